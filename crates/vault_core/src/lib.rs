//! Client-side sync engine for the Kakadu credentials vault.
//!
//! The backend store owns the encrypted data; this crate owns the derived
//! view state: the hierarchical group tree, the record table for the
//! selected group, and the selection/context bookkeeping. All backend
//! interaction goes through two contracts: a [`CommandChannel`]
//! (request/response, may fail) and an [`EventChannel`] (fire-and-forget
//! pushes with no ordering guarantee relative to command completions).
//!
//! Mutations are optimistic: the local patch is applied immediately, the
//! command is issued, and the patch is rolled back if the command fails.
//! Pushes are treated as the authoritative snapshot for whatever entity
//! they name; a record push for a group that is no longer selected is
//! dropped so the latest user intent always wins.

use std::{collections::HashSet, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{GroupId, RecordId},
    protocol::{BackendEvent, ClientRequest, Group, Record},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

pub mod error;
pub mod password;
mod records;
pub mod selection;
pub mod tree;

pub use error::VaultError;
pub use selection::SelectionState;
pub use tree::{GroupTreeNode, TreeSnapshot};

use records::RecordStore;

/// Extension enforced on every save path.
pub const VAULT_FILE_EXTENSION: &str = "kkd";

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Request/response contract to the backend store. A failed send means the
/// backend rejected the command; callers surface the error and leave local
/// state unchanged.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn send(&self, request: ClientRequest) -> Result<()>;
}

/// Push contract from the backend store. Each subscription is an owned
/// receiver scoped to one sync session; dropping it ends the subscription.
#[async_trait]
pub trait EventChannel: Send + Sync {
    async fn subscribe(&self) -> Result<broadcast::Receiver<BackendEvent>>;
}

/// Engine-to-view notifications.
#[derive(Debug, Clone)]
pub enum VaultEvent {
    GroupTreeUpdated(Vec<GroupTreeNode>),
    RecordsUpdated(Vec<Record>),
    IntegrityWarning { orphaned: Vec<GroupId> },
    Error(String),
}

/// Subscription lifecycle of a sync session. There is no `Active → Active`
/// transition: starting a session while one is active disposes the old one
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unsubscribed,
    Subscribing,
    Active,
    Disposing,
}

pub struct VaultClient {
    commands: Arc<dyn CommandChannel>,
    backend_events: Arc<dyn EventChannel>,
    inner: Mutex<VaultClientState>,
    events: broadcast::Sender<VaultEvent>,
}

struct VaultClientState {
    phase: SessionPhase,
    event_pump: Option<JoinHandle<()>>,
    groups: Vec<Group>,
    tree: TreeSnapshot,
    records: RecordStore,
    selection: SelectionState,
    inflight_record_mutations: HashSet<RecordId>,
}

impl VaultClient {
    pub fn new(commands: Arc<dyn CommandChannel>, backend_events: Arc<dyn EventChannel>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            commands,
            backend_events,
            inner: Mutex::new(VaultClientState {
                phase: SessionPhase::Unsubscribed,
                event_pump: None,
                groups: Vec::new(),
                tree: TreeSnapshot::default(),
                records: RecordStore::default(),
                selection: SelectionState::default(),
                inflight_record_mutations: HashSet::new(),
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<VaultEvent> {
        self.events.subscribe()
    }

    pub async fn session_phase(&self) -> SessionPhase {
        self.inner.lock().await.phase
    }

    pub async fn group_tree(&self) -> Vec<GroupTreeNode> {
        self.inner.lock().await.tree.roots.clone()
    }

    pub async fn records(&self) -> Vec<Record> {
        self.inner.lock().await.records.snapshot()
    }

    pub async fn selection(&self) -> SelectionState {
        self.inner.lock().await.selection.clone()
    }

    /// Starts a sync session: subscribes to backend pushes, then issues the
    /// initial `list_groups` request. The subscription is established before
    /// the request is sent so a fast backend push cannot be missed. An
    /// already-active session is disposed first.
    pub async fn start_session(self: &Arc<Self>) -> Result<(), VaultError> {
        self.dispose_session().await;

        self.inner.lock().await.phase = SessionPhase::Subscribing;
        let receiver = match self.backend_events.subscribe().await {
            Ok(receiver) => receiver,
            Err(err) => {
                self.inner.lock().await.phase = SessionPhase::Unsubscribed;
                warn!(error = %err, "backend event subscription failed");
                return Err(VaultError::SessionSubscribe(err.to_string()));
            }
        };

        let pump = self.spawn_event_pump(receiver);
        {
            let mut inner = self.inner.lock().await;
            inner.event_pump = Some(pump);
            inner.phase = SessionPhase::Active;
        }
        info!("sync session active; requesting initial group set");

        self.send_command(ClientRequest::ListGroups).await
    }

    /// Tears the session down deterministically: after this returns, no
    /// event listener survives and the next mount starts from scratch.
    pub async fn dispose_session(&self) {
        let pump = {
            let mut inner = self.inner.lock().await;
            match inner.event_pump.take() {
                Some(pump) => {
                    inner.phase = SessionPhase::Disposing;
                    pump
                }
                None => {
                    inner.phase = SessionPhase::Unsubscribed;
                    return;
                }
            }
        };

        pump.abort();
        let _ = pump.await;
        self.inner.lock().await.phase = SessionPhase::Unsubscribed;
        debug!("sync session disposed");
    }

    fn spawn_event_pump(
        self: &Arc<Self>,
        mut receiver: broadcast::Receiver<BackendEvent>,
    ) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => client.handle_backend_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event channel lagged; pushes were dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn handle_backend_event(&self, event: BackendEvent) {
        match event {
            BackendEvent::GroupSetUpdated { groups } => self.apply_group_set(groups).await,
            BackendEvent::RecordSetUpdated { group_id, records } => {
                let snapshot = {
                    let mut inner = self.inner.lock().await;
                    if inner.selection.selected_group_id() != Some(group_id) {
                        debug!(
                            group_id = group_id.0,
                            "dropping record push for a group that is no longer selected"
                        );
                        return;
                    }
                    inner.records.replace_all(records);
                    inner.records.snapshot()
                };
                let _ = self.events.send(VaultEvent::RecordsUpdated(snapshot));
            }
            BackendEvent::Error(err) => {
                warn!(code = ?err.code, message = %err.message, "backend pushed an error");
                let _ = self.events.send(VaultEvent::Error(err.message));
            }
        }
    }

    async fn apply_group_set(&self, groups: Vec<Group>) {
        let snapshot = tree::build_tree(&groups);
        if !snapshot.orphaned.is_empty() {
            let orphaned: Vec<i64> = snapshot.orphaned.iter().map(|id| id.0).collect();
            warn!(
                ?orphaned,
                "group set contains groups unreachable from any root; dropped from the tree"
            );
            let _ = self.events.send(VaultEvent::IntegrityWarning {
                orphaned: snapshot.orphaned.clone(),
            });
        }

        let roots = {
            let mut inner = self.inner.lock().await;
            inner.groups = groups;
            inner.tree = snapshot;
            inner.tree.roots.clone()
        };
        let _ = self.events.send(VaultEvent::GroupTreeUpdated(roots));
    }

    /// Rebuilds and re-emits the tree from the locally cached flat list,
    /// used by optimistic group patches and their rollbacks. Integrity
    /// warnings are only raised for authoritative pushes.
    async fn rebuild_tree_from_cache(&self) {
        let roots = {
            let mut inner = self.inner.lock().await;
            let groups = std::mem::take(&mut inner.groups);
            inner.tree = tree::build_tree(&groups);
            inner.groups = groups;
            inner.tree.roots.clone()
        };
        let _ = self.events.send(VaultEvent::GroupTreeUpdated(roots));
    }

    /// Selects a tree node and asks the backend for that group's records.
    /// The selection is recorded before the fetch goes out, so a push for a
    /// previously selected group arriving late is recognized as stale and
    /// dropped. The tree itself is not touched.
    pub async fn select_group(&self, key: &str) -> Result<(), VaultError> {
        let group_id = parse_node_key(key)?;
        self.inner.lock().await.selection.select(key);
        debug!(group_id = group_id.0, "group selected; fetching records");
        self.send_command(ClientRequest::GetRecordsByGroup { group_id })
            .await
    }

    pub async fn set_context_target(&self, key: &str) {
        self.inner.lock().await.selection.set_context_target(key);
    }

    pub async fn clear_context_target(&self) {
        self.inner.lock().await.selection.clear_context_target();
    }

    pub async fn can_delete_context_target(&self) -> bool {
        self.inner.lock().await.selection.can_delete_context_target()
    }

    /// Creates a child group. The backend allocates the id, so there is no
    /// optimistic patch; a group-set refresh is requested instead and the
    /// resulting push rebuilds the tree.
    pub async fn create_group(&self, parent_key: &str, group_name: &str) -> Result<(), VaultError> {
        let parent_group_id = parse_node_key(parent_key)?;
        self.send_command(ClientRequest::NewGroup {
            parent_group_id,
            group_name: group_name.to_string(),
        })
        .await?;
        self.send_command(ClientRequest::ListGroups).await
    }

    /// Renames a group optimistically: the cached flat list is patched and
    /// the tree re-emitted before the command goes out; on failure the patch
    /// is rolled back and the error returned.
    pub async fn rename_group(&self, key: &str, new_name: &str) -> Result<(), VaultError> {
        let group_id = parse_node_key(key)?;
        let previous = {
            let mut inner = self.inner.lock().await;
            let Some(group) = inner.groups.iter_mut().find(|group| group.id == group_id) else {
                return Err(VaultError::GroupNotCached(group_id));
            };
            std::mem::replace(&mut group.name, new_name.to_string())
        };
        self.rebuild_tree_from_cache().await;

        let result = self
            .send_command(ClientRequest::RenameGroup {
                group_id,
                new_name: new_name.to_string(),
            })
            .await;

        if let Err(err) = result {
            {
                let mut inner = self.inner.lock().await;
                if let Some(group) = inner.groups.iter_mut().find(|group| group.id == group_id) {
                    group.name = previous;
                }
            }
            self.rebuild_tree_from_cache().await;
            return Err(err);
        }
        Ok(())
    }

    /// Deletes a group optimistically with the same rollback discipline as
    /// [`rename_group`](Self::rename_group). The root sentinel is refused.
    pub async fn delete_group(&self, key: &str) -> Result<(), VaultError> {
        let group_id = parse_node_key(key)?;
        if group_id.is_root() {
            return Err(VaultError::RootGroupProtected);
        }

        let removed = {
            let mut inner = self.inner.lock().await;
            let Some(index) = inner.groups.iter().position(|group| group.id == group_id) else {
                return Err(VaultError::GroupNotCached(group_id));
            };
            (index, inner.groups.remove(index))
        };
        self.rebuild_tree_from_cache().await;

        let result = self.send_command(ClientRequest::DeleteGroup { group_id }).await;
        if let Err(err) = result {
            {
                let mut inner = self.inner.lock().await;
                let (index, group) = removed;
                let index = index.min(inner.groups.len());
                inner.groups.insert(index, group);
            }
            self.rebuild_tree_from_cache().await;
            return Err(err);
        }
        Ok(())
    }

    /// Deletes a record. The command is confirmed first; only a successful
    /// response removes the record locally, so a rejected delete leaves the
    /// set untouched. No automatic retry.
    pub async fn delete_record(&self, record_id: RecordId) -> Result<(), VaultError> {
        self.begin_record_mutation(record_id).await?;

        let result = self.send_command(ClientRequest::DeleteRecord { record_id }).await;
        let outcome = match result {
            Ok(()) => {
                let snapshot = {
                    let mut inner = self.inner.lock().await;
                    let _ = inner.records.remove(record_id);
                    inner.records.snapshot()
                };
                let _ = self.events.send(VaultEvent::RecordsUpdated(snapshot));
                Ok(())
            }
            Err(err) => Err(err),
        };

        self.end_record_mutation(record_id).await;
        outcome
    }

    /// Renames a record with instant feedback: the name is patched locally
    /// and re-emitted, then confirmed with the backend; a rejection rolls
    /// the patch back and re-emits the previous state.
    pub async fn rename_record(&self, record_id: RecordId, new_name: &str) -> Result<(), VaultError> {
        self.begin_record_mutation(record_id).await?;

        let (previous, snapshot) = {
            let mut inner = self.inner.lock().await;
            let previous = inner.records.rename(record_id, new_name);
            (previous, inner.records.snapshot())
        };
        if previous.is_some() {
            let _ = self.events.send(VaultEvent::RecordsUpdated(snapshot));
        }

        let result = self
            .send_command(ClientRequest::RenameRecord {
                record_id,
                new_name: new_name.to_string(),
            })
            .await;

        let outcome = match result {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Some(previous) = previous {
                    let snapshot = {
                        let mut inner = self.inner.lock().await;
                        inner.records.rename(record_id, &previous);
                        inner.records.snapshot()
                    };
                    let _ = self.events.send(VaultEvent::RecordsUpdated(snapshot));
                }
                Err(err)
            }
        };

        self.end_record_mutation(record_id).await;
        outcome
    }

    /// Opens a vault file. A wrong password or corrupt payload comes back as
    /// a command error for the caller to surface; the loaded data itself
    /// arrives through a `group_set_updated` push.
    pub async fn open_vault(&self, path: &str, password: &str) -> Result<(), VaultError> {
        if password.is_empty() {
            return Err(VaultError::PasswordRequired);
        }
        self.send_command(ClientRequest::OpenFile {
            path: path.to_string(),
            password: password.to_string(),
        })
        .await
    }

    /// Saves the vault. Gated by the password policy and the confirmation
    /// match; a validation failure blocks the save locally and nothing is
    /// sent. The path always carries the vault extension.
    pub async fn save_vault(
        &self,
        path: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<(), VaultError> {
        if !password::validate(password).is_valid {
            return Err(VaultError::PasswordPolicy);
        }
        if !password::matches(password, confirmation) {
            return Err(VaultError::PasswordMismatch);
        }
        self.send_command(ClientRequest::SaveFile {
            path: normalize_vault_path(path),
            password: password.to_string(),
        })
        .await
    }

    pub async fn exit_app(&self) -> Result<(), VaultError> {
        self.send_command(ClientRequest::ExitApp).await
    }

    async fn begin_record_mutation(&self, record_id: RecordId) -> Result<(), VaultError> {
        let mut inner = self.inner.lock().await;
        if !inner.inflight_record_mutations.insert(record_id) {
            return Err(VaultError::RecordMutationInFlight(record_id));
        }
        Ok(())
    }

    async fn end_record_mutation(&self, record_id: RecordId) {
        self.inner
            .lock()
            .await
            .inflight_record_mutations
            .remove(&record_id);
    }

    async fn send_command(&self, request: ClientRequest) -> Result<(), VaultError> {
        let name = request.name();
        self.commands.send(request).await.map_err(|err| {
            warn!(request = name, error = %err, "backend command failed");
            VaultError::Command {
                request: name,
                message: err.to_string(),
            }
        })
    }
}

fn parse_node_key(key: &str) -> Result<GroupId, VaultError> {
    key.parse::<i64>()
        .map(GroupId)
        .map_err(|_| VaultError::InvalidNodeKey(key.to_string()))
}

/// Appends the `.kkd` extension unless the path already carries it.
pub fn normalize_vault_path(path: &str) -> String {
    let has_extension = std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        == Some(VAULT_FILE_EXTENSION);
    if has_extension {
        path.to_string()
    } else {
        format!("{path}.{VAULT_FILE_EXTENSION}")
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
