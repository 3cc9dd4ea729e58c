use serde::{Deserialize, Serialize};

use crate::{
    domain::{GroupId, RecordId},
    error::ApiError,
};

/// One credentials folder. The wire name for the parent pointer is `pid`,
/// matching the vault payload format; `GroupId::ROOT` marks a root group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    #[serde(rename = "pid")]
    pub parent_id: GroupId,
    pub name: String,
}

/// One stored credential. Belongs to exactly one group (`pid` on the wire).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    #[serde(rename = "pid")]
    pub group_id: GroupId,
    pub name: String,
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientRequest {
    ListGroups,
    GetRecordsByGroup {
        group_id: GroupId,
    },
    NewGroup {
        parent_group_id: GroupId,
        group_name: String,
    },
    RenameGroup {
        group_id: GroupId,
        new_name: String,
    },
    DeleteGroup {
        group_id: GroupId,
    },
    DeleteRecord {
        record_id: RecordId,
    },
    RenameRecord {
        record_id: RecordId,
        new_name: String,
    },
    SaveFile {
        path: String,
        password: String,
    },
    OpenFile {
        path: String,
        password: String,
    },
    ExitApp,
}

impl ClientRequest {
    /// Stable request name for logs and error messages. Never log the full
    /// request: the file variants carry the vault password.
    pub fn name(&self) -> &'static str {
        match self {
            ClientRequest::ListGroups => "list_groups",
            ClientRequest::GetRecordsByGroup { .. } => "get_records_by_group",
            ClientRequest::NewGroup { .. } => "new_group",
            ClientRequest::RenameGroup { .. } => "rename_group",
            ClientRequest::DeleteGroup { .. } => "delete_group",
            ClientRequest::DeleteRecord { .. } => "delete_record",
            ClientRequest::RenameRecord { .. } => "rename_record",
            ClientRequest::SaveFile { .. } => "save_file",
            ClientRequest::OpenFile { .. } => "open_file",
            ClientRequest::ExitApp => "exit_app",
        }
    }
}

/// Push notifications from the backend store. Every push is the current
/// authoritative snapshot for the entity it names; `RecordSetUpdated` is
/// tagged with the group it was fetched for so stale pushes can be dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum BackendEvent {
    GroupSetUpdated {
        groups: Vec<Group>,
    },
    RecordSetUpdated {
        group_id: GroupId,
        records: Vec<Record>,
    },
    Error(ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_push_wire_shape_uses_pid_and_snake_case_tag() {
        let event = BackendEvent::RecordSetUpdated {
            group_id: GroupId(2),
            records: vec![Record {
                id: RecordId(7),
                group_id: GroupId(2),
                name: "mail".to_string(),
                login: "alice".to_string(),
                password: "hunter2hunter2".to_string(),
            }],
        };

        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "record_set_updated");
        assert_eq!(json["payload"]["group_id"], 2);
        assert_eq!(json["payload"]["records"][0]["pid"], 2);

        let parsed: BackendEvent = serde_json::from_value(json).expect("deserialize");
        match parsed {
            BackendEvent::RecordSetUpdated { group_id, records } => {
                assert_eq!(group_id, GroupId(2));
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].group_id, GroupId(2));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
