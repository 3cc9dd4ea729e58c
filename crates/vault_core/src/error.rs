use shared::domain::{GroupId, RecordId};
use thiserror::Error;

/// Failure taxonomy of the sync engine. Validation variants are decided
/// locally and never reach the backend; `Command` wraps a backend rejection
/// with local state left untouched. Nothing here is fatal: every failure is
/// recoverable by retrying the user action.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("password does not satisfy the vault policy")]
    PasswordPolicy,
    #[error("password confirmation does not match")]
    PasswordMismatch,
    #[error("a password is required to open a vault")]
    PasswordRequired,
    #[error("invalid tree node key: {0:?}")]
    InvalidNodeKey(String),
    #[error("the root group cannot be deleted")]
    RootGroupProtected,
    #[error("group {} is not present in the cached group set", .0 .0)]
    GroupNotCached(GroupId),
    #[error("another mutation is already in flight for record {}", .0 .0)]
    RecordMutationInFlight(RecordId),
    #[error("failed to subscribe to backend events: {0}")]
    SessionSubscribe(String),
    #[error("backend command {request} failed: {message}")]
    Command {
        request: &'static str,
        message: String,
    },
}
