use pdr_codec::CodecError;
use pdr_repository::RepoError;
use thiserror::Error;

/// Errors surfaced by the manager. Lower-level codec errors are wrapped
/// verbatim; repository errors are re-classified into the taxonomy below
/// since a full `RepoError` is an implementation detail the caller of
/// `apply_change_event`/`sync_terminus` shouldn't need to match on.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("decode error: {0}")]
    Decode(#[from] CodecError),

    #[error("transport failure contacting eid {eid:#04x} (command {command:#04x})")]
    Transport { eid: u8, command: u8 },

    #[error("eid {eid:#04x} returned completion code {completion_code:#04x} for command {command:#04x}")]
    Remote {
        eid: u8,
        command: u8,
        completion_code: u8,
    },

    #[error("resource exhausted: {0}")]
    ResourceExhausted(RepoError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("eid {0:#04x} is already registered")]
    Duplicate(u8),
}

impl From<RepoError> for ManagerError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(handle) => {
                ManagerError::NotFound(format!("record handle {handle:#010x}"))
            }
            other => ManagerError::ResourceExhausted(other),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
