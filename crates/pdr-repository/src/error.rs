use thiserror::Error;

/// Errors surfaced by repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error("repository is at its record capacity")]
    Full,

    #[error("blob has no space for {needed} more bytes ({available} available)")]
    OutOfBlobSpace { needed: usize, available: usize },

    #[error("no record with handle {0:#010x}")]
    NotFound(u32),

    #[error("data_transfer_handle {offset} is out of range for a record of size {size}")]
    OffsetOutOfRange { offset: u32, size: usize },

    #[error("buffer too small to hold a PDR common header: needed {needed}, got {available}")]
    HeaderTooShort { needed: usize, available: usize },
}

pub type RepoResult<T> = Result<T, RepoError>;
