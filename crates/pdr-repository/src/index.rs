/// Per-record metadata kept outside the blob — the repository's table of contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub record_handle: u32,
    pub offset: usize,
    /// Total size including the common header.
    pub size: usize,
    pub pdr_type: u8,
    pub tombstone: bool,
}

/// `repository_state` as reported by GetPDRRepositoryInfo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepositoryState {
    #[default]
    Available,
    UpdateInProgress,
    Failed,
}

impl RepositoryState {
    pub fn as_wire(self) -> u8 {
        match self {
            RepositoryState::Available => 0,
            RepositoryState::UpdateInProgress => 1,
            RepositoryState::Failed => 2,
        }
    }
}

/// Pre-computed metadata returned directly by GetPDRRepositoryInfo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepositoryInfo {
    pub repository_state: RepositoryState,
    pub record_count: u32,
    pub repository_size: u32,
    pub largest_record_size: u32,
}
