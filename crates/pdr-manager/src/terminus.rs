/// Lifecycle state of a tracked terminus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminusState {
    Unused,
    Discovered,
    Syncing,
    Synced,
    Stale,
    Error,
}

/// Per-terminus reassembly state for a multi-part GetPDR transfer.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    pub reassembly_buf: Vec<u8>,
    /// Remote handle of the record to fetch next; 0 selects the first record.
    pub next_record_handle: u32,
    pub records_fetched: u16,
    pub retries: u8,
}

impl FetchContext {
    pub const MAX_REASSEMBLY_LEN: usize = 256;

    fn reset(&mut self) {
        self.reassembly_buf.clear();
    }
}

/// One entry of a terminus's remote-to-local handle map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleMapEntry {
    pub remote_handle: u32,
    pub local_handle: u32,
}

/// Tracking state for one remote terminus.
///
/// `slot_index` is populated once at [`crate::Manager::add_terminus`] time
/// and threaded explicitly through every operation that needs to know which
/// handle range this terminus owns, rather than recovered from the slot's
/// position in a backing array.
#[derive(Debug, Clone)]
pub struct TerminusSlot {
    pub slot_index: usize,
    pub state: TerminusState,
    pub eid: u8,
    pub tid: u8,
    pub terminus_handle: u16,
    pub remote_record_count: u32,
    pub remote_repo_size: u32,
    pub last_signature: u32,
    pub local_handle_seq: u16,
    pub local_record_count: u16,
    pub fetch_ctx: FetchContext,
    pub handle_map: Vec<HandleMapEntry>,
}

impl TerminusSlot {
    pub(crate) fn new(slot_index: usize, eid: u8, terminus_handle: u16, tid: u8) -> Self {
        Self {
            slot_index,
            state: TerminusState::Discovered,
            eid,
            tid,
            terminus_handle,
            remote_record_count: 0,
            remote_repo_size: 0,
            last_signature: 0,
            local_handle_seq: 1,
            local_record_count: 0,
            fetch_ctx: FetchContext::default(),
            handle_map: Vec::new(),
        }
    }

    pub(crate) fn begin_fetch_pass(&mut self) {
        self.local_handle_seq = 1;
        self.local_record_count = 0;
        self.handle_map.clear();
        self.fetch_ctx.reset();
        self.fetch_ctx.next_record_handle = 0;
        self.fetch_ctx.records_fetched = 0;
    }

    pub fn find_handle_mapping(&self, remote_handle: u32) -> Option<u32> {
        self.handle_map
            .iter()
            .find(|e| e.remote_handle == remote_handle)
            .map(|e| e.local_handle)
    }

    pub fn add_handle_mapping(&mut self, remote_handle: u32, local_handle: u32) {
        self.handle_map.push(HandleMapEntry {
            remote_handle,
            local_handle,
        });
    }

    pub fn remove_handle_mapping(&mut self, remote_handle: u32) {
        self.handle_map.retain(|e| e.remote_handle != remote_handle);
    }
}
