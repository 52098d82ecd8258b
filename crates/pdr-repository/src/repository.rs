use crate::crc32::crc32;
use crate::error::{RepoError, RepoResult};
use crate::header::PdrHeader;
use crate::index::{IndexEntry, RepositoryInfo, RepositoryState};

/// Maximum blob size in bytes.
pub const MAX_BLOB_SIZE: usize = 8 * 1024;
/// Maximum number of PDR records held at once.
pub const MAX_RECORD_COUNT: usize = 64;
/// Maximum bytes returned per GetPDR transfer chunk.
pub const TRANSFER_CHUNK_SIZE: usize = 128;

/// `transfer_flag` on a GetPDR response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferFlag {
    Start = 0,
    Middle = 1,
    End = 4,
    StartAndEnd = 5,
}

/// One chunk of a multi-part GetPDR transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdrChunk<'a> {
    pub data: &'a [u8],
    pub transfer_flag: TransferFlag,
    pub next_data_transfer_handle: u32,
    pub next_record_handle: u32,
}

/// Result of a FindPDR lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindResult<'a> {
    pub found_handle: u32,
    pub data: &'a [u8],
    pub next_handle: u32,
}

/// A blob-backed, index-addressable PDR repository.
///
/// Records live concatenated (common header + payload) in a single growable
/// blob; a parallel index gives O(1) handle lookup without re-parsing the
/// blob. Removal only flips a tombstone flag — the blob is never compacted
/// until [`Repository::run_init_agent`] wipes and rebuilds it.
pub struct Repository {
    blob: Vec<u8>,
    index: Vec<IndexEntry>,
    info: RepositoryInfo,
    signature: u32,
    signature_valid: bool,
    next_record_handle: u32,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository {
    pub fn new() -> Self {
        Self {
            blob: Vec::new(),
            index: Vec::new(),
            info: RepositoryInfo::default(),
            signature: 0,
            signature_valid: false,
            next_record_handle: 1,
        }
    }

    pub fn get_info(&self) -> &RepositoryInfo {
        &self.info
    }

    pub fn blob_used(&self) -> usize {
        self.blob.len()
    }

    pub fn count(&self) -> usize {
        self.index.len()
    }

    fn non_tombstone_count(&self) -> usize {
        self.index.iter().filter(|e| !e.tombstone).count()
    }

    fn invalidate_signature(&mut self) {
        self.signature_valid = false;
    }

    fn recompute_info(&mut self) {
        let mut record_count = 0u32;
        let mut largest = 0u32;
        let mut last_used_end = 0usize;
        for entry in &self.index {
            if entry.tombstone {
                continue;
            }
            record_count += 1;
            largest = largest.max(entry.size as u32);
            last_used_end = last_used_end.max(entry.offset + entry.size);
        }
        self.info.record_count = record_count;
        self.info.largest_record_size = largest;
        self.info.repository_size = last_used_end as u32;
    }

    /// Find the index position for `handle`. Skips tombstones. Returns `None`
    /// if not found (or if it is a tombstone).
    pub fn find_index(&self, handle: u32) -> Option<usize> {
        self.index
            .iter()
            .position(|e| !e.tombstone && e.record_handle == handle)
    }

    fn append_to_blob(&mut self, pdr_type: u8, handle: u32, data: &[u8]) -> RepoResult<usize> {
        let total = PdrHeader::SIZE + data.len();
        if self.blob.len() + total > MAX_BLOB_SIZE {
            return Err(RepoError::OutOfBlobSpace {
                needed: total,
                available: MAX_BLOB_SIZE - self.blob.len(),
            });
        }

        let header = PdrHeader {
            record_handle: handle,
            pdr_header_version: PdrHeader::VERSION,
            pdr_type,
            record_change_num: 0,
            data_length: data.len() as u16,
        };

        let offset = self.blob.len();
        self.blob.extend_from_slice(&header.to_bytes());
        self.blob.extend_from_slice(data);
        Ok(offset)
    }

    fn insert_entry(&mut self, handle: u32, offset: usize, size: usize, pdr_type: u8) {
        self.index.push(IndexEntry {
            record_handle: handle,
            offset,
            size,
            pdr_type,
            tombstone: false,
        });
        self.recompute_info();
        self.invalidate_signature();
    }

    /// Assigns a fresh handle, writes `data` into the blob, appends an index
    /// entry.
    pub fn add_record(&mut self, pdr_type: u8, data: &[u8]) -> RepoResult<u32> {
        if self.index.len() >= MAX_RECORD_COUNT {
            return Err(RepoError::Full);
        }
        let handle = self.next_record_handle;
        let offset = self.append_to_blob(pdr_type, handle, data)?;
        self.next_record_handle += 1;
        self.insert_entry(handle, offset, PdrHeader::SIZE + data.len(), pdr_type);
        Ok(handle)
    }

    /// Add a record under an explicit, caller-supplied handle, bypassing the
    /// monotonic allocator entirely. Used by the manager to mirror a remote
    /// record's remapped handle without disturbing `next_record_handle`.
    pub fn add_record_with_handle(
        &mut self,
        handle: u32,
        pdr_type: u8,
        data: &[u8],
    ) -> RepoResult<()> {
        if self.index.len() >= MAX_RECORD_COUNT {
            return Err(RepoError::Full);
        }
        let offset = self.append_to_blob(pdr_type, handle, data)?;
        if handle >= self.next_record_handle {
            self.next_record_handle = handle + 1;
        }
        self.insert_entry(handle, offset, PdrHeader::SIZE + data.len(), pdr_type);
        Ok(())
    }

    /// Zero-copy bootstrap: read the header already present at `offset` in
    /// the blob and index it, without writing anything.
    pub fn index_record(&mut self, offset: usize) -> RepoResult<()> {
        let header = PdrHeader::parse(&self.blob[offset..])?;
        let size = PdrHeader::SIZE + header.data_length as usize;
        if offset + size > self.blob.len() {
            return Err(RepoError::OutOfBlobSpace {
                needed: size,
                available: self.blob.len() - offset,
            });
        }
        if header.record_handle >= self.next_record_handle {
            self.next_record_handle = header.record_handle + 1;
        }
        self.insert_entry(header.record_handle, offset, size, header.pdr_type);
        Ok(())
    }

    /// Sets the tombstone flag; O(1), does not reclaim blob bytes.
    pub fn remove_record(&mut self, handle: u32) -> RepoResult<()> {
        let idx = self.find_index(handle).ok_or(RepoError::NotFound(handle))?;
        self.index[idx].tombstone = true;
        self.recompute_info();
        self.invalidate_signature();
        Ok(())
    }

    /// Tombstones every non-tombstone record whose handle does not satisfy
    /// `keep`. Used to purge one terminus's handle range in one pass without
    /// exposing the index itself.
    pub fn retain_handles<F: FnMut(u32) -> bool>(&mut self, mut keep: F) {
        let mut changed = false;
        for entry in &mut self.index {
            if !entry.tombstone && !keep(entry.record_handle) {
                entry.tombstone = true;
                changed = true;
            }
        }
        if changed {
            self.recompute_info();
            self.invalidate_signature();
        }
    }

    fn first_non_tombstone(&self) -> Option<usize> {
        self.index.iter().position(|e| !e.tombstone)
    }

    fn next_non_tombstone_after(&self, idx: usize) -> Option<usize> {
        self.index[idx + 1..]
            .iter()
            .position(|e| !e.tombstone)
            .map(|p| p + idx + 1)
    }

    /// Multi-part GetPDR transfer. `record_handle == 0` resolves to the first
    /// non-tombstone record.
    pub fn get_pdr(&self, record_handle: u32, data_transfer_handle: u32) -> RepoResult<PdrChunk<'_>> {
        let idx = if record_handle == 0 {
            self.first_non_tombstone()
                .ok_or(RepoError::NotFound(record_handle))?
        } else {
            self.find_index(record_handle)
                .ok_or(RepoError::NotFound(record_handle))?
        };

        let entry = &self.index[idx];
        let record_bytes = &self.blob[entry.offset..entry.offset + entry.size];
        let payload = &record_bytes[PdrHeader::SIZE..];

        let offset = data_transfer_handle as usize;
        if offset > payload.len() {
            return Err(RepoError::OffsetOutOfRange {
                offset: data_transfer_handle,
                size: payload.len(),
            });
        }

        let remaining = payload.len() - offset;
        let chunk_len = remaining.min(TRANSFER_CHUNK_SIZE);
        let is_first = offset == 0;
        let is_last = offset + chunk_len == payload.len();

        let transfer_flag = match (is_first, is_last) {
            (true, true) => TransferFlag::StartAndEnd,
            (true, false) => TransferFlag::Start,
            (false, true) => TransferFlag::End,
            (false, false) => TransferFlag::Middle,
        };

        let next_data_transfer_handle = if is_last {
            0
        } else {
            (offset + chunk_len) as u32
        };

        let next_record_handle = if is_last {
            self.next_non_tombstone_after(idx)
                .map(|i| self.index[i].record_handle)
                .unwrap_or(0)
        } else {
            entry.record_handle
        };

        Ok(PdrChunk {
            data: &payload[offset..offset + chunk_len],
            transfer_flag,
            next_data_transfer_handle,
            next_record_handle,
        })
    }

    /// Linear scan for the next non-tombstone record of `pdr_type`, starting
    /// strictly after `start_handle` (or from the beginning if `start_handle == 0`).
    pub fn find_pdr(&self, pdr_type: u8, start_handle: u32) -> RepoResult<FindResult<'_>> {
        let start_idx = if start_handle == 0 {
            0
        } else {
            let idx = self
                .find_index(start_handle)
                .ok_or(RepoError::NotFound(start_handle))?;
            idx + 1
        };

        let found_idx = self.index[start_idx..]
            .iter()
            .position(|e| !e.tombstone && e.pdr_type == pdr_type)
            .map(|p| p + start_idx)
            .ok_or(RepoError::NotFound(start_handle))?;

        let entry = &self.index[found_idx];
        let record_bytes = &self.blob[entry.offset..entry.offset + entry.size];
        let data = &record_bytes[PdrHeader::SIZE..];

        let next_handle = self.index[found_idx + 1..]
            .iter()
            .position(|e| !e.tombstone && e.pdr_type == pdr_type)
            .map(|p| self.index[p + found_idx + 1].record_handle)
            .unwrap_or(0);

        Ok(FindResult {
            found_handle: entry.record_handle,
            data,
            next_handle,
        })
    }

    /// CRC32 over the used portion of the blob. Lazily computed and cached
    /// until the next mutation.
    pub fn get_signature(&mut self) -> u32 {
        if !self.signature_valid {
            self.signature = crc32(&self.blob);
            self.signature_valid = true;
        }
        self.signature
    }

    /// Wipes the repository and invokes `callback` to repopulate it via
    /// `add_record`.
    pub fn run_init_agent<F>(&mut self, mut callback: F) -> RepoResult<()>
    where
        F: FnMut(&mut Repository) -> RepoResult<()>,
    {
        self.info.repository_state = RepositoryState::UpdateInProgress;
        self.blob.clear();
        self.index.clear();
        self.next_record_handle = 1;
        self.invalidate_signature();

        let result = callback(self);

        match result {
            Ok(()) => {
                self.info.repository_state = RepositoryState::Available;
                self.recompute_info();
                Ok(())
            }
            Err(err) => {
                self.info.repository_state = RepositoryState::Failed;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_fetch_single_chunk() {
        let mut repo = Repository::new();
        let handle = repo.add_record(1, b"hello").unwrap();
        let chunk = repo.get_pdr(handle, 0).unwrap();
        assert_eq!(chunk.data, b"hello");
        assert_eq!(chunk.transfer_flag, TransferFlag::StartAndEnd);
        assert_eq!(chunk.next_data_transfer_handle, 0);
        assert_eq!(chunk.next_record_handle, 0);
    }

    #[test]
    fn chunked_fetch_of_300_bytes() {
        let mut repo = Repository::new();
        let payload = vec![0xAAu8; 300];
        let handle = repo.add_record(2, &payload).unwrap();

        let c1 = repo.get_pdr(handle, 0).unwrap();
        assert_eq!(c1.data.len(), 128);
        assert_eq!(c1.transfer_flag, TransferFlag::Start);

        let c2 = repo.get_pdr(handle, c1.next_data_transfer_handle).unwrap();
        assert_eq!(c2.data.len(), 128);
        assert_eq!(c2.transfer_flag, TransferFlag::Middle);

        let c3 = repo.get_pdr(handle, c2.next_data_transfer_handle).unwrap();
        assert_eq!(c3.data.len(), 44);
        assert_eq!(c3.transfer_flag, TransferFlag::End);
        assert_eq!(c3.next_data_transfer_handle, 0);

        let total = c1.data.len() + c2.data.len() + c3.data.len();
        assert_eq!(total, 300);
    }

    #[test]
    fn remove_is_tombstone_only() {
        let mut repo = Repository::new();
        let h1 = repo.add_record(1, b"a").unwrap();
        let _h2 = repo.add_record(1, b"b").unwrap();
        let blob_before = repo.blob_used();

        repo.remove_record(h1).unwrap();
        assert_eq!(repo.blob_used(), blob_before);
        assert_eq!(repo.get_info().record_count, 1);
        assert!(repo.find_index(h1).is_none());
    }

    #[test]
    fn get_pdr_zero_resolves_to_first_non_tombstone() {
        let mut repo = Repository::new();
        let h1 = repo.add_record(1, b"a").unwrap();
        let h2 = repo.add_record(1, b"b").unwrap();
        repo.remove_record(h1).unwrap();

        let chunk = repo.get_pdr(0, 0).unwrap();
        assert_eq!(chunk.data, b"b");
        assert_eq!(chunk.next_record_handle, 0);
        let _ = h2;
    }

    #[test]
    fn signature_invalidated_exactly_once_per_mutation() {
        let mut repo = Repository::new();
        repo.add_record(1, b"a").unwrap();
        let sig1 = repo.get_signature();
        let sig1_again = repo.get_signature();
        assert_eq!(sig1, sig1_again);

        repo.add_record(1, b"b").unwrap();
        let sig2 = repo.get_signature();
        assert_ne!(sig1, sig2);
        assert_eq!(sig2, crc32(&repo.blob));
    }

    #[test]
    fn find_pdr_skips_tombstones_and_other_types() {
        let mut repo = Repository::new();
        let h1 = repo.add_record(1, b"a").unwrap();
        let _h2 = repo.add_record(2, b"b").unwrap();
        let h3 = repo.add_record(1, b"c").unwrap();
        repo.remove_record(h1).unwrap();

        let found = repo.find_pdr(1, 0).unwrap();
        assert_eq!(found.found_handle, h3);
        assert_eq!(found.next_handle, 0);
    }

    #[test]
    fn add_record_with_handle_bypasses_allocator() {
        let mut repo = Repository::new();
        repo.add_record_with_handle(0x10001, 3, b"xyz").unwrap();
        assert!(repo.find_index(0x10001).is_some());
        let next = repo.add_record(3, b"abc").unwrap();
        assert_eq!(next, 0x10002);
    }

    #[test]
    fn retain_handles_tombstones_everything_outside_the_kept_range() {
        let mut repo = Repository::new();
        repo.add_record_with_handle(0x10001, 1, b"a").unwrap();
        repo.add_record_with_handle(0x10002, 1, b"b").unwrap();
        repo.add_record_with_handle(0x20001, 1, b"c").unwrap();

        repo.retain_handles(|h| !(0x10000..=0x1FFFF).contains(&h));

        assert!(repo.find_index(0x10001).is_none());
        assert!(repo.find_index(0x10002).is_none());
        assert!(repo.find_index(0x20001).is_some());
        assert_eq!(repo.get_info().record_count, 1);
    }

    #[test]
    fn run_init_agent_rebuilds_from_scratch() {
        let mut repo = Repository::new();
        repo.add_record(1, b"stale").unwrap();

        repo.run_init_agent(|r| {
            r.add_record(1, b"fresh").map(|_| ())
        })
        .unwrap();

        assert_eq!(repo.get_info().record_count, 1);
        let chunk = repo.get_pdr(0, 0).unwrap();
        assert_eq!(chunk.data, b"fresh");
    }
}
