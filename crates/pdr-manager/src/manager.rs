use pdr_codec::{ChangeFormat, ChangeOp};
use pdr_repository::{PdrHeader, Repository, RepositoryInfo};

use crate::error::{ManagerError, ManagerResult};
use crate::handle::{handle_range, remap_handle, terminus_idx_of_handle, MAX_TERMINI};
use crate::terminus::{FetchContext, TerminusSlot, TerminusState};
use crate::transport::{
    GetPdrRequest, GetPdrResponse, RepoInfoResponse, SignatureResponse, Transport, TransferOp,
    CC_ERROR_UNSUPPORTED_PLDM_CMD, CC_SUCCESS, CMD_GET_PDR, CMD_GET_PDR_REPOSITORY_INFO,
    CMD_GET_PDR_REPOSITORY_SIGNATURE, PLDM_TYPE_PLATFORM,
};

const INFO_RESP_BUF_LEN: usize = 64;
const GET_PDR_RESP_BUF_LEN: usize = GetPdrResponse::HEADER_SIZE + pdr_repository::TRANSFER_CHUNK_SIZE;

fn send_recv<T: Transport>(
    transport: &mut T,
    eid: u8,
    command: u8,
    req: &[u8],
    resp_buf: &mut [u8],
) -> ManagerResult<usize> {
    transport
        .send_recv(eid, PLDM_TYPE_PLATFORM, command, req, resp_buf)
        .map_err(|()| ManagerError::Transport { eid, command })
}

/// Owns a single consolidated [`Repository`] and up to [`MAX_TERMINI`]
/// terminus slots; drives full and incremental synchronization over a
/// blocking [`Transport`].
pub struct Manager<T: Transport> {
    repo: Repository,
    termini: [Option<TerminusSlot>; MAX_TERMINI],
    transport: T,
}

impl<T: Transport> Manager<T> {
    pub fn new(transport: T) -> Self {
        Self {
            repo: Repository::new(),
            termini: std::array::from_fn(|_| None),
            transport,
        }
    }

    fn find_slot_idx(&self, eid: u8) -> Option<usize> {
        self.termini
            .iter()
            .position(|slot| matches!(slot, Some(s) if s.eid == eid))
    }

    /// Registers a remote endpoint in the first free slot. Rejects an EID
    /// already occupying a slot.
    pub fn add_terminus(&mut self, eid: u8, terminus_handle: u16, tid: u8) -> ManagerResult<usize> {
        if self.find_slot_idx(eid).is_some() {
            return Err(ManagerError::Duplicate(eid));
        }
        let idx = self
            .termini
            .iter()
            .position(|slot| slot.is_none())
            .ok_or_else(|| {
                ManagerError::ResourceExhausted(pdr_repository::RepoError::Full)
            })?;
        self.termini[idx] = Some(TerminusSlot::new(idx, eid, terminus_handle, tid));
        Ok(idx)
    }

    /// Purges this terminus's records from the consolidated repository and
    /// frees its slot.
    pub fn remove_terminus(&mut self, eid: u8) -> ManagerResult<()> {
        let idx = self
            .find_slot_idx(eid)
            .ok_or_else(|| ManagerError::NotFound(format!("eid {eid:#04x}")))?;
        self.purge_terminus_pdrs(idx);
        self.termini[idx] = None;
        Ok(())
    }

    pub fn get_terminus_state(&self, eid: u8) -> ManagerResult<TerminusState> {
        let idx = self
            .find_slot_idx(eid)
            .ok_or_else(|| ManagerError::NotFound(format!("eid {eid:#04x}")))?;
        Ok(self.termini[idx].as_ref().unwrap().state)
    }

    fn purge_terminus_pdrs(&mut self, slot_idx: usize) {
        let (base, end) = handle_range(slot_idx as u8);
        self.repo.retain_handles(|h| !(h >= base && h <= end));
    }

    /// Fetches GetPDRRepositoryInfo then GetPDRRepositorySignature (falling
    /// back to a pseudo-signature if unsupported).
    fn fetch_repo_info(&mut self, slot_idx: usize) -> ManagerResult<()> {
        let eid = self.termini[slot_idx].as_ref().unwrap().eid;

        let mut resp_buf = [0u8; INFO_RESP_BUF_LEN];
        let n = send_recv(
            &mut self.transport,
            eid,
            CMD_GET_PDR_REPOSITORY_INFO,
            &[],
            &mut resp_buf,
        )?;
        let info = RepoInfoResponse::parse(&resp_buf[..n])
            .ok_or(ManagerError::Transport { eid, command: CMD_GET_PDR_REPOSITORY_INFO })?;
        if info.completion_code != CC_SUCCESS {
            return Err(ManagerError::Remote {
                eid,
                command: CMD_GET_PDR_REPOSITORY_INFO,
                completion_code: info.completion_code,
            });
        }

        let slot = self.termini[slot_idx].as_mut().unwrap();
        slot.remote_record_count = info.record_count;
        slot.remote_repo_size = info.repository_size;

        let mut sig_buf = [0u8; INFO_RESP_BUF_LEN];
        let sig_result = send_recv(
            &mut self.transport,
            eid,
            CMD_GET_PDR_REPOSITORY_SIGNATURE,
            &[],
            &mut sig_buf,
        );

        let slot = self.termini[slot_idx].as_mut().unwrap();
        match sig_result.ok().and_then(|n| SignatureResponse::parse(&sig_buf[..n])) {
            Some(sig) if sig.completion_code == CC_SUCCESS => {
                slot.last_signature = sig.signature;
            }
            Some(sig) if sig.completion_code == CC_ERROR_UNSUPPORTED_PLDM_CMD => {
                slot.last_signature =
                    slot.remote_record_count ^ (slot.remote_repo_size << 16);
            }
            _ => {
                slot.last_signature =
                    slot.remote_record_count ^ (slot.remote_repo_size << 16);
            }
        }

        Ok(())
    }

    /// Fetches the record named by `fetch_ctx.next_record_handle`, looping
    /// over GetPDR chunks until a terminal transfer flag arrives. Leaves the
    /// reassembled bytes in `fetch_ctx.reassembly_buf`.
    fn fetch_one_pdr(&mut self, slot_idx: usize) -> ManagerResult<()> {
        let eid = self.termini[slot_idx].as_ref().unwrap().eid;

        {
            let slot = self.termini[slot_idx].as_mut().unwrap();
            slot.fetch_ctx.reassembly_buf.clear();
        }

        let mut data_transfer_handle = 0u32;
        let mut transfer_op = TransferOp::GetFirstPart;
        let record_handle = self.termini[slot_idx].as_ref().unwrap().fetch_ctx.next_record_handle;

        loop {
            let req = GetPdrRequest {
                record_handle,
                data_transfer_handle,
                transfer_op_flag: transfer_op,
                request_count: pdr_repository::TRANSFER_CHUNK_SIZE as u16,
                record_change_num: 0,
            };
            let req_bytes = req.to_bytes();

            let mut resp_buf = [0u8; GET_PDR_RESP_BUF_LEN];
            let n = send_recv(&mut self.transport, eid, CMD_GET_PDR, &req_bytes, &mut resp_buf)?;

            let resp = GetPdrResponse::parse(&resp_buf[..n])
                .ok_or(ManagerError::Transport { eid, command: CMD_GET_PDR })?;
            if resp.completion_code != CC_SUCCESS {
                return Err(ManagerError::Remote {
                    eid,
                    command: CMD_GET_PDR,
                    completion_code: resp.completion_code,
                });
            }

            let slot = self.termini[slot_idx].as_mut().unwrap();
            if slot.fetch_ctx.reassembly_buf.len() + resp.data.len()
                > FetchContext::MAX_REASSEMBLY_LEN
            {
                return Err(ManagerError::ResourceExhausted(
                    pdr_repository::RepoError::OutOfBlobSpace {
                        needed: resp.data.len(),
                        available: FetchContext::MAX_REASSEMBLY_LEN
                            - slot.fetch_ctx.reassembly_buf.len(),
                    },
                ));
            }
            slot.fetch_ctx.reassembly_buf.extend_from_slice(resp.data);

            if resp.transfer_flag.is_terminal() {
                slot.fetch_ctx.next_record_handle = resp.next_record_handle;
                slot.fetch_ctx.records_fetched += 1;
                return Ok(());
            }

            data_transfer_handle = resp.next_data_transfer_handle;
            transfer_op = TransferOp::GetNextPart;
        }
    }

    fn fetch_pdr_by_handle(&mut self, slot_idx: usize, remote_handle: u32) -> ManagerResult<()> {
        self.termini[slot_idx].as_mut().unwrap().fetch_ctx.next_record_handle = remote_handle;
        self.fetch_one_pdr(slot_idx)
    }

    /// Insert the reassembled record under an explicit handle, bypassing the
    /// repository's monotonic allocator.
    fn add_remapped_pdr(&mut self, handle: u32, pdr_type: u8, data: &[u8]) -> ManagerResult<()> {
        self.repo
            .add_record_with_handle(handle, pdr_type, data)
            .map_err(ManagerError::from)
    }

    /// The full synchronization sequence: info/signature check with an
    /// idempotent fast-path, purge, chunked fetch-all, remap, insert.
    pub fn sync_terminus(&mut self, eid: u8) -> ManagerResult<()> {
        let idx = self
            .find_slot_idx(eid)
            .ok_or_else(|| ManagerError::NotFound(format!("eid {eid:#04x}")))?;

        let old_sig = self.termini[idx].as_ref().unwrap().last_signature;
        let was_synced = matches!(
            self.termini[idx].as_ref().unwrap().state,
            TerminusState::Synced | TerminusState::Stale
        );
        self.termini[idx].as_mut().unwrap().state = TerminusState::Syncing;

        if let Err(err) = self.fetch_repo_info(idx) {
            self.termini[idx].as_mut().unwrap().state = TerminusState::Error;
            return Err(err);
        }

        let new_sig = self.termini[idx].as_ref().unwrap().last_signature;
        if was_synced && old_sig != 0 && new_sig == old_sig {
            self.termini[idx].as_mut().unwrap().state = TerminusState::Synced;
            return Ok(());
        }

        self.purge_terminus_pdrs(idx);
        self.termini[idx].as_mut().unwrap().begin_fetch_pass();

        let remote_record_count = self.termini[idx].as_ref().unwrap().remote_record_count;
        for _ in 0..remote_record_count {
            if let Err(err) = self.fetch_one_pdr(idx) {
                self.termini[idx].as_mut().unwrap().state = TerminusState::Error;
                return Err(err);
            }

            let reassembly_len = self.termini[idx].as_ref().unwrap().fetch_ctx.reassembly_buf.len();
            if reassembly_len < PdrHeader::SIZE {
                self.termini[idx].as_mut().unwrap().state = TerminusState::Error;
                return Err(ManagerError::ResourceExhausted(
                    pdr_repository::RepoError::HeaderTooShort {
                        needed: PdrHeader::SIZE,
                        available: reassembly_len,
                    },
                ));
            }

            let parsed = PdrHeader::parse(&self.termini[idx].as_ref().unwrap().fetch_ctx.reassembly_buf);
            let header = match parsed {
                Ok(h) => h,
                Err(err) => {
                    self.termini[idx].as_mut().unwrap().state = TerminusState::Error;
                    return Err(err.into());
                }
            };

            let remapped = {
                let slot = self.termini[idx].as_mut().unwrap();
                let seq = slot.local_handle_seq;
                slot.local_handle_seq += 1;
                remap_handle(idx as u8, seq)
            };

            let payload = self.termini[idx].as_ref().unwrap().fetch_ctx.reassembly_buf
                [PdrHeader::SIZE..]
                .to_vec();

            if let Err(err) = self.add_remapped_pdr(remapped, header.pdr_type, &payload) {
                self.termini[idx].as_mut().unwrap().state = TerminusState::Error;
                return Err(err);
            }

            let slot = self.termini[idx].as_mut().unwrap();
            slot.local_record_count += 1;
            slot.add_handle_mapping(header.record_handle, remapped);

            if slot.fetch_ctx.next_record_handle == 0 {
                break;
            }
        }

        self.termini[idx].as_mut().unwrap().state = TerminusState::Synced;
        Ok(())
    }

    /// Runs `sync_terminus` over every slot in `Discovered` or `Stale` state.
    /// Every eligible slot is attempted even if an earlier one fails; the
    /// first failure is returned once the sweep completes.
    pub fn sync_all(&mut self) -> ManagerResult<()> {
        let eids: Vec<u8> = self
            .termini
            .iter()
            .flatten()
            .filter(|s| matches!(s.state, TerminusState::Discovered | TerminusState::Stale))
            .map(|s| s.eid)
            .collect();

        let mut first_err = None;
        for eid in eids {
            if let Err(err) = self.sync_terminus(eid) {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Lightweight signature comparison; marks a previously-synced slot
    /// `Stale` if the remote repository has changed.
    pub fn check_for_changes(&mut self, eid: u8) -> ManagerResult<bool> {
        let idx = self
            .find_slot_idx(eid)
            .ok_or_else(|| ManagerError::NotFound(format!("eid {eid:#04x}")))?;
        let old_sig = self.termini[idx].as_ref().unwrap().last_signature;

        self.fetch_repo_info(idx)?;

        let slot = self.termini[idx].as_mut().unwrap();
        let changed = old_sig == 0 || slot.last_signature != old_sig;
        if changed && slot.state == TerminusState::Synced {
            slot.state = TerminusState::Stale;
        }
        Ok(changed)
    }

    fn handle_deletes(&mut self, slot_idx: usize, entries: &[u32]) -> ManagerResult<()> {
        for &remote_handle in entries {
            let local_handle = match self.termini[slot_idx].as_ref().unwrap().find_handle_mapping(remote_handle) {
                Some(h) => h,
                None => continue, // unknown remote handle: forward-compatible skip
            };
            let _ = self.repo.remove_record(local_handle);
            let slot = self.termini[slot_idx].as_mut().unwrap();
            slot.remove_handle_mapping(remote_handle);
            slot.local_record_count = slot.local_record_count.saturating_sub(1);
        }
        Ok(())
    }

    fn handle_adds(&mut self, slot_idx: usize, entries: &[u32]) -> ManagerResult<()> {
        for &remote_handle in entries {
            self.fetch_pdr_by_handle(slot_idx, remote_handle)?;

            let reassembly_len = self.termini[slot_idx].as_ref().unwrap().fetch_ctx.reassembly_buf.len();
            if reassembly_len < PdrHeader::SIZE {
                return Err(ManagerError::ResourceExhausted(
                    pdr_repository::RepoError::HeaderTooShort {
                        needed: PdrHeader::SIZE,
                        available: reassembly_len,
                    },
                ));
            }

            let header = PdrHeader::parse(
                &self.termini[slot_idx].as_ref().unwrap().fetch_ctx.reassembly_buf,
            )?;

            let remapped = {
                let slot = self.termini[slot_idx].as_mut().unwrap();
                let seq = slot.local_handle_seq;
                slot.local_handle_seq += 1;
                remap_handle(slot_idx as u8, seq)
            };

            let payload = self.termini[slot_idx].as_ref().unwrap().fetch_ctx.reassembly_buf
                [PdrHeader::SIZE..]
                .to_vec();
            self.add_remapped_pdr(remapped, header.pdr_type, &payload)?;

            let slot = self.termini[slot_idx].as_mut().unwrap();
            slot.add_handle_mapping(remote_handle, remapped);
            slot.local_record_count += 1;
        }
        Ok(())
    }

    fn handle_modifies(&mut self, slot_idx: usize, entries: &[u32]) -> ManagerResult<()> {
        for &remote_handle in entries {
            let local_handle = match self.termini[slot_idx].as_ref().unwrap().find_handle_mapping(remote_handle) {
                Some(h) => h,
                None => continue,
            };

            let _ = self.repo.remove_record(local_handle);

            let bail = |mgr: &mut Self| {
                let slot = mgr.termini[slot_idx].as_mut().unwrap();
                slot.remove_handle_mapping(remote_handle);
                slot.local_record_count = slot.local_record_count.saturating_sub(1);
            };

            if let Err(err) = self.fetch_pdr_by_handle(slot_idx, remote_handle) {
                bail(self);
                return Err(err);
            }

            let reassembly_len = self.termini[slot_idx].as_ref().unwrap().fetch_ctx.reassembly_buf.len();
            if reassembly_len < PdrHeader::SIZE {
                bail(self);
                return Err(ManagerError::ResourceExhausted(
                    pdr_repository::RepoError::HeaderTooShort {
                        needed: PdrHeader::SIZE,
                        available: reassembly_len,
                    },
                ));
            }

            let header = match PdrHeader::parse(
                &self.termini[slot_idx].as_ref().unwrap().fetch_ctx.reassembly_buf,
            ) {
                Ok(h) => h,
                Err(err) => {
                    bail(self);
                    return Err(err.into());
                }
            };

            let payload = self.termini[slot_idx].as_ref().unwrap().fetch_ctx.reassembly_buf
                [PdrHeader::SIZE..]
                .to_vec();

            // Re-add under the SAME local handle to preserve the mapping.
            if let Err(err) = self.add_remapped_pdr(local_handle, header.pdr_type, &payload) {
                bail(self);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Decodes `raw_bytes` and applies it: a REFRESH_ENTIRE/PDR_TYPES event
    /// triggers a full resync; a PDR_HANDLES event is applied incrementally,
    /// falling back to a full resync on any mutation failure. Validation
    /// errors in the event itself are never swallowed by the fallback — they
    /// indicate a broken peer, not a transient failure.
    pub fn apply_change_event(&mut self, eid: u8, raw_bytes: &[u8]) -> ManagerResult<()> {
        let event = pdr_codec::decode(raw_bytes)?;

        if event.format == ChangeFormat::RefreshEntire || event.format == ChangeFormat::PdrTypes {
            return self.sync_terminus(eid);
        }

        let slot_idx = self
            .find_slot_idx(eid)
            .ok_or_else(|| ManagerError::NotFound(format!("eid {eid:#04x}")))?;

        for record in &event.records {
            let result = match record.operation {
                ChangeOp::Deleted => self.handle_deletes(slot_idx, &record.entries),
                ChangeOp::Added => self.handle_adds(slot_idx, &record.entries),
                ChangeOp::Modified => self.handle_modifies(slot_idx, &record.entries),
                ChangeOp::RefreshAll => {
                    // PDR_HANDLES + REFRESH_ALL never passes codec validation.
                    unreachable!("decode() rejects REFRESH_ALL under PDR_HANDLES")
                }
            };
            if result.is_err() {
                return self.sync_terminus(eid);
            }
        }

        Ok(())
    }

    /// Recovers the originating EID from a consolidated handle.
    pub fn lookup_origin(&self, handle: u32) -> ManagerResult<u8> {
        let idx = terminus_idx_of_handle(handle);
        if idx >= MAX_TERMINI {
            return Err(ManagerError::NotFound(format!("handle {handle:#010x}")));
        }
        match &self.termini[idx] {
            Some(slot) if slot.state != TerminusState::Unused => Ok(slot.eid),
            _ => Err(ManagerError::NotFound(format!("handle {handle:#010x}"))),
        }
    }

    pub fn get_info(&self) -> &RepositoryInfo {
        self.repo.get_info()
    }

    pub fn get_pdr(
        &self,
        record_handle: u32,
        data_transfer_handle: u32,
    ) -> ManagerResult<pdr_repository::PdrChunk<'_>> {
        self.repo
            .get_pdr(record_handle, data_transfer_handle)
            .map_err(ManagerError::from)
    }

    pub fn find_pdr(&self, pdr_type: u8, start_handle: u32) -> ManagerResult<pdr_repository::FindResult<'_>> {
        self.repo.find_pdr(pdr_type, start_handle).map_err(ManagerError::from)
    }

    pub fn get_signature(&mut self) -> u32 {
        self.repo.get_signature()
    }
}
