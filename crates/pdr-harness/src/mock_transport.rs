use pdr_manager::{
    GetPdrRequest, RepoInfoResponse, ResponseTransferFlag, SignatureResponse, Transport,
    CC_SUCCESS, CMD_GET_PDR, CMD_GET_PDR_REPOSITORY_INFO, CMD_GET_PDR_REPOSITORY_SIGNATURE,
};

/// An in-memory PDR repository standing in for a real remote terminus.
/// Serves GetPDRRepositoryInfo, GetPDRRepositorySignature, and chunked GetPDR
/// against a fixed record set, and counts calls so scenarios can assert on
/// the signature fast path.
pub struct MockTerminus {
    pub records: Vec<(u32, u8, Vec<u8>)>,
    pub signature: u32,
    pub call_count: u32,
}

impl MockTerminus {
    pub fn new(records: Vec<(u32, u8, Vec<u8>)>, signature: u32) -> Self {
        Self { records, signature, call_count: 0 }
    }

    fn repo_size(&self) -> u32 {
        self.records.iter().map(|(_, _, d)| 10 + d.len() as u32).sum()
    }

    fn write_info_response(&self, buf: &mut [u8]) -> usize {
        buf[0] = CC_SUCCESS;
        buf[1] = 0;
        let offset = 2 + 13 + 13;
        buf[offset..offset + 4].copy_from_slice(&(self.records.len() as u32).to_le_bytes());
        buf[offset + 4..offset + 8].copy_from_slice(&self.repo_size().to_le_bytes());
        let largest = self.records.iter().map(|(_, _, d)| d.len() as u32).max().unwrap_or(0);
        buf[offset + 8..offset + 12].copy_from_slice(&largest.to_le_bytes());
        RepoInfoResponse::SIZE
    }

    fn write_signature_response(&self, buf: &mut [u8]) -> usize {
        buf[0] = CC_SUCCESS;
        buf[1..5].copy_from_slice(&self.signature.to_le_bytes());
        SignatureResponse::SIZE
    }

    fn write_get_pdr_response(&self, req: GetPdrRequest, buf: &mut [u8]) -> usize {
        let idx = if req.record_handle == 0 {
            0
        } else {
            self.records
                .iter()
                .position(|(h, _, _)| *h == req.record_handle)
                .expect("mock received a request for an unknown record handle")
        };
        let (_, _, data) = &self.records[idx];

        let offset = req.data_transfer_handle as usize;
        let remaining = data.len() - offset;
        let chunk_len = remaining.min(req.request_count as usize);
        let is_first = offset == 0;
        let is_last = offset + chunk_len == data.len();

        let flag = match (is_first, is_last) {
            (true, true) => ResponseTransferFlag::StartAndEnd,
            (true, false) => ResponseTransferFlag::Start,
            (false, true) => ResponseTransferFlag::End,
            (false, false) => ResponseTransferFlag::Middle,
        };
        let next_data_transfer_handle = if is_last { 0 } else { (offset + chunk_len) as u32 };
        let next_record_handle = if is_last {
            self.records.get(idx + 1).map(|(h, _, _)| *h).unwrap_or(0)
        } else {
            self.records[idx].0
        };

        buf[0] = CC_SUCCESS;
        buf[1..5].copy_from_slice(&next_record_handle.to_le_bytes());
        buf[5..9].copy_from_slice(&next_data_transfer_handle.to_le_bytes());
        buf[9] = flag as u8;
        buf[10..12].copy_from_slice(&(chunk_len as u16).to_le_bytes());
        buf[12..12 + chunk_len].copy_from_slice(&data[offset..offset + chunk_len]);
        12 + chunk_len
    }
}

impl Transport for MockTerminus {
    fn send_recv(
        &mut self,
        _eid: u8,
        _pldm_type: u8,
        command: u8,
        req: &[u8],
        resp_buf: &mut [u8],
    ) -> Result<usize, ()> {
        self.call_count += 1;
        match command {
            CMD_GET_PDR_REPOSITORY_INFO => Ok(self.write_info_response(resp_buf)),
            CMD_GET_PDR_REPOSITORY_SIGNATURE => Ok(self.write_signature_response(resp_buf)),
            CMD_GET_PDR => {
                let parsed = GetPdrRequest::parse(req).ok_or(())?;
                Ok(self.write_get_pdr_response(parsed, resp_buf))
            }
            _ => Err(()),
        }
    }
}
