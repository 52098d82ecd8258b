//! PLDM Platform Monitoring & Control (type 0x02) wire contract: command
//! codes, completion codes, transfer flags, and the request/response
//! structures the manager exchanges with a terminus.

/// PLDM type used for every command the manager issues.
pub const PLDM_TYPE_PLATFORM: u8 = 0x02;

pub const CMD_GET_PDR_REPOSITORY_INFO: u8 = 0x50;
pub const CMD_GET_PDR: u8 = 0x51;
pub const CMD_FIND_PDR: u8 = 0x52;
pub const CMD_GET_PDR_REPOSITORY_SIGNATURE: u8 = 0x53;

pub const CC_SUCCESS: u8 = 0x00;
pub const CC_ERROR_UNSUPPORTED_PLDM_CMD: u8 = 0x04;

/// `transfer_op_flag` on a GetPDR request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    GetNextPart = 0x00,
    GetFirstPart = 0x01,
}

/// `transfer_flag` on a GetPDR response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseTransferFlag {
    Start = 0x00,
    Middle = 0x01,
    End = 0x04,
    StartAndEnd = 0x05,
}

impl ResponseTransferFlag {
    pub fn is_terminal(self) -> bool {
        matches!(self, ResponseTransferFlag::End | ResponseTransferFlag::StartAndEnd)
    }

    fn from_wire(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Start),
            0x01 => Some(Self::Middle),
            0x04 => Some(Self::End),
            0x05 => Some(Self::StartAndEnd),
            _ => None,
        }
    }
}

/// The blocking request/response callback the integrator supplies at
/// `Manager::new`. Must not return before a matched response or a
/// definitive failure — it is the manager's only suspension point.
pub trait Transport {
    /// Send `req` to `eid` for `command` under `pldm_type`, blocking until a
    /// response lands in `resp_buf`. Returns the number of bytes written.
    fn send_recv(
        &mut self,
        eid: u8,
        pldm_type: u8,
        command: u8,
        req: &[u8],
        resp_buf: &mut [u8],
    ) -> Result<usize, ()>;
}

/// Parsed GetPDRRepositoryInfo (0x50) response.
#[derive(Debug, Clone, Copy)]
pub struct RepoInfoResponse {
    pub completion_code: u8,
    pub repository_state: u8,
    pub record_count: u32,
    pub repository_size: u32,
    pub largest_record_size: u32,
}

impl RepoInfoResponse {
    /// `[cc:1][state:1][update_time:13][oem_time:13][count:4][size:4][largest:4][timeout:1]`
    pub const SIZE: usize = 1 + 1 + 13 + 13 + 4 + 4 + 4 + 1;

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }
        let completion_code = data[0];
        let repository_state = data[1];
        let offset = 2 + 13 + 13;
        let record_count = u32::from_le_bytes(data[offset..offset + 4].try_into().ok()?);
        let repository_size =
            u32::from_le_bytes(data[offset + 4..offset + 8].try_into().ok()?);
        let largest_record_size =
            u32::from_le_bytes(data[offset + 8..offset + 12].try_into().ok()?);
        Some(Self {
            completion_code,
            repository_state,
            record_count,
            repository_size,
            largest_record_size,
        })
    }
}

/// GetPDR (0x51) request.
#[derive(Debug, Clone, Copy)]
pub struct GetPdrRequest {
    pub record_handle: u32,
    pub data_transfer_handle: u32,
    pub transfer_op_flag: TransferOp,
    pub request_count: u16,
    pub record_change_num: u16,
}

impl GetPdrRequest {
    pub const SIZE: usize = 4 + 4 + 1 + 2 + 2;

    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.record_handle.to_le_bytes());
        out[4..8].copy_from_slice(&self.data_transfer_handle.to_le_bytes());
        out[8] = self.transfer_op_flag as u8;
        out[9..11].copy_from_slice(&self.request_count.to_le_bytes());
        out[11..13].copy_from_slice(&self.record_change_num.to_le_bytes());
        out
    }

    /// Parses a request back out of wire bytes. Not used by the manager
    /// itself; exposed for test and mock-terminus transport implementations.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }
        let record_handle = u32::from_le_bytes(data[0..4].try_into().ok()?);
        let data_transfer_handle = u32::from_le_bytes(data[4..8].try_into().ok()?);
        let transfer_op_flag = match data[8] {
            0x00 => TransferOp::GetNextPart,
            0x01 => TransferOp::GetFirstPart,
            _ => return None,
        };
        let request_count = u16::from_le_bytes(data[9..11].try_into().ok()?);
        let record_change_num = u16::from_le_bytes(data[11..13].try_into().ok()?);
        Some(Self {
            record_handle,
            data_transfer_handle,
            transfer_op_flag,
            request_count,
            record_change_num,
        })
    }
}

/// Parsed GetPDR (0x51) response header; `data` borrows the trailing bytes.
#[derive(Debug, Clone, Copy)]
pub struct GetPdrResponse<'a> {
    pub completion_code: u8,
    pub next_record_handle: u32,
    pub next_data_transfer_handle: u32,
    pub transfer_flag: ResponseTransferFlag,
    pub data: &'a [u8],
}

impl<'a> GetPdrResponse<'a> {
    /// `[cc:1][next_record_handle:4][next_data_transfer_handle:4][flag:1][count:2]`
    pub const HEADER_SIZE: usize = 1 + 4 + 4 + 1 + 2;

    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }
        let completion_code = data[0];
        let next_record_handle = u32::from_le_bytes(data[1..5].try_into().ok()?);
        let next_data_transfer_handle = u32::from_le_bytes(data[5..9].try_into().ok()?);
        let transfer_flag = ResponseTransferFlag::from_wire(data[9])?;
        let response_count = u16::from_le_bytes(data[10..12].try_into().ok()?) as usize;

        let payload = &data[Self::HEADER_SIZE..];
        if payload.len() < response_count {
            return None;
        }

        Some(Self {
            completion_code,
            next_record_handle,
            next_data_transfer_handle,
            transfer_flag,
            data: &payload[..response_count],
        })
    }
}

/// Parsed GetPDRRepositorySignature (0x53) response.
#[derive(Debug, Clone, Copy)]
pub struct SignatureResponse {
    pub completion_code: u8,
    pub signature: u32,
}

impl SignatureResponse {
    pub const SIZE: usize = 1 + 4;

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            completion_code: data[0],
            signature: u32::from_le_bytes(data[1..5].try_into().ok()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_pdr_request_round_trips_fields() {
        let req = GetPdrRequest {
            record_handle: 20,
            data_transfer_handle: 128,
            transfer_op_flag: TransferOp::GetNextPart,
            request_count: 128,
            record_change_num: 0,
        };
        let bytes = req.to_bytes();
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 20);
        assert_eq!(bytes[8], TransferOp::GetNextPart as u8);
    }

    #[test]
    fn get_pdr_request_parse_is_the_inverse_of_to_bytes() {
        let req = GetPdrRequest {
            record_handle: 0x10001,
            data_transfer_handle: 64,
            transfer_op_flag: TransferOp::GetFirstPart,
            request_count: 128,
            record_change_num: 0,
        };
        let bytes = req.to_bytes();
        let parsed = GetPdrRequest::parse(&bytes).unwrap();
        assert_eq!(parsed.record_handle, req.record_handle);
        assert_eq!(parsed.data_transfer_handle, req.data_transfer_handle);
        assert_eq!(parsed.transfer_op_flag, req.transfer_op_flag);
    }

    #[test]
    fn get_pdr_response_parses_header_and_payload() {
        let mut bytes = vec![0u8; GetPdrResponse::HEADER_SIZE];
        bytes[0] = CC_SUCCESS;
        bytes[1..5].copy_from_slice(&0u32.to_le_bytes());
        bytes[5..9].copy_from_slice(&0u32.to_le_bytes());
        bytes[9] = 0x05; // StartAndEnd
        bytes[10..12].copy_from_slice(&3u16.to_le_bytes());
        bytes.extend_from_slice(b"xyz");

        let resp = GetPdrResponse::parse(&bytes).unwrap();
        assert_eq!(resp.data, b"xyz");
        assert_eq!(resp.transfer_flag, ResponseTransferFlag::StartAndEnd);
        assert!(resp.transfer_flag.is_terminal());
    }
}
