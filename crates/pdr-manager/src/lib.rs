//! # pdr-manager
//!
//! Terminus-side and consolidator-side glue for a PLDM Platform Data Record
//! exchange (DSP0248 §16.7): remote-handle remapping, per-terminus state
//! machines, and the full/incremental synchronization algorithms that sit on
//! top of [`pdr_repository::Repository`] and [`pdr_codec`].
//!
//! The manager is single-threaded and cooperative: [`transport::Transport::send_recv`]
//! is its only suspension point, so no async runtime is needed.

#![deny(unsafe_code)]

mod error;
mod handle;
mod manager;
mod terminus;
mod transport;

pub use error::{ManagerError, ManagerResult};
pub use handle::{handle_range, remap_handle, terminus_idx_of_handle, MAX_TERMINI};
pub use manager::Manager;
pub use terminus::{FetchContext, HandleMapEntry, TerminusSlot, TerminusState};
pub use transport::{
    GetPdrRequest, GetPdrResponse, RepoInfoResponse, ResponseTransferFlag, SignatureResponse,
    Transport, TransferOp, CC_ERROR_UNSUPPORTED_PLDM_CMD, CC_SUCCESS, CMD_FIND_PDR, CMD_GET_PDR,
    CMD_GET_PDR_REPOSITORY_INFO, CMD_GET_PDR_REPOSITORY_SIGNATURE, PLDM_TYPE_PLATFORM,
};
