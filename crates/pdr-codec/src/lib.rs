//! # pdr-codec
//!
//! Wire encode/decode and V1–V6 validation for `pldmPDRRepositoryChgEvent`
//! (DSP0248 §16.14), plus the terminus-side [`ChangeTracker`] that
//! accumulates add/delete/modify entries and composes events subject to a
//! transport MTU.

#![deny(unsafe_code)]

mod codec;
mod error;
mod tracker;
mod types;

pub use codec::{decode, encode, encoded_size, validate};
pub use error::{CodecError, CodecResult};
pub use tracker::ChangeTracker;
pub use types::{
    ChangeEvent, ChangeFormat, ChangeOp, ChangeRecord, MAX_ENTRIES_PER_RECORD,
    MAX_RECORDS_PER_EVENT,
};
