//! # pdr-repository
//!
//! A blob-backed, index-addressable store for PLDM Platform Data Records
//! (DSP0248). Serves the five repository-facing commands — GetInfo, GetPDR
//! (chunked), FindPDR, GetSignature, RunInitAgent — with tombstone deletion
//! and a lazily-cached signature.
//!
//! All lookups are linear over at most [`MAX_RECORD_COUNT`] entries; that
//! constant is small enough that a hash index would cost more than it saves.

#![deny(unsafe_code)]

mod crc32;
mod error;
mod header;
mod index;
mod repository;

pub use error::{RepoError, RepoResult};
pub use header::PdrHeader;
pub use index::{IndexEntry, RepositoryInfo, RepositoryState};
pub use repository::{
    FindResult, PdrChunk, Repository, TransferFlag, MAX_BLOB_SIZE, MAX_RECORD_COUNT,
    TRANSFER_CHUNK_SIZE,
};
