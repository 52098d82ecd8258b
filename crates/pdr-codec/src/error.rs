use thiserror::Error;

/// Errors from decoding, encoding, or validating a change event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("buffer underrun: needed at least {needed} bytes, got {available}")]
    BufferTooShort { needed: usize, available: usize },

    #[error("unrecognized event_data_format {0:#04x}")]
    UnknownFormat(u8),

    #[error("unrecognized event_data_operation {0:#04x}")]
    UnknownOperation(u8),

    #[error("REFRESH_ENTIRE format must carry zero change records (V1)")]
    RefreshEntireWithRecords,

    #[error("PDR_HANDLES format may not contain a REFRESH_ALL record (V2)")]
    RefreshAllUnderHandles,

    #[error("operation codes must be non-decreasing across records (V4)")]
    OperationsOutOfOrder,

    #[error("record has {0} change entries, exceeding the per-record limit of 16 (V5)")]
    TooManyEntries(usize),

    #[error("event has {0} change records, exceeding the per-event limit of 4 (V5)")]
    TooManyRecords(usize),

    #[error("change tracker accumulator is full (16 entries)")]
    TrackerFull,
}

pub type CodecResult<T> = Result<T, CodecError>;
