use crate::error::{CodecError, CodecResult};
use crate::types::{
    ChangeEvent, ChangeFormat, ChangeOp, ChangeRecord, MAX_ENTRIES_PER_RECORD,
    MAX_RECORDS_PER_EVENT,
};

/// Validate V1, V2, V4, V5. V3 is enforced by [`ChangeFormat`]'s own
/// conversion from the wire byte, so a validated [`ChangeEvent`] can never
/// carry an out-of-range format. V6 applies only to the tracker's
/// `build_event`, not to a standalone event.
pub fn validate(event: &ChangeEvent) -> CodecResult<()> {
    if event.format == ChangeFormat::RefreshEntire {
        return if event.records.is_empty() {
            Ok(())
        } else {
            Err(CodecError::RefreshEntireWithRecords)
        };
    }

    if event.records.len() > MAX_RECORDS_PER_EVENT {
        return Err(CodecError::TooManyRecords(event.records.len()));
    }

    let mut last_op = ChangeOp::RefreshAll;
    for (i, rec) in event.records.iter().enumerate() {
        if event.format == ChangeFormat::PdrHandles && rec.operation == ChangeOp::RefreshAll {
            return Err(CodecError::RefreshAllUnderHandles);
        }

        if i > 0 && rec.operation < last_op {
            return Err(CodecError::OperationsOutOfOrder);
        }
        last_op = rec.operation;

        if rec.entries.len() > MAX_ENTRIES_PER_RECORD {
            return Err(CodecError::TooManyEntries(rec.entries.len()));
        }
    }

    Ok(())
}

/// Encoded size in bytes, as it would be written by [`encode`].
pub fn encoded_size(event: &ChangeEvent) -> usize {
    let mut size = 2;
    for rec in &event.records {
        size += 2 + rec.entries.len() * 4;
    }
    size
}

/// Serialize `event` into little-endian wire bytes. Validates first.
pub fn encode(event: &ChangeEvent) -> CodecResult<Vec<u8>> {
    validate(event)?;

    let mut buf = Vec::with_capacity(encoded_size(event));
    buf.push(event.format.as_wire());
    buf.push(event.records.len() as u8);

    for rec in &event.records {
        buf.push(rec.operation.as_wire());
        buf.push(rec.entries.len() as u8);
        for entry in &rec.entries {
            buf.extend_from_slice(&entry.to_le_bytes());
        }
    }

    Ok(buf)
}

/// Parse wire bytes into a [`ChangeEvent`], bounds-checking every field, then
/// re-validate the parsed structure.
pub fn decode(buf: &[u8]) -> CodecResult<ChangeEvent> {
    if buf.len() < 2 {
        return Err(CodecError::BufferTooShort {
            needed: 2,
            available: buf.len(),
        });
    }

    let format = ChangeFormat::try_from(buf[0])?;
    let num_records = buf[1] as usize;

    if format == ChangeFormat::RefreshEntire {
        return if num_records == 0 {
            Ok(ChangeEvent::refresh_entire())
        } else {
            Err(CodecError::RefreshEntireWithRecords)
        };
    }

    if num_records > MAX_RECORDS_PER_EVENT {
        return Err(CodecError::TooManyRecords(num_records));
    }

    let mut offset = 2usize;
    let mut records = Vec::with_capacity(num_records);

    for _ in 0..num_records {
        if offset + 2 > buf.len() {
            return Err(CodecError::BufferTooShort {
                needed: offset + 2,
                available: buf.len(),
            });
        }

        let operation = ChangeOp::try_from(buf[offset])?;
        let num_entries = buf[offset + 1] as usize;
        offset += 2;

        if num_entries > MAX_ENTRIES_PER_RECORD {
            return Err(CodecError::TooManyEntries(num_entries));
        }

        let entries_bytes = num_entries * 4;
        if offset + entries_bytes > buf.len() {
            return Err(CodecError::BufferTooShort {
                needed: offset + entries_bytes,
                available: buf.len(),
            });
        }

        let mut entries = Vec::with_capacity(num_entries);
        for i in 0..num_entries {
            let base = offset + i * 4;
            entries.push(u32::from_le_bytes([
                buf[base],
                buf[base + 1],
                buf[base + 2],
                buf[base + 3],
            ]));
        }
        offset += entries_bytes;

        records.push(ChangeRecord { operation, entries });
    }

    let event = ChangeEvent { format, records };
    validate(&event)?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles_event(op: ChangeOp, entries: Vec<u32>) -> ChangeEvent {
        ChangeEvent {
            format: ChangeFormat::PdrHandles,
            records: vec![ChangeRecord { operation: op, entries }],
        }
    }

    #[test]
    fn round_trips_a_single_delete_record() {
        let event = handles_event(ChangeOp::Deleted, vec![20]);
        let bytes = encode(&event).unwrap();
        assert_eq!(decode(&bytes).unwrap(), event);
    }

    #[test]
    fn round_trips_refresh_entire() {
        let event = ChangeEvent::refresh_entire();
        let bytes = encode(&event).unwrap();
        assert_eq!(bytes, vec![0x00, 0x00]);
        assert_eq!(decode(&bytes).unwrap(), event);
    }

    #[test]
    fn decode_re_encodes_byte_identical() {
        let bytes = [0x02u8, 0x01, 0x01, 0x01, 20, 0, 0, 0];
        let event = decode(&bytes).unwrap();
        assert_eq!(encode(&event).unwrap(), bytes);
    }

    #[test]
    fn v1_refresh_entire_with_records_rejected() {
        let bytes = [0x00u8, 0x01, 0x01, 0x00];
        assert_eq!(
            decode(&bytes).unwrap_err(),
            CodecError::RefreshEntireWithRecords
        );
    }

    #[test]
    fn v2_refresh_all_under_handles_rejected() {
        let event = handles_event(ChangeOp::RefreshAll, vec![]);
        assert_eq!(
            validate(&event).unwrap_err(),
            CodecError::RefreshAllUnderHandles
        );
    }

    #[test]
    fn v3_unknown_format_rejected() {
        let bytes = [0x09u8, 0x00];
        assert!(matches!(
            decode(&bytes).unwrap_err(),
            CodecError::UnknownFormat(0x09)
        ));
    }

    #[test]
    fn v4_operations_must_be_non_decreasing() {
        // PDR_HANDLES, 2 records: ADDED then DELETED.
        let bytes = [0x02u8, 0x02, 0x02, 0x00, 0x01, 0x00];
        assert_eq!(
            decode(&bytes).unwrap_err(),
            CodecError::OperationsOutOfOrder
        );
    }

    #[test]
    fn v5_too_many_entries_rejected() {
        let event = handles_event(ChangeOp::Added, vec![0; 17]);
        assert!(matches!(
            validate(&event).unwrap_err(),
            CodecError::TooManyEntries(17)
        ));
    }

    #[test]
    fn v5_too_many_records_rejected() {
        let event = ChangeEvent {
            format: ChangeFormat::PdrHandles,
            records: vec![
                ChangeRecord { operation: ChangeOp::Deleted, entries: vec![] },
                ChangeRecord { operation: ChangeOp::Deleted, entries: vec![] },
                ChangeRecord { operation: ChangeOp::Deleted, entries: vec![] },
                ChangeRecord { operation: ChangeOp::Deleted, entries: vec![] },
                ChangeRecord { operation: ChangeOp::Deleted, entries: vec![] },
            ],
        };
        assert!(matches!(
            validate(&event).unwrap_err(),
            CodecError::TooManyRecords(5)
        ));
    }

    #[test]
    fn decode_rejects_truncated_entries() {
        let bytes = [0x02u8, 0x01, 0x01, 0x01, 20, 0, 0];
        assert!(matches!(
            decode(&bytes).unwrap_err(),
            CodecError::BufferTooShort { .. }
        ));
    }
}
