use pdr_codec::{decode, encode, ChangeEvent, ChangeFormat, ChangeOp, ChangeRecord, CodecError};

fn record(op: ChangeOp, entries: Vec<u32>) -> ChangeRecord {
    ChangeRecord { operation: op, entries }
}

#[test]
fn v1_non_empty_refresh_entire_is_rejected() {
    let event = ChangeEvent {
        format: ChangeFormat::RefreshEntire,
        records: vec![record(ChangeOp::Deleted, vec![1])],
    };
    assert_eq!(
        pdr_codec::validate(&event).unwrap_err(),
        CodecError::RefreshEntireWithRecords
    );
}

#[test]
fn v4_counter_example_added_then_deleted() {
    // Matches the concrete scenario byte sequence: PDR_HANDLES, 2 records,
    // ADDED then DELETED.
    let bytes = [0x02u8, 0x02, 0x02, 0x00, 0x01, 0x00];
    assert_eq!(decode(&bytes).unwrap_err(), CodecError::OperationsOutOfOrder);
}

#[test]
fn encode_of_decoded_valid_buffer_is_byte_identical() {
    let event = ChangeEvent {
        format: ChangeFormat::PdrHandles,
        records: vec![
            record(ChangeOp::Deleted, vec![1, 2]),
            record(ChangeOp::Added, vec![3]),
            record(ChangeOp::Modified, vec![4, 5, 6]),
        ],
    };
    let bytes = encode(&event).unwrap();
    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded, event);
    assert_eq!(encode(&decoded).unwrap(), bytes);
}

#[test]
fn pdr_types_format_permits_refresh_all() {
    let event = ChangeEvent {
        format: ChangeFormat::PdrTypes,
        records: vec![record(ChangeOp::RefreshAll, vec![5, 9])],
    };
    assert!(pdr_codec::validate(&event).is_ok());
    let bytes = encode(&event).unwrap();
    assert_eq!(decode(&bytes).unwrap(), event);
}
