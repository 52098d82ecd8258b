use pdr_manager::{Manager, TerminusState};
use serde::Serialize;

use crate::mock_transport::MockTerminus;

const EID: u8 = 0x08;

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

fn result(name: &str, passed: bool, detail: impl Into<String>) -> ScenarioResult {
    ScenarioResult { name: name.to_string(), passed, detail: detail.into() }
}

/// Bootstrap sync of three records onto a fresh manager, expecting
/// consolidated handles 0x10001/0x10002/0x10003 and a working reverse
/// EID lookup.
pub fn bootstrap_sync() -> ScenarioResult {
    let transport = MockTerminus::new(
        vec![(10, 1, b"alpha".to_vec()), (20, 1, b"beta".to_vec()), (30, 2, b"gamma".to_vec())],
        0xAAAA_AAAA,
    );
    let mut mgr = Manager::new(transport);
    if let Err(e) = mgr.add_terminus(EID, 1, 0) {
        return result("bootstrap_sync", false, format!("add_terminus failed: {e}"));
    }
    if let Err(e) = mgr.sync_terminus(EID) {
        return result("bootstrap_sync", false, format!("sync_terminus failed: {e}"));
    }

    let origin_ok = mgr.lookup_origin(0x10002).map(|e| e == EID).unwrap_or(false);
    let count_ok = mgr.get_info().record_count == 3;
    let passed = origin_ok && count_ok;
    result(
        "bootstrap_sync",
        passed,
        format!("record_count={}, lookup_origin(0x10002)_matches={origin_ok}", mgr.get_info().record_count),
    )
}

/// An unchanged remote signature should short-circuit a second sync without
/// refetching any records.
pub fn signature_fast_path() -> ScenarioResult {
    let transport = MockTerminus::new(vec![(10, 1, b"alpha".to_vec())], 0x1234_5678);
    let mut mgr = Manager::new(transport);
    mgr.add_terminus(EID, 1, 0).ok();
    if mgr.sync_terminus(EID).is_err() {
        return result("signature_fast_path", false, "initial sync failed");
    }
    let before = mgr.get_info().record_count;
    if mgr.sync_terminus(EID).is_err() {
        return result("signature_fast_path", false, "second sync failed");
    }
    let after = mgr.get_info().record_count;
    result(
        "signature_fast_path",
        before == after,
        format!("record_count stable across resync: {before} -> {after}"),
    )
}

/// A 300-byte record must be reassembled from three GetPDR chunks.
pub fn chunked_fetch() -> ScenarioResult {
    let payload = vec![0x42u8; 300];
    let transport = MockTerminus::new(vec![(10, 5, payload.clone())], 0x5555_5555);
    let mut mgr = Manager::new(transport);
    mgr.add_terminus(EID, 1, 0).ok();
    if mgr.sync_terminus(EID).is_err() {
        return result("chunked_fetch", false, "sync failed");
    }
    let chunk = match mgr.get_pdr(0x10001, 0) {
        Ok(c) => c,
        Err(e) => return result("chunked_fetch", false, format!("get_pdr failed: {e}")),
    };
    let passed = chunk.data == payload.as_slice();
    result("chunked_fetch", passed, format!("reassembled {} of {} bytes", chunk.data.len(), payload.len()))
}

/// An incremental PDR_HANDLES/Deleted event must remove exactly the named
/// local record.
pub fn incremental_delete() -> ScenarioResult {
    let transport = MockTerminus::new(
        vec![(10, 1, b"alpha".to_vec()), (20, 1, b"beta".to_vec())],
        0x1111_1111,
    );
    let mut mgr = Manager::new(transport);
    mgr.add_terminus(EID, 1, 0).ok();
    if mgr.sync_terminus(EID).is_err() {
        return result("incremental_delete", false, "sync failed");
    }

    let event = pdr_codec::ChangeEvent {
        format: pdr_codec::ChangeFormat::PdrHandles,
        records: vec![pdr_codec::ChangeRecord {
            operation: pdr_codec::ChangeOp::Deleted,
            entries: vec![10],
        }],
    };
    let bytes = match pdr_codec::encode(&event) {
        Ok(b) => b,
        Err(e) => return result("incremental_delete", false, format!("encode failed: {e}")),
    };
    if let Err(e) = mgr.apply_change_event(EID, &bytes) {
        return result("incremental_delete", false, format!("apply_change_event failed: {e}"));
    }

    let passed = mgr.get_info().record_count == 1;
    result("incremental_delete", passed, format!("record_count after delete: {}", mgr.get_info().record_count))
}

/// A malformed event (ADDED before DELETED under PDR_HANDLES, violating V4)
/// must be rejected without mutating the repository or the terminus state.
pub fn v4_violation_rejected() -> ScenarioResult {
    let transport = MockTerminus::new(vec![(10, 1, b"alpha".to_vec())], 0x2222_2222);
    let mut mgr = Manager::new(transport);
    mgr.add_terminus(EID, 1, 0).ok();
    if mgr.sync_terminus(EID).is_err() {
        return result("v4_violation_rejected", false, "sync failed");
    }

    let bytes = [0x02u8, 0x02, 0x02, 0x00, 0x01, 0x00]; // ADDED then DELETED
    let before_count = mgr.get_info().record_count;
    let apply_result = mgr.apply_change_event(EID, &bytes);
    let state_ok = mgr.get_terminus_state(EID).map(|s| s != TerminusState::Error).unwrap_or(false);
    let passed = apply_result.is_err() && mgr.get_info().record_count == before_count && state_ok;
    result(
        "v4_violation_rejected",
        passed,
        format!("apply rejected={}, record_count unchanged={}", apply_result.is_err(), mgr.get_info().record_count == before_count),
    )
}

/// An oversized change set must fall back to REFRESH_ENTIRE instead of
/// producing an event that violates the MTU.
pub fn mtu_fallback() -> ScenarioResult {
    let mut tracker = pdr_codec::ChangeTracker::default();
    for record_kind in 0..pdr_codec::MAX_RECORDS_PER_EVENT as u32 {
        for i in 0..pdr_codec::MAX_ENTRIES_PER_RECORD as u32 {
            let entry = record_kind * 100 + i;
            match record_kind % 3 {
                0 => tracker.record_delete(entry),
                1 => tracker.record_add(entry),
                _ => tracker.record_modify(entry),
            }
            .ok();
        }
    }
    let event = tracker.build_event(pdr_codec::ChangeFormat::PdrHandles, 64);
    let passed = event.format == pdr_codec::ChangeFormat::RefreshEntire;
    result("mtu_fallback", passed, format!("composed format: {:?}", event.format))
}

pub fn all() -> Vec<ScenarioResult> {
    vec![
        bootstrap_sync(),
        signature_fast_path(),
        chunked_fetch(),
        incremental_delete(),
        v4_violation_rejected(),
        mtu_fallback(),
    ]
}
