use crate::codec::encoded_size;
use crate::error::{CodecError, CodecResult};
use crate::types::{ChangeEvent, ChangeFormat, ChangeOp, ChangeRecord, MAX_ENTRIES_PER_RECORD};

/// Terminus-side accumulator of pending PDR changes. Call `record_add` /
/// `record_delete` / `record_modify` as changes happen, then `build_event`
/// to compose the wire event when it's time to notify the manager.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    deletes: Vec<u32>,
    adds: Vec<u32>,
    modifies: Vec<u32>,
}

fn record(accumulator: &mut Vec<u32>, entry: u32) -> CodecResult<()> {
    if accumulator.len() >= MAX_ENTRIES_PER_RECORD {
        return Err(CodecError::TrackerFull);
    }
    accumulator.push(entry);
    Ok(())
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_changes(&self) -> bool {
        !self.deletes.is_empty() || !self.adds.is_empty() || !self.modifies.is_empty()
    }

    pub fn record_add(&mut self, entry: u32) -> CodecResult<()> {
        record(&mut self.adds, entry)
    }

    pub fn record_delete(&mut self, entry: u32) -> CodecResult<()> {
        record(&mut self.deletes, entry)
    }

    pub fn record_modify(&mut self, entry: u32) -> CodecResult<()> {
        record(&mut self.modifies, entry)
    }

    /// Compose change records in the V4-mandated order (deletes, adds,
    /// modifies), omitting empty accumulators. Falls back to
    /// `REFRESH_ENTIRE` if the tracker is empty or the encoded event would
    /// exceed `max_msg_size` (0 = no limit).
    pub fn build_event(&self, format: ChangeFormat, max_msg_size: u16) -> ChangeEvent {
        if !self.has_changes() {
            return ChangeEvent::refresh_entire();
        }

        let mut records = Vec::new();
        if !self.deletes.is_empty() {
            records.push(ChangeRecord {
                operation: ChangeOp::Deleted,
                entries: self.deletes.clone(),
            });
        }
        if !self.adds.is_empty() {
            records.push(ChangeRecord {
                operation: ChangeOp::Added,
                entries: self.adds.clone(),
            });
        }
        if !self.modifies.is_empty() {
            records.push(ChangeRecord {
                operation: ChangeOp::Modified,
                entries: self.modifies.clone(),
            });
        }

        let event = ChangeEvent { format, records };

        if max_msg_size != 0 && encoded_size(&event) > max_msg_size as usize {
            return ChangeEvent::refresh_entire();
        }

        event
    }

    pub fn clear(&mut self) {
        self.deletes.clear();
        self.adds.clear();
        self.modifies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tracker_builds_refresh_entire() {
        let tracker = ChangeTracker::new();
        assert_eq!(
            tracker.build_event(ChangeFormat::PdrHandles, 0),
            ChangeEvent::refresh_entire()
        );
    }

    #[test]
    fn composes_in_delete_add_modify_order() {
        let mut tracker = ChangeTracker::new();
        tracker.record_modify(3).unwrap();
        tracker.record_add(2).unwrap();
        tracker.record_delete(1).unwrap();

        let event = tracker.build_event(ChangeFormat::PdrHandles, 0);
        let ops: Vec<_> = event.records.iter().map(|r| r.operation).collect();
        assert_eq!(ops, vec![ChangeOp::Deleted, ChangeOp::Added, ChangeOp::Modified]);
    }

    #[test]
    fn v6_mtu_fallback_to_refresh_entire() {
        let mut tracker = ChangeTracker::new();
        for record_kind in 0..4u32 {
            for i in 0..16u32 {
                let entry = record_kind * 100 + i;
                match record_kind % 3 {
                    0 => tracker.record_delete(entry).unwrap(),
                    1 => tracker.record_add(entry).unwrap(),
                    _ => tracker.record_modify(entry).unwrap(),
                };
            }
        }

        let event = tracker.build_event(ChangeFormat::PdrHandles, 64);
        assert_eq!(event, ChangeEvent::refresh_entire());
    }

    #[test]
    fn full_accumulator_rejects_further_inserts() {
        let mut tracker = ChangeTracker::new();
        for i in 0..16 {
            tracker.record_add(i).unwrap();
        }
        assert_eq!(tracker.record_add(99).unwrap_err(), CodecError::TrackerFull);
    }
}
