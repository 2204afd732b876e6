//! Index Manager - Coordinates all glucolens indexes
//!
//! Provides a unified interface to:
//! - TimeIndex ×2 (by UTC `time` and by device-local normal time)
//! - DayIndex (weekday of the UTC `time`)
//! - TypeIndex (event type)
//!
//! # Query Optimization
//!
//! The IndexManager combines indexes to minimize records touched:
//!
//! ```text
//! Query: "smbg on weekdays, 2023-01-02 .. 2023-01-09"
//!
//! 1. TimeIndex: slots in [start, end), chronological
//!    → [s3, s4, s9, s12, s15]
//!
//! 2. DayIndex: drop slots whose weekday is inactive
//!    → [s3, s4, s12, s15]
//!
//! 3. TypeIndex: keep slots of type "smbg"
//!    → [s4, s15]
//!
//! 4. Only these 2 records are normalized and returned!
//! ```

use crate::index::{
    DateKey, DayIndex, DaySet, IndexStats, IndexView, RecordSlot, TimeIndex, TypeIndex,
};
use crate::storage::{EventType, Record, TimeRange};
use std::collections::HashSet;

/// Coordinates all index types for efficient queries
#[derive(Debug, Default, Clone)]
pub struct IndexManager {
    /// Keyed by the raw UTC `time`
    utc_index: TimeIndex,
    /// Keyed by the device-local normal time
    local_index: TimeIndex,
    /// Weekday buckets
    day_index: DayIndex,
    /// Event type → slots
    type_index: TypeIndex,
}

impl IndexManager {
    /// Create an empty index manager
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Query Methods ====================

    /// Open a filter view over these indexes
    ///
    /// The view starts unfiltered. Range filters on the view are applied to
    /// the date index selected by `date_key`.
    pub fn view(&self, date_key: DateKey) -> IndexView<'_> {
        IndexView::new(self, date_key)
    }

    /// Find all slots in a time range, chronological
    pub fn find_by_time_range(&self, date_key: DateKey, range: &TimeRange) -> Vec<RecordSlot> {
        self.time_index(date_key)
            .find_range(range.start, range.end)
            .collect()
    }

    /// Find all slots of an event type
    pub fn find_by_type(&self, event_type: &EventType) -> Option<&HashSet<RecordSlot>> {
        self.type_index.find(event_type)
    }

    /// Check whether a slot falls on one of the given weekdays
    pub fn matches_days(&self, slot: RecordSlot, days: DaySet) -> bool {
        self.day_index.matches(slot, days)
    }

    pub(crate) fn time_index(&self, date_key: DateKey) -> &TimeIndex {
        match date_key {
            DateKey::Utc => &self.utc_index,
            DateKey::DeviceLocal => &self.local_index,
        }
    }

    // ==================== Index Update Methods ====================

    /// Index a single record
    pub fn index_record(&mut self, slot: RecordSlot, record: &Record) {
        self.utc_index.insert(record.time.timestamp_millis(), slot);
        self.local_index
            .insert(record.device_local_time().timestamp_millis(), slot);
        self.day_index.add(record.day_of_week(), slot);
        self.type_index.add(&record.event_type, slot);
    }

    /// Remove a record from all indexes
    pub fn remove_record(&mut self, slot: RecordSlot, record: &Record) {
        self.utc_index.remove(record.time.timestamp_millis(), slot);
        self.local_index
            .remove(record.device_local_time().timestamp_millis(), slot);
        self.day_index.remove(record.day_of_week(), slot);
        self.type_index.remove(&record.event_type, slot);
    }

    /// Drop every entry from every index
    pub fn clear(&mut self) {
        self.utc_index.clear();
        self.local_index.clear();
        self.day_index.clear();
        self.type_index.clear();
    }

    // ==================== Stats Methods ====================

    /// Get statistics about all indexes
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            date_entries: self.utc_index.count(),
            day_entries: self.day_index.counts(),
            types_indexed: self.type_index.type_count(),
        }
    }

    /// Get UTC time bounds of indexed data
    pub fn time_bounds(&self) -> Option<(i64, i64)> {
        self.utc_index.time_bounds()
    }

    /// Get all indexed event types
    pub fn types(&self) -> Vec<EventType> {
        self.type_index.types()
    }

    /// Number of indexed records of a type
    pub fn type_count(&self, event_type: &EventType) -> usize {
        self.type_index.count(event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, event_type: &str, time: &str) -> Record {
        Record::from_value(json!({ "id": id, "type": event_type, "time": time })).unwrap()
    }

    fn millis(iso: &str) -> i64 {
        crate::storage::parse_iso(iso).unwrap().timestamp_millis()
    }

    #[test]
    fn test_manager_creation() {
        let manager = IndexManager::new();
        let stats = manager.stats();

        assert_eq!(stats.date_entries, 0);
        assert_eq!(stats.types_indexed, 0);
        assert!(manager.time_bounds().is_none());
    }

    #[test]
    fn test_index_record() {
        let mut manager = IndexManager::new();

        // 2023-01-01 is a Sunday, 2023-01-02 a Monday
        manager.index_record(RecordSlot(0), &record("a", "cbg", "2023-01-01T12:00:00Z"));
        manager.index_record(RecordSlot(1), &record("b", "basal", "2023-01-02T12:00:00Z"));

        let stats = manager.stats();
        assert_eq!(stats.date_entries, 2);
        assert_eq!(stats.day_entries, [1, 1, 0, 0, 0, 0, 0]);
        assert_eq!(stats.types_indexed, 2);
    }

    #[test]
    fn test_find_by_time_range() {
        let mut manager = IndexManager::new();

        manager.index_record(RecordSlot(0), &record("a", "cbg", "2023-01-01T00:00:00Z"));
        manager.index_record(RecordSlot(1), &record("b", "cbg", "2023-01-01T12:00:00Z"));
        manager.index_record(RecordSlot(2), &record("c", "cbg", "2023-01-02T00:00:00Z"));

        let range = TimeRange::new(millis("2023-01-01T00:00:00Z"), millis("2023-01-02T00:00:00Z"));
        let slots = manager.find_by_time_range(DateKey::Utc, &range);

        assert_eq!(slots, vec![RecordSlot(0), RecordSlot(1)]);
    }

    #[test]
    fn test_device_local_key() {
        let mut manager = IndexManager::new();

        let shifted = Record::from_value(json!({
            "id": "a",
            "type": "smbg",
            "time": "2023-01-02T03:00:00Z",
            "timezoneOffset": -300,
            "conversionOffset": 0,
        }))
        .unwrap();
        manager.index_record(RecordSlot(0), &shifted);

        let jan_1 = TimeRange::new(millis("2023-01-01T00:00:00Z"), millis("2023-01-02T00:00:00Z"));

        assert!(manager.find_by_time_range(DateKey::Utc, &jan_1).is_empty());
        assert_eq!(
            manager.find_by_time_range(DateKey::DeviceLocal, &jan_1),
            vec![RecordSlot(0)]
        );
    }

    #[test]
    fn test_remove_record() {
        let mut manager = IndexManager::new();

        let a = record("a", "cbg", "2023-01-01T00:00:00Z");
        let b = record("b", "bolus", "2023-01-01T01:00:00Z");
        manager.index_record(RecordSlot(0), &a);
        manager.index_record(RecordSlot(1), &b);

        manager.remove_record(RecordSlot(0), &a);

        let stats = manager.stats();
        assert_eq!(stats.date_entries, 1);
        assert_eq!(stats.types_indexed, 1);
        assert_eq!(manager.type_count(&EventType::Cbg), 0);
        assert_eq!(manager.type_count(&EventType::Bolus), 1);
    }

    #[test]
    fn test_clear() {
        let mut manager = IndexManager::new();

        manager.index_record(RecordSlot(0), &record("a", "cbg", "2023-01-01T00:00:00Z"));
        manager.clear();

        assert_eq!(manager.stats().date_entries, 0);
        assert!(manager.types().is_empty());
    }
}
