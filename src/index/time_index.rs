//! Time Index - B-tree over record instants for time range queries
//!
//! Keys are `(timestamp_ms, slot)` pairs so records sharing an instant stay
//! distinct and come back in ingest order.
//!
//! # Performance
//! - Insert/remove: O(log n)
//! - Range query: O(log n + k) where k = results

use crate::index::RecordSlot;
use std::collections::BTreeSet;

/// Ordered index of record instants
#[derive(Debug, Default, Clone)]
pub struct TimeIndex {
    entries: BTreeSet<(i64, RecordSlot)>,
}

impl TimeIndex {
    /// Create an empty time index
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a single entry
    pub fn insert(&mut self, timestamp: i64, slot: RecordSlot) {
        self.entries.insert((timestamp, slot));
    }

    /// Remove a single entry, returning whether it was present
    pub fn remove(&mut self, timestamp: i64, slot: RecordSlot) -> bool {
        self.entries.remove(&(timestamp, slot))
    }

    /// Iterate all slots in a time range [start, end)
    ///
    /// Slots come back sorted by timestamp, then by slot.
    pub fn find_range(&self, start: i64, end: i64) -> impl Iterator<Item = RecordSlot> + '_ {
        // An empty or inverted range would make BTreeSet::range panic
        let end = end.max(start);
        self.entries
            .range((start, RecordSlot(0))..(end, RecordSlot(0)))
            .map(|&(_, slot)| slot)
    }

    /// Iterate every slot in chronological order
    pub fn iter(&self) -> impl Iterator<Item = RecordSlot> + '_ {
        self.entries.iter().map(|&(_, slot)| slot)
    }

    /// Get count of entries
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Get min and max timestamps
    pub fn time_bounds(&self) -> Option<(i64, i64)> {
        let first = self.entries.first()?;
        let last = self.entries.last()?;
        Some((first.0, last.0))
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_index_creation() {
        let index = TimeIndex::new();
        assert_eq!(index.count(), 0);
        assert!(index.time_bounds().is_none());
    }

    #[test]
    fn test_insert_and_query() {
        let mut index = TimeIndex::new();

        index.insert(1000, RecordSlot(1));
        index.insert(2000, RecordSlot(2));
        index.insert(3000, RecordSlot(3));

        let results: Vec<_> = index.find_range(1500, 2500).collect();
        assert_eq!(results, vec![RecordSlot(2)]);

        let results: Vec<_> = index.find_range(0, 10_000).collect();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_range_is_half_open() {
        let mut index = TimeIndex::new();

        index.insert(1000, RecordSlot(1));
        index.insert(2000, RecordSlot(2));

        let results: Vec<_> = index.find_range(1000, 2000).collect();
        assert_eq!(results, vec![RecordSlot(1)]);

        assert_eq!(index.find_range(2000, 2000).count(), 0);
        assert_eq!(index.find_range(3000, 1000).count(), 0);
    }

    #[test]
    fn test_same_instant_keeps_ingest_order() {
        let mut index = TimeIndex::new();

        index.insert(1000, RecordSlot(7));
        index.insert(1000, RecordSlot(3));
        index.insert(500, RecordSlot(9));

        let results: Vec<_> = index.iter().collect();
        assert_eq!(results, vec![RecordSlot(9), RecordSlot(3), RecordSlot(7)]);
    }

    #[test]
    fn test_remove() {
        let mut index = TimeIndex::new();

        index.insert(1000, RecordSlot(1));
        index.insert(2000, RecordSlot(2));

        assert!(index.remove(1000, RecordSlot(1)));
        assert!(!index.remove(1000, RecordSlot(1)));
        assert_eq!(index.count(), 1);
    }

    #[test]
    fn test_time_bounds() {
        let mut index = TimeIndex::new();

        index.insert(5000, RecordSlot(1));
        index.insert(1000, RecordSlot(2));
        index.insert(3000, RecordSlot(3));

        assert_eq!(index.time_bounds(), Some((1000, 5000)));
    }

    #[test]
    fn test_large_insert_performance() {
        let mut index = TimeIndex::new();

        let start = std::time::Instant::now();
        for i in 0..100_000u64 {
            index.insert(i as i64 * 300_000, RecordSlot(i));
        }
        let elapsed = start.elapsed();
        println!("Inserted 100K entries in {:?}", elapsed);

        let query_start = std::time::Instant::now();
        let results = index.find_range(25_000 * 300_000, 75_000 * 300_000).count();
        let query_elapsed = query_start.elapsed();

        println!("Range query returned {} results in {:?}", results, query_elapsed);
        assert_eq!(results, 50_000);
    }
}
