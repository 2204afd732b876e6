//! Day Index - weekday buckets for active-day filtering
//!
//! Each record lands in the bucket of the weekday of its raw UTC `time`
//! (0 = Sunday). The weekday is taken from the reported instant, not the
//! normalized one, so a late-evening reading west of UTC files under the
//! following day.

use crate::index::RecordSlot;
use std::collections::HashSet;

/// A set of weekdays, 0 = Sunday .. 6 = Saturday
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySet(u8);

impl DaySet {
    const ALL_BITS: u8 = 0b0111_1111;

    /// All seven days
    pub fn all() -> Self {
        Self(Self::ALL_BITS)
    }

    /// No days at all
    pub fn none() -> Self {
        Self(0)
    }

    /// Build from day numbers; values outside 0..=6 are ignored
    pub fn from_days<I: IntoIterator<Item = u8>>(days: I) -> Self {
        let bits = days
            .into_iter()
            .filter(|&d| d < 7)
            .fold(0u8, |acc, d| acc | (1 << d));
        Self(bits)
    }

    /// Check membership
    pub fn contains(&self, day: u8) -> bool {
        day < 7 && self.0 & (1 << day) != 0
    }

    /// Number of distinct days in the set
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Check if no day is active
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Check if every day is active
    pub fn is_all(&self) -> bool {
        self.0 == Self::ALL_BITS
    }

    /// Iterate the active days in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..7u8).filter(move |&d| self.contains(d))
    }
}

impl Default for DaySet {
    fn default() -> Self {
        Self::all()
    }
}

/// Weekday buckets over record slots
#[derive(Debug, Default, Clone)]
pub struct DayIndex {
    buckets: [HashSet<RecordSlot>; 7],
}

impl DayIndex {
    /// Create an empty day index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record slot under its weekday
    pub fn add(&mut self, day: u8, slot: RecordSlot) {
        if let Some(bucket) = self.buckets.get_mut(day as usize) {
            bucket.insert(slot);
        }
    }

    /// Remove a record slot, returning whether it was present
    pub fn remove(&mut self, day: u8, slot: RecordSlot) -> bool {
        self.buckets
            .get_mut(day as usize)
            .map(|bucket| bucket.remove(&slot))
            .unwrap_or(false)
    }

    /// Check whether a slot falls on any of the given days
    pub fn matches(&self, slot: RecordSlot, days: DaySet) -> bool {
        if days.is_all() {
            return true;
        }
        days.iter().any(|d| self.buckets[d as usize].contains(&slot))
    }

    /// Number of records per weekday, Sunday first
    pub fn counts(&self) -> [usize; 7] {
        let mut counts = [0; 7];
        for (count, bucket) in counts.iter_mut().zip(&self.buckets) {
            *count = bucket.len();
        }
        counts
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }
}
