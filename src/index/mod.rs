//! glucolens Dimension Indexes
//!
//! Provides sub-linear filtering over the record store:
//!
//! - **TimeIndex**: ordered set of `(instant, slot)` for O(log n) range queries
//! - **DayIndex**: seven weekday buckets for active-day filtering
//! - **TypeIndex**: HashMap for O(1) event type → records lookup
//! - **IndexView**: a transient, per-query filter over all three
//!
//! # Architecture
//!
//! ```text
//! Query: "cbg readings last 14 days, weekdays only"
//!        ↓
//! TimeIndex: records in [start, end) → chronological slots
//!        ↓
//! DayIndex: keep slots whose UTC weekday is active
//!        ↓
//! TypeIndex: keep slots of type "cbg"
//!        ↓
//! Only these records get normalized, sorted and projected
//! ```
//!
//! Filters are never stored on the indexes themselves. A query borrows the
//! [`IndexManager`] through an [`IndexView`], so the store cannot be mutated
//! while any view is alive and dropping the view is all the cleanup needed.

mod day_index;
mod manager;
mod time_index;
mod type_index;
mod view;

pub use day_index::{DayIndex, DaySet};
pub use manager::IndexManager;
pub use time_index::TimeIndex;
pub use type_index::TypeIndex;
pub use view::IndexView;

use serde::Serialize;

/// Position of a record within the store
///
/// Slots are handed out from a monotonically increasing sequence, so
/// ordering by slot is ordering by ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordSlot(pub u64);

/// Which instant the date index is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateKey {
    /// Raw reported UTC `time` (the normal time when a display timezone is set)
    #[default]
    Utc,
    /// Device-local time read as UTC (the normal time in naive mode)
    DeviceLocal,
}

/// Statistics about index usage
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    /// Number of entries in each date index
    pub date_entries: usize,
    /// Records per weekday, Sunday first
    pub day_entries: [usize; 7],
    /// Number of distinct event types indexed
    pub types_indexed: usize,
}
