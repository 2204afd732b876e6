//! Index View - a transient filtered view over the indexes
//!
//! An `IndexView` holds the filters for one query: an optional date range,
//! an active-day set and an optional exact type. Filters compose as an
//! intersection. The view only borrows the [`IndexManager`], so the filters
//! vanish with it and the store stays immutable while it is alive.
//!
//! ```ignore
//! let mut view = manager.view(DateKey::Utc);
//! view.filter_range(range).filter_days(weekdays);
//! let basal = view.filter_exact(EventType::Basal).top();
//! let bolus = view.filter_exact(EventType::Bolus).top();
//! ```

use crate::index::{DateKey, DaySet, IndexManager, RecordSlot};
use crate::storage::{EventType, TimeRange};

/// Filtered view over an [`IndexManager`]
#[derive(Debug, Clone)]
pub struct IndexView<'a> {
    manager: &'a IndexManager,
    date_key: DateKey,
    range: Option<TimeRange>,
    days: DaySet,
    event_type: Option<EventType>,
}

impl<'a> IndexView<'a> {
    pub(crate) fn new(manager: &'a IndexManager, date_key: DateKey) -> Self {
        Self {
            manager,
            date_key,
            range: None,
            days: DaySet::all(),
            event_type: None,
        }
    }

    /// Restrict to records whose date key falls in [start, end)
    pub fn filter_range(&mut self, range: TimeRange) -> &mut Self {
        self.range = Some(range);
        self
    }

    /// Restrict to records whose UTC weekday is in `days`
    pub fn filter_days(&mut self, days: DaySet) -> &mut Self {
        self.days = days;
        self
    }

    /// Restrict to records of exactly this type
    pub fn filter_exact(&mut self, event_type: EventType) -> &mut Self {
        self.event_type = Some(event_type);
        self
    }

    /// Reset every filter to all-pass
    pub fn clear_filters(&mut self) -> &mut Self {
        self.range = None;
        self.days = DaySet::all();
        self.event_type = None;
        self
    }

    /// Which date index range filters apply to
    pub fn date_key(&self) -> DateKey {
        self.date_key
    }

    /// All currently matching slots, chronological by the date key
    pub fn top(&self) -> Vec<RecordSlot> {
        let type_slots = match &self.event_type {
            Some(event_type) => match self.manager.find_by_type(event_type) {
                Some(slots) => Some(slots),
                None => return Vec::new(),
            },
            None => None,
        };

        if self.days.is_empty() {
            return Vec::new();
        }

        let matches = |slot: &RecordSlot| {
            type_slots.map_or(true, |slots| slots.contains(slot))
                && self.manager.matches_days(*slot, self.days)
        };

        let index = self.manager.time_index(self.date_key);
        match self.range {
            Some(range) => index.find_range(range.start, range.end).filter(matches).collect(),
            None => index.iter().filter(matches).collect(),
        }
    }

    /// Number of currently matching slots
    pub fn count(&self) -> usize {
        self.top().len()
    }
}
