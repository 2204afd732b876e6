//! Endpoint windows
//!
//! A query's `[start, end]` endpoints define the `current` window; `prev`
//! and `next` are the equal-length windows on either side. All three are
//! half-open and contiguous:
//!
//! ```text
//!   prev            current          next
//! [s - len, s)    [s, e)           [e, e + len)
//! ```

use crate::index::DaySet;
use crate::query::error::{QueryError, QueryResult};
use crate::storage::{parse_iso, TimeRange, MS_IN_DAY};

/// Which of the three windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowName {
    Current,
    Next,
    Prev,
}

impl WindowName {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowName::Current => "current",
            WindowName::Next => "next",
            WindowName::Prev => "prev",
        }
    }
}

/// One window with its day counts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointWindow {
    pub range: TimeRange,
    /// Length in (fractional) days
    pub days_in_range: f64,
    /// `days_in_range` scaled by the share of active weekdays
    pub active_days_in_range: f64,
}

impl EndpointWindow {
    fn new(range: TimeRange, active_days: DaySet) -> Self {
        let days_in_range = days_in_range(&range);
        Self {
            range,
            days_in_range,
            active_days_in_range: active_days_in_range(days_in_range, active_days),
        }
    }

    /// `[start, end]` as ISO-8601 strings
    pub fn range_iso(&self) -> [String; 2] {
        [self.range.start_iso(), self.range.end_iso()]
    }
}

/// The current window and its neighbours
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Windows {
    pub current: EndpointWindow,
    pub next: EndpointWindow,
    pub prev: EndpointWindow,
}

impl Windows {
    /// Windows in output order
    pub fn iter(&self) -> impl Iterator<Item = (WindowName, &EndpointWindow)> {
        [
            (WindowName::Current, &self.current),
            (WindowName::Next, &self.next),
            (WindowName::Prev, &self.prev),
        ]
        .into_iter()
    }
}

/// Length of a range in days
pub fn days_in_range(range: &TimeRange) -> f64 {
    range.duration_millis() as f64 / MS_IN_DAY as f64
}

/// Days in range that fall on active weekdays, assuming an even spread
pub fn active_days_in_range(days_in_range: f64, active_days: DaySet) -> f64 {
    days_in_range * active_days.len() as f64 / 7.0
}

/// Build the three windows around `range`
pub fn windows_for(range: TimeRange, active_days: DaySet) -> Windows {
    Windows {
        current: EndpointWindow::new(range, active_days),
        next: EndpointWindow::new(range.following(), active_days),
        prev: EndpointWindow::new(range.preceding(), active_days),
    }
}

/// Parse `[start, end]` endpoints and build the three windows
///
/// Fails if either endpoint is not an ISO-8601 instant or if end
/// precedes start. Equal endpoints give three empty windows.
pub fn compute_windows(start: &str, end: &str, active_days: DaySet) -> QueryResult<Windows> {
    let start_time =
        parse_iso(start).ok_or_else(|| QueryError::InvalidTimestamp(start.to_string()))?;
    let end_time = parse_iso(end).ok_or_else(|| QueryError::InvalidTimestamp(end.to_string()))?;

    let range = TimeRange::between(&start_time, &end_time).ok_or_else(|| {
        QueryError::InvalidTimeRange(format!("end {} precedes start {}", end, start))
    })?;

    Ok(windows_for(range, active_days))
}
