//! Normalizer
//!
//! Derives the canonical `normalTime` of a record and the display fields
//! that depend on it. Two modes:
//!
//! - **Zoned**: a display timezone is set. `normalTime` is the UTC `time`
//!   and `displayOffset` is the zone's offset at that instant.
//! - **Naive**: no display timezone. `normalTime` is the device-local clock
//!   reading presented as if it were UTC, and `displayOffset` is 0.
//!
//! Normalization never mutates the stored record; it borrows it and
//! carries the derived values alongside.

use crate::index::DateKey;
use crate::query::error::{QueryError, QueryResult};
use crate::storage::{format_iso, EventType, Record};
use chrono::{DateTime, Offset, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Attached to naive-mode records whose offsets do not reproduce `deviceTime`
pub const TIME_MISMATCH_WARNING: &str =
    "Combining `time` and `timezoneOffset` does not yield `deviceTime`.";

/// How `normalTime` is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeMode {
    /// Device-local clock time, presented as UTC
    #[default]
    Naive,
    /// UTC time, displayed in this zone
    Zoned(Tz),
}

impl TimeMode {
    /// Resolve a display zone name; `None` means naive mode
    pub fn for_zone(name: Option<&str>) -> QueryResult<Self> {
        match name {
            None => Ok(TimeMode::Naive),
            Some(name) => name
                .parse::<Tz>()
                .map(TimeMode::Zoned)
                .map_err(|_| QueryError::UnknownTimezone(name.to_string())),
        }
    }

    /// The date index whose keys equal `normalTime` in this mode
    pub fn date_key(&self) -> DateKey {
        match self {
            TimeMode::Naive => DateKey::DeviceLocal,
            TimeMode::Zoned(_) => DateKey::Utc,
        }
    }

    /// IANA name of the display zone, if any
    pub fn timezone_name(&self) -> Option<&'static str> {
        match self {
            TimeMode::Naive => None,
            TimeMode::Zoned(tz) => Some(tz.name()),
        }
    }
}

/// A record together with its derived time fields
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord<'a> {
    pub record: &'a Record,
    pub normal_time: DateTime<Utc>,
    /// Minutes east of UTC in the display zone
    pub display_offset: i32,
    pub warning: Option<&'static str>,
    /// Milliseconds since local midnight (cbg and smbg only)
    pub ms_per_24: Option<i64>,
    /// `normal_time + duration` (basal only)
    pub normal_end: Option<DateTime<Utc>>,
}

impl<'a> NormalizedRecord<'a> {
    /// Look up a field, derived fields taking precedence over stored ones
    pub fn field(&self, name: &str) -> Option<Cow<'_, Value>> {
        match name {
            "normalTime" => Some(Cow::Owned(Value::String(format_iso(&self.normal_time)))),
            "displayOffset" => Some(Cow::Owned(Value::from(self.display_offset))),
            "warning" if self.warning.is_some() => {
                self.warning.map(|w| Cow::Owned(Value::from(w)))
            }
            "msPer24" if self.ms_per_24.is_some() => {
                self.ms_per_24.map(|ms| Cow::Owned(Value::from(ms)))
            }
            "normalEnd" if self.normal_end.is_some() => self
                .normal_end
                .map(|end| Cow::Owned(Value::String(format_iso(&end)))),
            _ => self.record.field(name).map(Cow::Borrowed),
        }
    }

    /// The stored fields plus every derived one
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.record.fields.clone();
        map.insert(
            "normalTime".to_string(),
            Value::String(format_iso(&self.normal_time)),
        );
        map.insert("displayOffset".to_string(), Value::from(self.display_offset));
        if let Some(warning) = self.warning {
            map.insert("warning".to_string(), Value::from(warning));
        }
        if let Some(ms) = self.ms_per_24 {
            map.insert("msPer24".to_string(), Value::from(ms));
        }
        if let Some(end) = &self.normal_end {
            map.insert("normalEnd".to_string(), Value::String(format_iso(end)));
        }
        map
    }
}

/// Derive the normalized view of a record
pub fn normalize(record: &Record, mode: TimeMode) -> NormalizedRecord<'_> {
    let (normal_time, display_offset, warning) = match mode {
        TimeMode::Zoned(tz) => {
            let offset = tz.offset_from_utc_datetime(&record.time.naive_utc()).fix();
            (record.time, offset.local_minus_utc() / 60, None)
        }
        TimeMode::Naive => {
            let normal_time = record.device_local_time();
            let warning = match &record.device_time {
                Some(device_time)
                    if normal_time.format("%Y-%m-%dT%H:%M:%S").to_string() != *device_time =>
                {
                    Some(TIME_MISMATCH_WARNING)
                }
                _ => None,
            };
            (normal_time, 0, warning)
        }
    };

    // Omitted when the segment end falls outside the calendar
    let normal_end = match (&record.event_type, record.duration) {
        (EventType::Basal, Some(duration)) => TimeDelta::try_milliseconds(duration)
            .and_then(|delta| normal_time.checked_add_signed(delta)),
        _ => None,
    };

    let ms_per_24 = record
        .event_type
        .is_glucose()
        .then(|| ms_per_24(&normal_time, mode));

    NormalizedRecord {
        record,
        normal_time,
        display_offset,
        warning,
        ms_per_24,
        normal_end,
    }
}

/// Milliseconds since local midnight, in the display zone or else UTC
pub fn ms_per_24(instant: &DateTime<Utc>, mode: TimeMode) -> i64 {
    match mode {
        TimeMode::Naive => ms_since_midnight(instant),
        TimeMode::Zoned(tz) => ms_since_midnight(&instant.with_timezone(&tz)),
    }
}

fn ms_since_midnight<T: Timelike>(t: &T) -> i64 {
    // Leap-second nanos run past 1e9; clamp into the last millisecond
    let millis = (t.nanosecond() / 1_000_000).min(999);
    t.num_seconds_from_midnight() as i64 * 1000 + millis as i64
}
