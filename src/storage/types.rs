//! Core data types for the glucolens record store
//!
//! This module defines the fundamental types used throughout the storage layer:
//! - `Record`: A single device event (glucose reading, dose, settings snapshot, ...)
//! - `EventType`: The `type` tag of a record
//! - `TimeRange`: A half-open time interval for queries
//! - ISO-8601 helpers shared by the index and query layers

use crate::storage::error::{StorageError, StorageResult};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Milliseconds in one minute
pub const MS_IN_MIN: i64 = 60 * 1000;

/// Milliseconds in one day
pub const MS_IN_DAY: i64 = 24 * 60 * MS_IN_MIN;

/// Format an instant the way every timestamp leaves this crate:
/// millisecond precision with a `Z` suffix (`2023-01-01T12:00:00.000Z`).
pub fn format_iso(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 instant. Strings without an offset are read as UTC,
/// and a bare date (`2023-01-01`) is midnight UTC.
pub fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_naive(s)
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parse an offset-less local clock string (`YYYY-MM-DDTHH:MM:SS[.fff]`)
pub fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

const KNOWN_TYPES: &[EventType] = &[
    EventType::Cbg,
    EventType::Smbg,
    EventType::Basal,
    EventType::Bolus,
    EventType::Wizard,
    EventType::Upload,
    EventType::PumpSettings,
    EventType::CgmSettings,
    EventType::DeviceEvent,
];

/// Event type of a record
///
/// The nine device data types are named explicitly; anything else is kept
/// as `Other` so it can still be stored and queried by exact name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Continuous glucose monitor reading
    Cbg,
    /// Self-monitored (fingerstick) glucose reading
    Smbg,
    /// Basal rate segment
    Basal,
    /// Insulin bolus
    Bolus,
    /// Bolus calculator event
    Wizard,
    /// Upload record
    Upload,
    /// Pump settings snapshot
    PumpSettings,
    /// CGM settings snapshot
    CgmSettings,
    /// Device event (alarms, reservoir changes, ...)
    DeviceEvent,
    /// Any other type tag
    Other(String),
}

impl EventType {
    /// The known device data types
    pub fn known() -> &'static [EventType] {
        KNOWN_TYPES
    }

    /// Wire name of this type
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Cbg => "cbg",
            EventType::Smbg => "smbg",
            EventType::Basal => "basal",
            EventType::Bolus => "bolus",
            EventType::Wizard => "wizard",
            EventType::Upload => "upload",
            EventType::PumpSettings => "pumpSettings",
            EventType::CgmSettings => "cgmSettings",
            EventType::DeviceEvent => "deviceEvent",
            EventType::Other(name) => name,
        }
    }

    /// Whether records of this type carry a blood glucose value
    pub fn is_glucose(&self) -> bool {
        matches!(self, EventType::Cbg | EventType::Smbg)
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s {
            "cbg" => EventType::Cbg,
            "smbg" => EventType::Smbg,
            "basal" => EventType::Basal,
            "bolus" => EventType::Bolus,
            "wizard" => EventType::Wizard,
            "upload" => EventType::Upload,
            "pumpSettings" => EventType::PumpSettings,
            "cgmSettings" => EventType::CgmSettings,
            "deviceEvent" => EventType::DeviceEvent,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl FromStr for EventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.into())
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EventType::from(s.as_str()))
    }
}

/// A single device event record
///
/// The common fields the engine needs are parsed out once at ingest; the
/// full ingested object is kept in `fields` so that any key can be
/// projected or sorted on later.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Opaque unique identifier
    pub id: String,
    /// The `type` tag
    pub event_type: EventType,
    /// Reported UTC instant
    pub time: DateTime<Utc>,
    /// Device-local clock string, no offset (empty strings are dropped)
    pub device_time: Option<String>,
    /// Minutes between device-local time and UTC
    pub timezone_offset: Option<i64>,
    /// Clock-drift correction in milliseconds
    pub conversion_offset: Option<i64>,
    /// Duration in milliseconds (basal segments)
    pub duration: Option<i64>,
    /// The ingested key/value structure
    pub fields: Map<String, Value>,
}

impl Record {
    /// Build a record from a generic JSON value
    ///
    /// Fails for anything that is not a plain object, or an object
    /// without a string `id`, a string `type` and a parseable `time`.
    pub fn from_value(value: Value) -> StorageResult<Self> {
        let fields = match value {
            Value::Object(map) => map,
            other => {
                return Err(StorageError::MalformedRecord(format!(
                    "expected an object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let id = match fields.get("id") {
            Some(Value::String(id)) => id.clone(),
            _ => return Err(StorageError::MalformedRecord("missing string `id`".into())),
        };

        let event_type = match fields.get("type") {
            Some(Value::String(t)) => EventType::from(t.as_str()),
            _ => {
                return Err(StorageError::MalformedRecord(format!(
                    "record {} has no string `type`",
                    id
                )))
            }
        };

        let time = match fields.get("time") {
            Some(Value::String(t)) => {
                parse_iso(t).ok_or_else(|| StorageError::InvalidTimestamp(t.clone()))?
            }
            _ => {
                return Err(StorageError::MalformedRecord(format!(
                    "record {} has no string `time`",
                    id
                )))
            }
        };

        let device_time = fields
            .get("deviceTime")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let timezone_offset = fields.get("timezoneOffset").and_then(as_millis_like);
        let conversion_offset = fields.get("conversionOffset").and_then(as_millis_like);
        let duration = fields.get("duration").and_then(as_millis_like);

        Ok(Self {
            id,
            event_type,
            time,
            device_time,
            timezone_offset,
            conversion_offset,
            duration,
            fields,
        })
    }

    /// Get an ingested field by name
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Day of week of the raw UTC `time` (0 = Sunday)
    pub fn day_of_week(&self) -> u8 {
        self.time.weekday().num_days_from_sunday() as u8
    }

    /// The instant this record normalizes to when no display timezone is set
    ///
    /// `time` shifted by both offsets when both are present, otherwise
    /// `deviceTime` read as UTC, otherwise `time` itself. Offsets that
    /// overflow the representable range count as absent.
    pub fn device_local_time(&self) -> DateTime<Utc> {
        if let Some(shifted) = self.offset_shifted_time() {
            return shifted;
        }

        self.device_time
            .as_deref()
            .and_then(parse_naive)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .unwrap_or(self.time)
    }

    fn offset_shifted_time(&self) -> Option<DateTime<Utc>> {
        let tz_offset = self.timezone_offset?;
        let conversion = self.conversion_offset?;
        let shift_ms = tz_offset
            .checked_mul(MS_IN_MIN)
            .and_then(|ms| ms.checked_add(conversion))?;
        self.time
            .checked_add_signed(TimeDelta::try_milliseconds(shift_ms)?)
    }
}

// Floats outside i64 would saturate on `as`; treat them as absent
fn as_millis_like(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .map(f64::round)
            .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Time range for queries (half-open interval: [start, end))
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Start timestamp (inclusive), in milliseconds
    pub start: i64,
    /// End timestamp (exclusive), in milliseconds
    pub end: i64,
}

impl TimeRange {
    /// Create a new time range
    ///
    /// # Panics
    /// Panics if start > end
    pub fn new(start: i64, end: i64) -> Self {
        assert!(start <= end, "TimeRange: start must not be after end");
        Self { start, end }
    }

    /// Create a time range, returning None if end precedes start
    pub fn try_new(start: i64, end: i64) -> Option<Self> {
        if start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Create a range from two instants
    pub fn between(start: &DateTime<Utc>, end: &DateTime<Utc>) -> Option<Self> {
        Self::try_new(start.timestamp_millis(), end.timestamp_millis())
    }

    /// Check if a timestamp falls within this range
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Get the duration in milliseconds
    pub fn duration_millis(&self) -> i64 {
        self.end - self.start
    }

    /// The range of equal length starting where this one ends
    pub fn following(&self) -> Self {
        Self {
            start: self.end,
            end: self.end + self.duration_millis(),
        }
    }

    /// The range of equal length ending where this one starts
    pub fn preceding(&self) -> Self {
        Self {
            start: self.start - self.duration_millis(),
            end: self.start,
        }
    }

    /// Start as an ISO-8601 string
    pub fn start_iso(&self) -> String {
        millis_to_iso(self.start)
    }

    /// End as an ISO-8601 string
    pub fn end_iso(&self) -> String {
        millis_to_iso(self.end)
    }
}

fn millis_to_iso(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| format_iso(&dt))
        .unwrap_or_default()
}
