//! Sort and projection over record lists
//!
//! Works over anything implementing [`FieldSource`]: normalized records on
//! the query path, plain JSON objects elsewhere.
//!
//! Sorting is stable and ascending by the field's natural order, with
//! missing or null values last. A descending sort is the ascending result
//! reversed.

use crate::query::normalize::NormalizedRecord;
use crate::query::spec::{FieldSelection, SortOrder, SortSpec};
use chrono::DateTime;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::cmp::Ordering;

/// Something with named JSON fields
pub trait FieldSource {
    /// Value of a field, if present
    fn field_value(&self, name: &str) -> Option<Cow<'_, Value>>;

    /// Every field as a JSON object
    fn to_map(&self) -> Map<String, Value>;

    /// Sort key for a field
    fn sort_key(&self, name: &str) -> SortKey {
        SortKey::from_value(self.field_value(name).as_deref())
    }
}

impl FieldSource for Map<String, Value> {
    fn field_value(&self, name: &str) -> Option<Cow<'_, Value>> {
        self.get(name).map(Cow::Borrowed)
    }

    fn to_map(&self) -> Map<String, Value> {
        self.clone()
    }
}

impl FieldSource for NormalizedRecord<'_> {
    fn field_value(&self, name: &str) -> Option<Cow<'_, Value>> {
        self.field(name)
    }

    fn to_map(&self) -> Map<String, Value> {
        NormalizedRecord::to_map(self)
    }

    fn sort_key(&self, name: &str) -> SortKey {
        match name {
            "normalTime" => SortKey::Instant(self.normal_time.timestamp_millis()),
            "time" => SortKey::Instant(self.record.time.timestamp_millis()),
            "normalEnd" if self.normal_end.is_some() => {
                SortKey::Instant(self.normal_end.map_or(0, |end| end.timestamp_millis()))
            }
            _ => SortKey::from_value(self.field(name).as_deref()),
        }
    }
}

/// Comparable form of a field value
///
/// Values of the same kind compare naturally. Across kinds the order is
/// numbers, instants, strings, booleans, other JSON, then missing.
#[derive(Debug, Clone)]
pub enum SortKey {
    Number(f64),
    /// Milliseconds since the epoch
    Instant(i64),
    Text(String),
    Bool(bool),
    /// Arrays and objects, by their JSON text
    Other(String),
    Missing,
}

impl SortKey {
    /// Key for an optional JSON value; strings in RFC 3339 form become instants
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => SortKey::Missing,
            Some(Value::Bool(b)) => SortKey::Bool(*b),
            Some(Value::Number(n)) => n.as_f64().map_or(SortKey::Missing, SortKey::Number),
            Some(Value::String(s)) => match DateTime::parse_from_rfc3339(s) {
                Ok(instant) => SortKey::Instant(instant.timestamp_millis()),
                Err(_) => SortKey::Text(s.clone()),
            },
            Some(other) => SortKey::Other(other.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Number(_) => 0,
            SortKey::Instant(_) => 1,
            SortKey::Text(_) => 2,
            SortKey::Bool(_) => 3,
            SortKey::Other(_) => 4,
            SortKey::Missing => 5,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Instant(a), SortKey::Instant(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Bool(a), SortKey::Bool(b)) => a.cmp(b),
            (SortKey::Other(a), SortKey::Other(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

/// Stable sort by `field`; `Desc` reverses the ascending order
pub fn sort_by<T: FieldSource>(records: &mut [T], field: &str, order: SortOrder) {
    records.sort_by_cached_key(|record| record.sort_key(field));
    if order == SortOrder::Desc {
        records.reverse();
    }
}

/// Chronological sort on `normalTime`
///
/// Retrieval already yields records in date order, so the common case is a
/// single linear check.
pub fn sort_by_normal_time(records: &mut [NormalizedRecord<'_>]) {
    let sorted = records
        .windows(2)
        .all(|pair| pair[0].normal_time <= pair[1].normal_time);
    if !sorted {
        records.sort_by_key(|record| record.normal_time);
    }
}

/// Apply a type's sort spec to normalized records
///
/// With no sort field the retrieval order is kept, though `Desc` still
/// reverses it.
pub fn apply_sort(records: &mut [NormalizedRecord<'_>], sort: &SortSpec) {
    match sort.field.as_deref() {
        Some("normalTime") => sort_by_normal_time(records),
        Some(field) => sort_by(records, field, SortOrder::Asc),
        None => {}
    }
    if sort.order == SortOrder::Desc {
        records.reverse();
    }
}

/// Reduce each record to the selected fields
///
/// Selected fields a record lacks are left out. The input is not modified.
pub fn project<T: FieldSource>(records: &[T], fields: &FieldSelection) -> Vec<Map<String, Value>> {
    match fields {
        FieldSelection::All => records.iter().map(FieldSource::to_map).collect(),
        FieldSelection::Fields(names) => records
            .iter()
            .map(|record| {
                names
                    .iter()
                    .filter_map(|name| {
                        record
                            .field_value(name)
                            .map(|value| (name.clone(), value.into_owned()))
                    })
                    .collect()
            })
            .collect(),
    }
}
