//! Query Spec
//!
//! The caller-facing shape of a query and its canonical internal form.
//!
//! Several inputs accept more than one shape on the wire:
//!
//! ```text
//! types:  [{ "type": "cbg", "select": "value,normalTime", "sort": "normalTime,desc" }]
//!     or  { "cbg": { "select": ["value", "normalTime"], "sort": { "field": "normalTime", "order": "desc" } } }
//! ```
//!
//! These are resolved exactly once, into [`TypeQuery`], [`FieldSelection`]
//! and [`SortSpec`]; nothing downstream branches on the input shape.

use crate::index::DaySet;
use crate::storage::EventType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// mg/dL unit string
pub const MGDL_UNITS: &str = "mg/dL";

/// mmol/L unit string
pub const MMOLL_UNITS: &str = "mmol/L";

/// A query as received from the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    /// `[start, end]` ISO-8601 instants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<String>>,
    /// Weekdays to include, 0 = Sunday
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_days: Option<Vec<i64>>,
    /// Event types to return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<TypesInput>,
    /// Timezone preferences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_prefs: Option<TimePrefs>,
    /// Blood glucose preferences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_prefs: Option<BgPrefs>,
}

/// Type specs: an ordered list, or a mapping keyed by type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypesInput {
    List(Vec<TypeEntry>),
    Keyed(BTreeMap<String, TypeOptions>),
}

/// One entry of the list form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeEntry {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, alias = "fields", skip_serializing_if = "Option::is_none")]
    pub select: Option<FieldsInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortInput>,
}

/// Field selection and sort for one type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeOptions {
    #[serde(default, alias = "fields", skip_serializing_if = "Option::is_none")]
    pub select: Option<FieldsInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortInput>,
}

/// `"a,b,c"` or `["a", "b", "c"]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldsInput {
    Csv(String),
    List(Vec<String>),
}

/// `"field,order"` or `{ "field": ..., "order": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortInput {
    Csv(String),
    Pair {
        #[serde(default)]
        field: Option<String>,
        #[serde(default)]
        order: Option<String>,
    },
}

/// Timezone preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePrefs {
    /// Honour `timezone_name` for normalization
    #[serde(default)]
    pub timezone_aware: bool,
    /// IANA zone name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone_name: Option<String>,
}

impl TimePrefs {
    /// The display zone these prefs ask for, if any
    ///
    /// Only a timezone-aware session has a display zone; one without a
    /// name displays in UTC.
    pub fn display_zone(&self) -> Option<&str> {
        if !self.timezone_aware {
            return None;
        }
        Some(
            self.timezone_name
                .as_deref()
                .filter(|name| !name.is_empty())
                .unwrap_or("UTC"),
        )
    }
}

/// Blood glucose preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BgPrefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_bounds: Option<BgBounds>,
}

/// Glucose classification thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BgBounds {
    pub very_low_threshold: f64,
    pub target_lower_bound: f64,
    pub target_upper_bound: f64,
    pub very_high_threshold: f64,
}

impl BgBounds {
    /// Built-in thresholds for a unit system; anything but mmol/L gets mg/dL
    pub fn for_units(units: &str) -> Self {
        if units == MMOLL_UNITS {
            Self {
                very_low_threshold: 3.0,
                target_lower_bound: 3.9,
                target_upper_bound: 10.0,
                very_high_threshold: 13.9,
            }
        } else {
            Self {
                very_low_threshold: 54.0,
                target_lower_bound: 70.0,
                target_upper_bound: 180.0,
                very_high_threshold: 250.0,
            }
        }
    }
}

// ============================================
// CANONICAL FORM
// ============================================

/// Which fields to keep on returned records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    /// Every stored and derived field. An absent `select` means this
    /// rather than an empty record.
    All,
    /// Exactly these fields, when present
    Fields(Vec<String>),
}

impl FieldSelection {
    fn from_input(input: Option<&FieldsInput>) -> Self {
        match input {
            None => FieldSelection::All,
            Some(FieldsInput::Csv(csv)) => FieldSelection::Fields(split_csv(csv)),
            Some(FieldsInput::List(list)) => FieldSelection::Fields(list.clone()),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `desc` (any case) is descending; anything else ascending
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

/// Sort field and direction for one type
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortSpec {
    /// Field to sort by; `None` keeps retrieval order
    pub field: Option<String>,
    pub order: SortOrder,
}

impl SortSpec {
    /// Ascending sort on `field`
    pub fn by(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            order: SortOrder::Asc,
        }
    }

    /// Builder: descending
    pub fn desc(mut self) -> Self {
        self.order = SortOrder::Desc;
        self
    }

    fn from_input(input: Option<&SortInput>) -> Self {
        match input {
            None => SortSpec::default(),
            Some(SortInput::Csv(csv)) => {
                let mut parts = csv.split(',').map(str::trim);
                let field = parts.next().filter(|f| !f.is_empty()).map(str::to_string);
                let order = parts.next().map(SortOrder::parse).unwrap_or_default();
                SortSpec { field, order }
            }
            Some(SortInput::Pair { field, order }) => SortSpec {
                field: field.clone().filter(|f| !f.is_empty()),
                order: order.as_deref().map(SortOrder::parse).unwrap_or_default(),
            },
        }
    }
}

/// A fully resolved request for one event type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeQuery {
    /// Type name as requested; also the key in the result
    pub name: String,
    pub event_type: EventType,
    pub fields: FieldSelection,
    pub sort: SortSpec,
}

impl TypeQuery {
    fn new(name: &str, select: Option<&FieldsInput>, sort: Option<&SortInput>) -> Self {
        Self {
            name: name.to_string(),
            event_type: EventType::from(name),
            fields: FieldSelection::from_input(select),
            sort: SortSpec::from_input(sort),
        }
    }
}

fn split_csv(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl QuerySpec {
    /// Start building a query
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    /// Resolve the type specs to their canonical form, in request order
    pub fn type_queries(&self) -> Vec<TypeQuery> {
        match &self.types {
            None => Vec::new(),
            Some(TypesInput::List(entries)) => entries
                .iter()
                .map(|entry| {
                    TypeQuery::new(&entry.event_type, entry.select.as_ref(), entry.sort.as_ref())
                })
                .collect(),
            Some(TypesInput::Keyed(map)) => map
                .iter()
                .map(|(name, options)| {
                    TypeQuery::new(name, options.select.as_ref(), options.sort.as_ref())
                })
                .collect(),
        }
    }

    /// Resolve the active-day set; all seven days when unspecified
    pub fn day_set(&self) -> DaySet {
        match &self.active_days {
            None => DaySet::all(),
            Some(days) => DaySet::from_days(days.iter().filter_map(|&d| u8::try_from(d).ok())),
        }
    }
}

/// Builder for constructing queries in code
#[derive(Debug, Default)]
pub struct QueryBuilder {
    spec: QuerySpec,
    types: Vec<TypeEntry>,
}

impl QueryBuilder {
    /// Set the `[start, end]` endpoints
    pub fn endpoints(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.spec.endpoints = Some(vec![start.into(), end.into()]);
        self
    }

    /// Restrict to these weekdays (0 = Sunday)
    pub fn active_days(mut self, days: &[u8]) -> Self {
        self.spec.active_days = Some(days.iter().map(|&d| d as i64).collect());
        self
    }

    /// Request a type with a CSV field selection
    pub fn select(mut self, event_type: &str, fields: &str) -> Self {
        self.types.push(TypeEntry {
            event_type: event_type.to_string(),
            select: Some(FieldsInput::Csv(fields.to_string())),
            sort: None,
        });
        self
    }

    /// Request a type with a CSV field selection and a `"field,order"` sort
    pub fn select_sorted(mut self, event_type: &str, fields: &str, sort: &str) -> Self {
        self.types.push(TypeEntry {
            event_type: event_type.to_string(),
            select: Some(FieldsInput::Csv(fields.to_string())),
            sort: Some(SortInput::Csv(sort.to_string())),
        });
        self
    }

    /// Normalize in this display timezone
    pub fn timezone(mut self, name: impl Into<String>) -> Self {
        self.spec.time_prefs = Some(TimePrefs {
            timezone_aware: true,
            timezone_name: Some(name.into()),
        });
        self
    }

    /// Set the blood glucose units
    pub fn bg_units(mut self, units: impl Into<String>) -> Self {
        let prefs = self.spec.bg_prefs.get_or_insert_with(BgPrefs::default);
        prefs.bg_units = Some(units.into());
        self
    }

    /// Build the query
    pub fn build(mut self) -> QuerySpec {
        if !self.types.is_empty() {
            self.spec.types = Some(TypesInput::List(self.types));
        }
        self.spec
    }
}
