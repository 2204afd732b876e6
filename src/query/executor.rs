//! Query Executor
//!
//! Runs a [`QuerySpec`] against the record store:
//! 1. Resolve windows, active days, type specs and preferences
//! 2. Per window: range and active-day filters on a fresh index view
//! 3. Per type: exact filter, fetch, normalize, sort, project
//!
//! # Execution Pipeline
//!
//! ```text
//! QuerySpec → resolve → IndexView(range, days) ─┬─ type → fetch → normalize → sort → project
//!                                               └─ ...one pass per requested type
//! ```
//!
//! Queries borrow the store immutably and keep no filter state between
//! calls, so they can run concurrently. Mutation needs `&mut self`.

use crate::index::{DaySet, IndexView};
use crate::query::error::{QueryError, QueryResult};
use crate::query::normalize::{normalize, TimeMode};
use crate::query::sort::{apply_sort, project};
use crate::query::spec::{BgBounds, QuerySpec, TimePrefs, TypeQuery, MGDL_UNITS};
use crate::query::window::{compute_windows, EndpointWindow, WindowName, Windows};
use crate::storage::{IngestReport, Record, RecordStore};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Instant;

/// Preferences applied when a query leaves them out
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDefaults {
    /// Units when `bgPrefs.bgUnits` is absent
    pub bg_units: String,
    /// Timezone preferences when `timePrefs` is absent
    pub time_prefs: TimePrefs,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            bg_units: MGDL_UNITS.to_string(),
            time_prefs: TimePrefs::default(),
        }
    }
}

/// Result of a query
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub data: QueryData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone_name: Option<String>,
    pub bg_units: String,
    pub bg_bounds: BgBounds,
    /// Execution time in milliseconds
    #[serde(skip)]
    pub execution_time_ms: u64,
}

/// Per-window results; all absent when the query had no endpoints
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<WindowData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<WindowData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<WindowData>,
}

impl QueryData {
    /// Get a window's results by name
    pub fn get(&self, name: WindowName) -> Option<&WindowData> {
        match name {
            WindowName::Current => self.current.as_ref(),
            WindowName::Next => self.next.as_ref(),
            WindowName::Prev => self.prev.as_ref(),
        }
    }

    fn set(&mut self, name: WindowName, window: WindowData) {
        match name {
            WindowName::Current => self.current = Some(window),
            WindowName::Next => self.next = Some(window),
            WindowName::Prev => self.prev = Some(window),
        }
    }
}

/// Results for one window
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowData {
    /// `[start, end]` as ISO-8601 strings
    pub range: [String; 2],
    pub days_in_range: f64,
    pub active_days_in_range: f64,
    /// Projected records keyed by requested type
    pub data: BTreeMap<String, Vec<Map<String, Value>>>,
}

impl WindowData {
    /// Records returned for a type; empty if the type was not requested
    pub fn records(&self, type_name: &str) -> &[Map<String, Value>] {
        self.data.get(type_name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Query executor owning the record store
#[derive(Debug, Default)]
pub struct QueryExecutor {
    store: RecordStore,
    defaults: QueryDefaults,
}

impl QueryExecutor {
    /// Create an executor over an initial record list
    pub fn new<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self::with_store(RecordStore::from_values(values))
    }

    /// Create an executor over an existing store
    pub fn with_store(store: RecordStore) -> Self {
        Self {
            store,
            defaults: QueryDefaults::default(),
        }
    }

    /// Builder: set the query defaults
    pub fn with_defaults(mut self, defaults: QueryDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// The query defaults in effect
    pub fn defaults(&self) -> &QueryDefaults {
        &self.defaults
    }

    /// The underlying store
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Ingest more records
    pub fn add_data<I>(&mut self, values: I) -> IngestReport
    where
        I: IntoIterator<Item = Value>,
    {
        self.store.add_data(values)
    }

    /// Ingest a JSON array of records
    pub fn add_json(&mut self, json: &str) -> QueryResult<IngestReport> {
        Ok(self.store.add_json(json)?)
    }

    /// Remove every record matching `predicate`
    pub fn remove_data<F>(&mut self, predicate: F) -> usize
    where
        F: FnMut(&Record) -> bool,
    {
        self.store.remove_data(predicate)
    }

    /// Discard everything and rebuild from `values`
    pub fn init<I>(&mut self, values: I) -> IngestReport
    where
        I: IntoIterator<Item = Value>,
    {
        self.store.init(values)
    }

    /// Parse and run a JSON query
    pub fn query_json(&self, json: &str) -> QueryResult<QueryResponse> {
        let spec: QuerySpec = serde_json::from_str(json)?;
        self.query_data(&spec)
    }

    /// Run a query
    pub fn query_data(&self, spec: &QuerySpec) -> QueryResult<QueryResponse> {
        let start = Instant::now();

        let active_days = spec.day_set();
        let windows = self.resolve_windows(spec, active_days)?;
        let types = spec.type_queries();

        let time_prefs = spec.time_prefs.as_ref().unwrap_or(&self.defaults.time_prefs);
        let mode = TimeMode::for_zone(time_prefs.display_zone())?;

        let bg_prefs = spec.bg_prefs.as_ref();
        let bg_units = bg_prefs
            .and_then(|prefs| prefs.bg_units.clone())
            .unwrap_or_else(|| self.defaults.bg_units.clone());
        let bg_bounds = bg_prefs
            .and_then(|prefs| prefs.bg_bounds)
            .unwrap_or_else(|| BgBounds::for_units(&bg_units));

        let mut data = QueryData::default();
        if let Some(windows) = &windows {
            for (name, window) in windows.iter() {
                let result = self.query_window(name, window, active_days, &types, mode);
                data.set(name, result);
            }
        }

        let execution_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "queryData: {} types over {} windows in {}ms",
            types.len(),
            if windows.is_some() { 3 } else { 0 },
            execution_time_ms
        );

        Ok(QueryResponse {
            data,
            timezone_name: mode.timezone_name().map(str::to_string),
            bg_units,
            bg_bounds,
            execution_time_ms,
        })
    }

    fn resolve_windows(&self, spec: &QuerySpec, active_days: DaySet) -> QueryResult<Option<Windows>> {
        match spec.endpoints.as_deref() {
            None => Ok(None),
            Some([start, end]) => compute_windows(start, end, active_days).map(Some),
            Some(other) => Err(QueryError::Parse(format!(
                "endpoints must be [start, end], got {} values",
                other.len()
            ))),
        }
    }

    fn query_window(
        &self,
        name: WindowName,
        window: &EndpointWindow,
        active_days: DaySet,
        types: &[TypeQuery],
        mode: TimeMode,
    ) -> WindowData {
        let mut view = self.store.view(mode.date_key());
        view.filter_range(window.range).filter_days(active_days);

        let mut data = BTreeMap::new();
        for type_query in types {
            view.filter_exact(type_query.event_type.clone());
            let records = self.fetch(&view, type_query, mode, name);
            data.insert(type_query.name.clone(), records);
        }

        WindowData {
            range: window.range_iso(),
            days_in_range: window.days_in_range,
            active_days_in_range: window.active_days_in_range,
            data,
        }
    }

    fn fetch(
        &self,
        view: &IndexView<'_>,
        type_query: &TypeQuery,
        mode: TimeMode,
        window: WindowName,
    ) -> Vec<Map<String, Value>> {
        let slots = view.top();
        let records = self.store.resolve(&slots);

        let timer = Instant::now();
        let mut normalized: Vec<_> = records.into_iter().map(|r| normalize(r, mode)).collect();
        tracing::trace!(
            "normalize | {} | {}: {:?}",
            type_query.name,
            window.as_str(),
            timer.elapsed()
        );

        let timer = Instant::now();
        apply_sort(&mut normalized, &type_query.sort);
        tracing::trace!(
            "sort | {} | {}: {:?}",
            type_query.name,
            window.as_str(),
            timer.elapsed()
        );

        let timer = Instant::now();
        let projected = project(&normalized, &type_query.fields);
        tracing::trace!(
            "select | {} | {}: {:?}",
            type_query.name,
            window.as_str(),
            timer.elapsed()
        );

        projected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::spec::MMOLL_UNITS;
    use serde_json::json;

    fn create_test_executor() -> QueryExecutor {
        QueryExecutor::new(vec![json!({
            "id": "a",
            "type": "cbg",
            "time": "2023-01-01T12:00:00.000Z",
            "value": 120,
        })])
    }

    fn query(value: Value) -> QuerySpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_simple_query() {
        let executor = create_test_executor();

        let result = executor
            .query_data(&query(json!({
                "endpoints": ["2023-01-01T00:00:00.000Z", "2023-01-02T00:00:00.000Z"],
                "types": [{ "type": "cbg", "select": "value" }],
            })))
            .unwrap();

        let current = result.data.current.as_ref().unwrap();
        assert_eq!(current.records("cbg"), &[json!({ "value": 120 }).as_object().unwrap().clone()]);
        assert_eq!(current.days_in_range, 1.0);

        let next = result.data.next.as_ref().unwrap();
        assert_eq!(
            next.range,
            ["2023-01-02T00:00:00.000Z".to_string(), "2023-01-03T00:00:00.000Z".to_string()]
        );
        assert!(next.records("cbg").is_empty());
        assert!(result.data.prev.as_ref().unwrap().records("cbg").is_empty());
    }

    #[test]
    fn test_active_day_exclusion() {
        let executor = create_test_executor();

        let result = executor
            .query_data(&query(json!({
                "endpoints": ["2023-01-01T00:00:00.000Z", "2023-01-02T00:00:00.000Z"],
                "activeDays": [1, 2, 3, 4, 5, 6],
                "types": [{ "type": "cbg", "select": "value" }],
            })))
            .unwrap();

        let current = result.data.current.as_ref().unwrap();
        assert!(current.records("cbg").is_empty());
        assert!((current.active_days_in_range - 6.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_endpoints_no_windows() {
        let executor = create_test_executor();

        let result = executor
            .query_data(&query(json!({ "types": [{ "type": "cbg" }] })))
            .unwrap();

        assert!(result.data.current.is_none());
        assert!(result.data.next.is_none());
        assert!(result.data.prev.is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["data"], json!({}));
    }

    #[test]
    fn test_default_prefs() {
        let executor = create_test_executor();

        let result = executor.query_data(&QuerySpec::default()).unwrap();

        assert_eq!(result.bg_units, MGDL_UNITS);
        assert_eq!(result.bg_bounds, BgBounds::for_units(MGDL_UNITS));
        assert_eq!(result.timezone_name, None);
    }

    #[test]
    fn test_defaults_from_executor() {
        let executor = create_test_executor().with_defaults(QueryDefaults {
            bg_units: MMOLL_UNITS.to_string(),
            time_prefs: TimePrefs {
                timezone_aware: true,
                timezone_name: Some("Europe/London".to_string()),
            },
        });

        let result = executor.query_data(&QuerySpec::default()).unwrap();

        assert_eq!(result.bg_units, MMOLL_UNITS);
        assert_eq!(result.bg_bounds.target_upper_bound, 10.0);
        assert_eq!(result.timezone_name.as_deref(), Some("Europe/London"));
    }

    #[test]
    fn test_unknown_timezone_fails() {
        let executor = create_test_executor();

        let err = executor
            .query_data(&QuerySpec::builder().timezone("Nowhere/Special").build())
            .unwrap_err();

        assert!(matches!(err, QueryError::UnknownTimezone(_)));
    }

    #[test]
    fn test_inverted_endpoints_fail() {
        let executor = create_test_executor();

        let err = executor
            .query_data(
                &QuerySpec::builder()
                    .endpoints("2023-01-02T00:00:00.000Z", "2023-01-01T00:00:00.000Z")
                    .build(),
            )
            .unwrap_err();

        assert!(matches!(err, QueryError::InvalidTimeRange(_)));
    }

    #[test]
    fn test_wrong_endpoint_count_fails() {
        let executor = create_test_executor();

        let err = executor
            .query_json(r#"{ "endpoints": ["2023-01-01T00:00:00.000Z"] }"#)
            .unwrap_err();

        assert!(matches!(err, QueryError::Parse(_)));
    }

    #[test]
    fn test_malformed_query_json() {
        let executor = create_test_executor();
        assert!(matches!(
            executor.query_json("{ endpoints: nope").unwrap_err(),
            QueryError::Parse(_)
        ));
    }

    #[test]
    fn test_add_json() {
        let mut executor = create_test_executor();

        let report = executor
            .add_json(r#"[{"id":"b","type":"smbg","time":"2023-01-01T13:00:00.000Z","value":98}]"#)
            .unwrap();
        assert_eq!(report.accepted, 1);
        assert_eq!(executor.store().len(), 2);

        assert!(matches!(
            executor.add_json("[{ not json").unwrap_err(),
            QueryError::Storage(_)
        ));
        assert_eq!(executor.store().len(), 2);
    }

    #[test]
    fn test_unknown_type_gives_empty_list() {
        let executor = create_test_executor();

        let result = executor
            .query_data(
                &QuerySpec::builder()
                    .endpoints("2023-01-01T00:00:00.000Z", "2023-01-02T00:00:00.000Z")
                    .select("food", "carbs")
                    .build(),
            )
            .unwrap();

        let current = result.data.get(WindowName::Current).unwrap();
        assert_eq!(current.data.get("food"), Some(&Vec::new()));
    }

    #[test]
    fn test_mutation_between_queries() {
        let mut executor = create_test_executor();
        let spec = QuerySpec::builder()
            .endpoints("2023-01-01T00:00:00.000Z", "2023-01-03T00:00:00.000Z")
            .select("cbg", "id")
            .build();

        executor.add_data(vec![json!({
            "id": "b", "type": "cbg", "time": "2023-01-02T12:00:00.000Z", "value": 90
        })]);
        let before = executor.query_data(&spec).unwrap();
        assert_eq!(before.data.current.unwrap().records("cbg").len(), 2);

        executor.remove_data(|r| r.id == "a");
        let after = executor.query_data(&spec).unwrap();
        assert_eq!(
            after.data.current.unwrap().records("cbg"),
            &[json!({ "id": "b" }).as_object().unwrap().clone()]
        );
    }
}
