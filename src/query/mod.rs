//! glucolens Query Engine
//!
//! Answers windowed queries over the record store:
//!
//! - **Spec**: Caller-facing query shape and its canonical form
//! - **Window**: `current`/`next`/`prev` endpoint windows
//! - **Normalize**: `normalTime` and the display fields derived from it
//! - **Sort**: Stable sort and field projection
//! - **Executor**: Runs queries against the store
//!
//! # Query Shape
//!
//! ```text
//! { endpoints?: [isoStart, isoEnd], activeDays?: [0..6],
//!   types?: [{type, select?, sort?}] | {type: {select?, sort?}},
//!   timePrefs?: {timezoneAware?, timezoneName?},
//!   bgPrefs?: {bgUnits?, bgBounds?} }
//! ```
//!
//! # Examples
//!
//! ## Using Query Builder
//!
//! ```rust
//! use glucolens::query::{QueryExecutor, QuerySpec};
//! use serde_json::json;
//!
//! let executor = QueryExecutor::new(vec![json!({
//!     "id": "a", "type": "cbg", "time": "2023-01-01T12:00:00.000Z", "value": 120
//! })]);
//!
//! let spec = QuerySpec::builder()
//!     .endpoints("2023-01-01T00:00:00.000Z", "2023-01-02T00:00:00.000Z")
//!     .select("cbg", "value")
//!     .build();
//!
//! let result = executor.query_data(&spec).unwrap();
//! let current = result.data.current.unwrap();
//! assert_eq!(current.records("cbg")[0]["value"], json!(120));
//! ```
//!
//! ## Using JSON
//!
//! ```rust,ignore
//! let result = executor.query_json(r#"{
//!     "endpoints": ["2023-01-01T00:00:00.000Z", "2023-01-15T00:00:00.000Z"],
//!     "activeDays": [1, 2, 3, 4, 5],
//!     "types": { "smbg": { "select": "value,normalTime", "sort": "normalTime,desc" } },
//!     "timePrefs": { "timezoneAware": true, "timezoneName": "America/New_York" }
//! }"#)?;
//! ```

mod error;
mod executor;
mod normalize;
mod sort;
mod spec;
mod window;

pub use error::{QueryError, QueryResult};
pub use executor::{QueryData, QueryDefaults, QueryExecutor, QueryResponse, WindowData};
pub use normalize::{ms_per_24, normalize, NormalizedRecord, TimeMode, TIME_MISMATCH_WARNING};
pub use sort::{apply_sort, project, sort_by, sort_by_normal_time, FieldSource, SortKey};
pub use spec::{
    BgBounds, BgPrefs, FieldSelection, FieldsInput, QueryBuilder, QuerySpec, SortInput, SortOrder,
    SortSpec, TimePrefs, TypeEntry, TypeOptions, TypeQuery, TypesInput, MGDL_UNITS, MMOLL_UNITS,
};
pub use window::{
    active_days_in_range, compute_windows, days_in_range, windows_for, EndpointWindow,
    WindowName, Windows,
};
