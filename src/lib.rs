//! # glucolens
//!
//! In-memory query engine for diabetes device data: CGM and fingerstick
//! glucose readings, basal and bolus insulin, bolus calculator events and
//! device settings snapshots.
//!
//! ## Features
//!
//! - **Deduplicating store**: Records are unique by id, first copy wins
//! - **Dimension indexes**: Date, weekday and type filters without full scans
//! - **Windowed queries**: Every query answers for the requested window
//!   and its equal-length neighbours
//! - **Timezone-aware**: Device-local or display-zone time normalization
//!
//! ## Modules
//!
//! - [`storage`]: Records and the deduplicating record store
//! - [`index`]: Index structures and filtered views
//! - [`query`]: Query spec, normalization, sorting and execution
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust
//! use glucolens::query::{QueryExecutor, QuerySpec};
//! use serde_json::json;
//!
//! let executor = QueryExecutor::new(vec![
//!     json!({ "id": "1", "type": "smbg", "time": "2023-01-02T08:00:00.000Z", "value": 96 }),
//!     json!({ "id": "2", "type": "smbg", "time": "2023-01-02T20:00:00.000Z", "value": 143 }),
//! ]);
//!
//! let spec = QuerySpec::builder()
//!     .endpoints("2023-01-02T00:00:00.000Z", "2023-01-03T00:00:00.000Z")
//!     .select_sorted("smbg", "value,msPer24", "value,desc")
//!     .build();
//!
//! let result = executor.query_data(&spec).unwrap();
//! let readings = result.data.current.unwrap();
//!
//! assert_eq!(readings.records("smbg")[0]["value"], json!(143));
//! assert_eq!(result.bg_units, "mg/dL");
//! ```

pub mod config;
pub mod index;
pub mod query;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    EventType, IngestReport, Record, RecordStore, StorageError, StorageResult, StoreStats,
    TimeRange,
};

pub use index::{DateKey, DaySet, IndexManager, IndexStats, IndexView};

pub use query::{
    BgBounds, QueryDefaults, QueryError, QueryExecutor, QueryResponse, QueryResult, QuerySpec,
    TimeMode,
};

pub use config::{Config, ConfigError, LoggingConfig, QueryConfig};
