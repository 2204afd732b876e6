//! glucolens Record Store
//!
//! This module provides the in-memory record set:
//!
//! - **types**: Core data structures (Record, EventType, TimeRange)
//! - **store**: Deduplicating store that maintains the dimension indexes
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Ingest Path:
//!   JSON value → Record (parse) → dedup by id → slot → indexes
//!
//! Read Path:
//!   IndexView (filters) → slots → records
//! ```
//!
//! # Example
//!
//! ```rust
//! use glucolens::storage::{EventType, RecordStore};
//! use serde_json::json;
//!
//! let mut store = RecordStore::new();
//! let report = store.add_data(vec![
//!     json!({ "id": "a", "type": "cbg", "time": "2023-01-01T12:00:00.000Z", "value": 120 }),
//!     json!({ "id": "a", "type": "cbg", "time": "2023-01-01T12:05:00.000Z", "value": 122 }),
//! ]);
//!
//! assert_eq!(report.accepted, 1);
//! assert_eq!(store.count_type(&EventType::Cbg), 1);
//! ```

pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use store::{IngestReport, RecordStore, StoreStats};
pub use types::{
    format_iso, parse_iso, parse_naive, EventType, Record, TimeRange, MS_IN_DAY, MS_IN_MIN,
};
