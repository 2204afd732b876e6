//! Record Store
//!
//! Holds the deduplicated record set and keeps the indexes in step with it:
//! - Ingest path: JSON value → Record → dedup by id → slot → IndexManager
//! - Evict path: predicate → matching slots → IndexManager → drop
//!
//! Mutation takes `&mut self`; reads (including index views) take `&self`.
//! Callers sharing a store across threads wrap it in a `RwLock`.

use crate::index::{DateKey, IndexManager, IndexStats, IndexView, RecordSlot};
use crate::storage::error::StorageResult;
use crate::storage::types::{format_iso, EventType, Record};
use chrono::{TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Outcome of an ingest call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Records added to the store
    pub accepted: usize,
    /// Records dropped because their id was already seen
    pub duplicates: usize,
    /// Inputs dropped because they were not records
    pub malformed: usize,
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accepted={}, duplicates={}, malformed={}",
            self.accepted, self.duplicates, self.malformed
        )
    }
}

/// Summary of store contents
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Total records held
    pub records: usize,
    /// Records per event type
    pub by_type: BTreeMap<String, usize>,
    /// Earliest and latest UTC `time`
    pub time_bounds: Option<(String, String)>,
    /// Index statistics
    pub index: IndexStats,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "records={}, types={}", self.records, self.by_type.len())?;
        if let Some((first, last)) = &self.time_bounds {
            write!(f, ", span={}..{}", first, last)?;
        }
        Ok(())
    }
}

/// The deduplicated, indexed record set
#[derive(Debug, Default)]
pub struct RecordStore {
    /// Slot → record
    records: HashMap<RecordSlot, Record>,
    /// Record id → slot
    ids: HashMap<String, RecordSlot>,
    /// Next slot to hand out
    next_slot: u64,
    /// Dimension indexes over `records`
    index: IndexManager,
}

impl RecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from an initial record list
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut store = Self::new();
        store.add_data(values);
        store
    }

    /// Discard everything and rebuild from `values`
    pub fn init<I>(&mut self, values: I) -> IngestReport
    where
        I: IntoIterator<Item = Value>,
    {
        self.records.clear();
        self.ids.clear();
        self.index.clear();
        self.add_data(values)
    }

    /// Ingest records
    ///
    /// Non-record inputs are dropped. Records are unique by `id`: the first
    /// occurrence wins, whether the duplicate arrives in the same batch or a
    /// later one.
    pub fn add_data<I>(&mut self, values: I) -> IngestReport
    where
        I: IntoIterator<Item = Value>,
    {
        let mut report = IngestReport::default();

        for value in values {
            let record = match Record::from_value(value) {
                Ok(record) => record,
                Err(e) => {
                    tracing::trace!("Dropping input: {}", e);
                    report.malformed += 1;
                    continue;
                }
            };

            if self.ids.contains_key(&record.id) {
                report.duplicates += 1;
                continue;
            }

            let slot = RecordSlot(self.next_slot);
            self.next_slot += 1;

            self.index.index_record(slot, &record);
            self.ids.insert(record.id.clone(), slot);
            self.records.insert(slot, record);
            report.accepted += 1;
        }

        tracing::debug!("addData: {} (store size {})", report, self.records.len());
        report
    }

    /// Ingest a JSON array of records
    pub fn add_json(&mut self, json: &str) -> StorageResult<IngestReport> {
        let values: Vec<Value> = serde_json::from_str(json)?;
        Ok(self.add_data(values))
    }

    /// Remove every record matching `predicate`, returning how many went
    pub fn remove_data<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Record) -> bool,
    {
        let doomed: Vec<RecordSlot> = self
            .records
            .iter()
            .filter(|&(_, record)| predicate(record))
            .map(|(slot, _)| *slot)
            .collect();

        for slot in &doomed {
            if let Some(record) = self.records.remove(slot) {
                self.index.remove_record(*slot, &record);
                self.ids.remove(&record.id);
            }
        }

        tracing::debug!(
            "removeData: removed {} (store size {})",
            doomed.len(),
            self.records.len()
        );
        doomed.len()
    }

    /// Look up a record by id
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.ids.get(id).and_then(|slot| self.records.get(slot))
    }

    /// Resolve slots to records, skipping any that are gone
    pub fn resolve(&self, slots: &[RecordSlot]) -> Vec<&Record> {
        slots.iter().filter_map(|slot| self.records.get(slot)).collect()
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The dimension indexes
    pub fn index(&self) -> &IndexManager {
        &self.index
    }

    /// Open a filter view over the indexes
    pub fn view(&self, date_key: DateKey) -> IndexView<'_> {
        self.index.view(date_key)
    }

    /// Summarize store contents
    pub fn stats(&self) -> StoreStats {
        let by_type = self
            .index
            .types()
            .into_iter()
            .map(|t| {
                let count = self.index.type_count(&t);
                (t.to_string(), count)
            })
            .collect();

        let time_bounds = self.index.time_bounds().and_then(|(min, max)| {
            let first = Utc.timestamp_millis_opt(min).single()?;
            let last = Utc.timestamp_millis_opt(max).single()?;
            Some((format_iso(&first), format_iso(&last)))
        });

        StoreStats {
            records: self.records.len(),
            by_type,
            time_bounds,
            index: self.index.stats(),
        }
    }

    /// Number of records of an event type
    pub fn count_type(&self, event_type: &EventType) -> usize {
        self.index.type_count(event_type)
    }
}
