//! Type Index - Inverted index for exact event type matches
//!
//! Maps event type → set of record slots.
//!
//! # Example
//! ```ignore
//! // Query: all basal segments
//! let slots = type_index.find(&EventType::Basal);
//! ```

use crate::index::RecordSlot;
use crate::storage::EventType;
use std::collections::{HashMap, HashSet};

/// Inverted index for type-based queries
///
/// Provides O(1) lookup for type → slots mapping
#[derive(Debug, Default, Clone)]
pub struct TypeIndex {
    index: HashMap<EventType, HashSet<RecordSlot>>,
}

impl TypeIndex {
    /// Create an empty type index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record slot under its type
    pub fn add(&mut self, event_type: &EventType, slot: RecordSlot) {
        self.index
            .entry(event_type.clone())
            .or_default()
            .insert(slot);
    }

    /// Remove a record slot, dropping the type once it has no records left
    pub fn remove(&mut self, event_type: &EventType, slot: RecordSlot) -> bool {
        let Some(slots) = self.index.get_mut(event_type) else {
            return false;
        };

        let removed = slots.remove(&slot);
        if slots.is_empty() {
            self.index.remove(event_type);
        }
        removed
    }

    /// Find all slots of a type
    pub fn find(&self, event_type: &EventType) -> Option<&HashSet<RecordSlot>> {
        self.index.get(event_type)
    }

    /// Number of records of a type
    pub fn count(&self, event_type: &EventType) -> usize {
        self.index.get(event_type).map(HashSet::len).unwrap_or(0)
    }

    /// Get all indexed types
    pub fn types(&self) -> Vec<EventType> {
        let mut types: Vec<_> = self.index.keys().cloned().collect();
        types.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        types
    }

    /// Number of distinct types
    pub fn type_count(&self) -> usize {
        self.index.len()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_find() {
        let mut index = TypeIndex::new();

        index.add(&EventType::Cbg, RecordSlot(1));
        index.add(&EventType::Cbg, RecordSlot(2));
        index.add(&EventType::Basal, RecordSlot(3));

        assert_eq!(index.count(&EventType::Cbg), 2);
        assert_eq!(index.count(&EventType::Basal), 1);
        assert!(index.find(&EventType::Cbg).unwrap().contains(&RecordSlot(2)));
        assert!(index.find(&EventType::Wizard).is_none());
    }

    #[test]
    fn test_other_types_are_exact() {
        let mut index = TypeIndex::new();

        index.add(&EventType::from("food"), RecordSlot(1));

        assert_eq!(index.count(&EventType::from("food")), 1);
        assert_eq!(index.count(&EventType::from("Food")), 0);
    }

    #[test]
    fn test_remove_drops_empty_types() {
        let mut index = TypeIndex::new();

        index.add(&EventType::Smbg, RecordSlot(1));
        assert_eq!(index.type_count(), 1);

        assert!(index.remove(&EventType::Smbg, RecordSlot(1)));
        assert!(!index.remove(&EventType::Smbg, RecordSlot(1)));
        assert_eq!(index.type_count(), 0);
    }

    #[test]
    fn test_types_sorted() {
        let mut index = TypeIndex::new();

        index.add(&EventType::Wizard, RecordSlot(1));
        index.add(&EventType::Basal, RecordSlot(2));
        index.add(&EventType::Cbg, RecordSlot(3));

        let names: Vec<_> = index.types().iter().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["basal", "cbg", "wizard"]);
    }
}
