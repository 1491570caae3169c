//! Per-event store of collections, subset views, and name lists.
//!
//! The store is an explicit per-event context object: upstream stages record
//! input collections into it, the resolver reads and decorates them, records
//! its subset views and the output-name registry, and the host clears the
//! store between events. Typed accessors return explicit errors instead of
//! "not found" sentinels.
//!
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;

use crate::types::{Kind, ObjectCollection, SubsetView, VariationName};

/// Error type for store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No collection recorded under the key.
    #[error("no collection recorded under key \"{key}\"")]
    CollectionNotFound {
        /// The missing key.
        key: String,
    },
    /// A collection was found but holds objects of a different kind.
    #[error("collection \"{key}\" holds {found} objects, expected {expected}")]
    KindMismatch {
        /// The key that was retrieved.
        key: String,
        /// The kind the caller asked for.
        expected: Kind,
        /// The kind actually recorded.
        found: Kind,
    },
    /// The key is already occupied in the addressed family.
    #[error("key \"{key}\" is already recorded")]
    KeyOccupied {
        /// The occupied key.
        key: String,
    },
    /// No subset view recorded under the key.
    #[error("no subset view recorded under key \"{key}\"")]
    ViewNotFound {
        /// The missing key.
        key: String,
    },
    /// No name list recorded under the key.
    #[error("no name list recorded under key \"{key}\"")]
    NamesNotFound {
        /// The missing key.
        key: String,
    },
}

/// Per-event key/value registry for the overlap resolver.
///
/// Three independent key families: source collections, subset views, and
/// variation-name lists. Keys are unique within a family; recording over an
/// occupied key fails rather than overwriting.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    collections: BTreeMap<String, ObjectCollection>,
    views: BTreeMap<String, SubsetView>,
    name_lists: BTreeMap<String, Vec<VariationName>>,
}

impl EventStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a collection is recorded under `key`.
    pub fn contains_collection(&self, key: &str) -> bool {
        self.collections.contains_key(key)
    }

    /// Record a collection. Fails if the key is occupied.
    pub fn record_collection(
        &mut self,
        key: impl Into<String>,
        collection: ObjectCollection,
    ) -> Result<(), StoreError> {
        let key = key.into();
        if self.collections.contains_key(&key) {
            return Err(StoreError::KeyOccupied { key });
        }
        self.collections.insert(key, collection);
        Ok(())
    }

    /// Retrieve the collection under `key`, checking its kind.
    pub fn collection(&self, key: &str, kind: Kind) -> Result<&ObjectCollection, StoreError> {
        let coll = self
            .collections
            .get(key)
            .ok_or_else(|| StoreError::CollectionNotFound {
                key: key.to_string(),
            })?;
        if coll.kind() != kind {
            return Err(StoreError::KindMismatch {
                key: key.to_string(),
                expected: kind,
                found: coll.kind(),
            });
        }
        Ok(coll)
    }

    /// Mutably retrieve the collection under `key`, checking its kind.
    pub fn collection_mut(
        &mut self,
        key: &str,
        kind: Kind,
    ) -> Result<&mut ObjectCollection, StoreError> {
        let coll =
            self.collections
                .get_mut(key)
                .ok_or_else(|| StoreError::CollectionNotFound {
                    key: key.to_string(),
                })?;
        if coll.kind() != kind {
            return Err(StoreError::KindMismatch {
                key: key.to_string(),
                expected: kind,
                found: coll.kind(),
            });
        }
        Ok(coll)
    }

    /// Record a subset view. Fails if the key is occupied.
    pub fn record_view(
        &mut self,
        key: impl Into<String>,
        view: SubsetView,
    ) -> Result<(), StoreError> {
        let key = key.into();
        if self.views.contains_key(&key) {
            return Err(StoreError::KeyOccupied { key });
        }
        self.views.insert(key, view);
        Ok(())
    }

    /// Retrieve the subset view under `key`.
    pub fn view(&self, key: &str) -> Result<&SubsetView, StoreError> {
        self.views.get(key).ok_or_else(|| StoreError::ViewNotFound {
            key: key.to_string(),
        })
    }

    /// Keys of all recorded subset views, in sorted order.
    pub fn view_keys(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    /// Record a variation-name list. Fails if the key is occupied.
    pub fn record_names(
        &mut self,
        key: impl Into<String>,
        names: Vec<VariationName>,
    ) -> Result<(), StoreError> {
        let key = key.into();
        if self.name_lists.contains_key(&key) {
            return Err(StoreError::KeyOccupied { key });
        }
        self.name_lists.insert(key, names);
        Ok(())
    }

    /// Retrieve the name list under `key`.
    pub fn names(&self, key: &str) -> Result<&[VariationName], StoreError> {
        self.name_lists
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::NamesNotFound {
                key: key.to_string(),
            })
    }

    /// Drop everything. Called by the host between events.
    pub fn clear(&mut self) {
        self.collections.clear();
        self.views.clear();
        self.name_lists.clear();
    }

    /// Emit the store contents at trace level.
    pub fn trace_contents(&self) {
        tracing::trace!(
            collections = ?self.collections.keys().collect::<Vec<_>>(),
            views = ?self.views.keys().collect::<Vec<_>>(),
            name_lists = ?self.name_lists.keys().collect::<Vec<_>>(),
            "event store contents"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectRecord;

    fn jets(n: usize) -> ObjectCollection {
        let objects = (0..n)
            .map(|i| ObjectRecord::new(100_000.0, 80_000.0 + i as f64, 0.5, 1.0))
            .collect();
        ObjectCollection::from_objects(Kind::Jet, objects)
    }

    #[test]
    fn test_record_and_retrieve() {
        let mut store = EventStore::new();
        store.record_collection("Jets", jets(2)).unwrap();

        assert!(store.contains_collection("Jets"));
        assert_eq!(store.collection("Jets", Kind::Jet).unwrap().len(), 2);
    }

    #[test]
    fn test_retrieve_missing_fails() {
        let store = EventStore::new();
        assert_eq!(
            store.collection("Jets", Kind::Jet),
            Err(StoreError::CollectionNotFound {
                key: "Jets".to_string()
            })
        );
    }

    #[test]
    fn test_kind_mismatch_fails() {
        let mut store = EventStore::new();
        store.record_collection("Jets", jets(1)).unwrap();

        let err = store.collection("Jets", Kind::Muon).unwrap_err();
        assert_eq!(
            err,
            StoreError::KindMismatch {
                key: "Jets".to_string(),
                expected: Kind::Muon,
                found: Kind::Jet,
            }
        );
    }

    #[test]
    fn test_record_over_occupied_key_fails() {
        let mut store = EventStore::new();
        store.record_collection("Jets", jets(1)).unwrap();

        let err = store.record_collection("Jets", jets(3)).unwrap_err();
        assert_eq!(
            err,
            StoreError::KeyOccupied {
                key: "Jets".to_string()
            }
        );
        // First recording is untouched.
        assert_eq!(store.collection("Jets", Kind::Jet).unwrap().len(), 1);
    }

    #[test]
    fn test_families_are_independent() {
        let mut store = EventStore::new();
        store.record_collection("Jets", jets(1)).unwrap();
        store
            .record_names("Jets", vec![VariationName::nominal()])
            .unwrap();
        assert_eq!(store.names("Jets").unwrap().len(), 1);
    }

    #[test]
    fn test_clear_empties_all_families() {
        let mut store = EventStore::new();
        store.record_collection("Jets", jets(1)).unwrap();
        store.record_names("syst", vec![]).unwrap();
        store.clear();

        assert!(!store.contains_collection("Jets"));
        assert!(store.names("syst").is_err());
    }
}
