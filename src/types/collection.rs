//! Object collections and order-preserving subset views.

use serde::{Deserialize, Serialize};

use super::kind::Kind;
use super::object::ObjectRecord;

/// An ordered collection of objects of one kind.
///
/// The kind is fixed at construction and insertion order is meaningful:
/// subset views refer to objects by their position here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectCollection {
    kind: Kind,
    objects: Vec<ObjectRecord>,
}

impl ObjectCollection {
    /// Create an empty collection of the given kind.
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            objects: Vec::new(),
        }
    }

    /// Create a collection from already-built objects.
    pub fn from_objects(kind: Kind, objects: Vec<ObjectRecord>) -> Self {
        Self { kind, objects }
    }

    /// The kind every object in this collection has.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Append an object, preserving insertion order.
    pub fn push(&mut self, object: ObjectRecord) {
        self.objects.push(object);
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Borrow the object at `index`.
    pub fn get(&self, index: usize) -> Option<&ObjectRecord> {
        self.objects.get(index)
    }

    /// Iterate objects in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ObjectRecord> {
        self.objects.iter()
    }

    /// Mutably iterate objects in insertion order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ObjectRecord> {
        self.objects.iter_mut()
    }
}

/// An order-preserving view of the surviving objects of a source collection.
///
/// A view is newly allocated per (axis, variation) pass and holds positions
/// into the named source collection rather than copies, so every viewed
/// element is the same entity as a source element. Built in a single linear
/// pass over the source; the source itself is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetView {
    kind: Kind,
    source_key: String,
    indices: Vec<usize>,
}

impl SubsetView {
    /// Build the view of survivors of `source`, recorded under `source_key`.
    ///
    /// An object is included iff its survive flag is present and true.
    pub fn survivors(source_key: impl Into<String>, source: &ObjectCollection) -> Self {
        let indices = source
            .iter()
            .enumerate()
            .filter(|(_, obj)| obj.survives_overlap == Some(true))
            .map(|(i, _)| i)
            .collect();
        Self {
            kind: source.kind(),
            source_key: source_key.into(),
            indices,
        }
    }

    /// The kind of the source collection.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Store key of the source collection this view indexes into.
    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    /// Positions of the viewed objects within the source, in source order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of viewed objects.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Resolve the viewed objects against their source collection.
    ///
    /// Positions past the end of `source` are skipped; that only happens if
    /// the source was replaced after the view was built.
    pub fn resolve<'a>(
        &'a self,
        source: &'a ObjectCollection,
    ) -> impl Iterator<Item = &'a ObjectRecord> + 'a {
        self.indices.iter().filter_map(|&i| source.get(i))
    }
}
