//! Variation catalogs: who supplies the per-axis variation lists.

use std::collections::BTreeMap;

use crate::types::VariationName;

/// Error type for catalog lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// No variation list is registered for the named source algorithm.
    #[error("no variation list registered for source algorithm \"{source_name}\"")]
    SourceUnknown {
        /// The configured source algorithm name.
        source_name: String,
    },
}

/// Provider of systematic-variation name lists.
///
/// Each axis is fed by the upstream algorithm named in
/// [`RunConfig::variation_sources`](crate::RunConfig); the catalog maps that
/// algorithm name to the ordered list of variation names it produced. By
/// contract the first entry of every list is the empty nominal name.
pub trait VariationCatalog {
    /// Fetch the ordered variation list published by `source`.
    fn variations_for(&self, source: &str) -> Result<Vec<VariationName>, CatalogError>;
}

/// In-memory catalog, filled by the host before processing.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    lists: BTreeMap<String, Vec<VariationName>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the variation list published by a source algorithm.
    pub fn register<I, N>(&mut self, source: impl Into<String>, names: I)
    where
        I: IntoIterator<Item = N>,
        N: Into<VariationName>,
    {
        self.lists
            .insert(source.into(), names.into_iter().map(Into::into).collect());
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_list<I, N>(mut self, source: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<VariationName>,
    {
        self.register(source, names);
        self
    }
}

impl VariationCatalog for MemoryCatalog {
    fn variations_for(&self, source: &str) -> Result<Vec<VariationName>, CatalogError> {
        self.lists
            .get(source)
            .cloned()
            .ok_or_else(|| CatalogError::SourceUnknown {
                source_name: source.to_string(),
            })
    }
}
