//! Per-kind overlap cutflow accumulation.
//!
//! The cutflow histograms themselves are owned and persisted by an external
//! stage; they pre-exist this kernel under the conventional names
//! `cutflow_<kind-plural>_1` with a labeled `OR_cut` bin. The accumulator
//! resolves every bin once at setup (failing fast if a histogram or label is
//! absent) and from then on adds one unweighted entry per removed object,
//! alongside a per-kind counter kept for diagnostics.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::{Kind, KindMap};

/// Label of the overlap-removal stage bin in the object cutflows.
pub const CUTFLOW_STAGE: &str = "OR_cut";

/// Error type for cutflow setup and accumulation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CutflowError {
    /// A required cutflow histogram is absent from the registry.
    #[error("cutflow histogram \"{name}\" not found in registry")]
    HistogramMissing {
        /// The conventional histogram name that was looked up.
        name: String,
    },
    /// A histogram exists but lacks the required labeled bin.
    #[error("histogram \"{name}\" has no bin labeled \"{label}\"")]
    LabelMissing {
        /// The histogram that was inspected.
        name: String,
        /// The label that could not be resolved.
        label: String,
    },
}

/// A counter histogram with labeled bins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutflowHistogram {
    name: String,
    labels: Vec<String>,
    entries: Vec<u64>,
}

impl CutflowHistogram {
    /// Create a histogram with one zeroed bin per label.
    pub fn with_labels<I, L>(name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let entries = vec![0; labels.len()];
        Self {
            name: name.into(),
            labels,
            entries,
        }
    }

    /// The histogram name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve a label to its bin index.
    pub fn find_bin(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Add one unweighted entry at `bin`. Out-of-range bins are ignored.
    pub fn fill(&mut self, bin: usize) {
        if let Some(entry) = self.entries.get_mut(bin) {
            *entry += 1;
        }
    }

    /// Entries accumulated at `bin` (zero for out-of-range bins).
    pub fn entries(&self, bin: usize) -> u64 {
        self.entries.get(bin).copied().unwrap_or(0)
    }
}

/// Host-owned registry of named histograms.
///
/// Shared with the kernel as `Arc<Mutex<HistogramRegistry>>`; the host keeps
/// ownership and persists the histograms after the run.
#[derive(Debug, Default)]
pub struct HistogramRegistry {
    histograms: BTreeMap<String, CutflowHistogram>,
}

impl HistogramRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard object cutflows: one per kind, each ending in the
    /// overlap-removal stage bin.
    pub fn object_cutflows() -> Self {
        let mut registry = Self::new();
        for kind in Kind::ALL {
            registry.insert(CutflowHistogram::with_labels(
                kind.cutflow_histogram(),
                ["init", "selected", CUTFLOW_STAGE],
            ));
        }
        registry
    }

    /// Insert a histogram, keyed by its name.
    pub fn insert(&mut self, histogram: CutflowHistogram) {
        self.histograms.insert(histogram.name().to_string(), histogram);
    }

    /// Borrow a histogram by name.
    pub fn get(&self, name: &str) -> Option<&CutflowHistogram> {
        self.histograms.get(name)
    }

    /// Mutably borrow a histogram by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut CutflowHistogram> {
        self.histograms.get_mut(name)
    }
}

/// Per-kind accumulator over the `OR_cut` bins.
///
/// Counts are monotonic for the lifetime of the run: one increment per
/// scanned object whose survive flag is false, summed across every
/// (axis, variation) pass of every event.
#[derive(Debug)]
pub struct CutflowAccumulator {
    registry: Arc<Mutex<HistogramRegistry>>,
    bins: KindMap<usize>,
    removed: KindMap<u64>,
}

impl CutflowAccumulator {
    /// Resolve the `OR_cut` bin of every kind's cutflow histogram.
    ///
    /// Fails fast at setup if any histogram or label is absent.
    pub fn resolve(registry: Arc<Mutex<HistogramRegistry>>) -> Result<Self, CutflowError> {
        let mut bins = KindMap::default();
        {
            let reg = registry.lock();
            for kind in Kind::ALL {
                let name = kind.cutflow_histogram();
                let hist = reg
                    .get(&name)
                    .ok_or_else(|| CutflowError::HistogramMissing { name: name.clone() })?;
                bins[kind] = hist.find_bin(CUTFLOW_STAGE).ok_or_else(|| {
                    CutflowError::LabelMissing {
                        name: name.clone(),
                        label: CUTFLOW_STAGE.to_string(),
                    }
                })?;
            }
        }
        Ok(Self {
            registry,
            bins,
            removed: KindMap::default(),
        })
    }

    /// Record one removed object of `kind`.
    pub fn record_removed(&mut self, kind: Kind) -> Result<(), CutflowError> {
        let name = kind.cutflow_histogram();
        let mut reg = self.registry.lock();
        let hist = reg
            .get_mut(&name)
            .ok_or(CutflowError::HistogramMissing { name })?;
        hist.fill(self.bins[kind]);
        drop(reg);

        self.removed[kind] += 1;
        Ok(())
    }

    /// Objects of `kind` counted as removed so far this run.
    pub fn removed(&self, kind: Kind) -> u64 {
        self.removed[kind]
    }
}
