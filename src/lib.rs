//! # overlap-kernel
//!
//! Variation-aware overlap resolution for reconstructed object collections.
//!
//! The kernel answers one question per event:
//!
//! > For every systematic variation, which reconstructed objects survive
//! > overlap removal?
//!
//! ## Core Contract
//!
//! 1. Run the nominal pass, then each active systematics axis in the fixed
//!    order electron, muon, jet, photon, tau
//! 2. Per (axis, variation) pass, substitute only that axis kind's
//!    container and invoke the overlap decision tool on the quintuple
//! 3. Record one order-preserving subset view of survivors per active kind,
//!    plus a registry of every variation name processed
//!
//! ## Architecture
//!
//! ```text
//! EventStore → OverlapResolver → OverlapDecision → SubsetViews + Registry
//!                    ↓
//!           VariationCatalog, CutflowAccumulator
//! ```
//!
//! ## Guarantees
//!
//! - Subset views preserve source order and alias source objects
//! - The empty (nominal) variation name is registered exactly once per
//!   event, by the nominal pass
//! - Every error is fatal to the current event; passes already recorded
//!   are not rolled back

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod canonical;
pub mod catalog;
pub mod config;
pub mod cutflow;
pub mod decision;
pub mod resolver;
pub mod store;
pub mod types;

// Re-exports
pub use types::{Kind, KindMap, VariationAxis};
pub use types::{ObjectCollection, SubsetView};
pub use types::{DecorationError, ObjectRecord, ObjectRef};
pub use types::VariationName;
pub use config::{ConfigError, RunConfig};
pub use catalog::{CatalogError, MemoryCatalog, VariationCatalog};
pub use decision::{
    DecisionError, DecisionRequest, DecisionSet, KeepAllDecision, KindDecision, OverlapDecision,
    ScriptedDecision,
};
pub use cutflow::{
    CutflowAccumulator, CutflowError, CutflowHistogram, HistogramRegistry, CUTFLOW_STAGE,
};
pub use store::{EventStore, StoreError};
pub use resolver::{EventReport, OverlapResolver, ResolverError, RunId};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};

/// Schema version for all overlap kernel types.
/// Increment on breaking changes to any recorded artifact.
pub const OVERLAP_KERNEL_SCHEMA_VERSION: &str = "1.0.0";
