//! The overlap resolver: the axis × variation matrix over one event.
//!
//! For every event the resolver first runs the nominal pass (all active
//! kinds at their nominal containers), then walks the systematics axes in
//! the fixed order electron, muon, jet, photon, tau. An axis runs only if
//! its kind is active and a variation source is configured for it; within
//! an axis, one pass executes per non-empty variation name, substituting
//! only that axis kind's container.
//!
//! ## One pass
//!
//! 1. Resolve per-kind store keys (axis kind at `input + name`, everything
//!    else at nominal)
//! 2. Invoke the decision tool on the assembled quintuple
//! 3. Apply the returned flags as `survives_overlap` decorations (and
//!    partner links when cross-linking is on)
//! 4. Accumulate the cutflow from the flags, if enabled
//! 5. Build and record one subset view per active kind, if enabled
//! 6. Append the variation name to the output registry
//!
//! Any failure is fatal to the current event: later passes do not run, and
//! output already recorded by earlier passes stays in the store.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::{CatalogError, VariationCatalog};
use crate::config::{ConfigError, RunConfig};
use crate::cutflow::{CutflowAccumulator, CutflowError, HistogramRegistry};
use crate::decision::{DecisionError, DecisionRequest, OverlapDecision};
use crate::store::{EventStore, StoreError};
use crate::types::{
    DecorationError, Kind, KindMap, SubsetView, VariationAxis, VariationName,
};

/// Error type for overlap resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// Configuration rejected at setup.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A required container was absent from the store at event time.
    #[error("container \"{key}\" for {kind} not found during {axis} pass")]
    ContainerNotFound {
        /// Axis being processed when the container was missed.
        axis: VariationAxis,
        /// Kind whose container was missed.
        kind: Kind,
        /// The store key that was looked up.
        key: String,
    },
    /// Cutflow setup or accumulation failed.
    #[error(transparent)]
    Cutflow(#[from] CutflowError),
    /// The variation catalog had no list for a configured source.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The decision tool failed or violated its contract.
    #[error(transparent)]
    Decision(#[from] DecisionError),
    /// An expected decoration was absent while scanning a collection.
    #[error("scanning \"{key}\" ({kind}): {source}")]
    Decoration {
        /// Kind of the scanned collection.
        kind: Kind,
        /// Store key of the scanned collection.
        key: String,
        /// The underlying decoration failure.
        #[source]
        source: DecorationError,
    },
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Identifier of one resolver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Summary of one processed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReport {
    /// The run this event belongs to.
    pub run_id: RunId,
    /// Ordinal of the event within the run (1-based).
    pub event_number: u64,
    /// Every variation name registered this event, in pass order. The
    /// first entry is always the nominal (empty) name.
    pub registered: Vec<VariationName>,
}

/// Variation-aware overlap-removal orchestrator.
///
/// Owns the run configuration, the decision tool, the variation catalog,
/// and (when enabled) the cutflow accumulator. Per-event state lives in the
/// [`EventStore`] passed into [`process_event`](Self::process_event); the
/// resolver retains nothing between events except its monotonic counters.
#[derive(Debug)]
pub struct OverlapResolver<D, C> {
    config: RunConfig,
    decision: D,
    catalog: C,
    cutflow: Option<CutflowAccumulator>,
    run_id: RunId,
    started_at: DateTime<Utc>,
    events_seen: u64,
}

impl<D: OverlapDecision, C: VariationCatalog> OverlapResolver<D, C> {
    /// Set up a resolver for one run.
    ///
    /// Validates the configuration and, when cutflow accumulation is
    /// enabled, resolves every kind's `OR_cut` bin from the host-owned
    /// histogram registry. Both checks fail fast, before any event.
    pub fn new(
        config: RunConfig,
        decision: D,
        catalog: C,
        histograms: Option<Arc<Mutex<HistogramRegistry>>>,
    ) -> Result<Self, ResolverError> {
        config.validate()?;

        let cutflow = if config.cutflow_enabled {
            let registry = histograms.ok_or(ConfigError::CutflowWithoutHistograms)?;
            Some(CutflowAccumulator::resolve(registry)?)
        } else {
            None
        };

        let resolver = Self {
            config,
            decision,
            catalog,
            cutflow,
            run_id: RunId::new(),
            started_at: Utc::now(),
            events_seen: 0,
        };
        tracing::info!(
            run_id = %resolver.run_id,
            params_hash = %resolver.config.params_hash(),
            "overlap resolver initialized"
        );
        Ok(resolver)
    }

    /// The run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Identifier of this run.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// When this run was set up.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Events processed since run start (failed events included).
    pub fn events_seen(&self) -> u64 {
        self.events_seen
    }

    /// The cutflow accumulator, when enabled.
    pub fn cutflow(&self) -> Option<&CutflowAccumulator> {
        self.cutflow.as_ref()
    }

    /// Resolve overlaps for the current event.
    ///
    /// Runs the nominal pass, then every active systematics axis in fixed
    /// order, recording subset views and finally the output-name registry
    /// into `store`. On error the event is abandoned as a whole; passes
    /// already recorded are not rolled back.
    pub fn process_event(&mut self, store: &mut EventStore) -> Result<EventReport, ResolverError> {
        self.events_seen += 1;
        tracing::debug!(event = self.events_seen, "applying overlap removal");

        let mut registered: Vec<VariationName> = Vec::new();

        // The nominal case always runs.
        self.run_axis(
            store,
            VariationAxis::Nominal,
            &[VariationName::nominal()],
            &mut registered,
        )?;

        for axis in VariationAxis::SYSTEMATICS {
            let Some(kind) = axis.kind() else { continue };
            if !self.config.is_active(kind) || !self.config.has_variation_source(kind) {
                continue;
            }

            let source = self.config.variation_sources[kind].clone();
            let names = self.catalog.variations_for(&source)?;
            if names.iter().all(VariationName::is_nominal) {
                tracing::debug!(axis = %axis, "no non-nominal variations, skipping axis");
                continue;
            }
            self.run_axis(store, axis, &names, &mut registered)?;
        }

        store.record_names(self.config.registry_key.clone(), registered.clone())?;
        store.trace_contents();

        Ok(EventReport {
            run_id: self.run_id,
            event_number: self.events_seen,
            registered,
        })
    }

    /// Run every pass of one axis.
    fn run_axis(
        &mut self,
        store: &mut EventStore,
        axis: VariationAxis,
        names: &[VariationName],
        registered: &mut Vec<VariationName>,
    ) -> Result<(), ResolverError> {
        tracing::debug!(axis = %axis, variations = names.len(), "running overlap axis");

        // Every active kind this axis does not own must have its nominal
        // container present before any variation is attempted.
        let mut missing: Option<(Kind, String)> = None;
        for kind in Kind::ALL {
            if !self.config.is_active(kind) || axis.kind() == Some(kind) {
                continue;
            }
            let key = &self.config.input_names[kind];
            if !store.contains_collection(key) {
                tracing::error!(
                    axis = %axis,
                    kind = %kind,
                    key = %key,
                    "nominal container not found, overlap removal fails for this event"
                );
                if missing.is_none() {
                    missing = Some((kind, key.clone()));
                }
            }
        }
        if let Some((kind, key)) = missing {
            return Err(ResolverError::ContainerNotFound { axis, kind, key });
        }

        for name in names {
            // The empty name was already covered by the nominal pass.
            if name.is_nominal() && axis != VariationAxis::Nominal {
                continue;
            }
            self.execute_pass(store, axis, name, registered)?;
        }
        Ok(())
    }

    /// Execute one (axis, variation) pass.
    fn execute_pass(
        &mut self,
        store: &mut EventStore,
        axis: VariationAxis,
        name: &VariationName,
        registered: &mut Vec<VariationName>,
    ) -> Result<(), ResolverError> {
        // Per-kind store keys for this pass: the axis kind at its
        // variation-specific container, every other active kind at nominal.
        let keys: KindMap<Option<String>> = KindMap::from_fn(|kind| {
            if !self.config.is_active(kind) {
                return None;
            }
            let base = &self.config.input_names[kind];
            if axis.kind() == Some(kind) {
                Some(format!("{base}{}", name.as_str()))
            } else {
                Some(base.clone())
            }
        });

        if let Some(kind) = axis.kind() {
            if let Some(key) = &keys[kind] {
                if !store.contains_collection(key) {
                    tracing::error!(
                        axis = %axis,
                        variation = %name,
                        kind = %kind,
                        key = %key,
                        "variation container not found, overlap removal fails for this event"
                    );
                    return Err(ResolverError::ContainerNotFound {
                        axis,
                        kind,
                        key: key.clone(),
                    });
                }
            }
        }

        // Assemble the quintuple and invoke the decision tool.
        let decisions = {
            let mut collections = KindMap::default();
            for kind in Kind::ALL {
                if let Some(key) = &keys[kind] {
                    let coll = store.collection(key, kind)?;
                    tracing::debug!(axis = %axis, variation = %name, kind = %kind, size = coll.len(), "pass input");
                    collections[kind] = Some(coll);
                }
            }
            let request = DecisionRequest::new(
                collections,
                self.config.selected_only,
                self.config.cross_link_overlaps,
            );
            self.decision.decide(&request)?
        };

        // Apply the decision as decorations, one kind at a time.
        for kind in Kind::ALL {
            let Some(key) = &keys[kind] else { continue };
            let decision = decisions
                .for_kind(kind)
                .ok_or(DecisionError::MissingKind { kind })?;
            let coll = store.collection_mut(key, kind)?;
            if decision.len() != coll.len() {
                return Err(DecisionError::LengthMismatch {
                    kind,
                    expected: coll.len(),
                    got: decision.len(),
                }
                .into());
            }
            let cross_link = self.config.cross_link_overlaps;
            for (i, obj) in coll.iter_mut().enumerate() {
                obj.survives_overlap = Some(decision.survives[i]);
                if cross_link {
                    obj.overlap_partner = decision.partners.get(i).copied().flatten();
                }
            }
        }

        // Accumulate the cutflow from the freshly-written flags.
        if self.cutflow.is_some() {
            for kind in Kind::ALL {
                let Some(key) = &keys[kind] else { continue };
                self.scan_cutflow(store, kind, key)?;
            }
        }

        // Build and record one subset view per active kind.
        if self.config.create_subset_views {
            for kind in Kind::ALL {
                let Some(key) = &keys[kind] else { continue };
                let coll = store.collection(key, kind)?;
                let view = SubsetView::survivors(key.clone(), coll);
                tracing::debug!(
                    axis = %axis,
                    variation = %name,
                    kind = %kind,
                    selected = view.len(),
                    total = coll.len(),
                    "recording subset view"
                );
                let out_key = format!("{}{}", self.config.output_names[kind], name.as_str());
                store.record_view(out_key, view)?;
            }
        }

        registered.push(name.clone());
        Ok(())
    }

    /// Scan one collection's survive flags into the cutflow.
    fn scan_cutflow(
        &mut self,
        store: &EventStore,
        kind: Kind,
        key: &str,
    ) -> Result<(), ResolverError> {
        let coll = store.collection(key, kind)?;
        for obj in coll.iter() {
            let survives = obj.survives().map_err(|source| ResolverError::Decoration {
                kind,
                key: key.to_string(),
                source,
            })?;
            tracing::debug!(
                kind = %kind,
                pt = obj.pt,
                eta = obj.eta,
                phi = obj.phi,
                b_tagged = ?obj.b_tagged,
                selected = ?obj.selected,
                partner = ?obj.overlap_partner,
                survives,
                "object scanned"
            );
            if !survives {
                if let Some(acc) = self.cutflow.as_mut() {
                    acc.record_removed(kind)?;
                }
            }
        }
        Ok(())
    }
}
