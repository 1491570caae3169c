//! The overlap decision contract.
//!
//! The geometric/kinematic decision algorithm is an external collaborator.
//! This module fixes the contract by which the resolver invokes it: the
//! resolver hands over up to five borrowed collections plus the run flags,
//! and the tool answers with one survive flag per object of every provided
//! collection (and, optionally, an overlap-partner reference per removed
//! object). The resolver applies the answer as decorations.
//!
//! ## Selected-only mode
//!
//! When `selected_only` is set, implementations must treat objects without
//! `selected == true` as ineligible: passed through untouched, flagged as
//! surviving, never removed.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::types::{Kind, KindMap, ObjectCollection, ObjectRef};

/// Error type for overlap decisions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    /// The tool returned no decision for a provided collection.
    #[error("decision tool returned no flags for provided {kind} collection")]
    MissingKind {
        /// The kind the tool ignored.
        kind: Kind,
    },
    /// The tool returned the wrong number of flags for a collection.
    #[error("decision tool returned {got} flags for {kind}, expected {expected}")]
    LengthMismatch {
        /// The kind with the mismatched answer.
        kind: Kind,
        /// Number of objects in the collection.
        expected: usize,
        /// Number of flags returned.
        got: usize,
    },
    /// The tool itself failed.
    #[error("decision tool failed: {reason}")]
    Failed {
        /// Tool-specific failure description.
        reason: String,
    },
}

/// One invocation's inputs: the per-kind collections of the current pass.
#[derive(Debug)]
pub struct DecisionRequest<'a> {
    collections: KindMap<Option<&'a ObjectCollection>>,
    /// Only pre-selected objects are eligible for removal.
    pub selected_only: bool,
    /// Removed objects should carry a link to their overlap partner.
    pub cross_link: bool,
}

impl<'a> DecisionRequest<'a> {
    /// Assemble a request from per-kind optional collections.
    pub fn new(
        collections: KindMap<Option<&'a ObjectCollection>>,
        selected_only: bool,
        cross_link: bool,
    ) -> Self {
        Self {
            collections,
            selected_only,
            cross_link,
        }
    }

    /// The collection provided for a kind, if any.
    pub fn collection(&self, kind: Kind) -> Option<&'a ObjectCollection> {
        *self.collections.get(kind)
    }

    /// Iterate the provided collections in [`Kind::ALL`] order.
    pub fn provided(&self) -> impl Iterator<Item = (Kind, &'a ObjectCollection)> + '_ {
        Kind::ALL
            .iter()
            .filter_map(move |&k| self.collection(k).map(|c| (k, c)))
    }
}

/// The tool's answer for one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct KindDecision {
    /// One survive flag per object, in collection order.
    pub survives: Vec<bool>,
    /// Optional overlap partner per object, in collection order.
    ///
    /// Either empty (no cross-linking) or the same length as `survives`.
    pub partners: Vec<Option<ObjectRef>>,
}

impl KindDecision {
    /// A decision from survive flags alone, with no partner links.
    pub fn from_flags(survives: Vec<bool>) -> Self {
        Self {
            survives,
            partners: Vec::new(),
        }
    }

    /// Keep every object of a collection of length `len`.
    pub fn keep_all(len: usize) -> Self {
        Self::from_flags(vec![true; len])
    }

    /// Attach a partner link for the object at `index`.
    pub fn with_partner(mut self, index: usize, partner: ObjectRef) -> Self {
        if self.partners.len() != self.survives.len() {
            self.partners = vec![None; self.survives.len()];
        }
        self.partners[index] = Some(partner);
        self
    }

    /// Number of flags in this decision.
    pub fn len(&self) -> usize {
        self.survives.len()
    }

    /// Whether the decision covers zero objects.
    pub fn is_empty(&self) -> bool {
        self.survives.is_empty()
    }
}

/// The tool's answer for one pass: at most one decision per kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionSet {
    decisions: KindMap<Option<KindDecision>>,
}

impl DecisionSet {
    /// An empty set with no decisions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of a kind's decision.
    pub fn with_kind(mut self, kind: Kind, decision: KindDecision) -> Self {
        self.decisions[kind] = Some(decision);
        self
    }

    /// The decision for a kind, if the tool produced one.
    pub fn for_kind(&self, kind: Kind) -> Option<&KindDecision> {
        self.decisions.get(kind).as_ref()
    }

    /// A set keeping every object of every collection in `request`.
    pub fn keep_all(request: &DecisionRequest<'_>) -> Self {
        let mut set = Self::new();
        for (kind, coll) in request.provided() {
            set.decisions[kind] = Some(KindDecision::keep_all(coll.len()));
        }
        set
    }
}

/// The overlap decision tool contract.
///
/// Implementations must return a [`KindDecision`] with exactly one flag per
/// object for every collection provided in the request; the resolver treats
/// anything less as a contract violation fatal to the event.
pub trait OverlapDecision {
    /// Decide which objects of the provided collections survive.
    fn decide(&self, request: &DecisionRequest<'_>) -> Result<DecisionSet, DecisionError>;
}

/// Decision tool that keeps everything.
///
/// Useful for wiring checks and throughput benchmarks where the decision
/// content is irrelevant.
#[derive(Debug, Default)]
pub struct KeepAllDecision;

impl OverlapDecision for KeepAllDecision {
    fn decide(&self, request: &DecisionRequest<'_>) -> Result<DecisionSet, DecisionError> {
        Ok(DecisionSet::keep_all(request))
    }
}

/// Decision tool that replays queued decision sets, for tests.
///
/// Each call pops the front of the queue; when the queue runs dry it keeps
/// everything. Queued sets must match the collection lengths of the pass
/// they are replayed against.
#[derive(Debug, Default)]
pub struct ScriptedDecision {
    script: Mutex<VecDeque<DecisionSet>>,
}

impl ScriptedDecision {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a decision set for a future pass.
    pub fn enqueue(&self, set: DecisionSet) {
        self.script.lock().unwrap().push_back(set);
    }

    /// Builder-style [`enqueue`](Self::enqueue).
    pub fn with_set(self, set: DecisionSet) -> Self {
        self.enqueue(set);
        self
    }
}

impl OverlapDecision for ScriptedDecision {
    fn decide(&self, request: &DecisionRequest<'_>) -> Result<DecisionSet, DecisionError> {
        match self.script.lock().unwrap().pop_front() {
            Some(set) => Ok(set),
            None => Ok(DecisionSet::keep_all(request)),
        }
    }
}
