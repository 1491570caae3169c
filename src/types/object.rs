//! Reconstructed object records and their overlap decorations.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::kind::Kind;

/// Reference to an object inside one of the event's source collections.
///
/// Identifies the overlap partner of a removed object: the kind of the
/// partner's collection plus its position in that collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Kind of the collection the partner lives in.
    pub kind: Kind,
    /// Position of the partner within its collection.
    pub index: usize,
}

impl ObjectRef {
    /// Create a reference to the object at `index` in the `kind` collection.
    pub fn new(kind: Kind, index: usize) -> Self {
        Self { kind, index }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.index)
    }
}

/// One reconstructed object.
///
/// Kinematic attributes are read-only inputs populated upstream. The
/// decorations are strongly-typed optional fields: `selected` and `b_tagged`
/// are written by upstream selection stages, `survives_overlap` and
/// `overlap_partner` are written when the overlap decision for a pass is
/// applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Energy in MeV.
    pub energy: f64,
    /// Transverse momentum in MeV.
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle.
    pub phi: f64,
    /// Upstream pre-selection flag, if the upstream selector ran.
    pub selected: Option<bool>,
    /// Whether the object survived the most recent overlap decision.
    pub survives_overlap: Option<bool>,
    /// The object this one overlapped with, when cross-linking is enabled.
    pub overlap_partner: Option<ObjectRef>,
    /// b-tag flag for the configured working point, if decorated upstream.
    pub b_tagged: Option<bool>,
}

impl ObjectRecord {
    /// Create an object with the given kinematics and no decorations.
    pub fn new(energy: f64, pt: f64, eta: f64, phi: f64) -> Self {
        Self {
            energy,
            pt,
            eta,
            phi,
            selected: None,
            survives_overlap: None,
            overlap_partner: None,
            b_tagged: None,
        }
    }

    /// Set the upstream pre-selection flag.
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = Some(selected);
        self
    }

    /// Set the b-tag flag.
    pub fn with_b_tag(mut self, b_tagged: bool) -> Self {
        self.b_tagged = Some(b_tagged);
        self
    }

    /// Read the survive flag, failing if the decoration is absent.
    ///
    /// The decision tool's contract guarantees the flag on every object it
    /// was given, so absence signals an upstream contract violation.
    pub fn survives(&self) -> Result<bool, DecorationError> {
        self.survives_overlap
            .ok_or(DecorationError::SurviveFlagMissing)
    }
}

/// Error when an expected decoration is absent on an object being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecorationError {
    /// The overlap survive flag was expected but never written.
    #[error("overlap survive flag missing on object")]
    SurviveFlagMissing,
}
