//! Object kinds and systematic-variation axes.
//!
//! `Kind` is the closed set of reconstructed object categories this kernel
//! resolves overlaps between. `VariationAxis` is `Kind` plus the
//! distinguished nominal axis, in the fixed order passes are executed.
//! `KindMap` is a per-kind lookup table; routing through it (instead of
//! inspecting a runtime type code) keeps kind dispatch total and cheap.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// One of the five reconstructed object categories.
///
/// Jet is always active; the other four participate only when an input
/// container name is configured for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// Reconstructed electron.
    Electron,
    /// Reconstructed muon.
    Muon,
    /// Reconstructed jet.
    Jet,
    /// Reconstructed photon.
    Photon,
    /// Reconstructed hadronic tau.
    Tau,
}

impl Kind {
    /// All kinds, in the order used for per-kind tables and iteration.
    pub const ALL: [Kind; 5] = [
        Kind::Electron,
        Kind::Muon,
        Kind::Jet,
        Kind::Photon,
        Kind::Tau,
    ];

    /// Parse a kind from its lowercase name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "electron" => Some(Self::Electron),
            "muon" => Some(Self::Muon),
            "jet" => Some(Self::Jet),
            "photon" => Some(Self::Photon),
            "tau" => Some(Self::Tau),
            _ => None,
        }
    }

    /// Plural form, as used in external histogram names.
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Electron => "electrons",
            Self::Muon => "muons",
            Self::Jet => "jets",
            Self::Photon => "photons",
            Self::Tau => "taus",
        }
    }

    /// Name of the externally-owned object cutflow histogram for this kind.
    pub fn cutflow_histogram(&self) -> String {
        format!("cutflow_{}_1", self.plural())
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Electron => 0,
            Self::Muon => 1,
            Self::Jet => 2,
            Self::Photon => 3,
            Self::Tau => 4,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Electron => write!(f, "electron"),
            Self::Muon => write!(f, "muon"),
            Self::Jet => write!(f, "jet"),
            Self::Photon => write!(f, "photon"),
            Self::Tau => write!(f, "tau"),
        }
    }
}

/// A systematic-variation axis.
///
/// Each non-nominal axis is tied to exactly one [`Kind`]: during a pass on
/// that axis, only that kind's container is substituted with the
/// variation-specific one, all other active kinds stay at nominal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationAxis {
    /// The nominal pass: every active kind at its nominal container.
    Nominal,
    /// Electron systematics.
    Electron,
    /// Muon systematics.
    Muon,
    /// Jet systematics.
    Jet,
    /// Photon systematics.
    Photon,
    /// Tau systematics.
    Tau,
}

impl VariationAxis {
    /// Every axis, in the fixed processing order.
    pub const ORDER: [VariationAxis; 6] = [
        VariationAxis::Nominal,
        VariationAxis::Electron,
        VariationAxis::Muon,
        VariationAxis::Jet,
        VariationAxis::Photon,
        VariationAxis::Tau,
    ];

    /// The non-nominal axes, in the fixed processing order.
    pub const SYSTEMATICS: [VariationAxis; 5] = [
        VariationAxis::Electron,
        VariationAxis::Muon,
        VariationAxis::Jet,
        VariationAxis::Photon,
        VariationAxis::Tau,
    ];

    /// The kind whose container is substituted on this axis.
    ///
    /// `None` for the nominal axis.
    pub fn kind(&self) -> Option<Kind> {
        match self {
            Self::Nominal => None,
            Self::Electron => Some(Kind::Electron),
            Self::Muon => Some(Kind::Muon),
            Self::Jet => Some(Kind::Jet),
            Self::Photon => Some(Kind::Photon),
            Self::Tau => Some(Kind::Tau),
        }
    }
}

impl fmt::Display for VariationAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nominal => write!(f, "nominal"),
            Self::Electron => write!(f, "electron"),
            Self::Muon => write!(f, "muon"),
            Self::Jet => write!(f, "jet"),
            Self::Photon => write!(f, "photon"),
            Self::Tau => write!(f, "tau"),
        }
    }
}

/// A fixed-size table holding one value per [`Kind`].
///
/// Indexing is total: every kind always has an entry. Used for per-kind
/// configuration, counters, and resolved histogram bins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KindMap<T> {
    entries: [T; 5],
}

impl<T> KindMap<T> {
    /// Build a table by evaluating `f` for every kind.
    pub fn from_fn(mut f: impl FnMut(Kind) -> T) -> Self {
        Self {
            entries: Kind::ALL.map(&mut f),
        }
    }

    /// Borrow the entry for a kind.
    pub fn get(&self, kind: Kind) -> &T {
        &self.entries[kind.index()]
    }

    /// Mutably borrow the entry for a kind.
    pub fn get_mut(&mut self, kind: Kind) -> &mut T {
        &mut self.entries[kind.index()]
    }

    /// Replace the entry for a kind, returning the table.
    pub fn with(mut self, kind: Kind, value: T) -> Self {
        self.entries[kind.index()] = value;
        self
    }

    /// Iterate entries in [`Kind::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Kind, &T)> {
        Kind::ALL.iter().map(move |&k| (k, &self.entries[k.index()]))
    }
}

impl<T> Index<Kind> for KindMap<T> {
    type Output = T;

    fn index(&self, kind: Kind) -> &T {
        self.get(kind)
    }
}

impl<T> IndexMut<Kind> for KindMap<T> {
    fn index_mut(&mut self, kind: Kind) -> &mut T {
        self.get_mut(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!(Kind::from_str("electron"), Some(Kind::Electron));
        assert_eq!(Kind::from_str("JET"), Some(Kind::Jet));
        assert_eq!(Kind::from_str("quark"), None);
    }

    #[test]
    fn test_cutflow_histogram_names() {
        assert_eq!(Kind::Electron.cutflow_histogram(), "cutflow_electrons_1");
        assert_eq!(Kind::Tau.cutflow_histogram(), "cutflow_taus_1");
    }

    #[test]
    fn test_axis_order_starts_nominal() {
        assert_eq!(VariationAxis::ORDER[0], VariationAxis::Nominal);
        assert_eq!(VariationAxis::ORDER.len(), 6);
        assert!(VariationAxis::SYSTEMATICS
            .iter()
            .all(|a| a.kind().is_some()));
    }

    #[test]
    fn test_axis_kind_mapping() {
        assert_eq!(VariationAxis::Nominal.kind(), None);
        assert_eq!(VariationAxis::Jet.kind(), Some(Kind::Jet));
    }

    #[test]
    fn test_kind_map_total() {
        let mut map = KindMap::from_fn(|_| 0u64);
        map[Kind::Muon] = 7;
        assert_eq!(map[Kind::Muon], 7);
        assert_eq!(map[Kind::Jet], 0);
        assert_eq!(map.iter().count(), 5);
    }
}
