//! Run configuration for the overlap resolver.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::types::{Kind, KindMap};

/// Configuration for one overlap-resolution run.
///
/// A kind is *active* when its input container name is non-empty. Jets are
/// mandatory: a configuration without a jet input name fails validation
/// before any event is processed.
///
/// ## Naming conventions
///
/// - Input containers are fetched under `input_names[kind] + variation`
///   (the nominal variation name is empty, so nominal keys equal the base
///   names).
/// - Subset views are recorded under `output_names[kind] + variation`.
/// - The list of processed variation names is recorded under
///   `registry_key` once per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Per-kind input container base names. Empty means inactive.
    pub input_names: KindMap<String>,
    /// Per-kind output base names for recorded subset views.
    pub output_names: KindMap<String>,
    /// Per-kind name of the upstream algorithm supplying that kind's
    /// variation list. Empty means no systematics axis for that kind.
    pub variation_sources: KindMap<String>,
    /// Store key under which the output-name registry is recorded.
    pub registry_key: String,
    /// Label of the b-tag working point decorated upstream.
    pub b_tag_label: String,
    /// Only objects carrying `selected == true` are eligible for removal.
    pub selected_only: bool,
    /// Decorate removed objects with a link to their overlap partner.
    pub cross_link_overlaps: bool,
    /// Build and record a subset view per active kind and pass.
    pub create_subset_views: bool,
    /// Accumulate per-kind cutflow counts from the survive flags.
    pub cutflow_enabled: bool,
}

impl RunConfig {
    /// Whether a kind participates in overlap removal.
    pub fn is_active(&self, kind: Kind) -> bool {
        !self.input_names[kind].is_empty()
    }

    /// Whether a kind's systematics axis has a variation source configured.
    pub fn has_variation_source(&self, kind: Kind) -> bool {
        !self.variation_sources[kind].is_empty()
    }

    /// Validate the configuration at setup time.
    ///
    /// Runs before any event is processed; a failure here aborts the run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_names[Kind::Jet].is_empty() {
            return Err(ConfigError::JetInputMissing);
        }
        if self.registry_key.is_empty() {
            return Err(ConfigError::RegistryKeyEmpty);
        }
        if self.create_subset_views {
            for (kind, name) in self.output_names.iter() {
                if self.is_active(kind) && name.is_empty() {
                    return Err(ConfigError::OutputNameMissing { kind });
                }
            }
        }
        Ok(())
    }

    /// Canonical fingerprint of the configuration parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_names: KindMap::default().with(Kind::Jet, "Jets".to_string()),
            output_names: KindMap::default().with(Kind::Jet, "JetsOR".to_string()),
            variation_sources: KindMap::default(),
            registry_key: "overlap_variations".to_string(),
            b_tag_label: String::new(),
            selected_only: false,
            cross_link_overlaps: false,
            create_subset_views: true,
            cutflow_enabled: false,
        }
    }
}

/// Error raised by configuration validation at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The mandatory jet input container name is empty.
    #[error("jet input container name is empty; overlap removal requires jets")]
    JetInputMissing,
    /// The output registry key is empty.
    #[error("output registry key is empty")]
    RegistryKeyEmpty,
    /// An active kind has no output name while subset creation is enabled.
    #[error("active kind {kind} has no output container name")]
    OutputNameMissing {
        /// The kind missing an output name.
        kind: Kind,
    },
    /// Cutflow accumulation was requested without a histogram registry.
    #[error("cutflow enabled but no histogram registry was provided")]
    CutflowWithoutHistograms,
}
