//! Systematic variation names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The name of one systematic shift along an axis.
///
/// The empty string is the distinguished nominal name: it denotes the
/// central value and is appended to container base names unchanged, so
/// nominal output keys equal the configured base names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariationName(String);

impl VariationName {
    /// Create a variation name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The distinguished empty name for the nominal/central value.
    pub fn nominal() -> Self {
        Self(String::new())
    }

    /// Whether this is the nominal (empty) name.
    pub fn is_nominal(&self) -> bool {
        self.0.is_empty()
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nominal() {
            write!(f, "<nominal>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for VariationName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for VariationName {
    fn from(s: String) -> Self {
        Self(s)
    }
}
