//! Configuration for the validation engine
//!
//! Settings are plain serde-friendly values with sensible defaults, so
//! they can be embedded in a larger application configuration or built
//! programmatically.

use serde::{Deserialize, Serialize};

/// Default bound on comparison depth.
///
/// Redirect chains terminate on finite input, but mixed/object wrappers
/// can still nest them arbitrarily deep; the bound turns a pathological
/// schema into a typed fault instead of a stack overflow.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Settings that control validation behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Maximum depth for recursive comparison
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Case-insensitive substrings marking keys that are unconditionally
    /// ignored in objects (matched keys are reported at info severity)
    #[serde(default = "default_ignored_key_markers")]
    pub ignored_key_markers: Vec<String>,

    /// When set, array templates that matched no input element produce a
    /// warning. Never affects the verdict of the default lenient mode.
    #[serde(default)]
    pub strict_arrays: bool,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_ignored_key_markers() -> Vec<String> {
    vec!["comment".to_string()]
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            ignored_key_markers: default_ignored_key_markers(),
            strict_arrays: false,
        }
    }
}

impl ValidatorConfig {
    /// Create a configuration with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum comparison depth
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Replace the ignored-key markers
    #[must_use]
    pub fn with_ignored_key_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_key_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Enable strict array reporting
    #[must_use]
    pub fn with_strict_arrays(mut self, strict: bool) -> Self {
        self.strict_arrays = strict;
        self
    }

    /// Whether a key is unconditionally ignored under this configuration
    #[must_use]
    pub fn is_ignored_key(&self, key: &str) -> bool {
        let lowered = key.to_lowercase();
        self.ignored_key_markers
            .iter()
            .any(|marker| lowered.contains(&marker.to_lowercase()))
    }
}
