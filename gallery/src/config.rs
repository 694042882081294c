use serde::{Deserialize, Serialize};

use crate::error::{GalleryError, Result};

/// Cosine distance at or below which a probe matches an enrolled record.
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// Identity used for path-derived enrollment when derivation fails and
/// [`Config::unknown_fallback`] is enabled.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Controls gallery behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Embedding dimension produced by the extractor (e.g. 512).
    pub dim: usize,

    /// Maximum cosine distance for a match.
    /// Lower = stricter (more no-matches), higher = more lenient.
    /// Default: 0.6.
    #[serde(default)]
    pub threshold: f32,

    /// Enroll under `"unknown"` when an identity cannot be derived from
    /// source paths, instead of rejecting the batch. Off by default.
    #[serde(default)]
    pub unknown_fallback: bool,
}

impl Config {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            threshold: DEFAULT_THRESHOLD,
            unknown_fallback: false,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_unknown_fallback(mut self, enabled: bool) -> Self {
        self.unknown_fallback = enabled;
        self
    }

    /// Fills zero values with defaults and validates the result.
    pub fn with_defaults(mut self) -> Result<Self> {
        if self.threshold == 0.0 {
            self.threshold = DEFAULT_THRESHOLD;
        }
        if self.dim == 0 {
            return Err(GalleryError::invalid("dim must be positive"));
        }
        check_threshold(self.threshold)?;
        Ok(self)
    }
}

pub(crate) fn check_threshold(threshold: f32) -> Result<()> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(GalleryError::invalid(format!(
            "threshold must be a non-negative number, got {threshold}"
        )));
    }
    Ok(())
}
