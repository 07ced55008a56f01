//! Temporal supersampling settings.

use serde::{Deserialize, Serialize};

/// Temporal accumulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Accumulate jittered samples while the image is static.
    pub enabled: bool,
    /// Samples per convergence (valid range: 1-256).
    pub budget: u32,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            budget: 30,
        }
    }
}
