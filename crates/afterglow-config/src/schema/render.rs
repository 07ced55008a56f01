//! Scene pass and presentation settings.

use serde::{Deserialize, Serialize};

use super::EffectKind;

/// Filter used when compositing the final image onto the presentation surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalFilter {
    /// Straight copy.
    #[default]
    Copy,
    /// Fast approximate antialiasing.
    Fxaa,
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Multisample count for the scene pass (1, 2, 4 or 8). Clamped to what
    /// the GPU supports.
    pub msaa_samples: u32,
    /// Scene clear color when no background effect is enabled.
    pub clear_color: String,
    pub final_filter: FinalFilter,
    /// Fixed order of the effect chain. Effects not listed never run.
    pub effect_order: Vec<EffectKind>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            msaa_samples: 4,
            clear_color: "#cccccc".into(),
            final_filter: FinalFilter::Copy,
            effect_order: EffectKind::DEFAULT_ORDER.to_vec(),
        }
    }
}
