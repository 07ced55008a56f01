//! Post-processing effect configuration types.
//!
//! Every effect carries its own `enabled` flag. Effects are off by default;
//! the order they run in is set by `render.effect_order`.

use serde::{Deserialize, Serialize};

/// Identifies one of the screen-space effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Background,
    Bloom,
    Ssao,
    Ssr,
    ToneMapping,
    Vignette,
}

impl EffectKind {
    /// Order used when `render.effect_order` is not set.
    pub const DEFAULT_ORDER: [EffectKind; 6] = [
        EffectKind::Background,
        EffectKind::Ssao,
        EffectKind::Ssr,
        EffectKind::Bloom,
        EffectKind::ToneMapping,
        EffectKind::Vignette,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Background => "background",
            EffectKind::Bloom => "bloom",
            EffectKind::Ssao => "ssao",
            EffectKind::Ssr => "ssr",
            EffectKind::ToneMapping => "tone_mapping",
            EffectKind::Vignette => "vignette",
        }
    }
}

impl std::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Solid color or environment backdrop behind the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub enabled: bool,
    /// Backdrop color as hex string, used when no environment map is set.
    pub color: String,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            color: "#000000".into(),
        }
    }
}

/// Bloom (light bleed) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    pub enabled: bool,
    /// Luminance cutoff for the bright pass (valid range: 0.0-1.0).
    pub threshold: f32,
    /// Bloom brightness multiplier (valid range: 0.0-10.0).
    pub intensity: f32,
    /// Blur tap spacing in texels (valid range: 0.0-10.0).
    pub radius: f32,
    /// Blur taps per direction (valid range: 3-25, odd).
    pub kernel_size: u32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.7,
            intensity: 1.0,
            radius: 2.0,
            kernel_size: 13,
        }
    }
}

/// Screen-space ambient occlusion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsaoConfig {
    pub enabled: bool,
    /// Hemisphere taps per pixel (valid range: 1-64).
    pub kernel_size: u32,
    /// Sampling radius in view-space units (valid range: 0.0-100.0).
    pub radius: f32,
    /// Depth bias against self-occlusion (valid range: 0.0-10.0).
    pub bias: f32,
    /// Occlusion strength (valid range: 0.0-10.0).
    pub intensity: f32,
    /// Occlusion falloff exponent (valid range: 0.0-10.0).
    pub power: f32,
    /// Edge-aware blur taps per side (valid range: 0-8).
    pub blur_size: u32,
    /// Depth difference that still counts as the same surface when blurring.
    pub depth_range: f32,
}

impl Default for SsaoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kernel_size: 32,
            radius: 10.0,
            bias: 0.2,
            intensity: 1.0,
            power: 1.0,
            blur_size: 2,
            depth_range: 1.0,
        }
    }
}

/// Screen-space reflection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsrConfig {
    pub enabled: bool,
    /// Maximum ray length in view-space units.
    pub max_ray_distance: f32,
    /// View depth at which the march stride reaches its maximum.
    pub pixel_stride_z_cutoff: f32,
    /// Thickness assumed for every depth sample.
    pub z_thickness_threshold: f32,
    /// Edge-aware blur taps per side (valid range: 0-8).
    pub blur_size: u32,
}

impl Default for SsrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_ray_distance: 200.0,
            pixel_stride_z_cutoff: 50.0,
            z_thickness_threshold: 1.0,
            blur_size: 2,
        }
    }
}

/// Tone curve applied after the color adjustments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneCurve {
    #[default]
    Linear,
    Reinhard,
    Filmic,
}

/// Tone mapping and color grading settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneMappingConfig {
    pub enabled: bool,
    pub curve: ToneCurve,
    /// Exposure in stops (valid range: -10.0-10.0).
    pub exposure: f32,
    /// Additive brightness (valid range: -1.0-1.0).
    pub brightness: f32,
    /// Contrast multiplier (valid range: 0.0-4.0).
    pub contrast: f32,
    /// Saturation multiplier (valid range: 0.0-4.0).
    pub saturation: f32,
}

impl Default for ToneMappingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            curve: ToneCurve::Linear,
            exposure: 0.0,
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
        }
    }
}

/// Screen-edge darkening settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VignetteConfig {
    pub enabled: bool,
    /// Radial scale of the falloff (valid range: 0.0-4.0).
    pub offset: f32,
    /// Darkening strength (valid range: 0.0-1.0).
    pub darkness: f32,
}

impl Default for VignetteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            offset: 1.0,
            darkness: 1.0,
        }
    }
}

/// All effect sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub background: BackgroundConfig,
    pub bloom: BloomConfig,
    pub ssao: SsaoConfig,
    pub ssr: SsrConfig,
    pub tone_mapping: ToneMappingConfig,
    pub vignette: VignetteConfig,
}

impl EffectsConfig {
    /// Whether the effect of the given kind is switched on.
    pub fn is_enabled(&self, kind: EffectKind) -> bool {
        match kind {
            EffectKind::Background => self.background.enabled,
            EffectKind::Bloom => self.bloom.enabled,
            EffectKind::Ssao => self.ssao.enabled,
            EffectKind::Ssr => self.ssr.enabled,
            EffectKind::ToneMapping => self.tone_mapping.enabled,
            EffectKind::Vignette => self.vignette.enabled,
        }
    }

    pub fn set_enabled(&mut self, kind: EffectKind, enabled: bool) {
        match kind {
            EffectKind::Background => self.background.enabled = enabled,
            EffectKind::Bloom => self.bloom.enabled = enabled,
            EffectKind::Ssao => self.ssao.enabled = enabled,
            EffectKind::Ssr => self.ssr.enabled = enabled,
            EffectKind::ToneMapping => self.tone_mapping.enabled = enabled,
            EffectKind::Vignette => self.vignette.enabled = enabled,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_effects_disabled_by_default() {
        let config = EffectsConfig::default();
        for kind in EffectKind::DEFAULT_ORDER {
            assert!(!config.is_enabled(kind), "{kind} should default to off");
        }
    }

    #[test]
    fn ssao_defaults() {
        let c = SsaoConfig::default();
        assert_eq!(c.kernel_size, 32);
        assert!((c.radius - 10.0).abs() < f32::EPSILON);
        assert!((c.bias - 0.2).abs() < f32::EPSILON);
        assert_eq!(c.blur_size, 2);
    }

    #[test]
    fn ssr_defaults() {
        let c = SsrConfig::default();
        assert!((c.max_ray_distance - 200.0).abs() < f32::EPSILON);
        assert!((c.pixel_stride_z_cutoff - 50.0).abs() < f32::EPSILON);
        assert!((c.z_thickness_threshold - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn set_enabled_round_trips_every_kind() {
        let mut config = EffectsConfig::default();
        for kind in EffectKind::DEFAULT_ORDER {
            config.set_enabled(kind, true);
            assert!(config.is_enabled(kind));
        }
    }

    #[test]
    fn tone_curve_parses_lowercase() {
        let config: ToneMappingConfig = toml::from_str("curve = \"filmic\"").unwrap();
        assert_eq!(config.curve, ToneCurve::Filmic);
    }

    #[test]
    fn effect_kind_display_matches_serde_name() {
        assert_eq!(EffectKind::ToneMapping.to_string(), "tone_mapping");
        let json = serde_json::to_string(&EffectKind::ToneMapping).unwrap();
        assert_eq!(json, "\"tone_mapping\"");
    }
}
