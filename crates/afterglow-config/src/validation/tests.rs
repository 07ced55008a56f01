//! Tests for the full validation pipeline.

use super::*;
use crate::schema::*;

#[test]
fn default_config_validates() {
    let config = AfterglowConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_budget_zero() {
    let mut config = AfterglowConfig::default();
    config.temporal.budget = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("temporal.budget"));
}

#[test]
fn catches_unsupported_msaa_count() {
    let mut config = AfterglowConfig::default();
    config.render.msaa_samples = 3;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("render.msaa_samples"));
}

#[test]
fn catches_bad_clear_color() {
    let mut config = AfterglowConfig::default();
    config.render.clear_color = "grey".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("render.clear_color"));
}

#[test]
fn catches_duplicate_effect_in_order() {
    let mut config = AfterglowConfig::default();
    config.render.effect_order = vec![EffectKind::Bloom, EffectKind::Vignette, EffectKind::Bloom];
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("bloom more than once"));
}

#[test]
fn catches_background_not_first() {
    let mut config = AfterglowConfig::default();
    config.render.effect_order = vec![EffectKind::Bloom, EffectKind::Background];
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("must start with background"));
}

#[test]
fn order_without_background_is_fine() {
    let mut config = AfterglowConfig::default();
    config.render.effect_order = vec![EffectKind::Vignette, EffectKind::Bloom];
    assert!(validate(&config).is_ok());
}

#[test]
fn empty_order_is_fine() {
    let mut config = AfterglowConfig::default();
    config.render.effect_order.clear();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_even_bloom_kernel() {
    let mut config = AfterglowConfig::default();
    config.effects.bloom.kernel_size = 12;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("effects.bloom.kernel_size = 12 must be odd"));
}

#[test]
fn catches_ssao_kernel_too_large() {
    let mut config = AfterglowConfig::default();
    config.effects.ssao.kernel_size = 65;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("effects.ssao.kernel_size"));
}

#[test]
fn catches_nan_parameters() {
    let mut config = AfterglowConfig::default();
    config.effects.tone_mapping.exposure = f32::NAN;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("effects.tone_mapping.exposure"));
}

#[test]
fn collects_multiple_errors() {
    let mut config = AfterglowConfig::default();
    config.temporal.budget = 0;
    config.effects.vignette.darkness = 2.0;
    config.effects.bloom.threshold = -1.0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("temporal.budget"));
    assert!(err.contains("effects.vignette.darkness"));
    assert!(err.contains("effects.bloom.threshold"));
}

#[test]
fn error_is_validation_error_variant() {
    let mut config = AfterglowConfig::default();
    config.effects.background.color = "#12".into();
    let err = validate(&config).unwrap_err();
    assert!(matches!(err, afterglow_common::ConfigError::ValidationError(_)));
}
