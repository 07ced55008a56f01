//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use crate::schema::{AfterglowConfig, EffectKind, FinalFilter};
use afterglow_common::ConfigError;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_afterglow_config.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r##"
[render]
final_filter = "fxaa"
effect_order = ["bloom", "vignette"]

[effects.vignette]
enabled = true
darkness = 0.5
"##,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.render.final_filter, FinalFilter::Fxaa);
    assert_eq!(
        config.render.effect_order,
        vec![EffectKind::Bloom, EffectKind::Vignette]
    );
    assert!(config.effects.vignette.enabled);
    assert!((config.effects.vignette.darkness - 0.5).abs() < f32::EPSILON);
    // Defaults preserved
    assert_eq!(config.render.msaa_samples, 4);
    assert_eq!(config.temporal.budget, 30);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let result = load_from_path(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn load_with_invalid_values_still_returns_parsed_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[temporal]\nbudget = 9000\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.temporal.budget, 9000);
}

#[test]
fn create_default_config_writes_loadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config, AfterglowConfig::default());
}

#[test]
fn default_template_mentions_every_section() {
    let content = super::template::default_config_toml();
    for section in [
        "[render]",
        "[temporal]",
        "[effects.background]",
        "[effects.bloom]",
        "[effects.ssao]",
        "[effects.ssr]",
        "[effects.tone_mapping]",
        "[effects.vignette]",
        "[logging]",
    ] {
        assert!(content.contains(section), "template missing {section}");
    }
}

#[test]
fn default_config_path_ends_with_afterglow_config() {
    if let Ok(path) = default_config_path() {
        assert!(path.ends_with("afterglow/config.toml"));
    }
}
