//! Render, effect order and temporal validation.

use std::collections::HashSet;

use super::helpers::{validate_hex_color, validate_range};
use crate::schema::{AfterglowConfig, EffectKind};

pub(super) fn validate_render(errors: &mut Vec<String>, config: &AfterglowConfig) {
    let samples = config.render.msaa_samples;
    if !matches!(samples, 1 | 2 | 4 | 8) {
        errors.push(format!("render.msaa_samples = {samples} must be one of 1, 2, 4, 8"));
    }
    validate_hex_color(errors, "render.clear_color", &config.render.clear_color);
}

/// No duplicates, and the background (which ignores what lies beneath it)
/// must run before anything that blends with it.
pub(super) fn validate_effect_order(errors: &mut Vec<String>, config: &AfterglowConfig) {
    let order = &config.render.effect_order;

    let mut seen = HashSet::new();
    for kind in order {
        if !seen.insert(*kind) {
            errors.push(format!("render.effect_order lists {kind} more than once"));
        }
    }

    if let Some(pos) = order.iter().position(|k| *k == EffectKind::Background) {
        if pos != 0 {
            errors.push("render.effect_order must start with background when it is listed".into());
        }
    }
}

pub(super) fn validate_temporal(errors: &mut Vec<String>, config: &AfterglowConfig) {
    validate_range(errors, "temporal.budget", config.temporal.budget, 1, 256);
}
