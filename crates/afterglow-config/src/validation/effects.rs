//! Per-effect parameter validation.

use super::helpers::{validate_hex_color, validate_range, validate_range_f32};
use crate::schema::AfterglowConfig;

pub(super) fn validate_background(errors: &mut Vec<String>, config: &AfterglowConfig) {
    validate_hex_color(
        errors,
        "effects.background.color",
        &config.effects.background.color,
    );
}

pub(super) fn validate_bloom(errors: &mut Vec<String>, config: &AfterglowConfig) {
    let b = &config.effects.bloom;
    validate_range_f32(errors, "effects.bloom.threshold", b.threshold, 0.0, 1.0);
    validate_range_f32(errors, "effects.bloom.intensity", b.intensity, 0.0, 10.0);
    validate_range_f32(errors, "effects.bloom.radius", b.radius, 0.0, 10.0);
    validate_range(errors, "effects.bloom.kernel_size", b.kernel_size, 3, 25);
    if b.kernel_size % 2 == 0 {
        errors.push(format!("effects.bloom.kernel_size = {} must be odd", b.kernel_size));
    }
}

pub(super) fn validate_ssao(errors: &mut Vec<String>, config: &AfterglowConfig) {
    let s = &config.effects.ssao;
    validate_range(errors, "effects.ssao.kernel_size", s.kernel_size, 1, 64);
    validate_range_f32(errors, "effects.ssao.radius", s.radius, 0.0, 100.0);
    validate_range_f32(errors, "effects.ssao.bias", s.bias, 0.0, 10.0);
    validate_range_f32(errors, "effects.ssao.intensity", s.intensity, 0.0, 10.0);
    validate_range_f32(errors, "effects.ssao.power", s.power, 0.0, 10.0);
    validate_range(errors, "effects.ssao.blur_size", s.blur_size, 0, 8);
    validate_range_f32(
        errors,
        "effects.ssao.depth_range",
        s.depth_range,
        0.0,
        100.0,
    );
}

pub(super) fn validate_ssr(errors: &mut Vec<String>, config: &AfterglowConfig) {
    let s = &config.effects.ssr;
    validate_range_f32(
        errors,
        "effects.ssr.max_ray_distance",
        s.max_ray_distance,
        0.0,
        10_000.0,
    );
    validate_range_f32(
        errors,
        "effects.ssr.pixel_stride_z_cutoff",
        s.pixel_stride_z_cutoff,
        0.0,
        10_000.0,
    );
    validate_range_f32(
        errors,
        "effects.ssr.z_thickness_threshold",
        s.z_thickness_threshold,
        0.0,
        100.0,
    );
    validate_range(errors, "effects.ssr.blur_size", s.blur_size, 0, 8);
}

pub(super) fn validate_tone_mapping(errors: &mut Vec<String>, config: &AfterglowConfig) {
    let t = &config.effects.tone_mapping;
    validate_range_f32(
        errors,
        "effects.tone_mapping.exposure",
        t.exposure,
        -10.0,
        10.0,
    );
    validate_range_f32(
        errors,
        "effects.tone_mapping.brightness",
        t.brightness,
        -1.0,
        1.0,
    );
    validate_range_f32(
        errors,
        "effects.tone_mapping.contrast",
        t.contrast,
        0.0,
        4.0,
    );
    validate_range_f32(
        errors,
        "effects.tone_mapping.saturation",
        t.saturation,
        0.0,
        4.0,
    );
}

pub(super) fn validate_vignette(errors: &mut Vec<String>, config: &AfterglowConfig) {
    let v = &config.effects.vignette;
    validate_range_f32(errors, "effects.vignette.offset", v.offset, 0.0, 4.0);
    validate_range_f32(errors, "effects.vignette.darkness", v.darkness, 0.0, 1.0);
}
