//! Full configuration validation.
//!
//! Checks numeric ranges, color formats, and the effect order. Each domain
//! has its own submodule; `validate` calls them all and collects every
//! problem into a single `ConfigError`.

mod effects;
mod helpers;
mod render;

#[cfg(test)]
mod tests;

use crate::schema::AfterglowConfig;
use afterglow_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &AfterglowConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    render::validate_render(&mut errors, config);
    render::validate_effect_order(&mut errors, config);
    render::validate_temporal(&mut errors, config);
    effects::validate_background(&mut errors, config);
    effects::validate_bloom(&mut errors, config);
    effects::validate_ssao(&mut errors, config);
    effects::validate_ssr(&mut errors, config);
    effects::validate_tone_mapping(&mut errors, config);
    effects::validate_vignette(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
