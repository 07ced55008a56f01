use std::any::Any;

use afterglow_config::schema::{EffectKind, EffectsConfig, VignetteConfig};

use super::tone_mapping::GradeUniforms;
use super::{draw, Effect, EffectContext};
use crate::camera::Camera;
use crate::gpu::{Program, Result};
use crate::target::RenderTarget;

/// Radial darkening towards the frame edges.
pub struct Vignette {
    config: VignetteConfig,
}

impl Vignette {
    pub fn new(config: &VignetteConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn offset(&self) -> f32 {
        self.config.offset
    }

    pub fn darkness(&self) -> f32 {
        self.config.darkness
    }
}

impl Effect for Vignette {
    fn kind(&self) -> EffectKind {
        EffectKind::Vignette
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    fn apply(
        &mut self,
        ctx: &mut EffectContext<'_>,
        _camera: &Camera,
        input: &RenderTarget,
        output: &mut RenderTarget,
    ) -> Result<()> {
        let uniforms = GradeUniforms {
            params: [self.config.offset, self.config.darkness, 0.0, 0.0],
            extra: [0.0; 4],
        };
        draw(
            ctx.backend,
            "vignette",
            Program::Vignette,
            &[input.texture()?],
            bytemuck::bytes_of(&uniforms),
            output,
        )
    }

    fn configure(&mut self, config: &EffectsConfig) {
        self.config = config.vignette.clone();
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
