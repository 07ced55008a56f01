use std::any::Any;

use afterglow_config::schema::{EffectKind, EffectsConfig, ToneCurve, ToneMappingConfig};

use super::{draw, Effect, EffectContext};
use crate::camera::Camera;
use crate::gpu::{Program, Result};
use crate::target::RenderTarget;

/// `GradeUniforms` in `grade.wgsl`, shared with the vignette.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(super) struct GradeUniforms {
    pub params: [f32; 4],
    pub extra: [f32; 4],
}

fn curve_index(curve: ToneCurve) -> f32 {
    match curve {
        ToneCurve::Linear => 0.0,
        ToneCurve::Reinhard => 1.0,
        ToneCurve::Filmic => 2.0,
    }
}

/// Exposure, brightness, contrast and saturation, then a display curve.
/// A pure function of its input, so nothing is cached.
pub struct ToneMapping {
    config: ToneMappingConfig,
}

impl ToneMapping {
    pub fn new(config: &ToneMappingConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn curve(&self) -> ToneCurve {
        self.config.curve
    }

    fn uniforms(&self) -> GradeUniforms {
        let c = &self.config;
        GradeUniforms {
            params: [c.exposure, c.brightness, c.contrast, c.saturation],
            extra: [curve_index(c.curve), 0.0, 0.0, 0.0],
        }
    }
}

impl Effect for ToneMapping {
    fn kind(&self) -> EffectKind {
        EffectKind::ToneMapping
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
        let uniforms = self.uniforms();
        draw(
            ctx.backend,
            "tone mapping",
            Program::ToneMapping,
            &[input.texture()?],
            bytemuck::bytes_of(&uniforms),
            output,
        )
    }

    fn configure(&mut self, config: &EffectsConfig) {
        self.config = config.tone_mapping.clone();
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{io, run_once};
    use super::*;
    use crate::gpu::{GpuBackend, RecordingBackend};

    #[test]
    fn curve_selects_shader_branch() {
        let mut config = ToneMappingConfig::default();
        for (curve, index) in [
            (ToneCurve::Linear, 0.0),
            (ToneCurve::Reinhard, 1.0),
            (ToneCurve::Filmic, 2.0),
        ] {
            config.curve = curve;
            assert_eq!(ToneMapping::new(&config).uniforms().extra[0], index);
        }
    }

    #[test]
    fn always_one_pass() {
        let mut backend = RecordingBackend::new();
        let (input, mut output) = io(&mut backend);
        let mut effect = ToneMapping::new(&ToneMappingConfig::default());
        for frame in 0..3 {
            backend.begin_frame().unwrap();
            run_once(&mut effect, &mut backend, None, frame, &input, &mut output);
            assert_eq!(backend.frame_counts().offscreen_passes, 1);
        }
        assert_eq!(
            backend.content(output.texture().unwrap()),
            Some("tone_mapping(clear)")
        );
    }

    #[test]
    fn configure_replaces_parameters() {
        let mut effect = ToneMapping::new(&ToneMappingConfig::default());
        let mut config = EffectsConfig::default();
        config.tone_mapping.enabled = true;
        config.tone_mapping.curve = ToneCurve::Reinhard;
        config.tone_mapping.exposure = 1.5;
        effect.configure(&config);
        assert!(effect.is_enabled());
        assert_eq!(effect.curve(), ToneCurve::Reinhard);
        assert_eq!(effect.uniforms().params[0], 1.5);
    }
}
