//! Threshold, separable blur, additive composite.

use std::any::Any;

use afterglow_config::schema::{BloomConfig, EffectKind, EffectsConfig};

use super::{draw, CacheState, Effect, EffectContext};
use crate::camera::Camera;
use crate::gpu::uniforms::texel;
use crate::gpu::{GpuBackend, PhysicalSize, Program, Result, TargetDescriptor};
use crate::target::{RenderTarget, TargetSet};

const BRIGHT: usize = 0;
const BLUR: usize = 1;

/// `BloomUniforms` in `bloom.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct BloomUniforms {
    /// x = threshold, y = intensity, z = radius, w = kernel size.
    params: [f32; 4],
    /// xy = 1 / resolution.
    texel: [f32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomSettings {
    pub threshold: f32,
    pub intensity: f32,
    pub radius: f32,
    pub kernel_size: u32,
}

impl From<&BloomConfig> for BloomSettings {
    fn from(config: &BloomConfig) -> Self {
        Self {
            threshold: config.threshold,
            intensity: config.intensity,
            radius: config.radius,
            // The blur shader walks kernel_size / 2 taps either side.
            kernel_size: config.kernel_size.clamp(3, 25) | 1,
        }
    }
}

pub struct Bloom {
    enabled: bool,
    settings: BloomSettings,
    scratch: TargetSet,
    /// Keyed by frame index only when something upstream varies per sample.
    cache: CacheState<Option<u32>>,
}

impl Bloom {
    pub fn new(
        backend: &mut dyn GpuBackend,
        size: PhysicalSize,
        config: &BloomConfig,
    ) -> Result<Self> {
        let scratch = TargetSet::allocate(
            backend,
            vec![
                TargetDescriptor::color("bloom bright", size),
                TargetDescriptor::color("bloom blur", size),
            ],
        )?;
        Ok(Self {
            enabled: config.enabled,
            settings: config.into(),
            scratch,
            cache: CacheState::Dirty,
        })
    }

    pub fn settings(&self) -> BloomSettings {
        self.settings
    }

    fn uniforms(&self, size: PhysicalSize) -> BloomUniforms {
        let s = self.settings;
        let [tx, ty] = texel(size);
        BloomUniforms {
            params: [s.threshold, s.intensity, s.radius, s.kernel_size as f32],
            texel: [tx, ty, 0.0, 0.0],
        }
    }

    fn extract_and_blur(
        &mut self,
        backend: &mut dyn GpuBackend,
        input: &RenderTarget,
    ) -> Result<()> {
        let uniforms = self.uniforms(input.size());
        let bytes = bytemuck::bytes_of(&uniforms);

        let source = input.texture()?;
        draw(
            backend,
            "bloom threshold",
            Program::LuminosityHighPass,
            &[source],
            bytes,
            self.scratch.at_mut(BRIGHT)?,
        )?;

        let (bright, blur) = self.scratch.pair_mut(BRIGHT, BLUR)?;
        draw(
            backend,
            "bloom blur h",
            Program::GaussianBlurH,
            &[bright.texture()?],
            bytes,
            blur,
        )?;

        let (blur, bright) = self.scratch.pair_mut(BLUR, BRIGHT)?;
        draw(
            backend,
            "bloom blur v",
            Program::GaussianBlurV,
            &[blur.texture()?],
            bytes,
            bright,
        )?;
        Ok(())
    }
}

impl Effect for Bloom {
    fn kind(&self) -> EffectKind {
        EffectKind::Bloom
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn scratch(&self) -> Option<&TargetSet> {
        Some(&self.scratch)
    }

    fn scratch_mut(&mut self) -> Option<&mut TargetSet> {
        Some(&mut self.scratch)
    }

    fn apply(
        &mut self,
        ctx: &mut EffectContext<'_>,
        _camera: &Camera,
        input: &RenderTarget,
        output: &mut RenderTarget,
    ) -> Result<()> {
        let key = ctx.upstream_varies.then_some(ctx.frame_index);
        if !self.cache.is_valid_for(&key) {
            self.extract_and_blur(ctx.backend, input)?;
            self.cache.validate(key);
        }

        let uniforms = self.uniforms(input.size());
        let glow = self.scratch.at(BRIGHT)?.texture()?;
        draw(
            ctx.backend,
            "bloom composite",
            Program::BloomComposite,
            &[input.texture()?, glow],
            bytemuck::bytes_of(&uniforms),
            output,
        )
    }

    fn mark_dirty(&mut self) {
        self.cache.invalidate();
    }

    fn configure(&mut self, config: &EffectsConfig) {
        self.enabled = config.bloom.enabled;
        self.settings = (&config.bloom).into();
        self.mark_dirty();
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::super::test_support::{ctx, io, run_once, SIZE};
    use super::*;
    use crate::gpu::RecordingBackend;

    fn bloom(backend: &mut RecordingBackend) -> Bloom {
        Bloom::new(backend, SIZE, &BloomConfig::default()).unwrap()
    }

    #[test]
    fn uniforms_are_32_bytes() {
        assert_eq!(std::mem::size_of::<BloomUniforms>(), 32);
    }

    #[test]
    fn settings_defaults() {
        let s = BloomSettings::from(&BloomConfig::default());
        assert!((s.threshold - 0.7).abs() < f32::EPSILON);
        assert!((s.intensity - 1.0).abs() < f32::EPSILON);
        assert!((s.radius - 2.0).abs() < f32::EPSILON);
        assert_eq!(s.kernel_size, 13);
    }

    #[test]
    fn even_kernel_rounds_up_to_odd() {
        let config = BloomConfig {
            kernel_size: 8,
            ..BloomConfig::default()
        };
        assert_eq!(BloomSettings::from(&config).kernel_size, 9);
    }

    #[test]
    fn first_apply_runs_all_four_passes() {
        let mut backend = RecordingBackend::new();
        let (input, mut output) = io(&mut backend);
        let mut effect = bloom(&mut backend);
        run_once(&mut effect, &mut backend, None, 0, &input, &mut output);
        assert_eq!(backend.frame_counts().offscreen_passes, 4);
        assert_eq!(
            backend.content(output.texture().unwrap()),
            Some("bloom(clear,blur_v(blur_h(threshold(clear))))")
        );
    }

    #[test]
    fn cached_blur_is_reused_until_dirty() {
        let mut backend = RecordingBackend::new();
        let (input, mut output) = io(&mut backend);
        let mut effect = bloom(&mut backend);

        run_once(&mut effect, &mut backend, None, 0, &input, &mut output);
        backend.begin_frame().unwrap();
        run_once(&mut effect, &mut backend, None, 1, &input, &mut output);
        assert_eq!(backend.frame_counts().offscreen_passes, 1);

        effect.mark_dirty();
        effect.mark_dirty();
        backend.begin_frame().unwrap();
        run_once(&mut effect, &mut backend, None, 1, &input, &mut output);
        assert_eq!(backend.frame_counts().offscreen_passes, 4);
    }

    #[test]
    fn varying_upstream_keys_cache_by_frame() {
        let mut backend = RecordingBackend::new();
        let (input, mut output) = io(&mut backend);
        let mut effect = bloom(&mut backend);
        let camera = Camera::default();

        for frame in 0..2 {
            backend.begin_frame().unwrap();
            let mut context = ctx(&mut backend, None, frame);
            context.upstream_varies = true;
            effect
                .apply(&mut context, &camera, &input, &mut output)
                .unwrap();
            assert_eq!(backend.frame_counts().offscreen_passes, 4);
        }
    }

    #[test]
    fn configure_marks_dirty() {
        let mut backend = RecordingBackend::new();
        let (input, mut output) = io(&mut backend);
        let mut effect = bloom(&mut backend);
        run_once(&mut effect, &mut backend, None, 0, &input, &mut output);

        let mut config = EffectsConfig::default();
        config.bloom.enabled = true;
        config.bloom.threshold = 0.3;
        effect.configure(&config);
        assert!(effect.is_enabled());
        assert!((effect.settings().threshold - 0.3).abs() < f32::EPSILON);

        backend.begin_frame().unwrap();
        run_once(&mut effect, &mut backend, None, 0, &input, &mut output);
        assert_eq!(backend.frame_counts().offscreen_passes, 4);
    }
}
