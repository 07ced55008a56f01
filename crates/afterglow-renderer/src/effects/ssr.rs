//! Screen-space reflections: march the reflected view ray through the
//! auxiliary depth, blur the hits edge-aware, add them onto the input.

use std::any::Any;

use afterglow_config::schema::{EffectKind, EffectsConfig, SsrConfig};

use super::{draw, CacheState, Effect, EffectContext};
use crate::camera::Camera;
use crate::gpu::uniforms::{texel_and_size, BlendUniforms, EdgeBlurUniforms};
use crate::gpu::{GpuBackend, PhysicalSize, Program, Result, TargetDescriptor};
use crate::math::Mat4;
use crate::target::{RenderTarget, TargetSet};

const MARCH_STEPS: f32 = 64.0;

const REFLECTION: usize = 0;
const BLUR: usize = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct SsrUniforms {
    projection: Mat4,
    inverse_projection: Mat4,
    /// x = max ray distance, y = z cutoff, z = thickness, w = steps.
    params: [f32; 4],
    texel: [f32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsrSettings {
    pub max_ray_distance: f32,
    pub pixel_stride_z_cutoff: f32,
    pub z_thickness_threshold: f32,
    pub blur_size: u32,
}

impl From<&SsrConfig> for SsrSettings {
    fn from(config: &SsrConfig) -> Self {
        Self {
            max_ray_distance: config.max_ray_distance.max(f32::EPSILON),
            pixel_stride_z_cutoff: config.pixel_stride_z_cutoff,
            z_thickness_threshold: config.z_thickness_threshold,
            blur_size: config.blur_size,
        }
    }
}

pub struct Ssr {
    enabled: bool,
    settings: SsrSettings,
    scratch: TargetSet,
    cache: CacheState<u32>,
}

impl Ssr {
    pub fn new(
        backend: &mut dyn GpuBackend,
        size: PhysicalSize,
        config: &SsrConfig,
    ) -> Result<Self> {
        let scratch = TargetSet::allocate(
            backend,
            vec![
                TargetDescriptor::color("ssr", size),
                TargetDescriptor::color("ssr blur", size),
            ],
        )?;
        Ok(Self {
            enabled: config.enabled,
            settings: config.into(),
            scratch,
            cache: CacheState::Dirty,
        })
    }

    pub fn settings(&self) -> SsrSettings {
        self.settings
    }

    fn reflect(
        &mut self,
        ctx: &mut EffectContext<'_>,
        camera: &Camera,
        input: &RenderTarget,
    ) -> Result<()> {
        let gbuffer = ctx.require_gbuffer(EffectKind::Ssr)?;
        let normals = gbuffer.normals()?;
        let depth = gbuffer.depth()?;
        let s = self.settings;
        let size = input.size();

        let uniforms = SsrUniforms {
            projection: camera.projection,
            inverse_projection: camera.inverse_projection(),
            params: [
                s.max_ray_distance,
                s.pixel_stride_z_cutoff,
                s.z_thickness_threshold,
                MARCH_STEPS,
            ],
            texel: texel_and_size(size),
        };
        draw(
            ctx.backend,
            "ssr",
            Program::Ssr,
            &[input.texture()?, normals, depth],
            bytemuck::bytes_of(&uniforms),
            self.scratch.at_mut(REFLECTION)?,
        )?;

        let blur = EdgeBlurUniforms::new(
            size,
            s.blur_size as f32,
            1.0 / s.z_thickness_threshold.max(1e-3),
        );
        let bytes = bytemuck::bytes_of(&blur);
        let (hits, tmp) = self.scratch.pair_mut(REFLECTION, BLUR)?;
        draw(
            ctx.backend,
            "ssr blur h",
            Program::EdgeAwareBlurH,
            &[hits.texture()?, normals, depth],
            bytes,
            tmp,
        )?;
        let (tmp, hits) = self.scratch.pair_mut(BLUR, REFLECTION)?;
        draw(
            ctx.backend,
            "ssr blur v",
            Program::EdgeAwareBlurV,
            &[tmp.texture()?, normals, depth],
            bytes,
            hits,
        )
    }
}

impl Effect for Ssr {
    fn kind(&self) -> EffectKind {
        EffectKind::Ssr
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn requires_auxiliary_buffer(&self) -> bool {
        true
    }

    fn varies_per_sample(&self) -> bool {
        true
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
        camera: &Camera,
        input: &RenderTarget,
        output: &mut RenderTarget,
    ) -> Result<()> {
        if !self.cache.is_valid_for(&ctx.frame_index) {
            self.reflect(ctx, camera, input)?;
            self.cache.validate(ctx.frame_index);
        }

        let uniforms = BlendUniforms::strength(1.0);
        let hits = self.scratch.at(REFLECTION)?.texture()?;
        draw(
            ctx.backend,
            "ssr additive",
            Program::AdditiveBlend,
            &[input.texture()?, hits],
            bytemuck::bytes_of(&uniforms),
            output,
        )
    }

    fn mark_dirty(&mut self) {
        self.cache.invalidate();
    }

    fn configure(&mut self, config: &EffectsConfig) {
        self.enabled = config.ssr.enabled;
        self.settings = (&config.ssr).into();
        self.mark_dirty();
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{ctx, gbuffer, io, run_once, SIZE};
    use super::*;
    use crate::gpu::{RecordingBackend, RendererError};

    fn ssr(backend: &mut RecordingBackend) -> Ssr {
        Ssr::new(backend, SIZE, &SsrConfig::default()).unwrap()
    }

    #[test]
    fn defaults() {
        let s = SsrSettings::from(&SsrConfig::default());
        assert!((s.max_ray_distance - 200.0).abs() < f32::EPSILON);
        assert!((s.pixel_stride_z_cutoff - 50.0).abs() < f32::EPSILON);
        assert!((s.z_thickness_threshold - 1.0).abs() < f32::EPSILON);
        assert_eq!(s.blur_size, 2);
    }

    #[test]
    fn uniforms_match_shader_block() {
        assert_eq!(std::mem::size_of::<SsrUniforms>(), 64 + 64 + 16 + 16);
    }

    #[test]
    fn fails_without_geometry_buffer() {
        let mut backend = RecordingBackend::new();
        let (input, mut output) = io(&mut backend);
        let mut effect = ssr(&mut backend);
        let camera = Camera::default();
        let mut context = ctx(&mut backend, None, 0);
        let err = effect
            .apply(&mut context, &camera, &input, &mut output)
            .unwrap_err();
        assert!(matches!(err, RendererError::Configuration(_)));
    }

    #[test]
    fn adds_blurred_reflections_onto_input() {
        let mut backend = RecordingBackend::new();
        let (input, mut output) = io(&mut backend);
        let gbuffer = gbuffer(&mut backend);
        let mut effect = ssr(&mut backend);
        let aux = Some(&gbuffer);
        run_once(&mut effect, &mut backend, aux, 0, &input, &mut output);
        let hits = "edge_blur_h(ssr(clear,normals,depth),normals,depth)";
        let expected = format!("additive(clear,edge_blur_v({hits},normals,depth))");
        assert_eq!(
            backend.content(output.texture().unwrap()),
            Some(expected.as_str())
        );
    }

    #[test]
    fn dirty_forces_recompute_at_same_frame() {
        let mut backend = RecordingBackend::new();
        let (input, mut output) = io(&mut backend);
        let gbuffer = gbuffer(&mut backend);
        let mut effect = ssr(&mut backend);
        let aux = Some(&gbuffer);

        run_once(&mut effect, &mut backend, aux, 2, &input, &mut output);
        backend.begin_frame().unwrap();
        run_once(&mut effect, &mut backend, aux, 2, &input, &mut output);
        assert_eq!(backend.frame_counts().offscreen_passes, 1);

        effect.mark_dirty();
        backend.begin_frame().unwrap();
        run_once(&mut effect, &mut backend, aux, 2, &input, &mut output);
        assert_eq!(backend.frame_counts().offscreen_passes, 4);
    }
}
