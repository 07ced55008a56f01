//! Hemisphere-kernel ambient occlusion from the auxiliary geometry buffer.

use std::any::Any;

use afterglow_config::schema::{EffectKind, EffectsConfig, SsaoConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{draw, CacheState, Effect, EffectContext};
use crate::camera::Camera;
use crate::gpu::uniforms::{texel_and_size, BlendUniforms, EdgeBlurUniforms};
use crate::gpu::{GpuBackend, PhysicalSize, Program, Result, TargetDescriptor};
use crate::math::Mat4;
use crate::target::{RenderTarget, TargetSet};

pub const MAX_KERNEL_SIZE: usize = 64;

const OCCLUSION: usize = 0;
const BLUR: usize = 1;

/// `SsaoUniforms` in `ssao.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct SsaoUniforms {
    projection: Mat4,
    inverse_projection: Mat4,
    kernel: [[f32; 4]; MAX_KERNEL_SIZE],
    /// x = radius, y = bias, z = intensity, w = power.
    params: [f32; 4],
    /// x = kernel size, y = depth range, z = rotation seed.
    extra: [f32; 4],
    texel: [f32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsaoSettings {
    pub kernel_size: u32,
    pub radius: f32,
    pub bias: f32,
    pub intensity: f32,
    pub power: f32,
    pub blur_size: u32,
    pub depth_range: f32,
}

impl From<&SsaoConfig> for SsaoSettings {
    fn from(config: &SsaoConfig) -> Self {
        Self {
            kernel_size: config.kernel_size.clamp(1, MAX_KERNEL_SIZE as u32),
            radius: config.radius,
            bias: config.bias,
            intensity: config.intensity,
            power: config.power,
            blur_size: config.blur_size,
            depth_range: config.depth_range,
        }
    }
}

/// Hemisphere samples around +Z for one frame. Deterministic per
/// `frame_index`, so each temporal sample sees a different rotation and a
/// repeated frame index sees the same one. Samples cluster towards the origin.
pub fn hemisphere_kernel(size: u32, frame_index: u32) -> Vec<[f32; 4]> {
    let mut rng = StdRng::seed_from_u64(u64::from(frame_index));
    let size = size.clamp(1, MAX_KERNEL_SIZE as u32);
    (0..size)
        .map(|i| {
            let mut v = [
                rng.gen_range(-1.0f32..1.0),
                rng.gen_range(-1.0f32..1.0),
                rng.gen_range(0.0f32..1.0),
            ];
            let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt().max(1e-4);
            let t = i as f32 / size as f32;
            let scale = (0.1 + 0.9 * t * t) * rng.gen_range(0.0f32..1.0) / len;
            v.iter_mut().for_each(|c| *c *= scale);
            [v[0], v[1], v[2], 0.0]
        })
        .collect()
}

pub struct Ssao {
    enabled: bool,
    settings: SsaoSettings,
    scratch: TargetSet,
    /// Keyed by temporal frame index: each sample uses its own kernel.
    cache: CacheState<u32>,
}

impl Ssao {
    pub fn new(
        backend: &mut dyn GpuBackend,
        size: PhysicalSize,
        config: &SsaoConfig,
    ) -> Result<Self> {
        let scratch = TargetSet::allocate(
            backend,
            vec![
                TargetDescriptor::color("ssao", size),
                TargetDescriptor::color("ssao blur", size),
            ],
        )?;
        Ok(Self {
            enabled: config.enabled,
            settings: config.into(),
            scratch,
            cache: CacheState::Dirty,
        })
    }

    pub fn settings(&self) -> SsaoSettings {
        self.settings
    }

    fn occlusion(
        &mut self,
        ctx: &mut EffectContext<'_>,
        camera: &Camera,
        size: PhysicalSize,
    ) -> Result<()> {
        let gbuffer = ctx.require_gbuffer(EffectKind::Ssao)?;
        let normals = gbuffer.normals()?;
        let depth = gbuffer.depth()?;
        let s = self.settings;

        let mut kernel = [[0.0f32; 4]; MAX_KERNEL_SIZE];
        for (slot, sample) in kernel
            .iter_mut()
            .zip(hemisphere_kernel(s.kernel_size, ctx.frame_index))
        {
            *slot = sample;
        }
        let uniforms = SsaoUniforms {
            projection: camera.projection,
            inverse_projection: camera.inverse_projection(),
            kernel,
            params: [s.radius, s.bias, s.intensity, s.power],
            extra: [
                s.kernel_size as f32,
                s.depth_range,
                ctx.frame_index as f32,
                0.0,
            ],
            texel: texel_and_size(size),
        };
        draw(
            ctx.backend,
            "ssao",
            Program::Ssao,
            &[normals, depth],
            bytemuck::bytes_of(&uniforms),
            self.scratch.at_mut(OCCLUSION)?,
        )?;

        let blur = EdgeBlurUniforms::new(size, s.blur_size as f32, 1.0 / s.depth_range.max(1e-3));
        let bytes = bytemuck::bytes_of(&blur);
        let (ao, tmp) = self.scratch.pair_mut(OCCLUSION, BLUR)?;
        draw(
            ctx.backend,
            "ssao blur h",
            Program::EdgeAwareBlurH,
            &[ao.texture()?, normals, depth],
            bytes,
            tmp,
        )?;
        let (tmp, ao) = self.scratch.pair_mut(BLUR, OCCLUSION)?;
        draw(
            ctx.backend,
            "ssao blur v",
            Program::EdgeAwareBlurV,
            &[tmp.texture()?, normals, depth],
            bytes,
            ao,
        )
    }
}

impl Effect for Ssao {
    fn kind(&self) -> EffectKind {
        EffectKind::Ssao
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
            self.occlusion(ctx, camera, input.size())?;
            self.cache.validate(ctx.frame_index);
        }

        let uniforms = BlendUniforms::strength(1.0);
        let ao = self.scratch.at(OCCLUSION)?.texture()?;
        draw(
            ctx.backend,
            "ssao multiply",
            Program::MultiplyBlend,
            &[input.texture()?, ao],
            bytemuck::bytes_of(&uniforms),
            output,
        )
    }

    fn mark_dirty(&mut self) {
        self.cache.invalidate();
    }

    fn configure(&mut self, config: &EffectsConfig) {
        self.enabled = config.ssao.enabled;
        self.settings = (&config.ssao).into();
        self.mark_dirty();
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
