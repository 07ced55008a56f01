//! Screen-space effects and the contract the chain drives them through.
//!
//! An effect reads `input`, writes a complete image into `output`, and may
//! keep private scratch targets and a [`CacheState`] for intermediates.
//! Every pass it issues carries its full pipeline state, so nothing leaks
//! from one effect into the next.

mod background;
mod bloom;
mod cache;
mod ssao;
mod ssr;
mod tone_mapping;
mod vignette;

pub use background::Background;
pub use bloom::Bloom;
pub use cache::CacheState;
pub use ssao::Ssao;
pub use ssr::Ssr;
pub use tone_mapping::ToneMapping;
pub use vignette::Vignette;

use std::any::Any;

use afterglow_config::schema::{EffectKind, EffectsConfig};

use crate::camera::Camera;
use crate::gbuffer::AuxiliaryGeometryBuffer;
use crate::gpu::{
    Binding, FullscreenPass, GpuBackend, LoadAction, PassState, PhysicalSize, Program,
    RendererError, Result, Rgba, TextureRef,
};
use crate::target::{RenderTarget, TargetSet};

/// Per-call state lent to an effect. Nothing here outlives `apply`.
pub struct EffectContext<'a> {
    pub backend: &'a mut dyn GpuBackend,
    /// Populated this sample when any enabled effect requires it.
    pub gbuffer: Option<&'a AuxiliaryGeometryBuffer>,
    /// Temporal sample being rendered; 0 when accumulation is off.
    pub frame_index: u32,
    /// Set by the chain when an earlier enabled effect varies per sample.
    pub upstream_varies: bool,
}

impl<'a> EffectContext<'a> {
    fn require_gbuffer(&self, kind: EffectKind) -> Result<&'a AuxiliaryGeometryBuffer> {
        self.gbuffer.ok_or_else(|| {
            RendererError::Configuration(format!("{kind} needs the auxiliary geometry buffer"))
        })
    }
}

pub trait Effect: Any {
    fn kind(&self) -> EffectKind;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Reads normals and depth from the auxiliary geometry buffer.
    fn requires_auxiliary_buffer(&self) -> bool {
        false
    }

    /// Output changes with each jittered temporal sample.
    fn varies_per_sample(&self) -> bool {
        false
    }

    fn scratch(&self) -> Option<&TargetSet> {
        None
    }

    fn scratch_mut(&mut self) -> Option<&mut TargetSet> {
        None
    }

    /// Reallocate scratch targets. Idempotent for equal sizes.
    fn resize(&mut self, backend: &mut dyn GpuBackend, width: u32, height: u32) -> Result<()> {
        let changed = match self.scratch_mut() {
            Some(scratch) => scratch.resize(backend, width, height)?,
            None => false,
        };
        if changed {
            self.mark_dirty();
        }
        Ok(())
    }

    fn apply(
        &mut self,
        ctx: &mut EffectContext<'_>,
        camera: &Camera,
        input: &RenderTarget,
        output: &mut RenderTarget,
    ) -> Result<()>;

    /// Drop cached intermediates so the next `apply` recomputes them.
    fn mark_dirty(&mut self) {}

    /// Take parameters and the enable flag from config. Marks dirty.
    fn configure(&mut self, config: &EffectsConfig);

    fn destroy(&mut self, backend: &mut dyn GpuBackend) {
        if let Some(scratch) = self.scratch_mut() {
            std::mem::take(scratch).destroy(backend);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Create the effect of `kind` with its scratch targets at `size`.
pub fn build(
    kind: EffectKind,
    backend: &mut dyn GpuBackend,
    size: PhysicalSize,
    config: &EffectsConfig,
) -> Result<Box<dyn Effect>> {
    let effect: Box<dyn Effect> = match kind {
        EffectKind::Background => Box::new(Background::new(&config.background)),
        EffectKind::Bloom => Box::new(Bloom::new(backend, size, &config.bloom)?),
        EffectKind::Ssao => Box::new(Ssao::new(backend, size, &config.ssao)?),
        EffectKind::Ssr => Box::new(Ssr::new(backend, size, &config.ssr)?),
        EffectKind::ToneMapping => Box::new(ToneMapping::new(&config.tone_mapping)),
        EffectKind::Vignette => Box::new(Vignette::new(&config.vignette)),
    };
    Ok(effect)
}

/// One full-screen pass into `output` that overwrites every texel.
pub(crate) fn draw(
    backend: &mut dyn GpuBackend,
    label: &'static str,
    program: Program,
    inputs: &[TextureRef],
    uniforms: &[u8],
    output: &mut RenderTarget,
) -> Result<()> {
    let bindings: Vec<Binding> = inputs.iter().copied().map(Binding::Texture).collect();
    backend.draw_fullscreen(&FullscreenPass {
        label,
        program,
        inputs: &bindings,
        uniforms,
        output: output.destination(),
        load: LoadAction::Clear(Rgba::TRANSPARENT),
        state: PassState::REPLACE,
    })?;
    output.mark_written();
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingBackend;

    #[test]
    fn build_creates_every_kind() {
        let mut backend = RecordingBackend::new();
        let config = EffectsConfig::default();
        for kind in EffectKind::DEFAULT_ORDER {
            let effect = build(kind, &mut backend, test_support::SIZE, &config).unwrap();
            assert_eq!(effect.kind(), kind);
            assert!(!effect.is_enabled());
        }
    }

    #[test]
    fn only_screen_space_effects_need_geometry() {
        let mut backend = RecordingBackend::new();
        let config = EffectsConfig::default();
        let needs: Vec<EffectKind> = EffectKind::DEFAULT_ORDER
            .into_iter()
            .filter(|&k| {
                build(k, &mut backend, test_support::SIZE, &config)
                    .unwrap()
                    .requires_auxiliary_buffer()
            })
            .collect();
        assert_eq!(needs, vec![EffectKind::Ssao, EffectKind::Ssr]);
    }

    #[test]
    fn destroy_releases_scratch() {
        let mut backend = RecordingBackend::new();
        let mut bloom = build(
            EffectKind::Bloom,
            &mut backend,
            test_support::SIZE,
            &EffectsConfig::default(),
        )
        .unwrap();
        assert_eq!(backend.live_targets(), 2);
        bloom.destroy(&mut backend);
        assert_eq!(backend.live_targets(), 0);
    }

    #[test]
    fn default_resize_is_idempotent() {
        let mut backend = RecordingBackend::new();
        let mut ssao = build(
            EffectKind::Ssao,
            &mut backend,
            test_support::SIZE,
            &EffectsConfig::default(),
        )
        .unwrap();
        ssao.resize(&mut backend, 64, 32).unwrap();
        let allocations = backend.total_counts().allocations;
        ssao.resize(&mut backend, 64, 32).unwrap();
        assert_eq!(backend.total_counts().allocations, allocations);
        assert!(ssao
            .scratch()
            .unwrap()
            .iter()
            .all(|t| t.size() == PhysicalSize::new(64, 32)));
    }
}
