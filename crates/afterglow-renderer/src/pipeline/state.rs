use std::collections::HashSet;

use afterglow_config::schema::{AfterglowConfig, EffectKind, EffectsConfig, FinalFilter};

use crate::chain::EffectChain;
use crate::effects::{self, Effect};
use crate::gbuffer::AuxiliaryGeometryBuffer;
use crate::gpu::{
    Capabilities, GpuBackend, PhysicalSize, RendererError, Result, Rgba, TargetDescriptor,
};
use crate::math::Mat4;
use crate::target::{RenderTarget, TargetSet};
use crate::temporal::{AccumulationState, TemporalAccumulator};

/// Slots in [`Offscreen::core`].
pub(super) const SCENE: usize = 0;
pub(super) const RESOLVED: usize = 1;

const DEFAULT_CLEAR: Rgba = Rgba::new(0.8, 0.8, 0.8, 1.0);

/// Pipeline-wide settings lifted out of the config.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Settings {
    pub clear_color: Rgba,
    pub final_filter: FinalFilter,
    pub temporal: bool,
}

impl Settings {
    pub fn from_config(config: &AfterglowConfig) -> Self {
        Self {
            clear_color: Rgba::from_hex_or(&config.render.clear_color, DEFAULT_CLEAR),
            final_filter: config.render.final_filter,
            temporal: config.temporal.enabled,
        }
    }
}

/// Configured MSAA sample count clamped to what the GPU reports.
pub(super) fn effective_samples(config: &AfterglowConfig, caps: &Capabilities) -> u32 {
    let samples = config.render.msaa_samples.clamp(1, caps.max_samples.max(1));
    if samples != config.render.msaa_samples {
        tracing::info!(
            requested = config.render.msaa_samples,
            samples,
            "msaa sample count clamped"
        );
    }
    samples
}

/// Scene target, plus a single-sampled resolve target when multisampled.
pub(super) fn core_descriptors(size: PhysicalSize, samples: u32) -> Vec<TargetDescriptor> {
    let scene = TargetDescriptor::color("scene", size)
        .with_samples(samples)
        .with_depth();
    if samples > 1 {
        vec![scene, TargetDescriptor::color("resolved", size)]
    } else {
        vec![scene]
    }
}

/// Effects in `order` that `existing` does not already hold, built at
/// `size`. All or nothing.
pub(super) fn build_missing(
    backend: &mut dyn GpuBackend,
    size: PhysicalSize,
    order: &[EffectKind],
    existing: &[Box<dyn Effect>],
    config: &EffectsConfig,
) -> Result<Vec<Box<dyn Effect>>> {
    let mut seen: HashSet<EffectKind> = existing.iter().map(|e| e.kind()).collect();
    let mut built: Vec<Box<dyn Effect>> = Vec::new();
    for &kind in order {
        if !seen.insert(kind) {
            continue;
        }
        match effects::build(kind, backend, size, config) {
            Ok(effect) => built.push(effect),
            Err(e) => {
                for mut effect in built {
                    effect.destroy(backend);
                }
                return Err(e);
            }
        }
    }
    Ok(built)
}

/// Everything the advanced path draws into.
pub(super) struct Offscreen {
    pub core: TargetSet,
    pub chain: EffectChain,
    pub gbuffer: AuxiliaryGeometryBuffer,
    pub effects: Vec<Box<dyn Effect>>,
    pub accumulator: TemporalAccumulator,
}

impl Offscreen {
    fn new(
        backend: &mut dyn GpuBackend,
        size: PhysicalSize,
        config: &AfterglowConfig,
        samples: u32,
    ) -> Result<Self> {
        let core = TargetSet::allocate(backend, core_descriptors(size, samples))?;
        let chain = match EffectChain::new(backend, size) {
            Ok(chain) => chain,
            Err(e) => {
                core.destroy(backend);
                return Err(e);
            }
        };
        let gbuffer = match AuxiliaryGeometryBuffer::new(backend, size) {
            Ok(gbuffer) => gbuffer,
            Err(e) => {
                core.destroy(backend);
                chain.destroy(backend);
                return Err(e);
            }
        };
        let accumulator = match TemporalAccumulator::new(backend, size, config.temporal.budget) {
            Ok(accumulator) => accumulator,
            Err(e) => {
                core.destroy(backend);
                chain.destroy(backend);
                gbuffer.destroy(backend);
                return Err(e);
            }
        };
        let effects = match build_missing(
            backend,
            size,
            &config.render.effect_order,
            &[],
            &config.effects,
        ) {
            Ok(effects) => effects,
            Err(e) => {
                core.destroy(backend);
                chain.destroy(backend);
                gbuffer.destroy(backend);
                accumulator.destroy(backend);
                return Err(e);
            }
        };
        Ok(Self {
            core,
            chain,
            gbuffer,
            effects,
            accumulator,
        })
    }

    pub fn samples(&self) -> u32 {
        self.core.get(SCENE).map_or(1, RenderTarget::sample_count)
    }

    pub fn mark_dirty(&mut self) {
        self.accumulator.mark_dirty();
        for effect in &mut self.effects {
            effect.mark_dirty();
        }
    }
}

/// The orchestrator. Owns its backend and every render target.
pub struct FramePipeline<B: GpuBackend> {
    pub(super) backend: B,
    pub(super) size: PhysicalSize,
    pub(super) settings: Settings,
    /// `None` runs the simple path for the pipeline's lifetime.
    pub(super) offscreen: Option<Offscreen>,
    pub(super) last_camera: Option<(Mat4, Mat4)>,
    pub(super) last_revision: Option<u64>,
}

impl<B: GpuBackend> FramePipeline<B> {
    /// Allocate every target at `width` x `height`. Falls back to the simple
    /// path when the backend lacks advanced capabilities or refuses the
    /// multisampled scene target.
    pub fn new(mut backend: B, width: u32, height: u32, config: &AfterglowConfig) -> Result<Self> {
        let size = PhysicalSize::new(width, height);
        backend.resize_surface(size);

        let caps = backend.capabilities().clone();
        let offscreen = if caps.advanced {
            let samples = effective_samples(config, &caps);
            match Offscreen::new(&mut backend, size, config, samples) {
                Ok(offscreen) => Some(offscreen),
                Err(RendererError::Unsupported(reason)) => {
                    tracing::warn!(%reason, "offscreen targets unsupported, using simple path");
                    None
                }
                Err(e) => return Err(e),
            }
        } else {
            tracing::warn!("GPU lacks float targets or multisampling, using simple path");
            None
        };

        tracing::info!(
            width = size.width,
            height = size.height,
            advanced = offscreen.is_some(),
            "frame pipeline ready"
        );

        Ok(Self {
            backend,
            size,
            settings: Settings::from_config(config),
            offscreen,
            last_camera: None,
            last_revision: None,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// For uploading meshes and cube maps.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn size(&self) -> PhysicalSize {
        self.size
    }

    pub fn is_advanced(&self) -> bool {
        self.offscreen.is_some()
    }

    pub fn sample_count(&self) -> u32 {
        self.offscreen.as_ref().map(Offscreen::samples).unwrap_or(1)
    }

    /// `None` on the simple path.
    pub fn accumulation_state(&self) -> Option<AccumulationState> {
        self.offscreen.as_ref().map(|o| o.accumulator.state())
    }

    /// Effects in chain order.
    pub fn effect_order(&self) -> Vec<EffectKind> {
        self.offscreen
            .iter()
            .flat_map(|o| o.effects.iter().map(|e| e.kind()))
            .collect()
    }

    pub fn is_effect_enabled(&self, kind: EffectKind) -> bool {
        let Some(offscreen) = self.offscreen.as_ref() else {
            return false;
        };
        offscreen
            .effects
            .iter()
            .any(|e| e.kind() == kind && e.is_enabled())
    }

    pub fn gbuffer_populated(&self) -> bool {
        self.offscreen
            .as_ref()
            .is_some_and(|o| o.gbuffer.is_populated())
    }

    /// Label and size of every target the pipeline and its effects own.
    pub fn target_sizes(&self) -> Vec<(&'static str, PhysicalSize)> {
        let Some(o) = self.offscreen.as_ref() else {
            return Vec::new();
        };
        let sets = [&o.core, o.chain.buffers(), o.gbuffer.targets()]
            .into_iter()
            .chain(o.effects.iter().filter_map(|e| e.scratch()));
        let mut sizes: Vec<_> = sets
            .flat_map(|set| set.iter())
            .map(|t| (t.label(), t.size()))
            .collect();
        let accumulation = o.accumulator.target();
        sizes.push((accumulation.label(), accumulation.size()));
        sizes
    }

    /// Restart accumulation and drop every effect cache.
    pub fn mark_dirty(&mut self) {
        if let Some(offscreen) = self.offscreen.as_mut() {
            offscreen.mark_dirty();
        }
    }

    /// Returns whether an effect of `kind` is in the chain. A change of the
    /// flag restarts accumulation.
    pub fn set_effect_enabled(&mut self, kind: EffectKind, enabled: bool) -> bool {
        let Some(offscreen) = self.offscreen.as_mut() else {
            return false;
        };
        let Some(effect) = offscreen.effects.iter_mut().find(|e| e.kind() == kind) else {
            return false;
        };
        if effect.is_enabled() != enabled {
            effect.set_enabled(enabled);
            tracing::debug!(effect = %kind, enabled, "effect toggled");
            offscreen.mark_dirty();
        }
        true
    }

    /// Mutable access to a concrete effect. Marks everything dirty, since
    /// the caller is expected to change something visible.
    pub fn effect_mut<T: Effect>(&mut self) -> Option<&mut T> {
        let offscreen = self.offscreen.as_mut()?;
        offscreen.mark_dirty();
        offscreen
            .effects
            .iter_mut()
            .find_map(|e| e.as_any_mut().downcast_mut::<T>())
    }
}
