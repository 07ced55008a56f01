use afterglow_config::schema::{AfterglowConfig, EffectKind};

use super::state::{
    build_missing, core_descriptors, effective_samples, FramePipeline, Offscreen, Settings,
};
use crate::effects::Effect;
use crate::gpu::{GpuBackend, PhysicalSize, Result};
use crate::target::TargetSet;

impl<B: GpuBackend> FramePipeline<B> {
    /// Take a new configuration: effect parameters, enable flags and order,
    /// temporal budget, MSAA sample count, clear color and final filter.
    /// Always restarts accumulation. On error nothing changes.
    pub fn apply_config(&mut self, config: &AfterglowConfig) -> Result<()> {
        if let Some(offscreen) = self.offscreen.as_mut() {
            let samples = effective_samples(config, self.backend.capabilities());
            offscreen.reconfigure(&mut self.backend, self.size, config, samples)?;
        }
        self.settings = Settings::from_config(config);
        self.mark_dirty();
        tracing::info!(
            effects = ?self.effect_order(),
            temporal = self.settings.temporal,
            "configuration applied"
        );
        Ok(())
    }
}

impl Offscreen {
    fn reconfigure(
        &mut self,
        backend: &mut dyn GpuBackend,
        size: PhysicalSize,
        config: &AfterglowConfig,
        samples: u32,
    ) -> Result<()> {
        // Allocate first so a failure leaves the live state untouched.
        let core = if samples != self.samples() {
            Some(TargetSet::allocate(backend, core_descriptors(size, samples))?)
        } else {
            None
        };
        let order = &config.render.effect_order;
        let built = match build_missing(backend, size, order, &self.effects, &config.effects) {
            Ok(built) => built,
            Err(e) => {
                if let Some(core) = core {
                    core.destroy(backend);
                }
                return Err(e);
            }
        };

        if let Some(core) = core {
            std::mem::replace(&mut self.core, core).destroy(backend);
            tracing::info!(samples, "scene target reallocated");
        }
        self.reorder(backend, order, built);
        for effect in &mut self.effects {
            effect.configure(&config.effects);
        }
        self.accumulator.set_budget(config.temporal.budget);
        Ok(())
    }

    /// Arrange effects in `order`, destroying any the order no longer names.
    fn reorder(
        &mut self,
        backend: &mut dyn GpuBackend,
        order: &[EffectKind],
        built: Vec<Box<dyn Effect>>,
    ) {
        let mut pool = std::mem::take(&mut self.effects);
        pool.extend(built);
        let mut ordered = Vec::with_capacity(order.len());
        for kind in order {
            if let Some(pos) = pool.iter().position(|e| e.kind() == *kind) {
                ordered.push(pool.remove(pos));
            }
        }
        for mut unused in pool {
            tracing::debug!(effect = %unused.kind(), "effect removed from chain");
            unused.destroy(backend);
        }
        self.effects = ordered;
    }
}
