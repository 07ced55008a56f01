//! Ordered effect chain over a pair of ping-pong targets.

use crate::camera::Camera;
use crate::effects::{Effect, EffectContext};
use crate::gpu::{GpuBackend, PhysicalSize, RendererError, Result, TargetDescriptor};
use crate::target::{RenderTarget, StagedTargets, TargetSet};

/// Where the next effect reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The target handed to [`EffectChain::run`].
    Input,
    /// One of the two ping-pong buffers.
    Buffer(usize),
}

/// The write buffer for `read`, and the read slot after that write.
pub fn next_slots(read: Slot) -> (usize, Slot) {
    let write = match read {
        Slot::Input | Slot::Buffer(1) => 0,
        Slot::Buffer(_) => 1,
    };
    (write, Slot::Buffer(write))
}

/// Result of one chain run.
pub struct ChainOutput<'a> {
    /// Either the chain input itself or one of the ping-pong buffers.
    pub target: &'a RenderTarget,
    pub applied: usize,
}

pub struct EffectChain {
    buffers: TargetSet,
}

impl EffectChain {
    pub fn new(backend: &mut dyn GpuBackend, size: PhysicalSize) -> Result<Self> {
        let buffers = TargetSet::allocate(
            backend,
            vec![
                TargetDescriptor::color("ping", size),
                TargetDescriptor::color("pong", size),
            ],
        )?;
        Ok(Self { buffers })
    }

    pub fn buffers(&self) -> &TargetSet {
        &self.buffers
    }

    /// Apply every enabled effect in slice order. With nothing enabled the
    /// input is returned as is, without a copy.
    pub fn run<'a>(
        &'a mut self,
        ctx: &mut EffectContext<'_>,
        camera: &Camera,
        effects: &mut [Box<dyn Effect>],
        input: &'a RenderTarget,
    ) -> Result<ChainOutput<'a>> {
        if self.buffers.contains(input.id()) {
            return Err(RendererError::Configuration(format!(
                "chain input '{}' is one of its own ping-pong buffers",
                input.label()
            )));
        }

        let mut read = Slot::Input;
        let mut applied = 0;
        ctx.upstream_varies = false;
        for effect in effects.iter_mut().filter(|e| e.is_enabled()) {
            let (write, next) = next_slots(read);
            match read {
                Slot::Input => {
                    let output = self.buffers.at_mut(write)?;
                    effect.apply(ctx, camera, input, output)?;
                }
                Slot::Buffer(r) => {
                    let (source, output) = self.buffers.pair_mut(r, write)?;
                    effect.apply(ctx, camera, source, output)?;
                }
            }
            tracing::trace!(effect = %effect.kind(), write, "effect applied");
            ctx.upstream_varies |= effect.varies_per_sample();
            read = next;
            applied += 1;
        }

        let target = match read {
            Slot::Input => input,
            Slot::Buffer(i) => self.buffers.at(i)?,
        };
        Ok(ChainOutput { target, applied })
    }

    pub(crate) fn commit(&mut self, staged: StagedTargets, backend: &mut dyn GpuBackend) {
        self.buffers.commit(staged, backend);
    }

    pub fn invalidate(&mut self) {
        self.buffers.invalidate();
    }

    pub fn destroy(self, backend: &mut dyn GpuBackend) {
        self.buffers.destroy(backend);
    }
}

// =============================================================================
// Tests
// =============================================================================
