use super::state::{FramePipeline, Offscreen};
use crate::gpu::{GpuBackend, PhysicalSize, Result};
use crate::target::{RenderTarget, StagedTargets, TargetSet};

impl<B: GpuBackend> FramePipeline<B> {
    /// Reallocate every target at `width` x `height` and restart
    /// accumulation.
    ///
    /// All replacements are allocated before any live target is released.
    /// On failure the pipeline keeps its previous size and targets.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let size = PhysicalSize::new(width, height);
        if let Some(offscreen) = self.offscreen.as_mut() {
            if let Err(e) = offscreen.resize(&mut self.backend, size) {
                tracing::warn!(
                    error = %e,
                    width = size.width,
                    height = size.height,
                    "resize failed, keeping previous targets"
                );
                return Err(e);
            }
        }
        self.backend.resize_surface(size);
        if size != self.size {
            tracing::info!(width = size.width, height = size.height, "pipeline resized");
        }
        self.size = size;
        self.mark_dirty();
        Ok(())
    }
}

impl Offscreen {
    fn target_sets(&self) -> Vec<&TargetSet> {
        [&self.core, self.chain.buffers(), self.gbuffer.targets()]
            .into_iter()
            .chain(self.effects.iter().filter_map(|e| e.scratch()))
            .collect()
    }

    fn resize(&mut self, backend: &mut dyn GpuBackend, size: PhysicalSize) -> Result<()> {
        let (width, height) = (size.width, size.height);

        let mut staged: Vec<StagedTargets> = Vec::new();
        for set in self.target_sets() {
            match set.stage_resize(backend, width, height) {
                Ok(s) => staged.push(s),
                Err(e) => {
                    discard(staged, backend);
                    return Err(e);
                }
            }
        }

        let accumulation = self.accumulator.target();
        let accumulation = if accumulation.size() == size {
            None
        } else {
            let desc = accumulation.descriptor().resized(width, height);
            match RenderTarget::new(backend, desc) {
                Ok(target) => Some(target),
                Err(e) => {
                    discard(staged, backend);
                    return Err(e);
                }
            }
        };

        // Everything is allocated; swap in the same order as `target_sets`.
        let mut staged = staged.into_iter();
        if let Some(s) = staged.next() {
            self.core.commit(s, backend);
        }
        if let Some(s) = staged.next() {
            self.chain.commit(s, backend);
        }
        if let Some(s) = staged.next() {
            self.gbuffer.commit(s, backend);
        }
        for effect in &mut self.effects {
            if let Some(scratch) = effect.scratch_mut() {
                if let Some(s) = staged.next() {
                    scratch.commit(s, backend);
                }
            }
        }
        if let Some(target) = accumulation {
            self.accumulator.replace_target(backend, target);
        }
        self.mark_dirty();
        Ok(())
    }
}

fn discard(staged: Vec<StagedTargets>, backend: &mut dyn GpuBackend) {
    for s in staged {
        s.discard(backend);
    }
}
