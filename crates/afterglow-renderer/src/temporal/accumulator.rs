//! Running-average accumulation of jittered frames.

use super::jitter::jitter_table;
use crate::camera::Camera;
use crate::gpu::uniforms::CopyUniforms;
use crate::gpu::{
    Binding, FullscreenPass, GpuBackend, LoadAction, PassState, PhysicalSize, Program,
    RendererError, Result, TargetDescriptor, TextureRef,
};
use crate::math;
use crate::target::RenderTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulationState {
    /// Samples `0..k` are in the accumulation target; the next one is `k`.
    Accumulating(u32),
    /// The budget is spent and the accumulation target holds the result.
    Finished,
}

pub struct TemporalAccumulator {
    budget: u32,
    state: AccumulationState,
    jitter: Vec<[f32; 2]>,
    target: RenderTarget,
}

impl TemporalAccumulator {
    pub fn new(backend: &mut dyn GpuBackend, size: PhysicalSize, budget: u32) -> Result<Self> {
        let target = RenderTarget::new(backend, TargetDescriptor::color("accumulation", size))?;
        let budget = budget.max(1);
        Ok(Self {
            budget,
            state: AccumulationState::Accumulating(0),
            jitter: jitter_table(budget),
            target,
        })
    }

    pub fn state(&self) -> AccumulationState {
        self.state
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn is_finished(&self) -> bool {
        self.state == AccumulationState::Finished
    }

    /// Index of the next sample, or `None` once finished.
    pub fn frame_index(&self) -> Option<u32> {
        match self.state {
            AccumulationState::Accumulating(k) => Some(k),
            AccumulationState::Finished => None,
        }
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    /// Restart accumulation from the first sample.
    pub fn start(&mut self) {
        if self.state != AccumulationState::Accumulating(0) {
            tracing::debug!(from = ?self.state, "accumulation restarted");
        }
        self.state = AccumulationState::Accumulating(0);
    }

    pub fn mark_dirty(&mut self) {
        self.start();
    }

    pub fn advance(&mut self) {
        self.state = match self.state {
            AccumulationState::Accumulating(k) if k + 1 < self.budget => {
                AccumulationState::Accumulating(k + 1)
            }
            AccumulationState::Accumulating(_) => {
                tracing::debug!(budget = self.budget, "accumulation finished");
                AccumulationState::Finished
            }
            AccumulationState::Finished => AccumulationState::Finished,
        };
    }

    /// Change the sample budget. Rebuilds the jitter table and restarts.
    pub fn set_budget(&mut self, budget: u32) {
        let budget = budget.max(1);
        if budget != self.budget {
            self.budget = budget;
            self.jitter = jitter_table(budget);
        }
        self.start();
    }

    /// Sub-pixel offset, in pixels, for the current sample.
    pub fn jitter_offset(&self) -> [f32; 2] {
        match self.state {
            AccumulationState::Accumulating(k) => {
                self.jitter.get(k as usize).copied().unwrap_or([0.0, 0.0])
            }
            AccumulationState::Finished => [0.0, 0.0],
        }
    }

    /// Shift `camera.projection` by the current offset. The caller restores
    /// the original projection after the scene pass.
    pub fn jitter_projection(&self, camera: &mut Camera, width: u32, height: u32) {
        let [jx, jy] = self.jitter_offset();
        let shift = math::translate(
            2.0 * jx / width.max(1) as f32,
            2.0 * jy / height.max(1) as f32,
            0.0,
        );
        camera.projection = math::mul(&shift, &camera.projection);
    }

    /// Blend `frame` into the accumulation target with weight `1 / (k + 1)`,
    /// advance, and return the accumulated texture.
    pub fn sample(
        &mut self,
        backend: &mut dyn GpuBackend,
        frame: &RenderTarget,
    ) -> Result<TextureRef> {
        let AccumulationState::Accumulating(k) = self.state else {
            return Err(RendererError::Configuration("sample after accumulation finished".into()));
        };
        if frame.size() != self.target.size() {
            return Err(RendererError::Configuration(format!(
                "accumulating '{}' {}x{} into {}x{}",
                frame.label(),
                frame.size().width,
                frame.size().height,
                self.target.size().width,
                self.target.size().height
            )));
        }

        // The first sample overwrites whatever a previous run left behind.
        let state = if k == 0 {
            PassState::REPLACE
        } else {
            PassState::mix(1.0 / (k + 1) as f32)
        };
        let uniforms = CopyUniforms::new(self.target.size(), 1.0);
        let inputs = [Binding::Texture(frame.texture()?)];
        backend.draw_fullscreen(&FullscreenPass {
            label: "accumulate",
            program: Program::Copy,
            inputs: &inputs,
            uniforms: bytemuck::bytes_of(&uniforms),
            output: self.target.destination(),
            load: LoadAction::Load,
            state,
        })?;
        self.target.mark_written();
        self.advance();
        self.target.texture()
    }

    /// The accumulated texture, valid once at least one sample has landed.
    pub fn output(&self) -> Result<TextureRef> {
        self.target.texture()
    }

    pub fn resize(&mut self, backend: &mut dyn GpuBackend, width: u32, height: u32) -> Result<()> {
        self.target.resize(backend, width, height)?;
        self.mark_dirty();
        Ok(())
    }

    /// Swap in a target allocated elsewhere at the new size.
    pub(crate) fn replace_target(&mut self, backend: &mut dyn GpuBackend, target: RenderTarget) {
        std::mem::replace(&mut self.target, target).destroy(backend);
        self.mark_dirty();
    }

    pub fn destroy(self, backend: &mut dyn GpuBackend) {
        self.target.destroy(backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{Command, Destination, RecordingBackend, Rgba};

    fn setup(budget: u32) -> (RecordingBackend, TemporalAccumulator, RenderTarget) {
        let mut backend = RecordingBackend::new();
        let size = PhysicalSize::new(16, 16);
        let acc = TemporalAccumulator::new(&mut backend, size, budget).unwrap();
        let mut frame =
            RenderTarget::new(&mut backend, TargetDescriptor::color("frame", size)).unwrap();
        backend.clear(frame.destination(), Rgba::BLACK).unwrap();
        frame.mark_written();
        (backend, acc, frame)
    }

    #[test]
    fn advances_to_finished_after_budget() {
        let (_, mut acc, _) = setup(3);
        assert_eq!(acc.state(), AccumulationState::Accumulating(0));
        acc.advance();
        acc.advance();
        assert_eq!(acc.state(), AccumulationState::Accumulating(2));
        acc.advance();
        assert_eq!(acc.state(), AccumulationState::Finished);
        acc.advance();
        assert!(acc.is_finished());
    }

    #[test]
    fn start_resets_from_any_state() {
        let (_, mut acc, _) = setup(2);
        acc.advance();
        acc.advance();
        assert!(acc.is_finished());
        acc.mark_dirty();
        assert_eq!(acc.state(), AccumulationState::Accumulating(0));
        acc.mark_dirty();
        assert_eq!(acc.state(), AccumulationState::Accumulating(0));
    }

    #[test]
    fn sample_weights_follow_running_average() {
        let (mut backend, mut acc, frame) = setup(4);
        let mut blends = Vec::new();
        for _ in 0..4 {
            acc.sample(&mut backend, &frame).unwrap();
            if let Some(Command::Fullscreen { blend, .. }) = backend.commands().last() {
                blends.push(*blend);
            }
        }
        use crate::gpu::BlendMode::*;
        assert_eq!(blends, vec![Replace, Mix(0.5), Mix(1.0 / 3.0), Mix(0.25)]);
        assert!(acc.is_finished());
    }

    #[test]
    fn sample_after_finish_is_rejected() {
        let (mut backend, mut acc, frame) = setup(1);
        let tex = acc.sample(&mut backend, &frame).unwrap();
        assert!(acc.is_finished());
        assert!(acc.sample(&mut backend, &frame).is_err());
        assert_eq!(acc.output().unwrap(), tex);
    }

    #[test]
    fn output_before_any_sample_is_unpopulated() {
        let (_, acc, _) = setup(4);
        assert!(matches!(
            acc.output(),
            Err(RendererError::UnpopulatedTarget("accumulation"))
        ));
    }

    #[test]
    fn jitter_scales_to_pixel_size() {
        let (_, acc, _) = setup(4);
        let mut camera = Camera::default();
        let original = camera.projection;
        acc.jitter_projection(&mut camera, 800, 600);

        let [jx, jy] = acc.jitter_offset();
        let point = [0.3, -0.2, -5.0];
        let a = math::transform_point(&original, point);
        let b = math::transform_point(&camera.projection, point);
        let dx = b[0] / b[3] - a[0] / a[3];
        let dy = b[1] / b[3] - a[1] / a[3];
        assert!((dx - 2.0 * jx / 800.0).abs() < 1e-6);
        assert!((dy - 2.0 * jy / 600.0).abs() < 1e-6);
    }

    #[test]
    fn set_budget_rebuilds_table_and_restarts() {
        let (_, mut acc, _) = setup(4);
        acc.advance();
        acc.set_budget(8);
        assert_eq!(acc.budget(), 8);
        assert_eq!(acc.state(), AccumulationState::Accumulating(0));
        for _ in 0..7 {
            acc.advance();
        }
        assert!(!acc.is_finished());
        acc.advance();
        assert!(acc.is_finished());
    }

    #[test]
    fn resize_restarts_and_unpopulates() {
        let (mut backend, mut acc, frame) = setup(4);
        acc.sample(&mut backend, &frame).unwrap();
        acc.resize(&mut backend, 32, 8).unwrap();
        assert_eq!(acc.state(), AccumulationState::Accumulating(0));
        assert_eq!(acc.target().size(), PhysicalSize::new(32, 8));
        assert!(acc.output().is_err());
        assert!(matches!(acc.target().destination(), Destination::Target(_)));
    }
}
