//! Window creation and pipeline initialization.

use std::sync::Arc;

use winit::event_loop::ActiveEventLoop;
use winit::window::WindowAttributes;

use afterglow_common::AfterglowError;
use afterglow_renderer::{FramePipeline, WgpuBackend};

use super::core::ViewerApp;
use crate::demo_scene;

impl ViewerApp {
    /// Create the window, the GPU backend, the pipeline and the demo scene.
    pub(super) fn initialize_window(
        &mut self,
        event_loop: &ActiveEventLoop,
    ) -> Result<(), AfterglowError> {
        let (width, height) = self.initial_size;
        let attrs = WindowAttributes::default()
            .with_title("Afterglow")
            .with_inner_size(winit::dpi::PhysicalSize::new(width, height));

        let window = event_loop
            .create_window(attrs)
            .map(Arc::new)
            .map_err(|e| AfterglowError::Window(format!("failed to create window: {e}")))?;

        let backend = pollster::block_on(WgpuBackend::new(window.clone()))
            .map_err(|e| AfterglowError::Renderer(format!("GPU init: {e}")))?;

        let size = window.inner_size();
        let mut pipeline = FramePipeline::new(backend, size.width, size.height, &self.config)
            .map_err(|e| AfterglowError::Renderer(format!("frame pipeline: {e}")))?;

        self.scene = demo_scene::build(pipeline.backend_mut())
            .map_err(|e| AfterglowError::Renderer(format!("demo scene upload: {e}")))?;

        self.camera.set_aspect(pipeline.size().aspect());
        self.orbit.apply(&mut self.camera);
        self.pipeline = Some(pipeline);
        self.window = Some(window);
        tracing::info!("Window created and pipeline initialized");
        Ok(())
    }
}
