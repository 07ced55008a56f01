//! ViewerApp struct definition and constructor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use winit::window::Window;

use afterglow_common::AfterglowError;
use afterglow_config::AfterglowConfig;
use afterglow_renderer::{Camera, FramePipeline, FrameTimer, StaticScene, WgpuBackend};

use crate::demo_scene::Orbit;

/// How long to sleep between config polls while the image is converged.
pub(super) const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How often frame statistics are logged.
pub(super) const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Top-level viewer state.
pub struct ViewerApp {
    pub(super) config: AfterglowConfig,
    pub(super) config_rx: watch::Receiver<AfterglowConfig>,
    // Hosts the config reload task.
    pub(super) _runtime: tokio::runtime::Runtime,

    // Windowing
    pub(super) window: Option<Arc<Window>>,
    pub(super) pipeline: Option<FramePipeline<WgpuBackend>>,
    pub(super) initial_size: (u32, u32),

    // Scene
    pub(super) scene: StaticScene,
    pub(super) camera: Camera,
    pub(super) orbit: Orbit,

    pub(super) timer: FrameTimer,

    // Set while accumulation is still running or after any input that
    // changes the image.
    pub(super) needs_redraw: bool,

    // Why the event loop was stopped early, if it was.
    pub(super) failure: Option<AfterglowError>,
}

impl ViewerApp {
    pub fn new(
        config: AfterglowConfig,
        config_rx: watch::Receiver<AfterglowConfig>,
        runtime: tokio::runtime::Runtime,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            config,
            config_rx,
            _runtime: runtime,
            window: None,
            pipeline: None,
            initial_size: (width, height),
            scene: StaticScene::new(),
            camera: Camera::default(),
            orbit: Orbit::new(),
            timer: FrameTimer::new(),
            needs_redraw: false,
            failure: None,
        }
    }

    /// Error that ended the event loop, if any.
    pub fn take_failure(&mut self) -> Option<AfterglowError> {
        self.failure.take()
    }

    pub(super) fn request_redraw(&self) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}
