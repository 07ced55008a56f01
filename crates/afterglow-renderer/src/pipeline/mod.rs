//! Per-frame orchestration: scene pass, resolve, effect chain, temporal
//! accumulation and the final composite.
//!
//! [`FramePipeline`] owns every target it draws into. Anything that changes
//! the image (camera, scene revision, size, config, effect toggles) restarts
//! accumulation and drops effect caches; once the accumulator finishes, a tick
//! only composites the converged texture.

mod config;
mod frame;
mod resize;
mod state;


pub use state::FramePipeline;

use crate::gpu::TextureRef;

/// Which branch a tick took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePath {
    /// No advanced GPU path: scene drawn straight to the surface.
    Simple,
    /// Rendered, post-processed and blended in as sample `sample`.
    Accumulated { sample: u32 },
    /// Accumulation finished; the converged texture was composited as is.
    Cached,
    /// Temporal accumulation off; the chain output was composited.
    Direct,
}

/// What one call to [`FramePipeline::render`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub path: FramePath,
    pub gbuffer_updated: bool,
    pub effects_applied: usize,
    /// Texture composited to the surface, `None` on the simple path.
    pub texture: Option<TextureRef>,
}

impl FrameReport {
    fn simple() -> Self {
        Self {
            path: FramePath::Simple,
            gbuffer_updated: false,
            effects_applied: 0,
            texture: None,
        }
    }

    /// A sample was accumulated, so the next tick may still change the image.
    pub fn wants_redraw(&self) -> bool {
        matches!(self.path, FramePath::Accumulated { .. })
    }
}
