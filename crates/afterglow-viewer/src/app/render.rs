//! Frame rendering.

use afterglow_renderer::RendererError;

use super::core::{ViewerApp, STATS_INTERVAL};

impl ViewerApp {
    /// Run one pipeline tick and decide whether another is needed.
    pub(super) fn render_frame(&mut self) {
        let Some(ref mut pipeline) = self.pipeline else {
            return;
        };

        match pipeline.render(&self.scene, &mut self.camera) {
            Ok(report) => {
                self.timer.record(report.path);
                self.needs_redraw = report.wants_redraw();
                if !self.needs_redraw {
                    tracing::debug!(path = ?report.path, "image settled");
                }
            }
            // Transient: the surface was reconfigured, try again next tick.
            Err(RendererError::SurfaceError(_)) => self.needs_redraw = true,
            Err(e) => {
                tracing::error!("Render error: {e}");
                self.needs_redraw = true;
            }
        }

        if self.timer.report_due(STATS_INTERVAL) && self.timer.sample_count() > 0 {
            tracing::info!(
                fps = self.timer.fps(),
                frame_ms = self.timer.frame_time_ms(),
                idle = self.timer.idle_fraction(),
                state = ?pipeline.accumulation_state(),
                "frame stats"
            );
        }
    }
}
