//! Frame timing and idle tracking for the viewer's periodic stats log.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::pipeline::FramePath;

const WINDOW: usize = 120;

/// Rolling window of frame intervals and the path each frame took.
pub struct FrameTimer {
    frames: VecDeque<(Duration, FramePath)>,
    last_frame: Instant,
    last_report: Instant,
}

impl FrameTimer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            frames: VecDeque::with_capacity(WINDOW),
            last_frame: now,
            last_report: now,
        }
    }

    /// Record a presented frame. Call once per tick, after rendering.
    pub fn record(&mut self, path: FramePath) {
        let now = Instant::now();
        let dt = now - self.last_frame;
        self.last_frame = now;
        self.frames.push_back((dt, path));
        if self.frames.len() > WINDOW {
            self.frames.pop_front();
        }
    }

    fn total_secs(&self) -> f64 {
        self.frames.iter().map(|(d, _)| d.as_secs_f64()).sum()
    }

    /// Average frames per second over the window.
    pub fn fps(&self) -> f64 {
        let total = self.total_secs();
        if self.frames.is_empty() || total <= 0.0 {
            return 0.0;
        }
        self.frames.len() as f64 / total
    }

    /// Average frame interval in milliseconds.
    pub fn frame_time_ms(&self) -> f64 {
        if self.frames.is_empty() {
            return 0.0;
        }
        (self.total_secs() / self.frames.len() as f64) * 1000.0
    }

    /// Share of frames in the window that only re-presented a converged image.
    pub fn idle_fraction(&self) -> f64 {
        if self.frames.is_empty() {
            return 0.0;
        }
        let idle = self
            .frames
            .iter()
            .filter(|(_, path)| *path == FramePath::Cached)
            .count();
        idle as f64 / self.frames.len() as f64
    }

    pub fn sample_count(&self) -> usize {
        self.frames.len()
    }

    /// True at most once per `interval`.
    pub fn report_due(&mut self, interval: Duration) -> bool {
        let now = Instant::now();
        if now - self.last_report >= interval {
            self.last_report = now;
            true
        } else {
            false
        }
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}
