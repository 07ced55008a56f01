//! `ApplicationHandler` implementation for the winit event loop.

use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::window::WindowId;

use super::core::{ViewerApp, POLL_INTERVAL};
use super::keys::{self, Action};

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.initialize_window(event_loop) {
            tracing::error!("{e}");
            self.failure = Some(e);
            event_loop.exit();
            return;
        }

        self.needs_redraw = true;
        self.request_redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Window close requested");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    self.handle_resize(size.width, size.height);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_keyboard_input(event_loop, event);
            }

            WindowEvent::RedrawRequested => {
                self.render_frame();
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.poll_config();

        if self.needs_redraw {
            self.request_redraw();
            event_loop.set_control_flow(ControlFlow::Poll);
        } else {
            event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + POLL_INTERVAL));
        }
    }
}

impl ViewerApp {
    fn handle_resize(&mut self, width: u32, height: u32) {
        let Some(ref mut pipeline) = self.pipeline else {
            return;
        };
        // A failed resize keeps the previous targets; the next Resized retries.
        if let Err(e) = pipeline.resize(width, height) {
            tracing::error!("Resize to {width}x{height} failed: {e}");
            return;
        }
        self.camera.set_aspect(pipeline.size().aspect());
        self.needs_redraw = true;
    }

    fn handle_keyboard_input(&mut self, event_loop: &ActiveEventLoop, event: KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        let Some(action) = keys::action_for(&event.logical_key) else {
            return;
        };

        match action {
            Action::Exit => event_loop.exit(),
            Action::Orbit(delta) => self.orbit.rotate(delta, &mut self.camera),
            Action::Restart => {
                if let Some(ref mut pipeline) = self.pipeline {
                    pipeline.mark_dirty();
                }
            }
            Action::ToggleEffect(kind) => {
                if let Some(ref mut pipeline) = self.pipeline {
                    let enabled = !pipeline.is_effect_enabled(kind);
                    if pipeline.set_effect_enabled(kind, enabled) {
                        tracing::info!(effect = %kind, enabled, "effect toggled");
                    } else {
                        tracing::info!(effect = %kind, "effect not in render.effect_order");
                    }
                }
            }
        }
        self.needs_redraw = true;
    }

    /// Apply a reloaded config, if the watcher published one.
    fn poll_config(&mut self) {
        match self.config_rx.has_changed() {
            Ok(true) => {}
            Ok(false) | Err(_) => return,
        }
        let config = self.config_rx.borrow_and_update().clone();
        if let Some(ref mut pipeline) = self.pipeline {
            if let Err(e) = pipeline.apply_config(&config) {
                tracing::error!("Config reload rejected by pipeline: {e}");
                return;
            }
        }
        self.config = config;
        self.needs_redraw = true;
    }
}
