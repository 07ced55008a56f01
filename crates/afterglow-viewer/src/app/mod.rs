//! Top-level viewer state.
//!
//! Implements `winit::application::ApplicationHandler` to drive the main
//! event loop. Coordinates config reloads, the frame pipeline and input.

mod core;
mod event_handler;
mod init;
mod keys;
mod render;

pub use core::ViewerApp;
