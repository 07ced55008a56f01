//! Live config reload manager.
//!
//! Combines the file watcher with loading and validation so the renderer
//! receives a fresh, valid config whenever the file changes on disk.

mod manager;

#[cfg(test)]
mod tests;

pub use manager::ReloadManager;
