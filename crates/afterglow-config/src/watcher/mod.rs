//! File watcher for live config reload.
//!
//! Watches the config file's directory with `notify` and coalesces bursts
//! of events (editors often write + rename) inside a 500ms window.

mod config_watcher;

#[cfg(test)]
mod tests;

pub use config_watcher::{ConfigWatcher, DEBOUNCE};
