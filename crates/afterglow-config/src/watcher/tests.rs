//! Tests for the config file watcher.

use super::*;
use std::path::PathBuf;

#[test]
fn watcher_new_with_nonexistent_path_succeeds() {
    let watcher = ConfigWatcher::new(PathBuf::from("/tmp/nonexistent_afterglow_test.toml"));
    assert!(watcher.is_ok());
}

#[test]
fn watcher_new_with_existing_path_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "# test").unwrap();

    let watcher = ConfigWatcher::new(path.clone()).unwrap();
    assert_eq!(watcher.path(), path.as_path());
}

#[test]
fn watcher_rejects_path_without_file_name() {
    let watcher = ConfigWatcher::new(PathBuf::from("/"));
    assert!(matches!(watcher, Err(afterglow_common::ConfigError::WatchError(_))));
}

#[test]
fn debounce_is_half_a_second() {
    assert_eq!(DEBOUNCE.as_millis(), 500);
}
