//! Tests for the reload manager.

use super::*;
use std::path::PathBuf;

#[tokio::test]
async fn start_with_nonexistent_path_uses_defaults() {
    let path = PathBuf::from("/tmp/nonexistent_afterglow_reload_test.toml");
    let (config, _rx) = ReloadManager::start(path).await;
    assert_eq!(config, crate::AfterglowConfig::default());
}

#[tokio::test]
async fn start_with_valid_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[temporal]
budget = 8
"#,
    )
    .unwrap();

    let (config, rx) = ReloadManager::start(path).await;
    assert_eq!(config.temporal.budget, 8);
    assert_eq!(rx.borrow().temporal.budget, 8);
}

#[tokio::test]
async fn start_with_invalid_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[temporal]\nbudget = 0\n").unwrap();

    let (config, _rx) = ReloadManager::start(path).await;
    assert_eq!(config.temporal.budget, 30);
}
