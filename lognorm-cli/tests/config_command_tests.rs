//! Integration tests for `lognorm config` loading.
//!
//! Tests config validation with real TOML files.

use std::fs;
use tempfile::TempDir;

use lognorm_core::config::LognormConfig;

#[tokio::test]
async fn test_config_validate_valid_toml() {
    // Given: A valid config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("lognorm.toml");

    let valid_config = r#"
[general]
log_level = "info"
log_format = "json"

[normalizer]
paths = ["/usr/share/lognorm/normalizers", "/etc/lognorm/normalizers"]
max_script_operations = 50000
timezone_field = "_tz"

[normalizer.active]
"syslog-0.99" = true
"sshd-0.99" = false
"#;

    fs::write(&config_path, valid_config).expect("should write config");

    // When: Loading the config
    let config = LognormConfig::load(&config_path)
        .await
        .expect("valid config should load successfully");

    // Then: Values come from the file
    assert_eq!(config.normalizer.paths.len(), 2);
    assert_eq!(config.normalizer.max_script_operations, 50_000);
    assert_eq!(config.normalizer.timezone_field, "_tz");
    assert_eq!(config.normalizer.active.get("sshd-0.99"), Some(&false));
}

#[tokio::test]
async fn test_config_validate_malformed_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");

    fs::write(&config_path, "[general\nlog_level = \"info\"\n").expect("should write bad config");

    let result = LognormConfig::load(&config_path).await;
    assert!(result.is_err(), "malformed TOML should fail to load");
}

#[tokio::test]
async fn test_config_validate_missing_file() {
    let config_path = std::path::PathBuf::from("/nonexistent/lognorm.toml");

    let result = LognormConfig::load(&config_path).await;
    assert!(result.is_err(), "missing file should fail to load");
}

#[tokio::test]
async fn test_config_validate_empty_file() {
    // Given: An empty config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("empty.toml");
    fs::write(&config_path, "").expect("should write empty file");

    // When: Loading the config
    let config = LognormConfig::load(&config_path)
        .await
        .expect("empty config should fall back to defaults");

    // Then: Defaults apply
    assert_eq!(config.general.log_format, "pretty");
    assert!(!config.normalizer.paths.is_empty());
}

#[tokio::test]
async fn test_config_invalid_log_format() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("lognorm.toml");
    fs::write(&config_path, "[general]\nlog_format = \"xml\"\n").expect("should write config");

    let err = LognormConfig::load(&config_path)
        .await
        .expect_err("unknown log format should be rejected");
    assert!(err.to_string().contains("log_format"));
}

#[tokio::test]
async fn test_config_empty_paths_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("lognorm.toml");
    fs::write(&config_path, "[normalizer]\npaths = []\n").expect("should write config");

    let result = LognormConfig::load(&config_path).await;
    assert!(result.is_err(), "empty paths should be rejected");
}

#[tokio::test]
async fn test_config_unicode_paths() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("설정.toml");
    fs::write(&config_path, "[normalizer]\npaths = [\"/규칙/正規化\"]\n").expect("should write config");

    let config = LognormConfig::load(&config_path)
        .await
        .expect("unicode paths should load");
    assert_eq!(config.normalizer.paths, vec!["/규칙/正規化"]);
}
