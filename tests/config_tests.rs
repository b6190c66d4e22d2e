//! Scanner configuration: builder defaults, validation and JSON files

use std::time::Duration;

use jobprobe::{ConfigError, ScannerConfig};
use tempfile::TempDir;

#[test]
fn test_builder_defaults() {
    let config = ScannerConfig::builder().build().unwrap();
    assert!(config.headless());
    assert_eq!(config.max_pages_per_source(), 20);
    assert_eq!(config.session_wait_timeout(), Duration::from_secs(60));
    assert_eq!(config.navigation_retry_backoff(), Duration::from_millis(2000));
    assert_eq!(config.min_interval_secs(), 60);
    assert_eq!(config.max_interval_secs(), 7 * 24 * 60 * 60);
    assert!(config.data_dir().to_string_lossy().contains("jobprobe"));
}

#[test]
fn test_builder_overrides() {
    let dir = TempDir::new().unwrap();
    let config = ScannerConfig::builder()
        .data_dir(dir.path())
        .max_pages_per_source(3)
        .session_wait_timeout_secs(5)
        .min_page_interval_ms(250)
        .build()
        .unwrap();
    assert_eq!(config.data_dir(), dir.path());
    assert_eq!(config.max_pages_per_source(), 3);
    assert_eq!(config.session_wait_timeout_secs(), 5);
    assert_eq!(config.min_page_interval(), Duration::from_millis(250));
}

#[test]
fn test_invalid_values_are_rejected() {
    let err = ScannerConfig::builder()
        .page_load_timeout_secs(0)
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid {
            field: "page_load_timeout_secs",
            ..
        }
    ));

    let err = ScannerConfig::builder().event_capacity(0).build().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "event_capacity", .. }));
}

#[test]
fn test_json_file_with_partial_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("jobprobe.json");
    std::fs::write(&path, r#"{ "max_pages_per_source": 4, "min_interval_secs": 120 }"#).unwrap();

    let config = ScannerConfig::from_json_file(&path).unwrap();
    assert_eq!(config.max_pages_per_source(), 4);
    assert_eq!(config.min_interval_secs(), 120);
    assert!(config.headless());
    assert_eq!(config.session_wait_timeout_secs(), 60);
}

#[test]
fn test_headed_mode_matches_between_builder_and_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("headed.json");
    std::fs::write(&path, r#"{ "headless": false }"#).unwrap();

    let from_json = ScannerConfig::from_json_file(&path).unwrap();
    let from_builder = ScannerConfig::builder().headless(false).build().unwrap();
    assert!(!from_json.headless());
    assert!(!from_builder.headless());
}

#[test]
fn test_json_file_errors() {
    let dir = TempDir::new().unwrap();
    let missing = ScannerConfig::from_json_file(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(missing, ConfigError::Read { .. }));

    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ max_pages").unwrap();
    assert!(matches!(
        ScannerConfig::from_json_file(&path).unwrap_err(),
        ConfigError::Parse(_)
    ));

    std::fs::write(&path, r#"{ "min_interval_secs": 500, "max_interval_secs": 100 }"#).unwrap();
    assert!(matches!(
        ScannerConfig::from_json_file(&path).unwrap_err(),
        ConfigError::Invalid { .. }
    ));
}
