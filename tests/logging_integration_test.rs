//! Integration tests for logging initialization
//!
//! A global subscriber can be installed once per process, so only one test
//! here calls `init_logging` successfully.

use tempfile::TempDir;
use threat_migrate::config::LoggingConfig;
use threat_migrate::logging::init_logging;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
    assert_eq!(config.local_max_size_mb, 100);
}

#[test]
fn test_invalid_level_rejected() {
    let config = LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    };

    let err = init_logging("chatty", &config).unwrap_err();
    assert!(err.to_string().contains("chatty"));
}

#[test]
fn test_json_file_logging() {
    std::env::remove_var("RUST_LOG");
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
        local_max_size_mb: 10,
    };

    let guard = init_logging("debug", &config).unwrap();
    threat_migrate::log_batch_result!(
        3,
        "committed",
        10u64,
        0u64,
        std::time::Duration::from_millis(12)
    );
    drop(guard);

    let entries: Vec<_> = std::fs::read_dir(&log_path)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);

    let file = &entries[0];
    let name = file.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("threat-migrate.log"), "unexpected file {name}");

    let contents = std::fs::read_to_string(file).unwrap();
    let first_line = contents.lines().next().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(first_line).unwrap();
    assert_eq!(parsed["fields"]["message"], "Logging initialized");
}
