//! Tests for config module

use std::io::Write;
use std::path::Path;

use taskhub::config::Config;

#[test]
fn test_config_file_exists() {
    let config_path = Path::new("config.toml");
    assert!(
        config_path.exists(),
        "config.toml should exist in project root"
    );
}

#[test]
fn test_bundled_config_loads() {
    let config = Config::from_file(Path::new("config.toml")).expect("config.toml should parse");

    assert!(config.validate().is_ok());
    assert_eq!(config.server.bind_address.port(), 8080);
    assert_eq!(config.scheduler.tick_interval_secs, 60);
    assert!(config.server.restart_timeout_secs.is_none());
}

#[test]
fn test_config_from_temp_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
bind_address = "127.0.0.1:9100"
restart_timeout_secs = 10

[database]
sqlite_path = "/tmp/taskhub-test.db"

[logging]
format = "json"
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();

    assert!(config.validate().is_ok());
    assert_eq!(config.server.bind_address.port(), 9100);
    assert_eq!(config.server.restart_timeout_secs, Some(10));
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.scheduler.tick_interval_secs, 60);
}

#[test]
fn test_invalid_toml_is_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[server\nbind_address = ").unwrap();

    let err = Config::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse TOML config file"));
}

#[test]
fn test_missing_file_is_error() {
    let err = Config::from_file(Path::new("does/not/exist.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_zero_tick_interval_fails_validation() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[scheduler]\ntick_interval_secs = 0").unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert!(config.validate().is_err());
}
