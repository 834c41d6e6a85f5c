//! Configuration resolution tests
//!
//! Covers the priority order CLI > environment > TOML file > compiled defaults,
//! and graceful handling of a missing config file.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate STRIPE_* or REAPER_* variables are marked with #[serial].

use reaper_common::config::{AppConfig, CliOverrides, CompiledDefaults, TomlConfig};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    for var in [
        "STRIPE_SECRET_KEY",
        "STRIPE_PUBLISHABLE_KEY",
        "STRIPE_WEBHOOK_SECRET",
        "REAPER_PUBLIC_URL",
    ] {
        env::remove_var(var);
    }
}

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.data_folder.as_os_str().is_empty());
    assert_eq!(defaults.bind, "127.0.0.1");
    assert_eq!(defaults.port, 5780);
    assert_eq!(defaults.log_level, "info");
}

#[test]
#[serial]
fn test_missing_config_file_uses_defaults() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let cli = CliOverrides {
        config_file: Some(temp_dir.path().join("absent.toml")),
        ..Default::default()
    };

    let config = AppConfig::resolve(&cli).expect("missing config must not be fatal");
    let defaults = CompiledDefaults::for_current_platform();

    assert_eq!(config.data_folder, defaults.data_folder);
    assert_eq!(config.port, defaults.port);
    assert!(!config.secure_cookies);
    assert!(!config.stripe.is_enabled());
    assert_eq!(config.public_url, "http://127.0.0.1:5780");
}

#[test]
#[serial]
fn test_config_file_values_applied() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        data_folder = "/srv/reaper"
        port = 9000
        secure_cookies = true
        public_url = "https://reaper.example.com/"

        [stripe]
        secret_key = "sk_test_fromfile"
        "#,
    )
    .unwrap();

    let cli = CliOverrides {
        config_file: Some(path),
        ..Default::default()
    };
    let config = AppConfig::resolve(&cli).unwrap();

    assert_eq!(config.data_folder, PathBuf::from("/srv/reaper"));
    assert_eq!(config.port, 9000);
    assert!(config.secure_cookies);
    // Trailing slash trimmed
    assert_eq!(config.public_url, "https://reaper.example.com");
    assert_eq!(config.stripe.secret_key.as_deref(), Some("sk_test_fromfile"));
    assert!(config.stripe.is_enabled());
}

#[test]
#[serial]
fn test_cli_overrides_file() {
    clear_env();
    let file = TomlConfig {
        port: Some(9000),
        bind: Some("0.0.0.0".to_string()),
        data_folder: Some(PathBuf::from("/from/file")),
        ..Default::default()
    };
    let cli = CliOverrides {
        port: Some(7000),
        data_folder: Some(PathBuf::from("/from/cli")),
        ..Default::default()
    };

    let config = AppConfig::merge(&cli, file, CompiledDefaults::for_current_platform());

    assert_eq!(config.port, 7000);
    assert_eq!(config.bind, "0.0.0.0");
    assert_eq!(config.data_folder, PathBuf::from("/from/cli"));
}

#[test]
#[serial]
fn test_env_overrides_file_for_stripe() {
    clear_env();
    env::set_var("STRIPE_SECRET_KEY", "sk_live_fromenv");
    env::set_var("STRIPE_WEBHOOK_SECRET", "  whsec_env  ");

    let mut file = TomlConfig::default();
    file.stripe.secret_key = Some("sk_test_fromfile".to_string());

    let config = AppConfig::merge(&CliOverrides::default(), file, CompiledDefaults::for_current_platform());

    assert_eq!(config.stripe.secret_key.as_deref(), Some("sk_live_fromenv"));
    assert_eq!(config.stripe.webhook_secret.as_deref(), Some("whsec_env"));

    clear_env();
}

#[test]
#[serial]
fn test_malformed_config_file_is_error() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    let cli = CliOverrides {
        config_file: Some(path),
        ..Default::default()
    };
    assert!(AppConfig::resolve(&cli).is_err());
}

#[test]
fn test_ensure_data_folder_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let folder = temp_dir.path().join("nested").join("data");
    let cli = CliOverrides {
        data_folder: Some(folder.clone()),
        ..Default::default()
    };
    let config = AppConfig::merge(&cli, TomlConfig::default(), CompiledDefaults::for_current_platform());

    config.ensure_data_folder().unwrap();
    assert!(folder.is_dir());
    assert_eq!(config.database_path(), folder.join("reaper.db"));
}
