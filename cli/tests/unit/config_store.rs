//! `YamlConfigStore` and the config service against a real file.
//!
//! These tests point `VPCFORGE_CONFIG` at a temp file, so they are
//! serialized with `serial_test`.

#![allow(clippy::expect_used, clippy::unwrap_used, unsafe_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use serial_test::serial;
use tempfile::TempDir;
use vpcforge_cli::application::ports::ConfigStore;
use vpcforge_cli::application::services::config_service::{load_config, set_config_value};
use vpcforge_cli::domain::VpcforgeConfig;
use vpcforge_cli::domain::error::ConfigError;
use vpcforge_cli::infra::config::{CONFIG_ENV, YamlConfigStore};

fn point_config_at(path: &Path) {
    // SAFETY: every test touching CONFIG_ENV is #[serial].
    unsafe { std::env::set_var(CONFIG_ENV, path) };
}

#[test]
#[serial]
fn test_path_honours_env_override() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/config.yaml");
    point_config_at(&path);

    assert_eq!(YamlConfigStore.path().unwrap(), path);
}

#[test]
#[serial]
fn test_missing_file_loads_defaults() {
    let dir = TempDir::new().unwrap();
    point_config_at(&dir.path().join("config.yaml"));

    assert_eq!(load_config(&YamlConfigStore).unwrap(), VpcforgeConfig::default());
    assert!(!dir.path().join("config.yaml").exists());
}

#[test]
#[serial]
fn test_set_persists_with_owner_only_mode() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/config.yaml");
    point_config_at(&path);

    set_config_value(&YamlConfigStore, "network.regions", "us-east-1, eu-west-1").unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
    let reloaded = load_config(&YamlConfigStore).unwrap();
    assert_eq!(reloaded.network.regions, ["us-east-1", "eu-west-1"]);
    assert_eq!(reloaded.network.subnet_prefix, 24);
}

#[test]
#[serial]
fn test_set_invalid_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    point_config_at(&path);
    set_config_value(&YamlConfigStore, "network.subnet_prefix", "20").unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    let err = set_config_value(&YamlConfigStore, "network.subnet_prefix", "0").unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::InvalidValue { .. })
    ));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
#[serial]
fn test_clearing_optional_path() {
    let dir = TempDir::new().unwrap();
    point_config_at(&dir.path().join("config.yaml"));

    set_config_value(&YamlConfigStore, "infra.templates", "/srv/templates").unwrap();
    assert!(load_config(&YamlConfigStore).unwrap().infra.templates.is_some());
    set_config_value(&YamlConfigStore, "infra.templates", "").unwrap();
    assert!(load_config(&YamlConfigStore).unwrap().infra.templates.is_none());
}

#[test]
#[serial]
fn test_unparseable_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "network: [not, a, map]\n").unwrap();
    point_config_at(&path);

    let err = format!("{:#}", load_config(&YamlConfigStore).unwrap_err());
    assert!(err.contains("cannot parse"), "got: {err}");
}
