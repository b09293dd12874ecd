//! Domain types and validators for vpcforge configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::network::MAX_PREFIX;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "infra.root",
    "infra.templates",
    "network.subnet_prefix",
    "network.environments",
    "network.regions",
    "aws.credentials_file",
];

pub const DEFAULT_INFRA_ROOT: &str = "/opt/infra";
pub const DEFAULT_SUBNET_PREFIX: u8 = 24;
pub const DEFAULT_ENVIRONMENTS: &[&str] = &["dev", "prod", "default"];
pub const DEFAULT_REGIONS: &[&str] = &["us-east-1"];

static NAME_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").ok());

/// `true` if `name` is usable as an environment/region directory name.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.as_ref().is_some_and(|re| re.is_match(name))
}

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.vpcforge/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct VpcforgeConfig {
    pub infra: InfraConfig,
    pub network: NetworkConfig,
    pub aws: AwsConfig,
}

/// Where artifacts are written and where templates come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InfraConfig {
    /// Root of the `<env>/<region>` tree.
    pub root: PathBuf,
    /// Template directory; built-in templates are used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates: Option<PathBuf>,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_INFRA_ROOT),
            templates: None,
        }
    }
}

/// Allocation defaults and the allowed environment/region names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    pub subnet_prefix: u8,
    pub environments: Vec<String>,
    pub regions: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            subnet_prefix: DEFAULT_SUBNET_PREFIX,
            environments: DEFAULT_ENVIRONMENTS.iter().map(ToString::to_string).collect(),
            regions: DEFAULT_REGIONS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// AWS settings handed to zone discovery.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AwsConfig {
    /// Shared credentials file passed to the `aws` CLI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,
}

impl VpcforgeConfig {
    /// All settings as `(key, display value)` pairs, in key order.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let path_or_unset = |p: &Option<PathBuf>| {
            p.as_ref()
                .map_or_else(|| "(unset)".to_string(), |p| p.display().to_string())
        };
        vec![
            ("infra.root", self.infra.root.display().to_string()),
            ("infra.templates", path_or_unset(&self.infra.templates)),
            ("network.subnet_prefix", self.network.subnet_prefix.to_string()),
            ("network.environments", self.network.environments.join(",")),
            ("network.regions", self.network.regions.join(",")),
            ("aws.credentials_file", path_or_unset(&self.aws.credentials_file)),
        ]
    }

    /// Validate and apply `key = value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is invalid for it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_config_key(key)?;
        validate_config_value(key, value)?;
        match key {
            "infra.root" => self.infra.root = PathBuf::from(value),
            "infra.templates" => self.infra.templates = optional_path(value),
            "network.subnet_prefix" => self.network.subnet_prefix = value.parse()?,
            "network.environments" => self.network.environments = split_list(value),
            "network.regions" => self.network.regions = split_list(value),
            "aws.credentials_file" => self.aws.credentials_file = optional_path(value),
            _ => anyhow::bail!("Unknown setting: {key}"),
        }
        Ok(())
    }
}

/// Empty string clears an optional path.
fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

/// Split a comma-separated list, trimming entries.
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    let invalid = |valid: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        valid: valid.to_string(),
    };
    match key {
        "infra.root" if value.trim().is_empty() => Err(invalid("a non-empty path").into()),
        "network.subnet_prefix" => match value.parse::<u8>() {
            Ok(p) if (1..=MAX_PREFIX).contains(&p) => Ok(()),
            _ => Err(invalid("an integer from 1 to 32").into()),
        },
        "network.environments" | "network.regions" => {
            let names = split_list(value);
            if names.is_empty() || !names.iter().all(|n| is_valid_name(n)) {
                return Err(invalid("comma-separated lowercase names, e.g. dev,prod").into());
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
