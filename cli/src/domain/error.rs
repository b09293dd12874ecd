//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed cause carried by collaborator and materialization errors.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

// ── Network errors ────────────────────────────────────────────────────────────

/// Errors parsing or partitioning a CIDR block.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid CIDR block '{0}': expected <address>/<prefix>, e.g. 10.0.0.0/16")]
    InvalidCidr(String),

    #[error("Invalid IPv4 address '{0}'")]
    InvalidAddress(String),

    #[error("Prefix length /{0} is longer than /32")]
    PrefixTooLong(u8),

    #[error("'{cidr}' has host bits set. Did you mean {network}?")]
    HostBitsSet { cidr: String, network: String },

    #[error("Subnet prefix /{prefix} must be longer than the parent block {parent}")]
    PrefixNotLonger { parent: String, prefix: u8 },
}

// ── Planning errors ───────────────────────────────────────────────────────────

/// Errors raised while planning a topology. Always fatal, always raised
/// before anything touches the filesystem.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanningError {
    #[error(
        "{parent} holds {available} /{prefix} subnets but {needed} are needed \
         (one private and one public per zone)"
    )]
    InsufficientAddressSpace {
        parent: String,
        prefix: u8,
        needed: u64,
        available: u64,
    },

    #[error("{block} is not inside the VPC block {parent}")]
    BlockOutOfRange { block: String, parent: String },

    #[error("Private block {private} overlaps public block {public}")]
    OverlappingBlocks { private: String, public: String },

    #[error("No availability zones to allocate into")]
    NoZones,

    #[error("Zone '{zone}' is listed more than once")]
    DuplicateZone { zone: String },

    #[error("Zone '{zone}' is not one of: {known}")]
    UnknownZone { zone: String, known: String },

    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

// ── Materialization errors ────────────────────────────────────────────────────

/// Per-artifact failures. Never abort sibling artifacts.
#[derive(Debug, Error)]
pub enum MaterializationError {
    #[error("{} already exists and no overwrite decision was given", path.display())]
    PathConflict { path: PathBuf },

    #[error("cannot link {} -> {}: {source}", link.display(), target.display())]
    ReferenceCreationFailed {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: Cause,
    },

    #[error("rendering template '{template}' failed: {source}")]
    RenderFailed {
        template: String,
        #[source]
        source: Cause,
    },

    #[error("writing {} failed: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: Cause,
    },

    #[error("no bundled directory named '{0}'")]
    BundleMissing(String),
}

impl MaterializationError {
    /// Stable machine-readable code for JSON output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PathConflict { .. } => "path_conflict",
            Self::ReferenceCreationFailed { .. } => "reference_creation_failed",
            Self::RenderFailed { .. } => "render_failed",
            Self::WriteFailed { .. } => "write_failed",
            Self::BundleMissing(_) => "bundle_missing",
        }
    }
}

// ── Collaborator errors ───────────────────────────────────────────────────────

/// Failures of the external collaborators around the core.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("availability zone discovery for {region} failed: {source}")]
    ZoneDiscovery {
        region: String,
        #[source]
        source: Cause,
    },

    #[error("key pair generation failed: {source}")]
    KeyGeneration {
        #[source]
        source: Cause,
    },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration keys, values, and command input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },

    #[error("Unknown environment '{env}'. Valid environments: {valid}")]
    UnknownEnvironment { env: String, valid: String },

    #[error("Unknown region '{region}'. Valid regions: {valid}")]
    UnknownRegion { region: String, valid: String },

    #[error("Missing required option: {0}")]
    MissingOption(&'static str),

    #[error("{0}")]
    ConflictingOptions(String),
}
