//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::Result;

use crate::domain::{AvailabilityZone, TemplateData, VpcforgeConfig};

// ── Value Types ───────────────────────────────────────────────────────────────

/// One file of a bundled directory, path relative to the bundle root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFile {
    pub path: PathBuf,
    pub contents: Vec<u8>,
    pub executable: bool,
}

/// Decision for an existing destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Replace the existing file in place.
    Overwrite,
    /// Leave the existing file and write to an alternate path.
    KeepOriginal,
}

/// Freshly generated SSH key material.
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// PEM-encoded private key.
    pub private_pem: Vec<u8>,
    /// OpenSSH-format public key line.
    pub public_openssh: Vec<u8>,
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or times out.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with extra environment variables set on the child only.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds the
    /// runner's timeout. On timeout, the child process is killed.
    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<Output>;
}

// ── Collaborator Ports ────────────────────────────────────────────────────────

/// Lists the availability zones of a region, in provider order.
#[allow(async_fn_in_trait)]
pub trait ZoneDiscovery {
    /// `profile` selects the credentials profile (the environment name).
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be queried or answers garbage.
    async fn list_zones(&self, region: &str, profile: &str) -> Result<Vec<AvailabilityZone>>;
}

/// Renders templates and serves bundled directories. Never inspected by the core.
pub trait TemplateSource {
    /// Render `template` with `data`.
    ///
    /// # Errors
    ///
    /// Returns the engine's error unchanged if the template is unknown or fails.
    fn render(&self, template: &str, data: &TemplateData<'_>) -> Result<String>;

    /// Files of the bundle `name`, or `None` if there is no such bundle.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle exists but cannot be read.
    fn bundle(&self, name: &str) -> Result<Option<Vec<BundleFile>>>;
}

/// Decides what happens to an existing destination.
pub trait ConflictResolver {
    /// `Ok(None)` means no decision is available (non-interactive run).
    ///
    /// # Errors
    ///
    /// Returns an error if asking for a decision fails (e.g. no TTY).
    fn resolve(&self, path: &Path) -> Result<Option<Resolution>>;
}

/// Generates SSH key pairs.
#[allow(async_fn_in_trait)]
pub trait KeyGenerator {
    /// Generate a fresh key pair labelled `comment`.
    ///
    /// # Errors
    ///
    /// Returns an error if the generator fails or its output is unusable.
    async fn generate(&self, comment: &str) -> Result<KeyPair>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Config and Filesystem Ports ───────────────────────────────────────────────

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<VpcforgeConfig>;
    /// Persist the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn save(&self, config: &VpcforgeConfig) -> Result<()>;
    /// Location of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if no location can be determined.
    fn path(&self) -> Result<PathBuf>;
}

/// Filesystem operations the materializer needs. Every mutating call is
/// complete-or-absent: a concurrent observer sees the old state or the new
/// state, never a partial file or directory.
pub trait ArtifactFs {
    /// Create `path` and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, with the path attached.
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    /// Create the single directory `path`. `Ok(false)` if it already existed.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, with the path attached.
    fn create_dir(&self, path: &Path) -> Result<bool>;
    /// `true` if anything (file, directory, or link, even dangling) is at `path`.
    fn exists(&self, path: &Path) -> bool;
    /// Contents of the file at `path` (following links), `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, with the path attached.
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>>;
    /// Write a new file with `mode`. `Ok(false)` if `path` already existed;
    /// the existing entry is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, with the path attached.
    fn write_new(&self, path: &Path, contents: &[u8], mode: u32) -> Result<bool>;
    /// Atomically replace whatever is at `path` with a file of `contents`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, with the path attached.
    fn replace(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()>;
    /// `true` if `link` resolves to the same file as `canonical`.
    fn same_file(&self, link: &Path, canonical: &Path) -> bool;
    /// Create a symlink at `link` pointing at `target`. `Ok(false)` if
    /// something already existed at `link`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, with the path attached.
    fn symlink_new(&self, target: &Path, link: &Path) -> Result<bool>;
    /// Atomically replace whatever is at `link` with a symlink to `target`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, with the path attached.
    fn replace_symlink(&self, target: &Path, link: &Path) -> Result<()>;
    /// Populate `dest` with `files`. `Ok(false)` if `dest` already existed;
    /// nothing is merged into it.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, with the path attached.
    fn install_dir(&self, dest: &Path, files: &[BundleFile]) -> Result<bool>;
}
