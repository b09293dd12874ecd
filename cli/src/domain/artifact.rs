//! Artifact plan and materialization report types.
//!
//! Describes *what* goes where under the infra root; the materializer
//! service decides *how* it gets there.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::error::MaterializationError;

/// Suffix of the sibling path used when an overwrite is declined.
pub const ALTERNATE_SUFFIX: &str = ".NEW";

/// Where an artifact lives and who owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Rendered once into `<root>/<env>/`, linked from every region.
    EnvironmentShared,
    /// Rendered into `<root>/<env>/<region>/` on every run.
    RegionLocal,
    /// A bundled directory copied into the region directory once.
    Bundle,
}

/// One entry of the artifact plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    /// Template identifier (or bundle name for [`ArtifactKind::Bundle`]).
    pub template: String,
    /// File or directory name inside the target directory.
    pub file_name: String,
    pub kind: ArtifactKind,
}

impl ArtifactSpec {
    #[must_use]
    pub fn shared(template: &str, file_name: &str) -> Self {
        Self {
            template: template.to_string(),
            file_name: file_name.to_string(),
            kind: ArtifactKind::EnvironmentShared,
        }
    }

    #[must_use]
    pub fn local(template: &str, file_name: &str) -> Self {
        Self {
            template: template.to_string(),
            file_name: file_name.to_string(),
            kind: ArtifactKind::RegionLocal,
        }
    }

    #[must_use]
    pub fn bundle(name: &str) -> Self {
        Self {
            template: name.to_string(),
            file_name: name.to_string(),
            kind: ArtifactKind::Bundle,
        }
    }
}

/// The Terraform tree written for every (environment, region).
#[must_use]
pub fn default_plan() -> Vec<ArtifactSpec> {
    vec![
        ArtifactSpec::shared("aws/variable.tf", "variable.tf"),
        ArtifactSpec::local("aws/provider.tf", "provider.tf"),
        ArtifactSpec::local("aws/terraform.tfvars", "terraform.tfvars"),
        ArtifactSpec::local("aws/vpc.tf", "vpc.tf"),
        ArtifactSpec::bundle("scripts"),
    ]
}

/// Directory layout under the infra root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
    env: String,
    region: String,
}

impl Layout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, env: &str, region: &str) -> Self {
        Self {
            root: root.into(),
            env: env.to_string(),
            region: region.to_string(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<env>`
    #[must_use]
    pub fn env_dir(&self) -> PathBuf {
        self.root.join(&self.env)
    }

    /// `<root>/<env>/<region>`
    #[must_use]
    pub fn region_dir(&self) -> PathBuf {
        self.env_dir().join(&self.region)
    }

    /// Where the concrete bytes of `spec` are written.
    #[must_use]
    pub fn target(&self, spec: &ArtifactSpec) -> PathBuf {
        match spec.kind {
            ArtifactKind::EnvironmentShared => self.env_dir().join(&spec.file_name),
            ArtifactKind::RegionLocal | ArtifactKind::Bundle => {
                self.region_dir().join(&spec.file_name)
            }
        }
    }

    /// Region-level reference to a shared artifact. `None` for other kinds.
    #[must_use]
    pub fn reference(&self, spec: &ArtifactSpec) -> Option<PathBuf> {
        (spec.kind == ArtifactKind::EnvironmentShared)
            .then(|| self.region_dir().join(&spec.file_name))
    }

    /// Link target written into the region reference: relative, so the tree
    /// can be moved as a whole.
    #[must_use]
    pub fn reference_target(spec: &ArtifactSpec) -> PathBuf {
        Path::new("..").join(&spec.file_name)
    }

    /// `<root>/<env>/<region>/<env>-<region>.pem` and `.pub`.
    #[must_use]
    pub fn key_pair(&self) -> (PathBuf, PathBuf) {
        let stem = format!("{}-{}", self.env, self.region);
        let dir = self.region_dir();
        (dir.join(format!("{stem}.pem")), dir.join(format!("{stem}.pub")))
    }
}

/// The `n`-th alternate path for `path`: `x.NEW`, `x.NEW.1`, `x.NEW.2`, …
#[must_use]
pub fn alternate_path(path: &Path, n: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(ALTERNATE_SUFFIX);
    if n > 0 {
        name.push(format!(".{n}"));
    }
    PathBuf::from(name)
}

// ── Outcomes ─────────────────────────────────────────────────────────────────

/// What happened to one concrete file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum FileAction {
    /// The file did not exist and was written.
    Created,
    /// The file existed, the overwrite was confirmed, and it was replaced.
    Replaced,
    /// The file already held exactly the rendered content.
    Unchanged,
    /// The overwrite was declined; new content went to `alternate`.
    Deferred { alternate: PathBuf },
    /// A shared file already existed; it belongs to the region that created it.
    Reused,
}

impl FileAction {
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Unchanged | Self::Reused)
    }
}

/// What happened to a region's reference to a shared file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum LinkAction {
    Linked,
    /// The reference already resolved to the canonical file.
    AlreadyLinked,
    /// A foreign file or link was replaced after confirmation.
    Relinked,
    /// Replacing a foreign entry was declined; the link went to `alternate`.
    Deferred { alternate: PathBuf },
}

impl LinkAction {
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::AlreadyLinked)
    }
}

/// What happened to a bundled directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirAction {
    Created,
    /// The destination already existed and was left untouched.
    Skipped,
}

/// Outcome of one [`ArtifactSpec`].
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ArtifactOutcome {
    File {
        file: FileAction,
    },
    Shared {
        canonical: FileAction,
        reference: LinkAction,
    },
    Directory {
        directory: DirAction,
    },
    Failed {
        code: &'static str,
        message: String,
        #[serde(skip)]
        error: MaterializationError,
    },
}

impl ArtifactOutcome {
    #[must_use]
    pub fn failed(error: MaterializationError) -> Self {
        Self::Failed {
            code: error.code(),
            message: error.to_string(),
            error,
        }
    }

    /// `true` when nothing on disk changed.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        match self {
            Self::File { file } => file.is_skip(),
            Self::Shared {
                canonical,
                reference,
            } => canonical.is_skip() && reference.is_skip(),
            Self::Directory { directory } => *directory == DirAction::Skipped,
            Self::Failed { .. } => false,
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One line of the report.
#[derive(Debug, Serialize)]
pub struct ArtifactReport {
    pub template: String,
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub outcome: ArtifactOutcome,
}

/// Result of creating one of the target directories.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryReport {
    pub path: PathBuf,
    pub created: bool,
}

/// Everything one materialization run did.
#[derive(Debug, Default, Serialize)]
pub struct MaterializationReport {
    pub directories: Vec<DirectoryReport>,
    pub artifacts: Vec<ArtifactReport>,
}

impl MaterializationReport {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.artifacts.iter().any(|a| a.outcome.is_failure())
    }

    /// `true` when the run changed nothing on disk.
    #[must_use]
    pub fn all_skipped(&self) -> bool {
        self.directories.iter().all(|d| !d.created)
            && self.artifacts.iter().all(|a| a.outcome.is_skip())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ArtifactReport> {
        self.artifacts.iter().filter(|a| a.outcome.is_failure())
    }
}
