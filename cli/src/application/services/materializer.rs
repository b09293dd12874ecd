//! Application service: writes a topology record out as a Terraform tree.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through the injected [`ArtifactFs`].
//!
//! Every step re-reads the filesystem instead of trusting earlier runs, so
//! re-running after an interruption, or alongside another run, converges on
//! the same tree. An existing file is never replaced without a decision from
//! the [`ConflictResolver`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::{ArtifactFs, ConflictResolver, Resolution, TemplateSource};
use crate::domain::artifact::{
    ArtifactKind, ArtifactOutcome, ArtifactReport, ArtifactSpec, DirAction, DirectoryReport,
    FileAction, Layout, LinkAction, MaterializationReport, alternate_path,
};
use crate::domain::error::MaterializationError;
use crate::domain::topology::{TemplateData, TopologyRecord};

/// Mode of rendered configuration files.
pub const FILE_MODE: u32 = 0o644;

/// Alternates tried before giving up on a declined overwrite.
const MAX_ALTERNATES: usize = 100;

/// What a group member's path holds before placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Absent,
    Same,
    Different,
}

/// Materializes records under one infra root.
pub struct Materializer<'a, F, R> {
    fs: &'a F,
    resolver: &'a R,
    root: PathBuf,
}

impl<'a, F: ArtifactFs, R: ConflictResolver> Materializer<'a, F, R> {
    #[must_use]
    pub fn new(fs: &'a F, resolver: &'a R, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            resolver,
            root: root.into(),
        }
    }

    /// The filesystem this materializer writes through.
    #[must_use]
    pub fn fs(&self) -> &'a F {
        self.fs
    }

    /// Directory layout for `record` under this root.
    #[must_use]
    pub fn layout(&self, record: &TopologyRecord) -> Layout {
        Layout::new(&self.root, record.env(), record.region())
    }

    /// Create the `<env>/<region>` directories and every artifact of `plan`.
    ///
    /// Artifacts are independent: a failure is recorded in the report and
    /// the remaining artifacts are still attempted.
    ///
    /// # Errors
    ///
    /// Returns an error only if the target directories cannot be created,
    /// in which case no artifact is attempted.
    pub fn materialize(
        &self,
        record: &TopologyRecord,
        plan: &[ArtifactSpec],
        templates: &impl TemplateSource,
    ) -> Result<MaterializationReport> {
        let layout = self.layout(record);
        let mut report = MaterializationReport::default();

        self.fs
            .create_dir_all(layout.root())
            .with_context(|| format!("creating infra root {}", layout.root().display()))?;
        for dir in [layout.env_dir(), layout.region_dir()] {
            let created = self
                .fs
                .create_dir(&dir)
                .with_context(|| format!("creating {}", dir.display()))?;
            if created {
                tracing::debug!(path = %dir.display(), "created directory");
            } else {
                tracing::debug!(path = %dir.display(), "directory already exists");
            }
            report.directories.push(DirectoryReport { path: dir, created });
        }

        let data = record.template_data();
        for spec in plan {
            let outcome = match spec.kind {
                ArtifactKind::EnvironmentShared => self.shared(&layout, spec, &data, templates),
                ArtifactKind::RegionLocal => self.local(&layout, spec, &data, templates),
                ArtifactKind::Bundle => self.bundle(&layout, spec, templates),
            }
            .unwrap_or_else(ArtifactOutcome::failed);

            let path = layout.target(spec);
            match &outcome {
                ArtifactOutcome::Failed { message, .. } => {
                    tracing::info!(path = %path.display(), "artifact failed: {message}");
                }
                other => tracing::info!(path = %path.display(), outcome = ?other, "artifact done"),
            }
            report.artifacts.push(ArtifactReport {
                template: spec.template.clone(),
                kind: spec.kind,
                path,
                outcome,
            });
        }
        Ok(report)
    }

    /// Write `contents` to `path` under the overwrite policy.
    ///
    /// - absent → created
    /// - identical content → unchanged
    /// - different content → the resolver decides: replace in place, or
    ///   write to the first free `<path>.NEW[.n]`. No decision is a
    ///   [`MaterializationError::PathConflict`].
    ///
    /// # Errors
    ///
    /// Returns a per-artifact [`MaterializationError`].
    fn place_file(
        &self,
        path: &Path,
        contents: &[u8],
        mode: u32,
    ) -> Result<FileAction, MaterializationError> {
        match self.fs.read(path).map_err(|e| write_failed(path, e))? {
            Some(existing) if existing == contents => return Ok(FileAction::Unchanged),
            Some(_) => {}
            None => {
                if self
                    .fs
                    .write_new(path, contents, mode)
                    .map_err(|e| write_failed(path, e))?
                {
                    return Ok(FileAction::Created);
                }
                // Someone else got there first (or a dangling link sits here).
                if self.fs.read(path).map_err(|e| write_failed(path, e))?.as_deref()
                    == Some(contents)
                {
                    return Ok(FileAction::Unchanged);
                }
            }
        }

        match self.decide(path)? {
            Resolution::Overwrite => {
                self.fs
                    .replace(path, contents, mode)
                    .map_err(|e| write_failed(path, e))?;
                tracing::info!(path = %path.display(), "replaced after confirmation");
                Ok(FileAction::Replaced)
            }
            Resolution::KeepOriginal => {
                let alternate = self.write_alternate(path, contents, mode)?;
                tracing::info!(
                    path = %path.display(),
                    alternate = %alternate.display(),
                    "kept original, wrote alternate"
                );
                Ok(FileAction::Deferred { alternate })
            }
        }
    }

    /// Place files that are only valid together, such as the halves of a
    /// key pair.
    ///
    /// Absent members are created and identical ones left alone. If any
    /// member differs from what is on disk, the resolver is asked once for
    /// the whole group: every member is replaced in place, or every member
    /// goes to the first `.NEW[.n]` suffix free for all of them. The group
    /// never ends up split between original and alternate names.
    ///
    /// # Errors
    ///
    /// Returns a [`MaterializationError`] for the first member that could
    /// not be read or written, or a `PathConflict` when no decision is given.
    pub fn place_together(
        &self,
        files: &[(&Path, &[u8])],
        mode: u32,
    ) -> Result<Vec<FileAction>, MaterializationError> {
        let mut slots = Vec::with_capacity(files.len());
        for (path, contents) in files {
            slots.push(match self.fs.read(path).map_err(|e| write_failed(path, e))? {
                None => Slot::Absent,
                Some(existing) if existing == *contents => Slot::Same,
                Some(_) => Slot::Different,
            });
        }

        let clash = files
            .iter()
            .zip(&slots)
            .find(|(_, slot)| **slot == Slot::Different)
            .map(|((path, _), _)| *path);
        let resolution = clash.map(|path| self.decide(path)).transpose()?;

        if resolution == Some(Resolution::KeepOriginal) {
            let n = self.free_group_suffix(files)?;
            return files
                .iter()
                .map(|(path, contents)| {
                    let alternate = alternate_path(path, n);
                    self.create(&alternate, contents, mode)?;
                    Ok(FileAction::Deferred { alternate })
                })
                .collect();
        }

        files
            .iter()
            .zip(&slots)
            .map(|((path, contents), slot)| match slot {
                Slot::Same => Ok(FileAction::Unchanged),
                Slot::Absent => self.create(path, contents, mode),
                Slot::Different => {
                    self.fs
                        .replace(path, contents, mode)
                        .map_err(|e| write_failed(path, e))?;
                    Ok(FileAction::Replaced)
                }
            })
            .collect()
    }

    fn create(
        &self,
        path: &Path,
        contents: &[u8],
        mode: u32,
    ) -> Result<FileAction, MaterializationError> {
        if self
            .fs
            .write_new(path, contents, mode)
            .map_err(|e| write_failed(path, e))?
        {
            Ok(FileAction::Created)
        } else {
            Err(MaterializationError::PathConflict {
                path: path.to_path_buf(),
            })
        }
    }

    fn free_group_suffix(&self, files: &[(&Path, &[u8])]) -> Result<usize, MaterializationError> {
        (0..MAX_ALTERNATES)
            .find(|&n| {
                files
                    .iter()
                    .all(|(path, _)| !self.fs.exists(&alternate_path(path, n)))
            })
            .ok_or_else(|| {
                let path = files.first().map_or_else(PathBuf::new, |(p, _)| p.to_path_buf());
                write_failed(
                    &path,
                    anyhow::anyhow!("no free alternate path after {MAX_ALTERNATES} attempts"),
                )
            })
    }

    fn decide(&self, path: &Path) -> Result<Resolution, MaterializationError> {
        match self.resolver.resolve(path) {
            Ok(Some(resolution)) => Ok(resolution),
            Ok(None) => Err(MaterializationError::PathConflict {
                path: path.to_path_buf(),
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), "no overwrite decision: {e:#}");
                Err(MaterializationError::PathConflict {
                    path: path.to_path_buf(),
                })
            }
        }
    }

    fn write_alternate(
        &self,
        path: &Path,
        contents: &[u8],
        mode: u32,
    ) -> Result<PathBuf, MaterializationError> {
        for n in 0..MAX_ALTERNATES {
            let alternate = alternate_path(path, n);
            match self.fs.read(&alternate).map_err(|e| write_failed(&alternate, e))? {
                Some(existing) if existing == contents => return Ok(alternate),
                Some(_) => {}
                None => {
                    if self
                        .fs
                        .write_new(&alternate, contents, mode)
                        .map_err(|e| write_failed(&alternate, e))?
                    {
                        return Ok(alternate);
                    }
                }
            }
        }
        Err(write_failed(
            path,
            anyhow::anyhow!("no free alternate path after {MAX_ALTERNATES} attempts"),
        ))
    }

    fn local(
        &self,
        layout: &Layout,
        spec: &ArtifactSpec,
        data: &TemplateData<'_>,
        templates: &impl TemplateSource,
    ) -> Result<ArtifactOutcome, MaterializationError> {
        let rendered = render(templates, spec, data)?;
        let file = self.place_file(&layout.target(spec), rendered.as_bytes(), FILE_MODE)?;
        Ok(ArtifactOutcome::File { file })
    }

    fn shared(
        &self,
        layout: &Layout,
        spec: &ArtifactSpec,
        data: &TemplateData<'_>,
        templates: &impl TemplateSource,
    ) -> Result<ArtifactOutcome, MaterializationError> {
        let canonical_path = layout.target(spec);
        let Some(link) = layout.reference(spec) else {
            return self.local(layout, spec, data, templates);
        };

        // The first region to get here owns the canonical file; later
        // regions neither re-render nor rewrite it.
        let canonical = if self.fs.exists(&canonical_path) {
            FileAction::Reused
        } else {
            let rendered = render(templates, spec, data)?;
            let created = self
                .fs
                .write_new(&canonical_path, rendered.as_bytes(), FILE_MODE)
                .map_err(|e| write_failed(&canonical_path, e))?;
            if created {
                FileAction::Created
            } else {
                FileAction::Reused
            }
        };

        let reference = self.reference(&canonical_path, &link, &Layout::reference_target(spec))?;
        Ok(ArtifactOutcome::Shared {
            canonical,
            reference,
        })
    }

    fn reference(
        &self,
        canonical: &Path,
        link: &Path,
        target: &Path,
    ) -> Result<LinkAction, MaterializationError> {
        if self.fs.same_file(link, canonical) {
            return Ok(LinkAction::AlreadyLinked);
        }
        let link_failed = |e: anyhow::Error, at: &Path| MaterializationError::ReferenceCreationFailed {
            link: at.to_path_buf(),
            target: target.to_path_buf(),
            source: e.into(),
        };

        if self.fs.symlink_new(target, link).map_err(|e| link_failed(e, link))? {
            return Ok(LinkAction::Linked);
        }
        if self.fs.same_file(link, canonical) {
            return Ok(LinkAction::AlreadyLinked);
        }

        match self.decide(link)? {
            Resolution::Overwrite => {
                self.fs
                    .replace_symlink(target, link)
                    .map_err(|e| link_failed(e, link))?;
                Ok(LinkAction::Relinked)
            }
            Resolution::KeepOriginal => {
                for n in 0..MAX_ALTERNATES {
                    let alternate = alternate_path(link, n);
                    if self.fs.same_file(&alternate, canonical)
                        || self
                            .fs
                            .symlink_new(target, &alternate)
                            .map_err(|e| link_failed(e, &alternate))?
                    {
                        return Ok(LinkAction::Deferred { alternate });
                    }
                }
                Err(link_failed(
                    anyhow::anyhow!("no free alternate path after {MAX_ALTERNATES} attempts"),
                    link,
                ))
            }
        }
    }

    fn bundle(
        &self,
        layout: &Layout,
        spec: &ArtifactSpec,
        templates: &impl TemplateSource,
    ) -> Result<ArtifactOutcome, MaterializationError> {
        let dest = layout.target(spec);
        if self.fs.exists(&dest) {
            tracing::debug!(path = %dest.display(), "directory exists, not copying");
            return Ok(ArtifactOutcome::Directory {
                directory: DirAction::Skipped,
            });
        }
        let files = templates
            .bundle(&spec.template)
            .map_err(|e| MaterializationError::RenderFailed {
                template: spec.template.clone(),
                source: e.into(),
            })?
            .ok_or_else(|| MaterializationError::BundleMissing(spec.template.clone()))?;
        let created = self
            .fs
            .install_dir(&dest, &files)
            .map_err(|e| write_failed(&dest, e))?;
        Ok(ArtifactOutcome::Directory {
            directory: if created {
                DirAction::Created
            } else {
                DirAction::Skipped
            },
        })
    }
}

fn render(
    templates: &impl TemplateSource,
    spec: &ArtifactSpec,
    data: &TemplateData<'_>,
) -> Result<String, MaterializationError> {
    templates
        .render(&spec.template, data)
        .map_err(|e| MaterializationError::RenderFailed {
            template: spec.template.clone(),
            source: e.into(),
        })
}

fn write_failed(path: &Path, e: anyhow::Error) -> MaterializationError {
    MaterializationError::WriteFailed {
        path: path.to_path_buf(),
        source: e.into(),
    }
}
