//! Filesystem infrastructure: implements `ArtifactFs` on the local disk.
//!
//! Files are staged in a temporary file next to their destination and moved
//! into place with a single rename or link, so a reader sees either the old
//! entry or the complete new one.

use std::io::{ErrorKind, Write};
use std::os::unix::fs::{MetadataExt, PermissionsExt, symlink};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::application::ports::{ArtifactFs, BundleFile};

const EXEC_MODE: u32 = 0o755;
const PLAIN_MODE: u32 = 0o644;

static LINK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Production implementation of `ArtifactFs`.
pub struct LocalFs;

fn parent_of(path: &Path) -> Result<&Path> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} has no parent directory", path.display()))
}

/// Stage `contents` in a temp file beside `path` with `mode` applied.
fn stage(path: &Path, contents: &[u8], mode: u32) -> Result<NamedTempFile> {
    let dir = parent_of(path)?;
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("writing temp file for {}", path.display()))?;
    tmp.as_file()
        .set_permissions(std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("setting permissions for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("syncing temp file for {}", path.display()))?;
    Ok(tmp)
}

impl ArtifactFs for LocalFs {
    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating directory {}", path.display()))
    }

    fn create_dir(&self, path: &Path) -> Result<bool> {
        match std::fs::create_dir(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                anyhow::ensure!(path.is_dir(), "{} exists and is not a directory", path.display());
                Ok(false)
            }
            Err(e) => Err(e).with_context(|| format!("creating directory {}", path.display())),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.symlink_metadata().is_ok()
    }

    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    fn write_new(&self, path: &Path, contents: &[u8], mode: u32) -> Result<bool> {
        let tmp = stage(path, contents, mode)?;
        match tmp.persist_noclobber(path) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.error).with_context(|| format!("writing {}", path.display())),
        }
    }

    fn replace(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()> {
        let tmp = stage(path, contents, mode)?;
        tmp.persist(path)
            .map(drop)
            .map_err(|e| e.error)
            .with_context(|| format!("replacing {}", path.display()))
    }

    fn same_file(&self, link: &Path, canonical: &Path) -> bool {
        match (std::fs::metadata(link), std::fs::metadata(canonical)) {
            (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
            _ => false,
        }
    }

    fn symlink_new(&self, target: &Path, link: &Path) -> Result<bool> {
        match symlink(target, link) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e).with_context(|| format!("linking {}", link.display())),
        }
    }

    fn replace_symlink(&self, target: &Path, link: &Path) -> Result<()> {
        let dir = parent_of(link)?;
        let name = link
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("{} has no file name", link.display()))?
            .to_string_lossy();
        loop {
            let n = LINK_COUNTER.fetch_add(1, Ordering::Relaxed);
            let staged = dir.join(format!(".{name}.{}.{n}.tmp", std::process::id()));
            match symlink(target, &staged) {
                Ok(()) => {
                    return std::fs::rename(&staged, link).or_else(|e| {
                        let _ = std::fs::remove_file(&staged);
                        Err(e).with_context(|| format!("replacing {}", link.display()))
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("linking {}", staged.display()));
                }
            }
        }
    }

    fn install_dir(&self, dest: &Path, files: &[BundleFile]) -> Result<bool> {
        if self.exists(dest) {
            return Ok(false);
        }
        let dir = parent_of(dest)?;
        let staging = tempfile::Builder::new()
            .prefix(".bundle-")
            .tempdir_in(dir)
            .with_context(|| format!("creating staging directory in {}", dir.display()))?;

        for file in files {
            let path = staging.path().join(&file.path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::write(&path, &file.contents)
                .with_context(|| format!("writing {}", path.display()))?;
            let mode = if file.executable { EXEC_MODE } else { PLAIN_MODE };
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
                .with_context(|| format!("setting permissions on {}", path.display()))?;
        }
        std::fs::set_permissions(staging.path(), std::fs::Permissions::from_mode(EXEC_MODE))
            .with_context(|| format!("setting permissions on {}", staging.path().display()))?;

        // An empty directory created concurrently would be replaced by the
        // rename; anything non-empty makes it fail.
        if self.exists(dest) {
            return Ok(false);
        }
        match std::fs::rename(staging.path(), dest) {
            Ok(()) => Ok(true),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::AlreadyExists | ErrorKind::DirectoryNotEmpty
                ) =>
            {
                Ok(false)
            }
            Err(e) => Err(e).with_context(|| format!("installing {}", dest.display())),
        }
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
