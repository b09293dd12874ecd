//! Template store: implements `TemplateSource` with Tera.
//!
//! Templates come either from the set compiled into the binary or from a
//! directory on disk with the same layout:
//!
//! ```text
//! aws/variable.tf        rendered
//! aws/provider.tf        rendered
//! ...
//! scripts/               bundle, copied verbatim
//! ```
//!
//! Top-level directories named in [`BUNDLES`] are bundles; every other file
//! is registered as a template under its relative path.

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use include_dir::{Dir, include_dir};
use tera::Tera;

use crate::application::ports::{BundleFile, TemplateSource};
use crate::domain::topology::TemplateData;

/// Templates compiled into the binary.
static EMBEDDED_TEMPLATES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Top-level directories copied verbatim instead of rendered.
pub const BUNDLES: &[&str] = &["scripts"];

/// Production `TemplateSource`. Everything is loaded once at construction.
pub struct TeraTemplateStore {
    tera: Tera,
    bundles: HashMap<String, Vec<BundleFile>>,
}

/// A file found while loading a template set.
struct Entry {
    path: PathBuf,
    contents: Vec<u8>,
    executable: bool,
}

impl TeraTemplateStore {
    /// Load the built-in template set.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in template fails to parse.
    pub fn builtin() -> Result<Self> {
        let mut entries = Vec::new();
        collect_embedded(&EMBEDDED_TEMPLATES, &mut entries);
        Self::from_entries(entries).context("loading built-in templates")
    }

    /// Load a template set from `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be read or a template fails to parse.
    pub fn from_dir(root: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        collect_dir(root, Path::new(""), &mut entries)
            .with_context(|| format!("reading templates from {}", root.display()))?;
        Self::from_entries(entries)
            .with_context(|| format!("loading templates from {}", root.display()))
    }

    fn from_entries(entries: Vec<Entry>) -> Result<Self> {
        let mut tera = Tera::default();
        let mut bundles: HashMap<String, Vec<BundleFile>> = HashMap::new();

        for entry in entries {
            let mut components = entry.path.components();
            let top = components
                .next()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .unwrap_or_default();
            let rest = components.as_path().to_path_buf();

            if BUNDLES.contains(&top.as_str()) && !rest.as_os_str().is_empty() {
                bundles.entry(top).or_default().push(BundleFile {
                    path: rest,
                    contents: entry.contents,
                    executable: entry.executable,
                });
                continue;
            }

            let name = template_name(&entry.path);
            let source = String::from_utf8(entry.contents)
                .with_context(|| format!("template {name} is not UTF-8"))?;
            tera.add_raw_template(&name, &source)
                .with_context(|| format!("parsing template {name}"))?;
        }
        for files in bundles.values_mut() {
            files.sort_by(|a, b| a.path.cmp(&b.path));
        }
        tracing::debug!(
            templates = tera.get_template_names().count(),
            bundles = bundles.len(),
            "template set loaded"
        );
        Ok(Self { tera, bundles })
    }
}

/// Template names always use `/`.
fn template_name(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn collect_embedded(dir: &Dir<'_>, out: &mut Vec<Entry>) {
    for file in dir.files() {
        let path = file.path().to_path_buf();
        let executable = path.extension().is_some_and(|e| e == "sh");
        out.push(Entry {
            path,
            contents: file.contents().to_vec(),
            executable,
        });
    }
    for sub in dir.dirs() {
        collect_embedded(sub, out);
    }
}

fn collect_dir(root: &Path, rel: &Path, out: &mut Vec<Entry>) -> Result<()> {
    let dir = root.join(rel);
    for entry in std::fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let rel_path = rel.join(entry.file_name());
        let meta = std::fs::metadata(entry.path())
            .with_context(|| format!("inspecting {}", entry.path().display()))?;
        if meta.is_dir() {
            collect_dir(root, &rel_path, out)?;
        } else {
            out.push(Entry {
                contents: std::fs::read(entry.path())
                    .with_context(|| format!("reading {}", entry.path().display()))?,
                executable: meta.permissions().mode() & 0o111 != 0,
                path: rel_path,
            });
        }
    }
    Ok(())
}

impl TemplateSource for TeraTemplateStore {
    fn render(&self, template: &str, data: &TemplateData<'_>) -> Result<String> {
        let context = tera::Context::from_serialize(data).context("building template context")?;
        Ok(self.tera.render(template, &context)?)
    }

    fn bundle(&self, name: &str) -> Result<Option<Vec<BundleFile>>> {
        Ok(self.bundles.get(name).cloned())
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
