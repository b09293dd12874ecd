//! `ConflictResolver` implementations for the command line.

use std::cell::Cell;
use std::path::Path;

use anyhow::Result;

use crate::application::ports::{ConflictResolver, Resolution};
use crate::domain::artifact::ALTERNATE_SUFFIX;

/// Always answers the same way. `None` turns every conflict into an error.
pub struct FixedResolver(pub Option<Resolution>);

impl ConflictResolver for FixedResolver {
    fn resolve(&self, _path: &Path) -> Result<Option<Resolution>> {
        Ok(self.0)
    }
}

/// Asks on the terminal, once per conflicting path, unless an
/// "all" answer was given earlier in the run.
pub struct PromptResolver {
    remembered: Cell<Option<Resolution>>,
}

impl PromptResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            remembered: Cell::new(None),
        }
    }
}

impl Default for PromptResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConflictResolver for PromptResolver {
    fn resolve(&self, path: &Path) -> Result<Option<Resolution>> {
        if let Some(answer) = self.remembered.get() {
            return Ok(Some(answer));
        }
        let keep_label = format!("Keep it, write {ALTERNATE_SUFFIX} alongside");
        let items = [
            "Overwrite",
            keep_label.as_str(),
            "Overwrite all remaining",
            "Keep all remaining",
        ];
        let choice = dialoguer::Select::new()
            .with_prompt(format!("{} already exists and differs", path.display()))
            .items(&items)
            .default(1)
            .interact()?;
        let answer = match choice {
            0 | 2 => Resolution::Overwrite,
            _ => Resolution::KeepOriginal,
        };
        if choice >= 2 {
            self.remembered.set(Some(answer));
        }
        Ok(Some(answer))
    }
}

/// The resolver chosen from command-line flags.
pub enum CliResolver {
    Fixed(FixedResolver),
    Prompt(PromptResolver),
}

impl CliResolver {
    /// `--overwrite` / `--keep` win; otherwise prompt when a terminal is
    /// attached and prompts are allowed, else leave conflicts unresolved.
    #[must_use]
    pub fn from_flags(overwrite: bool, keep: bool, interactive: bool) -> Self {
        if overwrite {
            Self::Fixed(FixedResolver(Some(Resolution::Overwrite)))
        } else if keep {
            Self::Fixed(FixedResolver(Some(Resolution::KeepOriginal)))
        } else if interactive && console::Term::stderr().is_term() {
            Self::Prompt(PromptResolver::new())
        } else {
            Self::Fixed(FixedResolver(None))
        }
    }
}

impl ConflictResolver for CliResolver {
    fn resolve(&self, path: &Path) -> Result<Option<Resolution>> {
        match self {
            Self::Fixed(r) => r.resolve(path),
            Self::Prompt(r) => r.resolve(path),
        }
    }
}
