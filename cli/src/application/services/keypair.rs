//! Application service: per-region SSH key pair.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::application::ports::{ArtifactFs, ConflictResolver, KeyGenerator, ProgressReporter};
use crate::application::services::materializer::Materializer;
use crate::domain::artifact::FileAction;
use crate::domain::error::{CollaboratorError, MaterializationError};
use crate::domain::topology::TopologyRecord;

/// Owner read/write only, for both halves of the pair.
pub const KEY_MODE: u32 = 0o600;

/// What happened to the key pair.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum KeyPairOutcome {
    /// Both files were already present; nothing was generated.
    Present,
    /// Both halves were placed, under the same naming.
    Generated {
        private: FileAction,
        public: FileAction,
    },
    /// Neither half was placed (or placement stopped part way).
    Failed {
        code: &'static str,
        message: String,
        #[serde(skip)]
        error: MaterializationError,
    },
}

impl KeyPairOutcome {
    fn failed(error: MaterializationError) -> Self {
        Self::Failed {
            code: error.code(),
            message: error.to_string(),
            error,
        }
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Make sure `<env>-<region>.pem` and `.pub` exist in the region directory.
///
/// Generation is skipped when both files are already there. Otherwise the
/// fresh pair goes through the overwrite policy as one unit, so `.pem` and
/// `.pub` (or their `.NEW` alternates) always hold matching halves.
///
/// # Errors
///
/// Returns [`CollaboratorError::KeyGeneration`] if the generator fails.
/// Placement failures are carried in the outcome.
pub async fn ensure_key_pair<F: ArtifactFs, R: ConflictResolver>(
    record: &TopologyRecord,
    materializer: &Materializer<'_, F, R>,
    generator: &impl KeyGenerator,
    reporter: &impl ProgressReporter,
) -> Result<KeyPairOutcome> {
    let fs = materializer.fs();
    let (pem, pub_path) = materializer.layout(record).key_pair();
    if fs.exists(&pem) && fs.exists(&pub_path) {
        tracing::debug!(path = %pem.display(), "key pair present");
        return Ok(KeyPairOutcome::Present);
    }

    reporter.step("generating key pair...");
    let comment = format!("{}-{}", record.env(), record.region());
    let pair = generator
        .generate(&comment)
        .await
        .map_err(|e| CollaboratorError::KeyGeneration { source: e.into() })?;

    let files: [(&Path, &[u8]); 2] = [
        (pem.as_path(), pair.private_pem.as_slice()),
        (pub_path.as_path(), pair.public_openssh.as_slice()),
    ];
    let outcome = match materializer.place_together(&files, KEY_MODE) {
        Ok(actions) => {
            let [private, public] = <[FileAction; 2]>::try_from(actions)
                .map_err(|_| anyhow::anyhow!("key placement returned a partial result"))?;
            KeyPairOutcome::Generated { private, public }
        }
        Err(e) => KeyPairOutcome::failed(e),
    };
    if outcome.has_failures() {
        reporter.warn("key pair could not be written");
    } else {
        reporter.success(&format!("key pair {}", pem.display()));
    }
    Ok(outcome)
}
