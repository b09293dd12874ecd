//! Key pair generation through `ssh-keygen`.

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, KeyGenerator, KeyPair};

/// Production `KeyGenerator`: a 2048-bit RSA key in PEM form, generated into
/// a private temp directory and read back.
pub struct SshKeygen<'a, C> {
    runner: &'a C,
}

impl<'a, C: CommandRunner> SshKeygen<'a, C> {
    #[must_use]
    pub fn new(runner: &'a C) -> Self {
        Self { runner }
    }
}

/// Validates an OpenSSH public key line: `<type> <base64-material> [comment]`.
///
/// # Errors
///
/// Returns an error if the key type or key material is missing.
pub fn validate_public_key(line: &str) -> Result<()> {
    let mut parts = line.split_whitespace();
    let kind = parts.next().unwrap_or_default();
    anyhow::ensure!(
        kind.starts_with("ssh-") || kind.starts_with("ecdsa-"),
        "not an OpenSSH public key (got: {line:?})"
    );
    anyhow::ensure!(
        parts.next().is_some_and(|m| !m.is_empty()),
        "public key has no key material"
    );
    Ok(())
}

impl<C: CommandRunner> KeyGenerator for SshKeygen<'_, C> {
    async fn generate(&self, comment: &str) -> Result<KeyPair> {
        let dir = tempfile::TempDir::new().context("creating key staging directory")?;
        let key_path = dir.path().join("key");
        let key_arg = key_path.to_string_lossy().into_owned();
        let args = [
            "-q", "-t", "rsa", "-b", "2048", "-m", "PEM", "-N", "", "-C", comment, "-f", &key_arg,
        ];

        let output = self.runner.run("ssh-keygen", &args).await?;
        if !output.status.success() {
            anyhow::bail!(
                "ssh-keygen exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let private_pem = tokio::fs::read(&key_path)
            .await
            .with_context(|| format!("reading {}", key_path.display()))?;
        let public_openssh = tokio::fs::read(key_path.with_extension("pub"))
            .await
            .context("reading generated public key")?;
        validate_public_key(&String::from_utf8_lossy(&public_openssh))?;
        Ok(KeyPair {
            private_pem,
            public_openssh,
        })
    }
}
