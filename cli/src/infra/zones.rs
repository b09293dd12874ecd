//! Availability zone discovery through the `aws` CLI.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::application::ports::{CommandRunner, ZoneDiscovery};
use crate::domain::allocator::AvailabilityZone;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeZones {
    availability_zones: Vec<ZoneEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ZoneEntry {
    zone_name: String,
}

/// Parse `aws ec2 describe-availability-zones --output json`, keeping order.
///
/// # Errors
///
/// Returns an error if the document is not the expected shape.
pub fn parse_zones(json: &[u8]) -> Result<Vec<AvailabilityZone>> {
    let doc: DescribeZones =
        serde_json::from_slice(json).context("unexpected describe-availability-zones output")?;
    Ok(doc
        .availability_zones
        .into_iter()
        .map(|z| AvailabilityZone::new(z.zone_name))
        .collect())
}

/// Production `ZoneDiscovery`. The profile is the environment name; the
/// credentials file, when configured, is set on the child process only.
pub struct AwsCliZoneDiscovery<'a, C> {
    runner: &'a C,
    credentials_file: Option<PathBuf>,
}

impl<'a, C: CommandRunner> AwsCliZoneDiscovery<'a, C> {
    #[must_use]
    pub fn new(runner: &'a C, credentials_file: Option<PathBuf>) -> Self {
        Self {
            runner,
            credentials_file,
        }
    }
}

impl<C: CommandRunner> ZoneDiscovery for AwsCliZoneDiscovery<'_, C> {
    async fn list_zones(&self, region: &str, profile: &str) -> Result<Vec<AvailabilityZone>> {
        let args = [
            "ec2",
            "describe-availability-zones",
            "--region",
            region,
            "--profile",
            profile,
            "--output",
            "json",
        ];
        let creds = self
            .credentials_file
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let env: Vec<(&str, &str)> = creds
            .as_deref()
            .map(|c| vec![("AWS_SHARED_CREDENTIALS_FILE", c)])
            .unwrap_or_default();

        let output = self.runner.run_with_env("aws", &args, &env).await?;
        if !output.status.success() {
            anyhow::bail!(
                "aws exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        parse_zones(&output.stdout)
    }
}
