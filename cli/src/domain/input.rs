//! Create-topology input: collected from flags and/or a YAML file, validated
//! up front into a [`ResolvedInput`] that the core consumes.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::allocator::{AllocationPolicy, AvailabilityZone, SingleZoneSelection};
use crate::domain::config::VpcforgeConfig;
use crate::domain::error::ConfigError;
use crate::domain::network::NetworkBlock;
use crate::domain::topology::{EipMode, NatPolicy, RecordParams};

/// Allocation policy as selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyChoice {
    /// One private and one public subnet in every zone of the region.
    AllZone,
    /// One zone with explicit private and public blocks.
    #[default]
    SingleZone,
}

impl PolicyChoice {
    pub const VARIANTS: &'static [&'static str] = &["all-zone", "single-zone"];
}

impl fmt::Display for PolicyChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AllZone => "all-zone",
            Self::SingleZone => "single-zone",
        })
    }
}

impl FromStr for PolicyChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all-zone" => Ok(Self::AllZone),
            "single-zone" => Ok(Self::SingleZone),
            other => Err(format!(
                "invalid policy '{other}' (expected one of: {})",
                Self::VARIANTS.join(", ")
            )),
        }
    }
}

/// Unvalidated input. Every field is optional so flag values and an input
/// file can be layered with [`TopologyInput::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TopologyInput {
    pub env: Option<String>,
    pub region: Option<String>,
    pub cidr: Option<String>,
    pub mgmt_vpc_id: Option<String>,
    pub policy: Option<PolicyChoice>,
    pub zone: Option<String>,
    pub private_cidr: Option<String>,
    pub public_cidr: Option<String>,
    pub nat: Option<NatPolicy>,
    pub eip: Option<EipMode>,
    pub zones: Option<Vec<String>>,
    pub subnet_prefix: Option<u8>,
}

/// Validated input; everything the core needs, nothing it has to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub env: String,
    pub region: String,
    pub cidr: NetworkBlock,
    pub mgmt_vpc_id: String,
    pub policy: AllocationPolicy,
    /// Zones supplied up front; `None` means ask the discovery collaborator.
    pub zones: Option<Vec<AvailabilityZone>>,
    pub nat: NatPolicy,
    pub eip: EipMode,
    pub subnet_prefix: u8,
}

fn parse_block(flag: &'static str, value: &str) -> Result<NetworkBlock> {
    value
        .parse::<NetworkBlock>()
        .with_context(|| format!("invalid {flag}"))
}

fn require(value: Option<String>, flag: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingOption(flag).into()),
    }
}

impl TopologyInput {
    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    #[must_use]
    pub fn merge(self, overrides: TopologyInput) -> TopologyInput {
        TopologyInput {
            env: overrides.env.or(self.env),
            region: overrides.region.or(self.region),
            cidr: overrides.cidr.or(self.cidr),
            mgmt_vpc_id: overrides.mgmt_vpc_id.or(self.mgmt_vpc_id),
            policy: overrides.policy.or(self.policy),
            zone: overrides.zone.or(self.zone),
            private_cidr: overrides.private_cidr.or(self.private_cidr),
            public_cidr: overrides.public_cidr.or(self.public_cidr),
            nat: overrides.nat.or(self.nat),
            eip: overrides.eip.or(self.eip),
            zones: overrides.zones.or(self.zones),
            subnet_prefix: overrides.subnet_prefix.or(self.subnet_prefix),
        }
    }

    /// Validate against the configured environments/regions and defaults.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing, unknown, malformed, or
    /// conflicting option.
    pub fn resolve(self, config: &VpcforgeConfig) -> Result<ResolvedInput> {
        let env = require(self.env, "--env")?;
        if !config.network.environments.contains(&env) {
            return Err(ConfigError::UnknownEnvironment {
                env,
                valid: config.network.environments.join(", "),
            }
            .into());
        }
        let region = require(self.region, "--region")?;
        if !config.network.regions.contains(&region) {
            return Err(ConfigError::UnknownRegion {
                region,
                valid: config.network.regions.join(", "),
            }
            .into());
        }
        let cidr = parse_block("--cidr", &require(self.cidr, "--cidr")?)?;
        let mgmt_vpc_id = require(self.mgmt_vpc_id, "--mgmt-vpc-id")?;

        let policy = match self.policy.unwrap_or_default() {
            PolicyChoice::AllZone => {
                if self.zone.is_some() || self.private_cidr.is_some() || self.public_cidr.is_some() {
                    return Err(ConfigError::ConflictingOptions(
                        "--zone, --private-cidr and --public-cidr only apply to --policy single-zone"
                            .into(),
                    )
                    .into());
                }
                AllocationPolicy::AllZones
            }
            PolicyChoice::SingleZone => {
                let zone = require(self.zone, "--zone")?;
                let private = parse_block(
                    "--private-cidr",
                    &require(self.private_cidr, "--private-cidr")?,
                )?;
                let public =
                    parse_block("--public-cidr", &require(self.public_cidr, "--public-cidr")?)?;
                AllocationPolicy::SingleZone(SingleZoneSelection {
                    zone: AvailabilityZone::new(zone),
                    private,
                    public,
                })
            }
        };

        let nat = self.nat.unwrap_or_default();
        let eip = self.eip.unwrap_or_else(|| EipMode::default_for(nat));
        if nat == NatPolicy::None && eip == EipMode::Auto {
            return Err(ConfigError::ConflictingOptions(
                "--eip auto requires a NAT gateway (--nat shared or --nat per-zone)".into(),
            )
            .into());
        }

        let zones = self.zones.map(|names| {
            names
                .iter()
                .map(|n| n.trim())
                .filter(|n| !n.is_empty())
                .map(AvailabilityZone::new)
                .collect::<Vec<_>>()
        });

        Ok(ResolvedInput {
            env,
            region,
            cidr,
            mgmt_vpc_id,
            policy,
            zones,
            nat,
            eip,
            subnet_prefix: self.subnet_prefix.unwrap_or(config.network.subnet_prefix),
        })
    }
}

impl ResolvedInput {
    /// Scalars for [`crate::domain::topology::TopologyRecord::build`].
    #[must_use]
    pub fn record_params(&self) -> RecordParams<'_> {
        RecordParams {
            env: &self.env,
            region: &self.region,
            cidr: self.cidr,
            mgmt_vpc_id: &self.mgmt_vpc_id,
            multi_az: self.policy.is_all_zones(),
            nat: self.nat,
            eip: self.eip,
        }
    }

    /// `true` when the zone list must come from the discovery collaborator.
    #[must_use]
    pub fn needs_discovery(&self) -> bool {
        self.zones.is_none() && self.policy.is_all_zones()
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
