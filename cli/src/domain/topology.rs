//! Topology record: the immutable, fully resolved description of one VPC.
//!
//! Built once per (environment, region) and handed read-only to every
//! template render. Derived naming (underscore tokens) is computed here and
//! nowhere else.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::allocator::{AvailabilityZone, SubnetAssignment, SubnetRole};
use crate::domain::error::PlanningError;
use crate::domain::network::NetworkBlock;

// ── NAT / EIP ────────────────────────────────────────────────────────────────

/// NAT gateway layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NatPolicy {
    /// No NAT gateway; private subnets have no egress.
    None,
    /// One NAT gateway shared by every zone.
    #[default]
    Shared,
    /// One NAT gateway per zone.
    PerZone,
}

impl NatPolicy {
    pub const VARIANTS: &'static [&'static str] = &["none", "shared", "per-zone"];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Shared => "shared",
            Self::PerZone => "per-zone",
        }
    }
}

impl fmt::Display for NatPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NatPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "shared" => Ok(Self::Shared),
            "per-zone" => Ok(Self::PerZone),
            other => Err(format!(
                "invalid NAT policy '{other}' (expected one of: {})",
                Self::VARIANTS.join(", ")
            )),
        }
    }
}

/// How NAT gateway elastic IPs are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EipMode {
    /// Terraform allocates a fresh EIP per NAT gateway.
    Auto,
    /// No elastic IPs.
    None,
}

impl EipMode {
    pub const VARIANTS: &'static [&'static str] = &["auto", "none"];

    /// Default EIP mode for a NAT policy.
    #[must_use]
    pub fn default_for(nat: NatPolicy) -> Self {
        match nat {
            NatPolicy::None => Self::None,
            NatPolicy::Shared | NatPolicy::PerZone => Self::Auto,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::None => "none",
        }
    }
}

impl fmt::Display for EipMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EipMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "none" => Ok(Self::None),
            other => Err(format!(
                "invalid EIP mode '{other}' (expected one of: {})",
                Self::VARIANTS.join(", ")
            )),
        }
    }
}

// ── Record ───────────────────────────────────────────────────────────────────

/// Replace `-` with `_` so a name can be used as a Terraform identifier.
#[must_use]
pub fn identifier_token(name: &str) -> String {
    name.replace('-', "_")
}

/// A planned subnet together with its precomputed zone token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSubnet {
    pub availability_zone: AvailabilityZone,
    pub cidr_block: NetworkBlock,
    /// Zone name usable as a Terraform identifier (`us_east_1a`).
    pub uaz: String,
}

/// Fully resolved topology for one (environment, region).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyRecord {
    env: String,
    region: String,
    region_token: String,
    cidr: NetworkBlock,
    mgmt_vpc_id: String,
    multi_az: bool,
    assignments: Vec<SubnetAssignment>,
    private: Vec<PlannedSubnet>,
    public: Vec<PlannedSubnet>,
    nat: NatPolicy,
    eip: EipMode,
}

/// Scalars supplied by the caller alongside the allocator's output.
#[derive(Debug, Clone)]
pub struct RecordParams<'a> {
    pub env: &'a str,
    pub region: &'a str,
    pub cidr: NetworkBlock,
    pub mgmt_vpc_id: &'a str,
    /// `true` when the assignments came from all-zone allocation.
    pub multi_az: bool,
    pub nat: NatPolicy,
    pub eip: EipMode,
}

impl TopologyRecord {
    /// Assemble and validate a record.
    ///
    /// # Errors
    ///
    /// Returns [`PlanningError::InvalidTopology`] if any name is empty, the
    /// assignment list is empty, two assignments share a block or a
    /// (zone, role) slot, an assignment lies outside `cidr`, or elastic IPs are
    /// requested without NAT.
    pub fn build(
        params: &RecordParams<'_>,
        assignments: Vec<SubnetAssignment>,
    ) -> Result<Self, PlanningError> {
        let invalid = |msg: String| Err(PlanningError::InvalidTopology(msg));

        if params.env.trim().is_empty() {
            return invalid("environment name is empty".into());
        }
        if params.region.trim().is_empty() {
            return invalid("region name is empty".into());
        }
        if params.mgmt_vpc_id.trim().is_empty() {
            return invalid("management VPC reference is empty".into());
        }
        if assignments.is_empty() {
            return invalid("no subnet assignments".into());
        }
        if params.nat == NatPolicy::None && params.eip == EipMode::Auto {
            return invalid("elastic IPs requested but NAT policy is 'none'".into());
        }

        let mut seen = HashSet::with_capacity(assignments.len());
        let mut slots = HashSet::with_capacity(assignments.len());
        for a in &assignments {
            if !seen.insert(a.block) {
                return invalid(format!("block {} is assigned twice", a.block));
            }
            // Terraform resource names are keyed on the zone token and role.
            if !slots.insert((identifier_token(a.zone.as_str()), a.role)) {
                return invalid(format!("zone {} has two {} subnets", a.zone, a.role));
            }
            if !params.cidr.contains(&a.block) {
                return invalid(format!("block {} is outside {}", a.block, params.cidr));
            }
        }

        let planned = |role: SubnetRole| -> Vec<PlannedSubnet> {
            assignments
                .iter()
                .filter(|a| a.role == role)
                .map(|a| PlannedSubnet {
                    availability_zone: a.zone.clone(),
                    cidr_block: a.block,
                    uaz: identifier_token(a.zone.as_str()),
                })
                .collect()
        };
        let private = planned(SubnetRole::Private);
        let public = planned(SubnetRole::Public);

        Ok(Self {
            env: params.env.to_string(),
            region: params.region.to_string(),
            region_token: identifier_token(params.region),
            cidr: params.cidr,
            mgmt_vpc_id: params.mgmt_vpc_id.to_string(),
            multi_az: params.multi_az,
            assignments,
            private,
            public,
            nat: params.nat,
            eip: params.eip,
        })
    }

    #[must_use]
    pub fn env(&self) -> &str {
        &self.env
    }

    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Region name usable as a Terraform identifier (`us_east_1`).
    #[must_use]
    pub fn region_token(&self) -> &str {
        &self.region_token
    }

    #[must_use]
    pub fn cidr(&self) -> NetworkBlock {
        self.cidr
    }

    #[must_use]
    pub fn mgmt_vpc_id(&self) -> &str {
        &self.mgmt_vpc_id
    }

    #[must_use]
    pub fn assignments(&self) -> &[SubnetAssignment] {
        &self.assignments
    }

    #[must_use]
    pub fn nat(&self) -> NatPolicy {
        self.nat
    }

    #[must_use]
    pub fn eip(&self) -> EipMode {
        self.eip
    }

    #[must_use]
    pub fn multi_az(&self) -> bool {
        self.multi_az
    }

    /// Projection handed to the template renderer.
    #[must_use]
    pub fn template_data(&self) -> TemplateData<'_> {
        TemplateData {
            env: &self.env,
            region: &self.region,
            uregion: &self.region_token,
            cidr_block: self.cidr,
            mgmt_vpc_id: &self.mgmt_vpc_id,
            multi_az: self.multi_az,
            private: &self.private,
            public: &self.public,
            nat: self.nat != NatPolicy::None,
            nat_policy: self.nat,
            multi_nat: self.nat == NatPolicy::PerZone,
            eip: self.eip,
        }
    }
}

/// Template variables. Field names are the template-facing contract.
#[derive(Debug, Serialize)]
pub struct TemplateData<'a> {
    pub env: &'a str,
    pub region: &'a str,
    pub uregion: &'a str,
    pub cidr_block: NetworkBlock,
    pub mgmt_vpc_id: &'a str,
    pub multi_az: bool,
    pub private: &'a [PlannedSubnet],
    pub public: &'a [PlannedSubnet],
    pub nat: bool,
    pub nat_policy: NatPolicy,
    pub multi_nat: bool,
    pub eip: EipMode,
}

// ── Unit tests ───────────────────────────────────────────────────────────────
