//! Command implementations

pub mod add_vpc;
pub mod config;
pub mod plan;
pub mod version;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::domain::input::{PolicyChoice, TopologyInput};
use crate::domain::topology::{EipMode, NatPolicy};

/// Topology options shared by `add-vpc` and `plan`.
#[derive(Args, Debug, Default)]
pub struct TopologyArgs {
    /// Environment name (also the AWS credentials profile)
    #[arg(long)]
    pub env: Option<String>,

    /// AWS region
    #[arg(long)]
    pub region: Option<String>,

    /// VPC IPv4 block, e.g. 10.0.0.0/16
    #[arg(long)]
    pub cidr: Option<String>,

    /// Management VPC to peer with
    #[arg(long)]
    pub mgmt_vpc_id: Option<String>,

    /// Allocation policy: all-zone or single-zone [default: single-zone]
    #[arg(long)]
    pub policy: Option<PolicyChoice>,

    /// Zone for single-zone allocation
    #[arg(long)]
    pub zone: Option<String>,

    /// Private subnet block for single-zone allocation
    #[arg(long)]
    pub private_cidr: Option<String>,

    /// Public subnet block for single-zone allocation
    #[arg(long)]
    pub public_cidr: Option<String>,

    /// NAT gateways: none, shared or per-zone [default: shared]
    #[arg(long)]
    pub nat: Option<NatPolicy>,

    /// NAT elastic IPs: auto or none [default: auto with NAT]
    #[arg(long)]
    pub eip: Option<EipMode>,

    /// Comma-separated zone names; skips zone discovery
    #[arg(long, value_delimiter = ',')]
    pub zones: Option<Vec<String>>,

    /// Prefix length of each subnet; defaults to the configured subnet prefix
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=32))]
    pub subnet_prefix: Option<u8>,

    /// YAML file with any of the options above; flags take precedence
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,
}

impl TopologyArgs {
    /// Layer the flags over the `--input` file, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the input file cannot be read or parsed.
    pub fn to_input(&self) -> Result<TopologyInput> {
        let flags = TopologyInput {
            env: self.env.clone(),
            region: self.region.clone(),
            cidr: self.cidr.clone(),
            mgmt_vpc_id: self.mgmt_vpc_id.clone(),
            policy: self.policy,
            zone: self.zone.clone(),
            private_cidr: self.private_cidr.clone(),
            public_cidr: self.public_cidr.clone(),
            nat: self.nat,
            eip: self.eip,
            zones: self.zones.clone(),
            subnet_prefix: self.subnet_prefix,
        };
        let Some(path) = &self.input else {
            return Ok(flags);
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let file: TopologyInput = serde_yaml::from_str(&content)
            .with_context(|| format!("cannot parse {}", path.display()))?;
        Ok(file.merge(flags))
    }
}
