//! Subnet allocation: splits a VPC block into per-zone private/public subnets.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::PlanningError;
use crate::domain::network::NetworkBlock;

/// Opaque provider failure-domain name, e.g. `us-east-1a`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailabilityZone(String);

impl AvailabilityZone {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AvailabilityZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AvailabilityZone {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Whether a subnet routes through an internet gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetRole {
    Private,
    Public,
}

impl SubnetRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
        }
    }
}

impl fmt::Display for SubnetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetAssignment {
    pub zone: AvailabilityZone,
    pub role: SubnetRole,
    pub block: NetworkBlock,
}

/// Caller-chosen zone and blocks for a single-zone VPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleZoneSelection {
    pub zone: AvailabilityZone,
    pub private: NetworkBlock,
    pub public: NetworkBlock,
}

/// How the parent block is divided among zones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationPolicy {
    /// One private and one public subnet in every zone, computed.
    AllZones,
    /// Exactly the caller's zone and blocks.
    SingleZone(SingleZoneSelection),
}

impl AllocationPolicy {
    #[must_use]
    pub fn is_all_zones(&self) -> bool {
        matches!(self, Self::AllZones)
    }
}

/// Plan the subnets of `parent`.
///
/// Under [`AllocationPolicy::AllZones`] each zone, in the order given, takes
/// the next two unused `/subnet_prefix` blocks of the parent: private first,
/// then public. Under [`AllocationPolicy::SingleZone`] the caller's blocks are
/// checked and passed through; `zones`, when non-empty, must contain the
/// chosen zone, and `subnet_prefix` is not used.
///
/// # Errors
///
/// - [`PlanningError::Network`] if `subnet_prefix` is not longer than the
///   parent's (all-zone only).
/// - [`PlanningError::NoZones`] for all-zone allocation with no zones.
/// - [`PlanningError::DuplicateZone`] if a zone appears twice in an all-zone list.
/// - [`PlanningError::InsufficientAddressSpace`] if the parent is too small.
/// - [`PlanningError::BlockOutOfRange`] / [`PlanningError::OverlappingBlocks`]
///   for invalid single-zone blocks.
pub fn allocate(
    parent: NetworkBlock,
    policy: &AllocationPolicy,
    zones: &[AvailabilityZone],
    subnet_prefix: u8,
) -> Result<Vec<SubnetAssignment>, PlanningError> {
    match policy {
        AllocationPolicy::AllZones => allocate_all_zones(parent, zones, subnet_prefix),
        AllocationPolicy::SingleZone(selection) => allocate_single_zone(parent, selection, zones),
    }
}

fn allocate_all_zones(
    parent: NetworkBlock,
    zones: &[AvailabilityZone],
    subnet_prefix: u8,
) -> Result<Vec<SubnetAssignment>, PlanningError> {
    let available = parent.subnet_count(subnet_prefix)?;
    if zones.is_empty() {
        return Err(PlanningError::NoZones);
    }
    let mut seen = HashSet::with_capacity(zones.len());
    if let Some(dup) = zones.iter().find(|z| !seen.insert(z.as_str())) {
        return Err(PlanningError::DuplicateZone {
            zone: dup.to_string(),
        });
    }
    let needed = 2 * zones.len() as u64;
    if needed > available {
        return Err(PlanningError::InsufficientAddressSpace {
            parent: parent.to_string(),
            prefix: subnet_prefix,
            needed,
            available,
        });
    }

    let mut subnets = parent.subnets(subnet_prefix)?;
    let mut assignments = Vec::with_capacity(zones.len() * 2);
    for zone in zones {
        for role in [SubnetRole::Private, SubnetRole::Public] {
            // capacity was checked above
            let block = subnets.next().ok_or_else(|| PlanningError::InsufficientAddressSpace {
                parent: parent.to_string(),
                prefix: subnet_prefix,
                needed,
                available,
            })?;
            assignments.push(SubnetAssignment {
                zone: zone.clone(),
                role,
                block,
            });
        }
    }
    Ok(assignments)
}

fn allocate_single_zone(
    parent: NetworkBlock,
    selection: &SingleZoneSelection,
    zones: &[AvailabilityZone],
) -> Result<Vec<SubnetAssignment>, PlanningError> {
    if !zones.is_empty() && !zones.contains(&selection.zone) {
        return Err(PlanningError::UnknownZone {
            zone: selection.zone.to_string(),
            known: zones
                .iter()
                .map(AvailabilityZone::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        });
    }
    for block in [selection.private, selection.public] {
        if !parent.contains(&block) {
            return Err(PlanningError::BlockOutOfRange {
                block: block.to_string(),
                parent: parent.to_string(),
            });
        }
    }
    if selection.private.overlaps(&selection.public) {
        return Err(PlanningError::OverlappingBlocks {
            private: selection.private.to_string(),
            public: selection.public.to_string(),
        });
    }
    Ok(vec![
        SubnetAssignment {
            zone: selection.zone.clone(),
            role: SubnetRole::Private,
            block: selection.private,
        },
        SubnetAssignment {
            zone: selection.zone.clone(),
            role: SubnetRole::Public,
            block: selection.public,
        },
    ])
}

// ── Unit tests ───────────────────────────────────────────────────────────────
