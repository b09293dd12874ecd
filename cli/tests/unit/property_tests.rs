//! Property-based tests for allocation and validation logic.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::Path;

use proptest::prelude::*;

use vpcforge_cli::domain::artifact::alternate_path;
use vpcforge_cli::domain::config::{VALID_CONFIG_KEYS, validate_config_key, validate_config_value};
use vpcforge_cli::domain::error::PlanningError;
use vpcforge_cli::domain::{
    AllocationPolicy, AvailabilityZone, NetworkBlock, SingleZoneSelection, SubnetRole, allocate,
};

fn parent_block(raw: u32, prefix: u8) -> NetworkBlock {
    let mask = u32::MAX << (32 - u32::from(prefix));
    NetworkBlock::new(Ipv4Addr::from(raw & mask), prefix).unwrap()
}

fn zone_list(n: usize) -> Vec<AvailabilityZone> {
    (0..n).map(|i| AvailabilityZone::new(format!("zone-{i}"))).collect()
}

// ============================================================================
// allocate() under the all-zone policy
// ============================================================================

proptest! {
    /// Every assigned block lies inside the parent and no two overlap.
    #[test]
    fn prop_all_zone_blocks_disjoint_and_contained(
        raw in any::<u32>(),
        parent_prefix in 8u8..=24,
        extra in 1u8..=6,
        n in 1usize..=6,
    ) {
        let parent = parent_block(raw, parent_prefix);
        let subnet_prefix = parent_prefix + extra;
        let zones = zone_list(n);

        match allocate(parent, &AllocationPolicy::AllZones, &zones, subnet_prefix) {
            Ok(assignments) => {
                prop_assert_eq!(assignments.len(), 2 * n);
                for (i, a) in assignments.iter().enumerate() {
                    prop_assert!(parent.contains(&a.block), "{} outside {}", a.block, parent);
                    prop_assert_eq!(a.block.prefix(), subnet_prefix);
                    for b in &assignments[i + 1..] {
                        prop_assert!(!a.block.overlaps(&b.block), "{} overlaps {}", a.block, b.block);
                    }
                }
            }
            Err(PlanningError::InsufficientAddressSpace { needed, available, .. }) => {
                prop_assert!(needed > available);
                prop_assert!(2 * n as u64 > 1u64 << extra);
            }
            Err(e) => prop_assert!(false, "unexpected error: {e}"),
        }
    }

    /// Zones keep their order; each gets private then public, on consecutive blocks.
    #[test]
    fn prop_all_zone_order_is_deterministic(
        raw in any::<u32>(),
        n in 1usize..=6,
    ) {
        let parent = parent_block(raw, 16);
        let zones = zone_list(n);

        let first = allocate(parent, &AllocationPolicy::AllZones, &zones, 24).unwrap();
        let again = allocate(parent, &AllocationPolicy::AllZones, &zones, 24).unwrap();
        prop_assert_eq!(&first, &again);

        for (i, pair) in first.chunks(2).enumerate() {
            prop_assert_eq!(&pair[0].zone, &zones[i]);
            prop_assert_eq!(&pair[1].zone, &zones[i]);
            prop_assert_eq!(pair[0].role, SubnetRole::Private);
            prop_assert_eq!(pair[1].role, SubnetRole::Public);
        }
        let starts: Vec<u32> = first.iter().map(|a| u32::from(a.block.network())).collect();
        prop_assert_eq!(starts[0], u32::from(parent.network()));
        for w in starts.windows(2) {
            prop_assert_eq!(w[1] - w[0], 256);
        }
    }

    /// A subnet prefix not longer than the parent's is always rejected.
    #[test]
    fn prop_short_subnet_prefix_rejected(
        raw in any::<u32>(),
        parent_prefix in 8u8..=28,
        shorter in 0u8..=8,
    ) {
        let parent = parent_block(raw, parent_prefix);
        let subnet_prefix = parent_prefix.saturating_sub(shorter).max(1);
        let result = allocate(parent, &AllocationPolicy::AllZones, &zone_list(1), subnet_prefix);
        prop_assert!(matches!(result, Err(PlanningError::Network(_))), "{result:?}");
    }
}

// ============================================================================
// allocate() under the single-zone policy
// ============================================================================

proptest! {
    /// Two distinct subnets of the parent are passed through unchanged.
    #[test]
    fn prop_single_zone_passes_valid_blocks_through(
        raw in any::<u32>(),
        a in 0u32..256,
        b in 0u32..256,
    ) {
        prop_assume!(a != b);
        let parent = parent_block(raw, 16);
        let sub = |i: u32| {
            NetworkBlock::new(Ipv4Addr::from(u32::from(parent.network()) + (i << 8)), 24).unwrap()
        };
        let selection = SingleZoneSelection {
            zone: AvailabilityZone::new("zone-0"),
            private: sub(a),
            public: sub(b),
        };

        let assignments =
            allocate(parent, &AllocationPolicy::SingleZone(selection), &[], 24).unwrap();

        prop_assert_eq!(assignments.len(), 2);
        prop_assert_eq!(assignments[0].block, sub(a));
        prop_assert_eq!(assignments[1].block, sub(b));
    }
}

#[test]
fn test_single_zone_same_block_twice_rejected() {
    let parent: NetworkBlock = "10.0.0.0/16".parse().unwrap();
    let block: NetworkBlock = "10.0.4.0/24".parse().unwrap();
    let selection = SingleZoneSelection {
        zone: AvailabilityZone::new("zone-0"),
        private: block,
        public: block,
    };
    let err = allocate(parent, &AllocationPolicy::SingleZone(selection), &[], 24).unwrap_err();
    assert!(matches!(err, PlanningError::OverlappingBlocks { .. }));
}

// ============================================================================
// alternate_path()
// ============================================================================

proptest! {
    /// Alternates are siblings of the original and never collide.
    #[test]
    fn prop_alternate_paths_distinct_siblings(name in "[a-z][a-z0-9_.-]{0,20}", count in 1usize..50) {
        let path = Path::new("/infra/dev/us-east-1").join(&name);
        let alternates: Vec<_> = (0..count).map(|n| alternate_path(&path, n)).collect();

        let unique: HashSet<_> = alternates.iter().collect();
        prop_assert_eq!(unique.len(), count);
        for alt in &alternates {
            prop_assert_eq!(alt.parent(), path.parent());
            prop_assert!(alt != &path);
            let file = alt.file_name().unwrap().to_string_lossy().into_owned();
            prop_assert!(file.starts_with(&format!("{name}.NEW")), "{file}");
        }
    }
}

// ============================================================================
// validate_config_key() and validate_config_value()
// ============================================================================

proptest! {
    /// Arbitrary keys outside the whitelist are rejected.
    #[test]
    fn prop_arbitrary_keys_rejected(key in "[a-z]{1,20}\\.[a-z_]{1,20}") {
        if !VALID_CONFIG_KEYS.contains(&key.as_str()) {
            prop_assert!(validate_config_key(&key).is_err(), "accepted invalid key: {key}");
        }
    }

    /// Subnet prefixes outside 1..=32 are rejected, inside accepted.
    #[test]
    fn prop_subnet_prefix_range(prefix in 0u32..100) {
        let result = validate_config_value("network.subnet_prefix", &prefix.to_string());
        prop_assert_eq!(result.is_ok(), (1..=32).contains(&prefix));
    }

    /// Environment lists with uppercase or path characters are rejected.
    #[test]
    fn prop_bad_environment_names_rejected(name in "[a-z]{0,5}[A-Z/.]{1,3}[a-z]{0,5}") {
        prop_assert!(validate_config_value("network.environments", &name).is_err());
    }
}
