// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Subnet Placement
//!
//! Whatever blocks are thrown at one network, the accepted subnets never
//! overlap and every rejection is a configuration error against a block
//! that really overlaps an accepted one.

use cim_cluster_topology::domain::{Ipv4Cidr, Resource};
use cim_cluster_topology::TopologyBuilder;
use proptest::prelude::*;
use std::net::Ipv4Addr;

/// Aligned block inside 10.0.0.0/16 with a prefix between /17 and /28
fn subnet_block() -> impl Strategy<Value = Ipv4Cidr> {
    (17u8..=28)
        .prop_flat_map(|prefix| (Just(prefix), 0u32..(1u32 << (prefix - 16))))
        .prop_map(|(prefix, index)| {
            let base = u32::from(Ipv4Addr::new(10, 0, 0, 0)) + (index << (32 - prefix));
            Ipv4Cidr::new(Ipv4Addr::from(base), prefix).unwrap()
        })
}

proptest! {
    #[test]
    fn prop_accepted_subnets_never_overlap(blocks in prop::collection::vec(subnet_block(), 1..24)) {
        let mut builder = TopologyBuilder::new();
        let vpc = builder.declare_network("my-vpc", "10.0.0.0/16").unwrap();
        let mut accepted: Vec<Ipv4Cidr> = Vec::new();

        for (i, block) in blocks.iter().enumerate() {
            let name = format!("subnet-{i}");
            match builder.declare_subnet(&name, &vpc, &block.to_string(), "ap-southeast-1a", false) {
                Ok(_) => accepted.push(*block),
                Err(err) => {
                    prop_assert!(err.is_config());
                    prop_assert_eq!(err.resource(), Some(name.as_str()));
                    prop_assert!(accepted.iter().any(|other| other.overlaps(block)));
                }
            }
        }

        for (i, a) in accepted.iter().enumerate() {
            for b in &accepted[i + 1..] {
                prop_assert!(!a.overlaps(b), "{} overlaps {}", a, b);
            }
        }

        let declared = builder
            .graph()
            .nodes()
            .filter(|node| matches!(node.resource, Resource::Subnet(_)))
            .count();
        prop_assert_eq!(declared, accepted.len());
    }

    #[test]
    fn prop_first_subnet_always_fits(block in subnet_block()) {
        let mut builder = TopologyBuilder::new();
        let vpc = builder.declare_network("my-vpc", "10.0.0.0/16").unwrap();
        prop_assert!(builder
            .declare_subnet("subnet", &vpc, &block.to_string(), "ap-southeast-1a", true)
            .is_ok());
    }
}
