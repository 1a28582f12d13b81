// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Graph Resolution
//!
//! Random acyclic dependency sets over a row of subnets: resolution must be
//! deterministic, topological and tie-broken by declaration order, and any
//! back edge must surface as a cycle.

use cim_cluster_topology::builder::SubnetRef;
use cim_cluster_topology::{InMemoryEngine, ProvisioningEngine, TopologyBuilder, TopologyError};
use proptest::prelude::*;
use std::collections::HashMap;

// ============================================================================
// Generators
// ============================================================================

/// Subnet count and random (a, b) pairs; each distinct pair orders the
/// later-declared subnet after the earlier one
fn dependency_sets() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..16).prop_flat_map(|count| {
        (
            Just(count),
            prop::collection::vec((0..count, 0..count), 0..24),
        )
    })
}

fn declare(count: usize, edges: &[(usize, usize)]) -> (TopologyBuilder, Vec<SubnetRef>) {
    let mut builder = TopologyBuilder::new();
    let vpc = builder.declare_network("vpc", "10.0.0.0/16").unwrap();
    let subnets: Vec<SubnetRef> = (0..count)
        .map(|i| {
            builder
                .declare_subnet(
                    &format!("subnet-{i}"),
                    &vpc,
                    &format!("10.0.{i}.0/24"),
                    "ap-southeast-1a",
                    false,
                )
                .unwrap()
        })
        .collect();

    for &(a, b) in edges {
        if a != b {
            builder
                .depends_on(&subnets[a.max(b)], &subnets[a.min(b)])
                .unwrap();
        }
    }

    (builder, subnets)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: the same declaration sequence yields the same plan
    #[test]
    fn prop_resolution_is_deterministic((count, edges) in dependency_sets()) {
        let (first, _) = declare(count, &edges);
        let (second, _) = declare(count, &edges);

        let plan = first.resolve().unwrap();
        let again = first.resolve().unwrap();
        let other = second.resolve().unwrap();

        prop_assert_eq!(&plan, &again);
        prop_assert_eq!(plan.names(), other.names());
    }

    /// Property: every dependency precedes its dependent
    #[test]
    fn prop_dependencies_precede_dependents((count, edges) in dependency_sets()) {
        let (builder, _) = declare(count, &edges);
        let plan = builder.resolve().unwrap();
        prop_assert_eq!(plan.len(), count + 1);

        let at: HashMap<&str, usize> = plan
            .names()
            .into_iter()
            .enumerate()
            .map(|(position, name)| (name, position))
            .collect();

        for resource in &plan {
            for dependency in &resource.depends_on {
                prop_assert!(
                    at[dependency.as_str()] < at[resource.name.as_str()],
                    "{} resolved before its dependency {}",
                    resource.name,
                    dependency
                );
            }
        }
    }

    /// Property: with no explicit edges, declaration order is plan order
    #[test]
    fn prop_ties_follow_declaration_order(count in 1usize..32) {
        let (builder, _) = declare(count, &[]);
        let plan = builder.resolve().unwrap();

        let mut expected = vec!["vpc".to_string()];
        expected.extend((0..count).map(|i| format!("subnet-{i}")));
        prop_assert_eq!(plan.names(), expected);
    }

    /// Property: a back edge over any ordered pair is reported as a cycle
    #[test]
    fn prop_back_edge_is_cycle(
        (count, edges) in dependency_sets(),
        pair in (0usize..16, 0usize..16),
    ) {
        let (a, b) = (pair.0 % count, pair.1 % count);
        let (low, high) = (a.min(b), a.max(b));
        prop_assume!(low < high);

        let (mut builder, subnets) = declare(count, &edges);
        builder.depends_on(&subnets[high], &subnets[low]).unwrap();
        builder.depends_on(&subnets[low], &subnets[high]).unwrap();

        match builder.resolve() {
            Err(TopologyError::Cycle { resources }) => {
                let low_name = format!("subnet-{low}");
                let high_name = format!("subnet-{high}");
                prop_assert!(resources.contains(&low_name));
                prop_assert!(resources.contains(&high_name));
                prop_assert!(!resources.contains(&"vpc".to_string()));
            }
            other => {
                prop_assert!(false, "expected a cycle, got {:?}", other);
            }
        }
    }

    /// Property: the engine realizes exactly in plan order
    #[test]
    fn prop_engine_realizes_in_plan_order((count, edges) in dependency_sets()) {
        let (builder, _) = declare(count, &edges);
        let plan = builder.resolve().unwrap();

        let mut engine = InMemoryEngine::new();
        let realized = tokio_test::block_on(engine.apply(&plan)).unwrap();

        let names: Vec<&str> = realized.iter().map(|r| r.name.as_str()).collect();
        prop_assert_eq!(names, plan.names());
        prop_assert!(realized.windows(2).all(|pair| pair[0].sequence < pair[1].sequence));
    }
}
