// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-cluster-topology
//!
//! Deterministic declarations shared by the integration tests. Configuration
//! is always built from an explicit lookup, never from the process
//! environment.
#![allow(dead_code)]

use std::collections::HashMap;

use cim_cluster_topology::builder::{NetworkRef, SubnetRef};
use cim_cluster_topology::config::{PUBLIC_KEY_VAR, WORKER_COUNT_VAR};
use cim_cluster_topology::{declare_cluster, ClusterConfig, Stack, TopologyBuilder};

pub const PUBLIC_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIFixtureKeyMaterial cluster@example";

pub const AZ: &str = "ap-southeast-1a";

/// Configuration as loaded from the given variables
pub fn config_from(pairs: &[(&str, &str)]) -> ClusterConfig {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    ClusterConfig::from_lookup(|key: &str| vars.get(key).cloned())
        .expect("Invalid configuration in test fixture")
}

/// Default cluster configuration with key material
pub fn cluster_config() -> ClusterConfig {
    config_from(&[(PUBLIC_KEY_VAR, PUBLIC_KEY)])
}

pub fn cluster_config_with_workers(workers: usize) -> ClusterConfig {
    let workers = workers.to_string();
    config_from(&[(PUBLIC_KEY_VAR, PUBLIC_KEY), (WORKER_COUNT_VAR, workers.as_str())])
}

pub fn cluster_stack() -> Stack {
    declare_cluster(&cluster_config()).expect("Cluster fixture must declare")
}

/// Builder holding `my-vpc` 10.0.0.0/16 with a public and a private subnet
pub fn two_tier_network() -> (TopologyBuilder, NetworkRef, SubnetRef, SubnetRef) {
    let mut builder = TopologyBuilder::new();
    let vpc = builder
        .declare_network("my-vpc", "10.0.0.0/16")
        .expect("Invalid network in test fixture");
    let public = builder
        .declare_subnet("public-subnet", &vpc, "10.0.1.0/24", AZ, true)
        .expect("Invalid public subnet in test fixture");
    let private = builder
        .declare_subnet("private-subnet", &vpc, "10.0.2.0/24", AZ, false)
        .expect("Invalid private subnet in test fixture");
    (builder, vpc, public, private)
}
