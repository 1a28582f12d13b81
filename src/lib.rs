// Copyright (c) 2025 - Cowboy AI, Inc.
//! Declarative cloud network topology for a small k3s cluster
//!
//! This crate builds a validated resource-dependency graph, resolves it into
//! a deterministic realization order and hands that plan to a provisioning
//! engine. Stack outputs stay deferred until the engine has realized the
//! resources they point at.

pub mod builder;
pub mod cluster;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod outputs;
pub mod stack;
pub mod state_machine;

// Re-export commonly used types
pub use builder::{
    DnsSettings, InstanceSpec, ResourceRef, RouteRule, RouteTargetRef, TopologyBuilder,
};
pub use cluster::declare_cluster;
pub use config::ClusterConfig;
pub use engine::{InMemoryEngine, ProvisioningEngine, RealizedResource};
pub use errors::{EngineError, EngineResult, TopologyError, TopologyResult};
pub use graph::{ResolvedPlan, ResolvedResource};
pub use outputs::{Output, OutputRef};
pub use stack::Stack;
