// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Engine Boundary
//!
//! The topology layer stops at a [`ResolvedPlan`]. A provisioning engine
//! realizes that plan against some backend and reports back what exists.
//!
//! # Ordering Contract
//!
//! ```text
//! ResolvedPlan ──apply──> [RealizedResource]
//!   [vpc, subnet, igw, ...]    dependencies first
//!
//! ResolvedPlan ──destroy──> [name]
//!   [..., igw, subnet, vpc]    dependents first
//! ```
//!
//! An engine must never realize a resource before every one of its
//! dependencies is realized, and must tear down in reverse plan order.
//! [`verify_order`] checks the plan side of that contract.

pub mod in_memory;

pub use in_memory::{EngineAction, EngineState, InMemoryEngine, JournalEntry};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::domain::ResourceKind;
use crate::errors::{EngineError, EngineResult};
use crate::graph::ResolvedPlan;

/// A resource as it exists in the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedResource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub physical_id: String,
    pub attributes: BTreeMap<String, String>,
    /// Declared properties with every reference substituted
    pub properties: serde_json::Value,
    /// Realization order, monotonically increasing per engine
    pub sequence: u64,
    pub realized_at: DateTime<Utc>,
}

impl RealizedResource {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Backend that realizes resolved plans
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// Realize every resource of the plan, dependencies first
    ///
    /// Resources realized earlier but absent from the plan are deleted.
    /// Returns the realized records in plan order.
    async fn apply(&mut self, plan: &ResolvedPlan) -> EngineResult<Vec<RealizedResource>>;

    /// Tear down the plan's resources in reverse order
    ///
    /// Returns the logical names deleted, in deletion order.
    async fn destroy(&mut self, plan: &ResolvedPlan) -> EngineResult<Vec<String>>;

    /// Verify the backend is reachable
    async fn health_check(&self) -> EngineResult<()>;

    /// Engine name for logging
    fn name(&self) -> &str;
}

/// Check that every dependency precedes its dependent in the plan
pub fn verify_order(plan: &ResolvedPlan) -> EngineResult<()> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(plan.len());

    for resource in plan {
        for dependency in &resource.depends_on {
            if !seen.contains(dependency.as_str()) {
                return Err(EngineError::OrderViolation {
                    resource: resource.name.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
        seen.insert(resource.name.as_str());
    }

    Ok(())
}
