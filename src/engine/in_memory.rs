// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Reference Engine
//!
//! Simulates a cloud backend: realizes resolved plans into an
//! [`EngineState`], diffing against what it realized before. Every action
//! goes through the realization state machine and into a journal.
//!
//! # Diffing
//!
//! - absent before → `create`
//! - present, same resolved properties → `unchanged`
//! - present, different properties → `update` (physical id kept)
//! - present, same properties but its address no longer fits its subnet,
//!   or its last provider call failed → `update`
//! - present, no longer in the plan → `delete`, newest first
//!
//! # Synthesized Attributes
//!
//! Physical ids are `<prefix>-<17 hex>` (`vpc-…`, `subnet-…`, `i-…`).
//! Private addresses are the lowest free host of the subnet block from
//! offset 4 (the first four addresses are reserved by the provider). An
//! address is kept across updates only while it still lies in the block.
//! Public addresses for Elastic IPs and instances in public subnets come
//! from 203.0.113.0/24.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::Ipv4Addr;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{verify_order, ProvisioningEngine, RealizedResource};
use crate::domain::resources::REFERENCE_KEY;
use crate::domain::{attributes, Ipv4Cidr, ResourceKind};
use crate::errors::{EngineError, EngineResult};
use crate::graph::{ResolvedPlan, ResolvedResource};
use crate::state_machine::{RealizationCommand, RealizationState, StateMachine};

/// First assignable host offset inside a subnet
const FIRST_HOST_OFFSET: u32 = 4;

/// First public address handed out from TEST-NET-3
const FIRST_PUBLIC_OFFSET: u32 = 10;

/// What the engine did to one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineAction {
    Create,
    Update,
    Unchanged,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub resource: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub action: EngineAction,
    pub at: DateTime<Utc>,
}

/// Everything the engine has realized, persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineState {
    pub resources: BTreeMap<String, RealizedResource>,
    pub next_sequence: u64,
    /// Public addresses handed out so far
    pub public_allocations: u32,
}

impl EngineState {
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn resource(&self, name: &str) -> Option<&RealizedResource> {
        self.resources.get(name)
    }

    /// Realized resources, oldest first
    pub fn in_realization_order(&self) -> Vec<&RealizedResource> {
        let mut resources: Vec<&RealizedResource> = self.resources.values().collect();
        resources.sort_by_key(|resource| resource.sequence);
        resources
    }

    /// Plan of everything realized, oldest first
    ///
    /// Lets a teardown run without redeclaring the topology; destroying it
    /// removes resources newest first.
    pub fn realized_plan(&self) -> ResolvedPlan {
        ResolvedPlan::new(
            self.in_realization_order()
                .into_iter()
                .map(|resource| ResolvedResource {
                    name: resource.name.clone(),
                    kind: resource.kind,
                    properties: resource.properties.clone(),
                    depends_on: Vec::new(),
                })
                .collect(),
        )
    }
}

/// Reference provisioning engine backed by process memory
#[derive(Debug, Clone)]
pub struct InMemoryEngine {
    name: String,
    state: EngineState,
    lifecycle: HashMap<String, RealizationState>,
    journal: Vec<JournalEntry>,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::from_state(EngineState::default())
    }

    /// Resume from previously realized state
    pub fn from_state(state: EngineState) -> Self {
        let lifecycle = state
            .resources
            .keys()
            .map(|name| (name.clone(), RealizationState::Realized))
            .collect();

        Self {
            name: "in-memory".to_string(),
            state,
            lifecycle,
            journal: Vec::new(),
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn into_state(self) -> EngineState {
        self.state
    }

    pub fn realized(&self, name: &str) -> Option<&RealizedResource> {
        self.state.resource(name)
    }

    pub fn lifecycle_state(&self, name: &str) -> Option<RealizationState> {
        self.lifecycle.get(name).copied()
    }

    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// Take the journal, leaving it empty
    pub fn take_journal(&mut self) -> Vec<JournalEntry> {
        std::mem::take(&mut self.journal)
    }

    pub fn snapshot(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(&self.state)?)
    }

    pub fn from_snapshot(json: &str) -> EngineResult<Self> {
        let state: EngineState = serde_json::from_str(json)?;
        Ok(Self::from_state(state))
    }

    /// Load state from a file; a missing file is an empty engine
    pub async fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        match tokio::fs::read_to_string(path.as_ref()).await {
            Ok(json) => Self::from_snapshot(&json),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.as_ref().display(), "No state file, starting empty");
                Ok(Self::new())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        tokio::fs::write(path.as_ref(), self.snapshot()?).await?;
        debug!(path = %path.as_ref().display(), resources = self.state.len(), "Saved engine state");
        Ok(())
    }

    fn transition(&mut self, name: &str, command: RealizationCommand) -> EngineResult<()> {
        let current = self
            .lifecycle
            .get(name)
            .copied()
            .unwrap_or(RealizationState::Pending);

        let (next, output) = current
            .transition(&command)
            .map_err(|source| EngineError::Lifecycle {
                resource: name.to_string(),
                source,
            })?;

        for warning in &output.warnings {
            warn!(resource = name, warning = %warning, "Lifecycle warning");
        }

        self.lifecycle.insert(name.to_string(), next);
        Ok(())
    }

    fn record(&mut self, resource: &str, kind: ResourceKind, action: EngineAction) {
        info!(engine = %self.name, resource, kind = %kind, ?action, "Engine action");
        self.journal.push(JournalEntry {
            resource: resource.to_string(),
            kind,
            action,
            at: Utc::now(),
        });
    }

    fn realize(&mut self, resource: &ResolvedResource) -> EngineResult<EngineAction> {
        for dependency in &resource.depends_on {
            let realized = self
                .lifecycle
                .get(dependency)
                .is_some_and(RealizationState::is_realized);
            if !realized {
                return Err(EngineError::DependencyNotRealized {
                    resource: resource.name.clone(),
                    dependency: dependency.clone(),
                });
            }
        }

        let properties = self.substitute(&resource.name, &resource.properties)?;

        let previous = self.state.resources.get(&resource.name).cloned();
        let settled = self
            .lifecycle
            .get(&resource.name)
            .is_some_and(RealizationState::is_realized);
        let action = match &previous {
            Some(existing) if existing.kind != resource.kind => {
                self.delete(&resource.name)?;
                EngineAction::Create
            }
            Some(existing)
                if existing.properties == properties
                    && settled
                    && !self.placement_drifted(resource, existing) =>
            {
                EngineAction::Unchanged
            }
            Some(_) => EngineAction::Update,
            None => EngineAction::Create,
        };

        let previous = match action {
            EngineAction::Unchanged => {
                self.record(&resource.name, resource.kind, action);
                return Ok(action);
            }
            EngineAction::Update => {
                self.transition(&resource.name, RealizationCommand::Update)?;
                previous
            }
            _ => {
                self.transition(&resource.name, RealizationCommand::Create)?;
                None
            }
        };

        match self.synthesize(resource, &properties, previous.as_ref()) {
            Ok(attributes) => {
                let sequence = match &previous {
                    Some(existing) => existing.sequence,
                    None => {
                        self.state.next_sequence += 1;
                        self.state.next_sequence
                    }
                };

                let physical_id = attributes
                    .get(attributes::ID)
                    .cloned()
                    .unwrap_or_default();

                self.state.resources.insert(
                    resource.name.clone(),
                    RealizedResource {
                        name: resource.name.clone(),
                        kind: resource.kind,
                        physical_id,
                        attributes,
                        properties,
                        sequence,
                        realized_at: Utc::now(),
                    },
                );
                self.transition(&resource.name, RealizationCommand::Succeed)?;
                self.record(&resource.name, resource.kind, action);
                Ok(action)
            }
            Err(err) => {
                self.transition(&resource.name, RealizationCommand::Fail)?;
                Err(err)
            }
        }
    }

    fn delete(&mut self, name: &str) -> EngineResult<()> {
        let kind = match self.state.resources.get(name) {
            Some(resource) => resource.kind,
            None => return Ok(()),
        };

        self.transition(name, RealizationCommand::Delete)?;
        self.state.resources.remove(name);
        self.transition(name, RealizationCommand::Succeed)?;
        self.lifecycle.remove(name);
        self.record(name, kind, EngineAction::Delete);
        Ok(())
    }

    /// Replace every `{"$ref": name, "attribute": attr}` with the realized value
    fn substitute(&self, owner: &str, value: &Value) -> EngineResult<Value> {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(target)) = map.get(REFERENCE_KEY) {
                    let attribute = map
                        .get("attribute")
                        .and_then(Value::as_str)
                        .unwrap_or(attributes::ID);
                    return self.reference_value(owner, target, attribute).map(Value::String);
                }

                map.iter()
                    .map(|(key, value)| Ok((key.clone(), self.substitute(owner, value)?)))
                    .collect::<EngineResult<Map<String, Value>>>()
                    .map(Value::Object)
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.substitute(owner, item))
                .collect::<EngineResult<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn reference_value(&self, owner: &str, target: &str, attribute: &str) -> EngineResult<String> {
        let record = self
            .state
            .resources
            .get(target)
            .ok_or_else(|| EngineError::UnresolvedReference {
                resource: owner.to_string(),
                reference: target.to_string(),
            })?;

        record
            .attribute(attribute)
            .map(str::to_string)
            .ok_or_else(|| EngineError::MissingAttribute {
                resource: target.to_string(),
                attribute: attribute.to_string(),
            })
    }

    fn synthesize(
        &mut self,
        resource: &ResolvedResource,
        properties: &Value,
        previous: Option<&RealizedResource>,
    ) -> EngineResult<BTreeMap<String, String>> {
        let kept = |attribute: &str| previous.and_then(|p| p.attribute(attribute)).map(str::to_string);

        let mut attrs = BTreeMap::new();
        attrs.insert(
            attributes::ID.to_string(),
            kept(attributes::ID).unwrap_or_else(|| physical_id(resource.kind)),
        );

        let copy = |attrs: &mut BTreeMap<String, String>, field: &str| {
            if let Some(value) = scalar(properties, field) {
                attrs.insert(field.to_string(), value);
            }
        };

        match resource.kind {
            ResourceKind::Vpc => copy(&mut attrs, attributes::CIDR_BLOCK),
            ResourceKind::Subnet => {
                copy(&mut attrs, attributes::CIDR_BLOCK);
                copy(&mut attrs, "availability_zone");
                copy(&mut attrs, "map_public_ip_on_launch");
            }
            ResourceKind::KeyPair => copy(&mut attrs, attributes::KEY_NAME),
            ResourceKind::ElasticIp => {
                let public_ip = match kept(attributes::PUBLIC_IP) {
                    Some(ip) => ip,
                    None => self.allocate_public()?,
                };
                attrs.insert(attributes::PUBLIC_IP.to_string(), public_ip);
            }
            ResourceKind::NatGateway => {
                let subnet = declared_reference(resource, "subnet_id")?;
                let block = self.subnet_block(&resource.name, subnet)?;
                let reusable = kept(attributes::PRIVATE_IP).filter(|ip| in_block(&block, ip));
                let private_ip = match reusable {
                    Some(ip) => ip,
                    None => self.allocate_private(&resource.name, subnet, &block)?,
                };
                attrs.insert(attributes::PRIVATE_IP.to_string(), private_ip);

                let allocation = declared_reference(resource, "allocation_id")?;
                let public_ip = self.reference_value(&resource.name, allocation, attributes::PUBLIC_IP)?;
                attrs.insert(attributes::PUBLIC_IP.to_string(), public_ip);
            }
            ResourceKind::Instance => {
                let subnet = declared_reference(resource, "subnet_id")?;
                let block = self.subnet_block(&resource.name, subnet)?;
                let reusable = kept(attributes::PRIVATE_IP).filter(|ip| in_block(&block, ip));
                let private_ip = match reusable {
                    Some(ip) => ip,
                    None => self.allocate_private(&resource.name, subnet, &block)?,
                };
                attrs.insert(attributes::PRIVATE_IP.to_string(), private_ip);

                if self.is_public_subnet(subnet) {
                    let public_ip = match kept(attributes::PUBLIC_IP) {
                        Some(ip) => ip,
                        None => self.allocate_public()?,
                    };
                    attrs.insert(attributes::PUBLIC_IP.to_string(), public_ip);
                }
            }
            _ => {}
        }

        Ok(attrs)
    }

    /// Whether a realized address no longer matches its current subnet
    ///
    /// Covers a subnet whose block changed underneath an otherwise unchanged
    /// instance or NAT gateway, and a subnet whose public flag flipped.
    fn placement_drifted(&self, resource: &ResolvedResource, existing: &RealizedResource) -> bool {
        if !matches!(resource.kind, ResourceKind::Instance | ResourceKind::NatGateway) {
            return false;
        }
        let Ok(subnet) = declared_reference(resource, "subnet_id") else {
            return false;
        };
        let Ok(block) = self.subnet_block(&resource.name, subnet) else {
            return false;
        };

        let misplaced = existing
            .attribute(attributes::PRIVATE_IP)
            .is_some_and(|ip| !in_block(&block, ip));
        let public_flipped = resource.kind == ResourceKind::Instance
            && existing.attribute(attributes::PUBLIC_IP).is_some() != self.is_public_subnet(subnet);

        misplaced || public_flipped
    }

    fn subnet_block(&self, owner: &str, subnet: &str) -> EngineResult<Ipv4Cidr> {
        self.state
            .resource(subnet)
            .ok_or_else(|| EngineError::UnresolvedReference {
                resource: owner.to_string(),
                reference: subnet.to_string(),
            })?
            .attribute(attributes::CIDR_BLOCK)
            .and_then(|cidr| cidr.parse().ok())
            .ok_or_else(|| EngineError::MissingAttribute {
                resource: subnet.to_string(),
                attribute: attributes::CIDR_BLOCK.to_string(),
            })
    }

    fn is_public_subnet(&self, subnet: &str) -> bool {
        self.state
            .resource(subnet)
            .and_then(|record| record.attribute("map_public_ip_on_launch"))
            == Some("true")
    }

    /// Lowest host of `block` not held by another realized resource
    fn allocate_private(&self, owner: &str, subnet: &str, block: &Ipv4Cidr) -> EngineResult<String> {
        let in_use: HashSet<&str> = self
            .state
            .resources
            .values()
            .filter(|record| record.name != owner)
            .filter_map(|record| record.attribute(attributes::PRIVATE_IP))
            .collect();

        (FIRST_HOST_OFFSET..)
            .map_while(|offset| host_address(block, offset))
            .find(|address| !in_use.contains(address.as_str()))
            .ok_or_else(|| EngineError::AddressExhausted {
                pool: subnet.to_string(),
            })
    }

    fn allocate_public(&mut self) -> EngineResult<String> {
        let address = host_address(
            &Ipv4Cidr::TEST_NET_3,
            FIRST_PUBLIC_OFFSET + self.state.public_allocations,
        )
        .ok_or_else(|| EngineError::AddressExhausted {
            pool: Ipv4Cidr::TEST_NET_3.to_string(),
        })?;
        self.state.public_allocations += 1;

        Ok(address)
    }
}

#[async_trait]
impl ProvisioningEngine for InMemoryEngine {
    async fn apply(&mut self, plan: &ResolvedPlan) -> EngineResult<Vec<RealizedResource>> {
        verify_order(plan)?;

        let declared: HashSet<&str> = plan.iter().map(|resource| resource.name.as_str()).collect();
        let orphans: Vec<String> = self
            .state
            .in_realization_order()
            .into_iter()
            .rev()
            .filter(|resource| !declared.contains(resource.name.as_str()))
            .map(|resource| resource.name.clone())
            .collect();

        for name in orphans {
            warn!(engine = %self.name, resource = %name, "Deleting resource that is no longer declared");
            self.delete(&name)?;
        }

        debug!(engine = %self.name, waves = plan.waves().len(), "Realizing plan in order");
        for resource in plan {
            self.realize(resource)?;
        }

        info!(engine = %self.name, resources = plan.len(), "Applied plan");

        plan.iter()
            .map(|resource| {
                self.state
                    .resource(&resource.name)
                    .cloned()
                    .ok_or_else(|| EngineError::UnresolvedReference {
                        resource: resource.name.clone(),
                        reference: resource.name.clone(),
                    })
            })
            .collect()
    }

    async fn destroy(&mut self, plan: &ResolvedPlan) -> EngineResult<Vec<String>> {
        let mut deleted = Vec::new();

        for resource in plan.iter().rev() {
            if self.state.resource(&resource.name).is_some() {
                self.delete(&resource.name)?;
                deleted.push(resource.name.clone());
            }
        }

        info!(engine = %self.name, resources = deleted.len(), "Destroyed plan");
        Ok(deleted)
    }

    async fn health_check(&self) -> EngineResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn physical_id(kind: ResourceKind) -> String {
    let hex = Uuid::now_v7().simple().to_string();
    // random tail of the v7 layout
    format!("{}-{}", kind.id_prefix(), &hex[hex.len() - 17..])
}

/// Host address at `offset`, keeping the broadcast address free
fn host_address(block: &Ipv4Cidr, offset: u32) -> Option<String> {
    if u64::from(offset) + 1 >= block.size() {
        return None;
    }
    block.nth_address(offset).map(|address| address.to_string())
}

fn in_block(block: &Ipv4Cidr, address: &str) -> bool {
    address
        .parse::<Ipv4Addr>()
        .is_ok_and(|address| block.contains_addr(address))
}

/// Scalar property rendered as an attribute string
fn scalar(properties: &Value, field: &str) -> Option<String> {
    match properties.get(field)? {
        Value::String(value) => Some(value.clone()),
        Value::Bool(value) => Some(value.to_string()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

/// Logical name behind a reference field of the declared properties
fn declared_reference<'a>(resource: &'a ResolvedResource, field: &str) -> EngineResult<&'a str> {
    resource
        .properties
        .get(field)
        .and_then(|reference| reference.get(REFERENCE_KEY))
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::MissingAttribute {
            resource: resource.name.clone(),
            attribute: field.to_string(),
        })
}
