// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Dependency Graph
//!
//! Nodes are declared resources in declaration order; an edge `a → b` means
//! `a` references (or was explicitly ordered after) `b`. Resolution is Kahn's
//! algorithm with ties among ready nodes broken by declaration order, so the
//! same declaration sequence always yields the same plan.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{LogicalName, Resource, ResourceKind};
use crate::errors::{TopologyError, TopologyResult};

/// Position of a node in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A declared resource and the nodes it depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    pub id: NodeId,
    pub name: LogicalName,
    pub resource: Resource,
    /// Sorted by declaration order, no duplicates
    pub depends_on: Vec<NodeId>,
}

impl ResourceNode {
    pub fn kind(&self) -> ResourceKind {
        self.resource.kind()
    }
}

/// Directed acyclic graph of declared resources
#[derive(Debug, Clone)]
pub struct ResourceGraph {
    id: Uuid,
    nodes: Vec<ResourceNode>,
    index: HashMap<LogicalName, NodeId>,
}

impl Default for ResourceGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Identity of this graph; references from other graphs are rejected
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&ResourceNode> {
        self.nodes.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<&ResourceNode> {
        self.nodes
            .iter()
            .find(|node| node.name.as_str() == name)
    }

    pub fn node_id(&self, name: &LogicalName) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    /// Nodes in declaration order
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.iter()
    }

    /// Insert a resource; every reference it carries becomes an edge
    ///
    /// Fails with a configuration error on a duplicate name and with a
    /// dependency error when a reference names an undeclared resource.
    pub fn insert(&mut self, name: LogicalName, resource: Resource) -> TopologyResult<NodeId> {
        if self.index.contains_key(&name) {
            return Err(TopologyError::config(
                name.as_str(),
                "a resource with this logical name is already declared",
            ));
        }

        let mut depends_on = BTreeSet::new();
        for reference in resource.references() {
            let target = self.index.get(&reference.resource).ok_or_else(|| {
                TopologyError::dependency(
                    name.as_str(),
                    format!("references undeclared resource '{}'", reference.resource),
                )
            })?;
            depends_on.insert(*target);
        }

        let id = NodeId(self.nodes.len());
        debug!(
            resource = %name,
            kind = %resource.kind(),
            dependencies = depends_on.len(),
            "Declared resource"
        );

        self.index.insert(name.clone(), id);
        self.nodes.push(ResourceNode {
            id,
            name,
            resource,
            depends_on: depends_on.into_iter().collect(),
        });

        Ok(id)
    }

    /// Add an ordering-only edge: `dependent` is realized after `dependency`
    pub fn add_dependency(&mut self, dependent: NodeId, dependency: NodeId) -> TopologyResult<()> {
        let dependency_name = self
            .node(dependency)
            .map(|node| node.name.to_string())
            .ok_or_else(|| {
                TopologyError::dependency(dependency.to_string(), "node is not part of this graph")
            })?;

        let node = self.nodes.get_mut(dependent.0).ok_or_else(|| {
            TopologyError::dependency(dependent.to_string(), "node is not part of this graph")
        })?;

        if let Err(position) = node.depends_on.binary_search(&dependency) {
            debug!(resource = %node.name, dependency = %dependency_name, "Added explicit dependency");
            node.depends_on.insert(position, dependency);
        }

        Ok(())
    }

    /// Topologically order every node (Kahn's algorithm)
    ///
    /// Ready nodes are emitted lowest declaration index first. Fails with a
    /// cycle error naming the resources that lie on a cycle.
    pub fn resolve(&self) -> TopologyResult<ResolvedPlan> {
        let count = self.nodes.len();
        let mut in_degree = vec![0usize; count];
        let mut dependents: Vec<Vec<NodeId>> = vec![Vec::new(); count];

        for node in &self.nodes {
            in_degree[node.id.0] = node.depends_on.len();
            for dependency in &node.depends_on {
                dependents[dependency.0].push(node.id);
            }
        }

        let mut ready: BTreeSet<NodeId> = self
            .nodes
            .iter()
            .filter(|node| in_degree[node.id.0] == 0)
            .map(|node| node.id)
            .collect();

        let mut order = Vec::with_capacity(count);
        while let Some(next) = ready.pop_first() {
            order.push(next);
            for dependent in &dependents[next.0] {
                in_degree[dependent.0] -= 1;
                if in_degree[dependent.0] == 0 {
                    ready.insert(*dependent);
                }
            }
        }

        if order.len() != count {
            let resources = self.cyclic_nodes(&in_degree);
            return Err(TopologyError::Cycle { resources });
        }

        let resources = order
            .into_iter()
            .map(|id| self.resolved_entry(&self.nodes[id.0]))
            .collect::<TopologyResult<Vec<_>>>()?;

        info!(resources = resources.len(), "Resolved resource graph");
        Ok(ResolvedPlan { resources })
    }

    /// Names of the nodes left over by Kahn that lie on a cycle
    ///
    /// A leftover node is cyclic when its strongly connected component has
    /// more than one member or it depends on itself. Nodes merely between or
    /// downstream of cycles sit in singleton components and are dropped.
    fn cyclic_nodes(&self, in_degree: &[usize]) -> Vec<String> {
        let leftover: Vec<bool> = in_degree.iter().map(|degree| *degree > 0).collect();
        let mut components = Components::new(self.nodes.len());
        for node in &self.nodes {
            if leftover[node.id.0] && components.index[node.id.0].is_none() {
                components.visit(&self.nodes, &leftover, node.id.0);
            }
        }

        let mut cyclic = vec![false; self.nodes.len()];
        for component in &components.found {
            let self_edge = component.len() == 1
                && self.nodes[component[0]].depends_on.contains(&NodeId(component[0]));
            if component.len() > 1 || self_edge {
                for member in component {
                    cyclic[*member] = true;
                }
            }
        }

        self.nodes
            .iter()
            .filter(|node| cyclic[node.id.0])
            .map(|node| node.name.to_string())
            .collect()
    }

    fn resolved_entry(&self, node: &ResourceNode) -> TopologyResult<ResolvedResource> {
        let properties = node
            .resource
            .properties()
            .map_err(|err| TopologyError::config(node.name.as_str(), err))?;

        Ok(ResolvedResource {
            name: node.name.to_string(),
            kind: node.kind(),
            properties,
            depends_on: node
                .depends_on
                .iter()
                .map(|id| self.nodes[id.0].name.to_string())
                .collect(),
        })
    }
}

/// Tarjan's strongly connected components over the leftover subgraph
struct Components {
    next_index: usize,
    index: Vec<Option<usize>>,
    low_link: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    found: Vec<Vec<usize>>,
}

impl Components {
    fn new(count: usize) -> Self {
        Self {
            next_index: 0,
            index: vec![None; count],
            low_link: vec![0; count],
            on_stack: vec![false; count],
            stack: Vec::new(),
            found: Vec::new(),
        }
    }

    fn visit(&mut self, nodes: &[ResourceNode], leftover: &[bool], v: usize) {
        self.index[v] = Some(self.next_index);
        self.low_link[v] = self.next_index;
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack[v] = true;

        for w in nodes[v].depends_on.iter().map(|id| id.0).filter(|w| leftover[*w]) {
            match self.index[w] {
                None => {
                    self.visit(nodes, leftover, w);
                    self.low_link[v] = self.low_link[v].min(self.low_link[w]);
                }
                Some(index) if self.on_stack[w] => {
                    self.low_link[v] = self.low_link[v].min(index);
                }
                Some(_) => {}
            }
        }

        if self.index[v] == Some(self.low_link[v]) {
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack[w] = false;
                component.push(w);
                if w == v {
                    break;
                }
            }
            self.found.push(component);
        }
    }
}

/// One entry of a resolved plan, as handed to a provisioning engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedResource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub properties: serde_json::Value,
    pub depends_on: Vec<String>,
}

/// Topologically ordered resources, dependencies first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlan {
    resources: Vec<ResolvedResource>,
}

impl ResolvedPlan {
    pub fn new(resources: Vec<ResolvedResource>) -> Self {
        Self { resources }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ResolvedResource> {
        self.resources.iter()
    }

    pub fn resources(&self) -> &[ResolvedResource] {
        &self.resources
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedResource> {
        self.resources.iter().find(|resource| resource.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.resources
            .iter()
            .position(|resource| resource.name == name)
    }

    /// Logical names in plan order
    pub fn names(&self) -> Vec<&str> {
        self.resources
            .iter()
            .map(|resource| resource.name.as_str())
            .collect()
    }

    /// Group the plan into dependency levels
    ///
    /// Members of one wave never depend on each other, so an engine may
    /// realize them concurrently. Waves preserve plan order.
    pub fn waves(&self) -> Vec<Vec<&ResolvedResource>> {
        let mut levels: HashMap<&str, usize> = HashMap::new();
        let mut waves: Vec<Vec<&ResolvedResource>> = Vec::new();

        for resource in &self.resources {
            let level = resource
                .depends_on
                .iter()
                .filter_map(|dependency| levels.get(dependency.as_str()))
                .map(|level| level + 1)
                .max()
                .unwrap_or(0);

            levels.insert(resource.name.as_str(), level);
            if waves.len() <= level {
                waves.resize_with(level + 1, Vec::new);
            }
            waves[level].push(resource);
        }

        waves
    }
}

impl<'a> IntoIterator for &'a ResolvedPlan {
    type Item = &'a ResolvedResource;
    type IntoIter = std::slice::Iter<'a, ResolvedResource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ElasticIp, InternetGateway, Reference, Subnet, Vpc};
    use pretty_assertions::assert_eq;

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    fn vpc() -> Resource {
        Vpc {
            cidr_block: "10.0.0.0/16".parse().unwrap(),
            enable_dns_hostnames: true,
            enable_dns_support: true,
        }
        .into()
    }

    fn subnet(cidr: &str) -> Resource {
        Subnet {
            vpc_id: Reference::id(name("vpc")),
            cidr_block: cidr.parse().unwrap(),
            availability_zone: "ap-southeast-1a".into(),
            map_public_ip_on_launch: false,
        }
        .into()
    }

    #[test]
    fn test_insert_tracks_references() {
        let mut graph = ResourceGraph::new();
        let vpc_id = graph.insert(name("vpc"), vpc()).unwrap();
        let subnet_id = graph.insert(name("subnet-a"), subnet("10.0.1.0/24")).unwrap();

        assert_eq!(graph.node(subnet_id).unwrap().depends_on, vec![vpc_id]);
        assert_eq!(graph.node_id(&name("subnet-a")), Some(subnet_id));
        assert_eq!(graph.find("vpc").unwrap().kind(), ResourceKind::Vpc);
    }

    #[test]
    fn test_insert_rejects_duplicates_and_dangling_references() {
        let mut graph = ResourceGraph::new();
        let err = graph.insert(name("subnet-a"), subnet("10.0.1.0/24")).unwrap_err();
        assert!(err.is_dependency());
        assert!(graph.is_empty());

        graph.insert(name("vpc"), vpc()).unwrap();
        assert!(graph.insert(name("vpc"), vpc()).unwrap_err().is_config());
    }

    #[test]
    fn test_resolve_breaks_ties_by_declaration_order() {
        let mut graph = ResourceGraph::new();
        graph.insert(name("eip"), ElasticIp::vpc().into()).unwrap();
        graph.insert(name("vpc"), vpc()).unwrap();
        graph.insert(name("subnet-b"), subnet("10.0.2.0/24")).unwrap();
        graph
            .insert(
                name("igw"),
                InternetGateway {
                    vpc_id: Reference::id(name("vpc")),
                }
                .into(),
            )
            .unwrap();
        graph.insert(name("subnet-a"), subnet("10.0.1.0/24")).unwrap();

        let plan = graph.resolve().unwrap();
        assert_eq!(plan.names(), vec!["eip", "vpc", "subnet-b", "igw", "subnet-a"]);
        assert_eq!(plan.get("igw").unwrap().depends_on, vec!["vpc".to_string()]);
    }

    #[test]
    fn test_explicit_dependency_reorders() {
        let mut graph = ResourceGraph::new();
        let vpc_id = graph.insert(name("vpc"), vpc()).unwrap();
        let eip = graph.insert(name("eip"), ElasticIp::vpc().into()).unwrap();
        let subnet_id = graph.insert(name("subnet-a"), subnet("10.0.1.0/24")).unwrap();

        graph.add_dependency(eip, subnet_id).unwrap();
        graph.add_dependency(eip, subnet_id).unwrap();
        assert_eq!(graph.node(eip).unwrap().depends_on, vec![subnet_id]);

        let plan = graph.resolve().unwrap();
        assert_eq!(plan.names(), vec!["vpc", "subnet-a", "eip"]);
        assert!(graph.node(vpc_id).unwrap().depends_on.is_empty());
    }

    #[test]
    fn test_cycle_names_only_cyclic_resources() {
        let mut graph = ResourceGraph::new();
        let vpc_id = graph.insert(name("vpc"), vpc()).unwrap();
        let a = graph.insert(name("subnet-a"), subnet("10.0.1.0/24")).unwrap();
        let b = graph.insert(name("subnet-b"), subnet("10.0.2.0/24")).unwrap();
        let downstream = graph.insert(name("eip"), ElasticIp::vpc().into()).unwrap();

        graph.add_dependency(vpc_id, b).unwrap();
        graph.add_dependency(downstream, a).unwrap();

        let err = graph.resolve().unwrap_err();
        assert_eq!(
            err,
            TopologyError::Cycle {
                resources: vec!["vpc".into(), "subnet-b".into()]
            }
        );
    }

    #[test]
    fn test_node_between_two_cycles_is_not_reported() {
        let mut graph = ResourceGraph::new();
        let s: Vec<NodeId> = (0..5)
            .map(|i| graph.insert(name(&format!("eip-{i}")), ElasticIp::vpc().into()).unwrap())
            .collect();

        graph.add_dependency(s[0], s[1]).unwrap();
        graph.add_dependency(s[1], s[0]).unwrap();
        graph.add_dependency(s[2], s[0]).unwrap();
        graph.add_dependency(s[3], s[2]).unwrap();
        graph.add_dependency(s[3], s[4]).unwrap();
        graph.add_dependency(s[4], s[3]).unwrap();

        let err = graph.resolve().unwrap_err();
        assert_eq!(
            err,
            TopologyError::Cycle {
                resources: vec!["eip-0".into(), "eip-1".into(), "eip-3".into(), "eip-4".into()]
            }
        );
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let mut graph = ResourceGraph::new();
        let vpc_id = graph.insert(name("vpc"), vpc()).unwrap();
        graph.add_dependency(vpc_id, vpc_id).unwrap();
        assert!(graph.resolve().unwrap_err().is_cycle());
    }

    #[test]
    fn test_waves() {
        let mut graph = ResourceGraph::new();
        graph.insert(name("vpc"), vpc()).unwrap();
        graph.insert(name("subnet-a"), subnet("10.0.1.0/24")).unwrap();
        graph.insert(name("subnet-b"), subnet("10.0.2.0/24")).unwrap();
        graph.insert(name("eip"), ElasticIp::vpc().into()).unwrap();

        let plan = graph.resolve().unwrap();
        let waves: Vec<Vec<&str>> = plan
            .waves()
            .iter()
            .map(|wave| wave.iter().map(|r| r.name.as_str()).collect())
            .collect();
        assert_eq!(waves, vec![vec!["vpc", "eip"], vec!["subnet-a", "subnet-b"]]);
    }
}
