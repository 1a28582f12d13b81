// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Builder
//!
//! Typed, fail-fast declaration of a network topology. Every `declare_*`
//! call validates its inputs before touching the graph, so a failed call
//! leaves the builder unchanged. Handles ([`ResourceRef`]) are typed by
//! resource kind and bound to the builder that issued them.
//!
//! # Example
//!
//! ```rust
//! use cim_cluster_topology::builder::{RouteRule, TopologyBuilder};
//!
//! let mut builder = TopologyBuilder::new();
//! let vpc = builder.declare_network("my-vpc", "10.0.0.0/16")?;
//! let public = builder.declare_subnet("public-subnet", &vpc, "10.0.1.0/24", "ap-southeast-1a", true)?;
//! let igw = builder.declare_internet_gateway("internet-gateway", &vpc)?;
//! let rtb = builder.declare_route_table("public-route-table", &vpc, vec![RouteRule::default_via_gateway(&igw)])?;
//! builder.associate_route_table("public-route-table-association", &public, &rtb)?;
//!
//! let plan = builder.resolve()?;
//! assert_eq!(plan.names()[0], "my-vpc");
//! # Ok::<(), cim_cluster_topology::TopologyError>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use tracing::info;
use uuid::Uuid;

use crate::domain::invariants::{
    validate_network_block, validate_not_blank, validate_public_key, validate_routes,
    validate_security_rule, validate_subnet_placement,
};
use crate::domain::{
    attributes, ElasticIp, Instance, InternetGateway, Ipv4Cidr, KeyPair, LogicalName, NatGateway,
    Reference, Resource, ResourceKind, ResourceProperties, Route, RouteTable,
    RouteTableAssociation, RouteTarget, SecurityGroup, SecurityRule, Subnet, Vpc,
};
use crate::errors::{TopologyError, TopologyResult};
use crate::graph::{NodeId, ResolvedPlan, ResourceGraph, ResourceNode};
use crate::outputs::{Export, OutputRef};
use crate::stack::Stack;

/// Typed handle on a resource declared by one builder
pub struct ResourceRef<T> {
    graph: Uuid,
    node: NodeId,
    name: LogicalName,
    _kind: PhantomData<fn() -> T>,
}

pub type NetworkRef = ResourceRef<Vpc>;
pub type SubnetRef = ResourceRef<Subnet>;
pub type GatewayRef = ResourceRef<InternetGateway>;
pub type EipRef = ResourceRef<ElasticIp>;
pub type NatGatewayRef = ResourceRef<NatGateway>;
pub type RouteTableRef = ResourceRef<RouteTable>;
pub type AssociationRef = ResourceRef<RouteTableAssociation>;
pub type SgRef = ResourceRef<SecurityGroup>;
pub type KeyPairRef = ResourceRef<KeyPair>;
pub type InstanceRef = ResourceRef<Instance>;

impl<T> Clone for ResourceRef<T> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph,
            node: self.node,
            name: self.name.clone(),
            _kind: PhantomData,
        }
    }
}

impl<T> PartialEq for ResourceRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.graph == other.graph && self.node == other.node
    }
}

impl<T> Eq for ResourceRef<T> {}

impl<T: ResourceProperties> fmt::Debug for ResourceRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRef")
            .field("kind", &T::KIND)
            .field("name", &self.name)
            .field("node", &self.node)
            .finish()
    }
}

impl<T: ResourceProperties> ResourceRef<T> {
    pub fn name(&self) -> &LogicalName {
        &self.name
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn kind(&self) -> ResourceKind {
        T::KIND
    }

    /// Reference to the physical id of this resource
    pub fn id(&self) -> Reference {
        Reference::id(self.name.clone())
    }

    pub fn attribute(&self, attribute: impl Into<String>) -> Reference {
        Reference::new(self.name.clone(), attribute)
    }

    /// Deferred output of one attribute
    pub fn output(&self, attribute: impl Into<String>) -> OutputRef {
        OutputRef::new(self.name.clone(), attribute)
    }
}

impl ResourceRef<Instance> {
    pub fn private_ip(&self) -> OutputRef {
        self.output(attributes::PRIVATE_IP)
    }

    pub fn public_ip(&self) -> OutputRef {
        self.output(attributes::PUBLIC_IP)
    }
}

impl ResourceRef<ElasticIp> {
    pub fn public_ip(&self) -> OutputRef {
        self.output(attributes::PUBLIC_IP)
    }
}

/// DNS flags of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnsSettings {
    pub hostnames: bool,
    pub support: bool,
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            hostnames: true,
            support: true,
        }
    }
}

/// Gateway a route rule points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTargetRef {
    Gateway(GatewayRef),
    Nat(NatGatewayRef),
}

/// Route rule as declared: destination block text and a gateway handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub destination: String,
    pub target: RouteTargetRef,
}

impl RouteRule {
    pub fn new(destination: impl Into<String>, target: RouteTargetRef) -> Self {
        Self {
            destination: destination.into(),
            target,
        }
    }

    /// `0.0.0.0/0` through an internet gateway
    pub fn default_via_gateway(gateway: &GatewayRef) -> Self {
        Self::new(Ipv4Cidr::ANY.to_string(), RouteTargetRef::Gateway(gateway.clone()))
    }

    /// `0.0.0.0/0` through a NAT gateway
    pub fn default_via_nat(nat: &NatGatewayRef) -> Self {
        Self::new(Ipv4Cidr::ANY.to_string(), RouteTargetRef::Nat(nat.clone()))
    }
}

/// Machine image, size and tags of an instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceSpec {
    pub image: String,
    pub instance_type: String,
    pub tags: BTreeMap<String, String>,
}

impl InstanceSpec {
    pub fn new(image: impl Into<String>, instance_type: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            instance_type: instance_type.into(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Declares resources into a fresh [`ResourceGraph`]
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    graph: ResourceGraph,
    network: Option<NodeId>,
    exports: Vec<Export>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// Declare the network with DNS hostnames and support enabled
    pub fn declare_network(&mut self, name: &str, cidr: &str) -> TopologyResult<NetworkRef> {
        self.declare_network_with_dns(name, cidr, DnsSettings::default())
    }

    pub fn declare_network_with_dns(
        &mut self,
        name: &str,
        cidr: &str,
        dns: DnsSettings,
    ) -> TopologyResult<NetworkRef> {
        let name = logical_name(name)?;

        if let Some(existing) = self.network.and_then(|id| self.graph.node(id)) {
            return Err(TopologyError::config(
                name.as_str(),
                format!("network '{}' is already declared", existing.name),
            ));
        }

        let cidr_block = parse_cidr(&name, cidr)?;
        validate_network_block(&cidr_block).map_err(|err| TopologyError::config(name.as_str(), err))?;

        let handle = self.insert(
            name,
            Vpc {
                cidr_block,
                enable_dns_hostnames: dns.hostnames,
                enable_dns_support: dns.support,
            },
        )?;
        self.network = Some(handle.node);
        Ok(handle)
    }

    pub fn declare_subnet(
        &mut self,
        name: &str,
        network: &NetworkRef,
        cidr: &str,
        availability_zone: &str,
        public: bool,
    ) -> TopologyResult<SubnetRef> {
        let name = logical_name(name)?;
        let network_node = self.check(&name, network)?;
        let network_block = match &network_node.resource {
            Resource::Vpc(vpc) => vpc.cidr_block,
            _ => return Err(kind_mismatch(&name, network)),
        };

        let cidr_block = parse_cidr(&name, cidr)?;
        validate_not_blank("availability_zone", availability_zone)
            .map_err(|err| TopologyError::config(name.as_str(), err))?;

        let siblings = self.graph.nodes().filter_map(|node| match &node.resource {
            Resource::Subnet(subnet) if subnet.vpc_id.resource == network.name => {
                Some((node.name.as_str(), &subnet.cidr_block))
            }
            _ => None,
        });
        validate_subnet_placement(&network_block, &cidr_block, siblings)
            .map_err(|err| TopologyError::config(name.as_str(), err))?;

        self.insert(
            name,
            Subnet {
                vpc_id: network.id(),
                cidr_block,
                availability_zone: availability_zone.to_string(),
                map_public_ip_on_launch: public,
            },
        )
    }

    /// At most one internet gateway per network
    pub fn declare_internet_gateway(
        &mut self,
        name: &str,
        network: &NetworkRef,
    ) -> TopologyResult<GatewayRef> {
        let name = logical_name(name)?;
        self.check(&name, network)?;

        if let Some(existing) = self.internet_gateway_of(&network.name) {
            return Err(TopologyError::config(
                name.as_str(),
                format!(
                    "network '{}' already has internet gateway '{}'",
                    network.name, existing.name
                ),
            ));
        }

        self.insert(name, InternetGateway { vpc_id: network.id() })
    }

    /// Route targets must be declared in this builder and in the same network
    pub fn declare_route_table(
        &mut self,
        name: &str,
        network: &NetworkRef,
        rules: Vec<RouteRule>,
    ) -> TopologyResult<RouteTableRef> {
        let name = logical_name(name)?;
        self.check(&name, network)?;

        let mut routes = Vec::with_capacity(rules.len());
        for rule in &rules {
            let cidr_block = parse_cidr(&name, &rule.destination)?;
            let (target_name, target) = match &rule.target {
                RouteTargetRef::Gateway(gateway) => {
                    self.check_route_target(&name, gateway)?;
                    (gateway.name(), RouteTarget::GatewayId(gateway.id()))
                }
                RouteTargetRef::Nat(nat) => {
                    self.check_route_target(&name, nat)?;
                    (nat.name(), RouteTarget::NatGatewayId(nat.id()))
                }
            };

            if self.network_of(target_name) != Some(&network.name) {
                return Err(TopologyError::config(
                    name.as_str(),
                    format!(
                        "route target '{}' is not in network '{}'",
                        target_name, network.name
                    ),
                ));
            }

            routes.push(Route { cidr_block, target });
        }

        validate_routes(&routes).map_err(|err| TopologyError::config(name.as_str(), err))?;

        self.insert(
            name,
            RouteTable {
                vpc_id: network.id(),
                routes,
            },
        )
    }

    /// A subnet is associated with exactly one route table
    pub fn associate_route_table(
        &mut self,
        name: &str,
        subnet: &SubnetRef,
        route_table: &RouteTableRef,
    ) -> TopologyResult<AssociationRef> {
        let name = logical_name(name)?;
        self.check(&name, subnet)?;
        self.check(&name, route_table)?;

        let existing = self.graph.nodes().find(|node| match &node.resource {
            Resource::RouteTableAssociation(association) => {
                association.subnet_id.resource == subnet.name
            }
            _ => false,
        });
        if let Some(existing) = existing {
            return Err(TopologyError::config(
                name.as_str(),
                format!(
                    "subnet '{}' is already associated by '{}'",
                    subnet.name, existing.name
                ),
            ));
        }

        if self.network_of(&subnet.name) != self.network_of(&route_table.name) {
            return Err(TopologyError::config(
                name.as_str(),
                format!(
                    "subnet '{}' and route table '{}' belong to different networks",
                    subnet.name, route_table.name
                ),
            ));
        }

        self.insert(
            name,
            RouteTableAssociation {
                subnet_id: subnet.id(),
                route_table_id: route_table.id(),
            },
        )
    }

    /// Declare `<name>-eip` and `<name>-gateway` in a public subnet
    ///
    /// The NAT gateway is ordered after the network's internet gateway when
    /// one is declared.
    pub fn attach_nat(
        &mut self,
        name: &str,
        public_subnet: &SubnetRef,
    ) -> TopologyResult<(EipRef, NatGatewayRef)> {
        let base = logical_name(name)?;
        let eip_name = logical_name(&format!("{base}-eip"))?;
        let nat_name = logical_name(&format!("{base}-gateway"))?;

        let subnet_node = self.check(&nat_name, public_subnet)?;
        let (public, network) = match &subnet_node.resource {
            Resource::Subnet(subnet) => (subnet.map_public_ip_on_launch, subnet.vpc_id.resource.clone()),
            _ => return Err(kind_mismatch(&nat_name, public_subnet)),
        };
        if !public {
            return Err(TopologyError::dependency(
                nat_name.as_str(),
                format!("subnet '{}' is not public", public_subnet.name),
            ));
        }

        for taken in [&eip_name, &nat_name] {
            if self.graph.node_id(taken).is_some() {
                return Err(TopologyError::config(
                    taken.as_str(),
                    "a resource with this logical name is already declared",
                ));
            }
        }

        let gateway = self.internet_gateway_of(&network).map(|node| node.id);

        let eip = self.insert(eip_name, ElasticIp::vpc())?;
        let nat = self.insert(
            nat_name,
            NatGateway {
                subnet_id: public_subnet.id(),
                allocation_id: eip.id(),
            },
        )?;

        if let Some(gateway) = gateway {
            self.graph.add_dependency(nat.node, gateway)?;
        }

        Ok((eip, nat))
    }

    pub fn declare_security_group(
        &mut self,
        name: &str,
        network: &NetworkRef,
        description: &str,
        ingress: Vec<SecurityRule>,
        egress: Vec<SecurityRule>,
    ) -> TopologyResult<SgRef> {
        let name = logical_name(name)?;
        self.check(&name, network)?;

        validate_not_blank("description", description)
            .map_err(|err| TopologyError::config(name.as_str(), err))?;

        for (direction, rules) in [("ingress", &ingress), ("egress", &egress)] {
            for (position, rule) in rules.iter().enumerate() {
                validate_security_rule(rule).map_err(|err| {
                    TopologyError::config(name.as_str(), format!("{direction} rule {}: {err}", position + 1))
                })?;
            }
        }

        self.insert(
            name,
            SecurityGroup {
                description: description.to_string(),
                vpc_id: network.id(),
                ingress,
                egress,
            },
        )
    }

    /// Register SSH public key material under the key pair's logical name
    pub fn declare_keypair(
        &mut self,
        name: &str,
        public_key: Option<&str>,
    ) -> TopologyResult<KeyPairRef> {
        let name = logical_name(name)?;
        let public_key =
            validate_public_key(public_key).map_err(|err| TopologyError::config(name.as_str(), err))?;

        self.insert(
            name.clone(),
            KeyPair {
                key_name: name.to_string(),
                public_key,
            },
        )
    }

    pub fn declare_instance(
        &mut self,
        name: &str,
        subnet: &SubnetRef,
        security_group: &SgRef,
        keypair: &KeyPairRef,
        spec: InstanceSpec,
    ) -> TopologyResult<InstanceRef> {
        let name = logical_name(name)?;
        self.check(&name, subnet)?;
        self.check(&name, security_group)?;
        self.check(&name, keypair)?;

        if self.network_of(&subnet.name) != self.network_of(&security_group.name) {
            return Err(TopologyError::dependency(
                name.as_str(),
                format!(
                    "security group '{}' is not in the network of subnet '{}'",
                    security_group.name, subnet.name
                ),
            ));
        }

        validate_not_blank("image", &spec.image)
            .and_then(|()| validate_not_blank("instance_type", &spec.instance_type))
            .map_err(|err| TopologyError::config(name.as_str(), err))?;

        self.insert(
            name,
            Instance {
                ami: spec.image,
                instance_type: spec.instance_type,
                subnet_id: subnet.id(),
                vpc_security_group_ids: vec![security_group.id()],
                key_name: keypair.attribute(attributes::KEY_NAME),
                tags: spec.tags,
            },
        )
    }

    /// Order `dependent` after `dependency` without a property reference
    pub fn depends_on<A, B>(
        &mut self,
        dependent: &ResourceRef<A>,
        dependency: &ResourceRef<B>,
    ) -> TopologyResult<()>
    where
        A: ResourceProperties,
        B: ResourceProperties,
    {
        self.check(dependent.name(), dependent)?;
        self.check(dependent.name(), dependency)?;
        self.graph.add_dependency(dependent.node, dependency.node)
    }

    /// Typed handle on an already declared resource
    pub fn lookup<T: ResourceProperties>(&self, name: &str) -> TopologyResult<ResourceRef<T>> {
        let node = self
            .graph
            .find(name)
            .ok_or_else(|| TopologyError::dependency(name, "no resource with this logical name is declared"))?;

        if node.kind() != T::KIND {
            return Err(TopologyError::dependency(
                name,
                format!("is a {}, not a {}", node.kind().display_name(), T::KIND.display_name()),
            ));
        }

        Ok(self.handle(node.id, node.name.clone()))
    }

    /// Register a named stack output
    pub fn export(&mut self, name: &str, output: OutputRef) -> TopologyResult<()> {
        validate_export_name(name)?;

        if self.exports.iter().any(|export| export.name == name) {
            return Err(TopologyError::config(name, "an output with this name is already exported"));
        }

        if self.graph.node_id(&output.resource).is_none() {
            return Err(TopologyError::dependency(
                name,
                format!("output source '{}' is not declared", output.resource),
            ));
        }

        self.exports.push(Export {
            name: name.to_string(),
            source: output,
        });
        Ok(())
    }

    /// Topologically ordered plan of everything declared so far
    pub fn resolve(&self) -> TopologyResult<ResolvedPlan> {
        self.graph.resolve()
    }

    /// Resolve and package the plan with its exports
    pub fn build(self) -> TopologyResult<Stack> {
        let plan = self.graph.resolve()?;
        info!(
            resources = plan.len(),
            outputs = self.exports.len(),
            "Built topology stack"
        );
        Ok(Stack::new(plan, self.exports))
    }

    fn insert<T: ResourceProperties>(
        &mut self,
        name: LogicalName,
        properties: T,
    ) -> TopologyResult<ResourceRef<T>> {
        let node = self.graph.insert(name.clone(), properties.into())?;
        Ok(self.handle(node, name))
    }

    fn handle<T>(&self, node: NodeId, name: LogicalName) -> ResourceRef<T> {
        ResourceRef {
            graph: self.graph.id(),
            node,
            name,
            _kind: PhantomData,
        }
    }

    /// Node behind a handle issued by this builder
    fn check<T: ResourceProperties>(
        &self,
        owner: &LogicalName,
        handle: &ResourceRef<T>,
    ) -> TopologyResult<&ResourceNode> {
        if handle.graph != self.graph.id() {
            return Err(TopologyError::dependency(
                owner.as_str(),
                format!(
                    "{} '{}' was declared by another builder",
                    T::KIND.display_name(),
                    handle.name
                ),
            ));
        }

        self.graph
            .node(handle.node)
            .filter(|node| node.name == handle.name && node.kind() == T::KIND)
            .ok_or_else(|| {
                TopologyError::dependency(
                    owner.as_str(),
                    format!("{} '{}' is not declared", T::KIND.display_name(), handle.name),
                )
            })
    }

    fn check_route_target<T: ResourceProperties>(
        &self,
        owner: &LogicalName,
        target: &ResourceRef<T>,
    ) -> TopologyResult<()> {
        self.check(owner, target).map(|_| ()).map_err(|err| match err {
            TopologyError::Dependency { resource, reason } => TopologyError::Config {
                resource,
                reason: format!("unresolved route target: {reason}"),
            },
            other => other,
        })
    }

    fn internet_gateway_of(&self, network: &LogicalName) -> Option<&ResourceNode> {
        self.graph.nodes().find(|node| match &node.resource {
            Resource::InternetGateway(gateway) => gateway.vpc_id.resource == *network,
            _ => false,
        })
    }

    /// Logical name of the network a resource lives in
    fn network_of(&self, name: &LogicalName) -> Option<&LogicalName> {
        let node = self.graph.node(self.graph.node_id(name)?)?;
        match &node.resource {
            Resource::Vpc(_) => Some(&node.name),
            Resource::Subnet(Subnet { vpc_id, .. })
            | Resource::InternetGateway(InternetGateway { vpc_id })
            | Resource::RouteTable(RouteTable { vpc_id, .. })
            | Resource::SecurityGroup(SecurityGroup { vpc_id, .. }) => Some(&vpc_id.resource),
            Resource::NatGateway(nat) => self.network_of(&nat.subnet_id.resource),
            Resource::RouteTableAssociation(association) => {
                self.network_of(&association.subnet_id.resource)
            }
            Resource::Instance(instance) => self.network_of(&instance.subnet_id.resource),
            Resource::ElasticIp(_) | Resource::KeyPair(_) => None,
        }
    }
}

fn logical_name(name: &str) -> TopologyResult<LogicalName> {
    LogicalName::new(name).map_err(|err| TopologyError::config(name, err))
}

fn parse_cidr(owner: &LogicalName, cidr: &str) -> TopologyResult<Ipv4Cidr> {
    cidr.parse()
        .map_err(|err| TopologyError::config(owner.as_str(), err))
}

fn kind_mismatch<T: ResourceProperties>(owner: &LogicalName, handle: &ResourceRef<T>) -> TopologyError {
    TopologyError::dependency(
        owner.as_str(),
        format!("'{}' is not a {}", handle.name, T::KIND.display_name()),
    )
}

/// Output names are identifiers: lowercase letter first, then `[a-z0-9_]`
fn validate_export_name(name: &str) -> TopologyResult<()> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if !valid {
        return Err(TopologyError::config(
            name,
            "output names must match [a-z][a-z0-9_]*",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn network(builder: &mut TopologyBuilder) -> NetworkRef {
        builder.declare_network("my-vpc", "10.0.0.0/16").unwrap()
    }

    #[test]
    fn test_declare_network_rules() {
        let mut builder = TopologyBuilder::new();
        assert!(builder.declare_network("vpc", "10.0.0.1/16").unwrap_err().is_config());
        assert!(builder.declare_network("vpc", "8.8.0.0/16").unwrap_err().is_config());
        assert!(builder.declare_network("Bad Name", "10.0.0.0/16").unwrap_err().is_config());
        assert!(builder.graph().is_empty());

        let vpc = network(&mut builder);
        assert_eq!(vpc.kind(), ResourceKind::Vpc);

        let err = builder.declare_network("other-vpc", "10.1.0.0/16").unwrap_err();
        assert_eq!(err.resource(), Some("other-vpc"));
        assert_eq!(builder.graph().len(), 1);
    }

    #[test]
    fn test_subnet_overlap_leaves_builder_unchanged() {
        let mut builder = TopologyBuilder::new();
        let vpc = network(&mut builder);
        builder
            .declare_subnet("public-subnet", &vpc, "10.0.1.0/24", "ap-southeast-1a", true)
            .unwrap();

        let err = builder
            .declare_subnet("bad-subnet", &vpc, "10.0.1.0/25", "ap-southeast-1a", false)
            .unwrap_err();
        assert!(err.is_config());
        assert_eq!(err.resource(), Some("bad-subnet"));
        assert_eq!(builder.graph().len(), 2);

        assert!(builder
            .declare_subnet("outside", &vpc, "10.1.0.0/24", "ap-southeast-1a", false)
            .unwrap_err()
            .is_config());
    }

    #[test]
    fn test_second_internet_gateway_rejected() {
        let mut builder = TopologyBuilder::new();
        let vpc = network(&mut builder);
        builder.declare_internet_gateway("internet-gateway", &vpc).unwrap();
        assert!(builder
            .declare_internet_gateway("second-gateway", &vpc)
            .unwrap_err()
            .is_config());
    }

    #[test]
    fn test_attach_nat_names_and_gateway_edge() {
        let mut builder = TopologyBuilder::new();
        let vpc = network(&mut builder);
        let public = builder
            .declare_subnet("public-subnet", &vpc, "10.0.1.0/24", "ap-southeast-1a", true)
            .unwrap();
        let igw = builder.declare_internet_gateway("internet-gateway", &vpc).unwrap();

        let (eip, nat) = builder.attach_nat("nat", &public).unwrap();
        assert_eq!(eip.name().as_str(), "nat-eip");
        assert_eq!(nat.name().as_str(), "nat-gateway");

        let nat_node = builder.graph().node(nat.node()).unwrap();
        assert!(nat_node.depends_on.contains(&igw.node()));
        assert!(nat_node.depends_on.contains(&eip.node()));

        let err = builder.attach_nat("nat", &public).unwrap_err();
        assert!(err.is_config());
        assert_eq!(err.resource(), Some("nat-eip"));
    }

    #[test]
    fn test_route_table_target_in_other_builder_is_config_error() {
        let mut other = TopologyBuilder::new();
        let other_vpc = network(&mut other);
        let foreign_igw = other.declare_internet_gateway("internet-gateway", &other_vpc).unwrap();

        let mut builder = TopologyBuilder::new();
        let vpc = network(&mut builder);
        let err = builder
            .declare_route_table(
                "public-route-table",
                &vpc,
                vec![RouteRule::default_via_gateway(&foreign_igw)],
            )
            .unwrap_err();
        assert!(err.is_config());

        let err = builder
            .declare_route_table(
                "bad-destination",
                &vpc,
                vec![RouteRule::new("10.0.0.0/33", RouteTargetRef::Gateway(foreign_igw))],
            )
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_subnet_associated_once() {
        let mut builder = TopologyBuilder::new();
        let vpc = network(&mut builder);
        let subnet = builder
            .declare_subnet("public-subnet", &vpc, "10.0.1.0/24", "ap-southeast-1a", true)
            .unwrap();
        let rtb = builder.declare_route_table("rtb", &vpc, Vec::new()).unwrap();

        builder.associate_route_table("assoc-a", &subnet, &rtb).unwrap();
        let err = builder.associate_route_table("assoc-b", &subnet, &rtb).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_security_group_rule_validation() {
        let mut builder = TopologyBuilder::new();
        let vpc = network(&mut builder);

        let err = builder
            .declare_security_group(
                "web-secgrp",
                &vpc,
                "Enable SSH",
                vec![SecurityRule::tcp(22, Vec::new())],
                Vec::new(),
            )
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("ingress rule 1"));

        assert!(builder
            .declare_security_group("web-secgrp", &vpc, "  ", Vec::new(), Vec::new())
            .unwrap_err()
            .is_config());
    }

    #[test]
    fn test_lookup_is_typed() {
        let mut builder = TopologyBuilder::new();
        let vpc = network(&mut builder);

        let found: NetworkRef = builder.lookup("my-vpc").unwrap();
        assert_eq!(found, vpc);

        assert!(builder.lookup::<Subnet>("my-vpc").unwrap_err().is_dependency());
        assert!(builder.lookup::<Vpc>("missing").unwrap_err().is_dependency());
    }

    #[test]
    fn test_export_validation() {
        let mut builder = TopologyBuilder::new();
        let keypair = builder.declare_keypair("my-key-pair", Some("ssh-ed25519 AAAA")).unwrap();
        let key_name = keypair.output(attributes::KEY_NAME);

        builder.export("key_name", key_name.clone()).unwrap();
        assert!(builder.export("key_name", key_name.clone()).unwrap_err().is_config());
        assert!(builder.export("Key-Name", key_name).unwrap_err().is_config());

        let dangling = OutputRef::new(LogicalName::new("ghost").unwrap(), attributes::ID);
        assert!(builder.export("ghost_id", dangling).unwrap_err().is_dependency());
        assert_eq!(builder.exports().len(), 1);
    }

    #[test]
    fn test_depends_on_creates_cycle() {
        let mut builder = TopologyBuilder::new();
        let vpc = network(&mut builder);
        let subnet = builder
            .declare_subnet("public-subnet", &vpc, "10.0.1.0/24", "ap-southeast-1a", true)
            .unwrap();

        builder.depends_on(&vpc, &subnet).unwrap();
        let err = builder.resolve().unwrap_err();
        assert_eq!(
            err,
            TopologyError::Cycle {
                resources: vec!["my-vpc".into(), "public-subnet".into()]
            }
        );
    }
}
