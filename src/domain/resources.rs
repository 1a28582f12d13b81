// Copyright (c) 2025 - Cowboy AI, Inc.
//! Declared Resource Properties
//!
//! One property struct per [`ResourceKind`], and the tagged [`Resource`]
//! variant the graph stores. Cross-resource links are [`Reference`]s: a
//! logical name plus the attribute the provisioning engine must substitute
//! once the referenced resource is realized.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::network::{Ipv4Cidr, PortRange, Protocol};
use super::{LogicalName, ResourceKind};

/// Well-known attribute names exposed by realized resources
pub mod attributes {
    pub const ID: &str = "id";
    pub const KEY_NAME: &str = "key_name";
    pub const PRIVATE_IP: &str = "private_ip";
    pub const PUBLIC_IP: &str = "public_ip";
    pub const CIDR_BLOCK: &str = "cidr_block";
}

/// JSON key marking a reference inside a resolved property map
pub const REFERENCE_KEY: &str = "$ref";

/// Link to an attribute of another declared resource
///
/// Serialized as `{"$ref": "<name>", "attribute": "<attr>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "$ref")]
    pub resource: LogicalName,
    pub attribute: String,
}

impl Reference {
    pub fn new(resource: LogicalName, attribute: impl Into<String>) -> Self {
        Self {
            resource,
            attribute: attribute.into(),
        }
    }

    /// Reference to the physical id of a resource
    pub fn id(resource: LogicalName) -> Self {
        Self::new(resource, attributes::ID)
    }
}

/// Property struct of one resource kind
pub trait ResourceProperties: Clone + Into<Resource> {
    const KIND: ResourceKind;

    /// Every resource this one links to
    fn references(&self) -> Vec<&Reference>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vpc {
    pub cidr_block: Ipv4Cidr,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub vpc_id: Reference,
    pub cidr_block: Ipv4Cidr,
    pub availability_zone: String,
    pub map_public_ip_on_launch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternetGateway {
    pub vpc_id: Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticIp {
    pub domain: String,
}

impl ElasticIp {
    /// Allocation usable inside a VPC
    pub fn vpc() -> Self {
        Self {
            domain: "vpc".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatGateway {
    pub subnet_id: Reference,
    pub allocation_id: Reference,
}

/// Where a route sends matching traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTarget {
    GatewayId(Reference),
    NatGatewayId(Reference),
}

impl RouteTarget {
    pub fn reference(&self) -> &Reference {
        match self {
            Self::GatewayId(reference) | Self::NatGatewayId(reference) => reference,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub cidr_block: Ipv4Cidr,
    #[serde(flatten)]
    pub target: RouteTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    pub vpc_id: Reference,
    pub routes: Vec<Route>,
}

impl RouteTable {
    pub fn default_route(&self) -> Option<&Route> {
        self.routes.iter().find(|route| route.cidr_block.is_default_route())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTableAssociation {
    pub subnet_id: Reference,
    pub route_table_id: Reference,
}

/// Ingress or egress rule of a security group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRule {
    pub protocol: Protocol,
    pub from_port: u16,
    pub to_port: u16,
    pub cidr_blocks: Vec<Ipv4Cidr>,
}

impl SecurityRule {
    pub fn new(protocol: Protocol, ports: PortRange, cidr_blocks: Vec<Ipv4Cidr>) -> Self {
        Self {
            protocol,
            from_port: ports.from_port,
            to_port: ports.to_port,
            cidr_blocks,
        }
    }

    /// Single TCP port from the given blocks
    pub fn tcp(port: u16, cidr_blocks: Vec<Ipv4Cidr>) -> Self {
        Self::new(Protocol::Tcp, PortRange::single(port), cidr_blocks)
    }

    /// Every protocol and port to/from the given blocks
    pub fn allow_all(cidr_blocks: Vec<Ipv4Cidr>) -> Self {
        Self::new(Protocol::All, PortRange::any(), cidr_blocks)
    }

    pub fn allows_port(&self, port: u16) -> bool {
        self.protocol == Protocol::All || (self.from_port..=self.to_port).contains(&port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub description: String,
    pub vpc_id: Reference,
    pub ingress: Vec<SecurityRule>,
    pub egress: Vec<SecurityRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub key_name: String,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub ami: String,
    pub instance_type: String,
    pub subnet_id: Reference,
    pub vpc_security_group_ids: Vec<Reference>,
    pub key_name: Reference,
    pub tags: BTreeMap<String, String>,
}

/// A declared resource, tagged by kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties", rename_all = "snake_case")]
pub enum Resource {
    Vpc(Vpc),
    Subnet(Subnet),
    InternetGateway(InternetGateway),
    ElasticIp(ElasticIp),
    NatGateway(NatGateway),
    RouteTable(RouteTable),
    RouteTableAssociation(RouteTableAssociation),
    SecurityGroup(SecurityGroup),
    KeyPair(KeyPair),
    Instance(Instance),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Vpc(_) => ResourceKind::Vpc,
            Self::Subnet(_) => ResourceKind::Subnet,
            Self::InternetGateway(_) => ResourceKind::InternetGateway,
            Self::ElasticIp(_) => ResourceKind::ElasticIp,
            Self::NatGateway(_) => ResourceKind::NatGateway,
            Self::RouteTable(_) => ResourceKind::RouteTable,
            Self::RouteTableAssociation(_) => ResourceKind::RouteTableAssociation,
            Self::SecurityGroup(_) => ResourceKind::SecurityGroup,
            Self::KeyPair(_) => ResourceKind::KeyPair,
            Self::Instance(_) => ResourceKind::Instance,
        }
    }

    pub fn references(&self) -> Vec<&Reference> {
        match self {
            Self::Vpc(r) => r.references(),
            Self::Subnet(r) => r.references(),
            Self::InternetGateway(r) => r.references(),
            Self::ElasticIp(r) => r.references(),
            Self::NatGateway(r) => r.references(),
            Self::RouteTable(r) => r.references(),
            Self::RouteTableAssociation(r) => r.references(),
            Self::SecurityGroup(r) => r.references(),
            Self::KeyPair(r) => r.references(),
            Self::Instance(r) => r.references(),
        }
    }

    /// Property map handed to the provisioning engine
    pub fn properties(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::Vpc(r) => serde_json::to_value(r),
            Self::Subnet(r) => serde_json::to_value(r),
            Self::InternetGateway(r) => serde_json::to_value(r),
            Self::ElasticIp(r) => serde_json::to_value(r),
            Self::NatGateway(r) => serde_json::to_value(r),
            Self::RouteTable(r) => serde_json::to_value(r),
            Self::RouteTableAssociation(r) => serde_json::to_value(r),
            Self::SecurityGroup(r) => serde_json::to_value(r),
            Self::KeyPair(r) => serde_json::to_value(r),
            Self::Instance(r) => serde_json::to_value(r),
        }
    }
}

macro_rules! resource_properties {
    ($ty:ident, |$this:ident| $refs:expr) => {
        impl ResourceProperties for $ty {
            const KIND: ResourceKind = ResourceKind::$ty;

            fn references(&self) -> Vec<&Reference> {
                let $this = self;
                $refs
            }
        }

        impl From<$ty> for Resource {
            fn from(value: $ty) -> Self {
                Resource::$ty(value)
            }
        }
    };
}

resource_properties!(Vpc, |_r| Vec::new());
resource_properties!(Subnet, |r| vec![&r.vpc_id]);
resource_properties!(InternetGateway, |r| vec![&r.vpc_id]);
resource_properties!(ElasticIp, |_r| Vec::new());
resource_properties!(NatGateway, |r| vec![&r.subnet_id, &r.allocation_id]);
resource_properties!(RouteTable, |r| {
    let mut refs = vec![&r.vpc_id];
    refs.extend(r.routes.iter().map(|route| route.target.reference()));
    refs
});
resource_properties!(RouteTableAssociation, |r| vec![&r.subnet_id, &r.route_table_id]);
resource_properties!(SecurityGroup, |r| vec![&r.vpc_id]);
resource_properties!(KeyPair, |_r| Vec::new());
resource_properties!(Instance, |r| {
    let mut refs = vec![&r.subnet_id];
    refs.extend(r.vpc_security_group_ids.iter());
    refs.push(&r.key_name);
    refs
});
