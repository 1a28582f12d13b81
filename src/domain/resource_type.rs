// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cloud Resource Kind Taxonomy
//!
//! The closed set of resource kinds a cluster topology is made of. The kind
//! is the type tag carried by every resolved plan entry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    // Network primitives
    /// Virtual private cloud
    Vpc,
    /// Subnet inside a VPC
    Subnet,

    // Gateways
    /// Internet gateway attached to a VPC
    InternetGateway,
    /// Elastic IP allocation
    ElasticIp,
    /// NAT gateway inside a public subnet
    NatGateway,

    // Routing
    /// Route table
    RouteTable,
    /// Subnet to route table link
    RouteTableAssociation,

    // Access
    /// Security group (stateful firewall)
    SecurityGroup,
    /// SSH key pair
    KeyPair,

    // Compute
    /// Compute instance
    Instance,
}

impl ResourceKind {
    /// Every kind, in dependency-tier order
    pub const ALL: [ResourceKind; 10] = [
        Self::Vpc,
        Self::Subnet,
        Self::InternetGateway,
        Self::SecurityGroup,
        Self::KeyPair,
        Self::RouteTable,
        Self::RouteTableAssociation,
        Self::ElasticIp,
        Self::NatGateway,
        Self::Instance,
    ];

    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vpc => "vpc",
            Self::Subnet => "subnet",
            Self::InternetGateway => "internet_gateway",
            Self::ElasticIp => "elastic_ip",
            Self::NatGateway => "nat_gateway",
            Self::RouteTable => "route_table",
            Self::RouteTableAssociation => "route_table_association",
            Self::SecurityGroup => "security_group",
            Self::KeyPair => "key_pair",
            Self::Instance => "instance",
        }
    }

    /// Get human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Vpc => "VPC",
            Self::Subnet => "Subnet",
            Self::InternetGateway => "Internet Gateway",
            Self::ElasticIp => "Elastic IP",
            Self::NatGateway => "NAT Gateway",
            Self::RouteTable => "Route Table",
            Self::RouteTableAssociation => "Route Table Association",
            Self::SecurityGroup => "Security Group",
            Self::KeyPair => "Key Pair",
            Self::Instance => "Instance",
        }
    }

    /// Prefix of the physical identifiers the cloud assigns to this kind
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Vpc => "vpc",
            Self::Subnet => "subnet",
            Self::InternetGateway => "igw",
            Self::ElasticIp => "eipalloc",
            Self::NatGateway => "nat",
            Self::RouteTable => "rtb",
            Self::RouteTableAssociation => "rtbassoc",
            Self::SecurityGroup => "sg",
            Self::KeyPair => "key",
            Self::Instance => "i",
        }
    }

    /// Whether this kind runs workloads
    pub fn is_compute(&self) -> bool {
        matches!(self, Self::Instance)
    }

    /// Whether this kind routes traffic out of the VPC
    pub fn is_gateway(&self) -> bool {
        matches!(self, Self::InternetGateway | Self::NatGateway)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
