// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Domain Models
//!
//! Value objects and resource property types for a declared cloud network
//! topology.
//!
//! # Value Objects with Invariants
//!
//! - [`LogicalName`] - Resource identity (lowercase, hyphenated)
//! - [`Ipv4Cidr`] - IPv4 block with no host bits set
//! - [`Protocol`] / [`PortRange`] - Security rule building blocks
//! - [`ResourceKind`] - Resource type taxonomy
//!
//! # Resources
//!
//! - [`Resource`] - Tagged variant over every property struct in [`resources`]

pub mod invariants;
pub mod name;
pub mod network;
pub mod resource_type;
pub mod resources;

pub use invariants::{ValidationError, ValidationResult};
pub use name::{LogicalName, NameError};
pub use network::{Ipv4Cidr, NetworkError, PortRange, Protocol};
pub use resource_type::ResourceKind;
pub use resources::{
    attributes, ElasticIp, Instance, InternetGateway, KeyPair, NatGateway, Reference, Resource,
    ResourceProperties, Route, RouteTable, RouteTableAssociation, RouteTarget, SecurityGroup,
    SecurityRule, Subnet, Vpc,
};
