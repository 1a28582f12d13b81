// Copyright (c) 2025 - Cowboy AI, Inc.
//! k3s Cluster Topology
//!
//! One VPC with a public and a private subnet. The public subnet routes
//! through an internet gateway and hosts the NAT gateway and the git runner;
//! the private subnet routes through the NAT and hosts the k3s master and
//! workers.
//!
//! ```text
//! my-vpc 10.0.0.0/16
//! ├── public-subnet 10.0.1.0/24 ── 0.0.0.0/0 → internet-gateway
//! │   ├── nat-gateway (nat-eip)
//! │   └── git-runner-instance
//! └── private-subnet 10.0.2.0/24 ── 0.0.0.0/0 → nat-gateway
//!     ├── master-instance
//!     └── worker-instance-1..N
//! ```

use tracing::info;

use crate::builder::{InstanceSpec, RouteRule, TopologyBuilder};
use crate::config::ClusterConfig;
use crate::domain::{Ipv4Cidr, SecurityRule};
use crate::errors::{TopologyError, TopologyResult};
use crate::stack::Stack;

pub const VPC: &str = "my-vpc";
pub const PUBLIC_SUBNET: &str = "public-subnet";
pub const PRIVATE_SUBNET: &str = "private-subnet";
pub const INTERNET_GATEWAY: &str = "internet-gateway";
pub const PUBLIC_ROUTE_TABLE: &str = "public-route-table";
pub const PRIVATE_ROUTE_TABLE: &str = "private-route-table";
pub const NAT: &str = "nat";
pub const SECURITY_GROUP: &str = "web-secgrp";
pub const MASTER: &str = "master-instance";
pub const GIT_RUNNER: &str = "git-runner-instance";

pub const SECURITY_GROUP_DESCRIPTION: &str = "Enable SSH and K3s access";

pub const GIT_RUNNER_PUBLIC_IP: &str = "git_runner_public_ip";
pub const MASTER_PRIVATE_IP: &str = "master_private_ip";

/// Logical name of the n-th worker (1-based)
pub fn worker_name(n: usize) -> String {
    format!("worker-instance-{n}")
}

/// Output name of the n-th worker's private address (1-based)
pub fn worker_output(n: usize) -> String {
    format!("worker{n}_private_ip")
}

/// Declare the cluster and package it as a stack
pub fn declare_cluster(config: &ClusterConfig) -> TopologyResult<Stack> {
    cluster_builder(config)?.build()
}

/// Declare the cluster into a fresh builder
pub fn cluster_builder(config: &ClusterConfig) -> TopologyResult<TopologyBuilder> {
    let mut builder = TopologyBuilder::new();
    let az = config.availability_zone.as_str();

    let vpc = builder.declare_network(VPC, &config.vpc_cidr)?;
    let public = builder.declare_subnet(PUBLIC_SUBNET, &vpc, &config.public_subnet_cidr, az, true)?;
    let private =
        builder.declare_subnet(PRIVATE_SUBNET, &vpc, &config.private_subnet_cidr, az, false)?;

    let igw = builder.declare_internet_gateway(INTERNET_GATEWAY, &vpc)?;
    let public_rtb = builder.declare_route_table(
        PUBLIC_ROUTE_TABLE,
        &vpc,
        vec![RouteRule::default_via_gateway(&igw)],
    )?;
    builder.associate_route_table(
        &format!("{PUBLIC_ROUTE_TABLE}-association"),
        &public,
        &public_rtb,
    )?;

    let (_, nat) = builder.attach_nat(NAT, &public)?;
    let private_rtb = builder.declare_route_table(
        PRIVATE_ROUTE_TABLE,
        &vpc,
        vec![RouteRule::default_via_nat(&nat)],
    )?;
    builder.associate_route_table(
        &format!("{PRIVATE_ROUTE_TABLE}-association"),
        &private,
        &private_rtb,
    )?;

    let cidrs = config
        .ingress_cidrs
        .iter()
        .map(|cidr| cidr.parse::<Ipv4Cidr>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| TopologyError::config(SECURITY_GROUP, err))?;
    let ingress = config
        .ingress_ports
        .iter()
        .map(|port| SecurityRule::tcp(*port, cidrs.clone()))
        .collect();
    let sg = builder.declare_security_group(
        SECURITY_GROUP,
        &vpc,
        SECURITY_GROUP_DESCRIPTION,
        ingress,
        vec![SecurityRule::allow_all(vec![Ipv4Cidr::ANY])],
    )?;

    let keypair = builder.declare_keypair(&config.key_name, config.public_key.as_deref())?;

    let spec = |display: String| {
        InstanceSpec::new(config.ami.as_str(), config.instance_type.as_str()).with_tag("Name", display)
    };

    let master = builder.declare_instance(MASTER, &private, &sg, &keypair, spec("Master Node".into()))?;
    builder.export(MASTER_PRIVATE_IP, master.private_ip())?;

    for n in 1..=config.worker_count {
        let worker = builder.declare_instance(
            &worker_name(n),
            &private,
            &sg,
            &keypair,
            spec(format!("Worker Node {n}")),
        )?;
        builder.export(&worker_output(n), worker.private_ip())?;
    }

    let runner = builder.declare_instance(GIT_RUNNER, &public, &sg, &keypair, spec("Git Runner".into()))?;
    builder.export(GIT_RUNNER_PUBLIC_IP, runner.public_ip())?;

    info!(
        resources = builder.graph().len(),
        workers = config.worker_count,
        "Declared k3s cluster topology"
    );
    Ok(builder)
}
