// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cluster configuration
//!
//! Defaults describe the reference k3s cluster. Environment overrides are
//! read through [`ClusterConfig::from_lookup`] so the parsing logic never
//! touches the process environment directly.

use serde::{Deserialize, Serialize};

use crate::errors::{TopologyError, TopologyResult};

/// SSH public key material for the cluster key pair
pub const PUBLIC_KEY_VAR: &str = "PUBLIC_KEY";
pub const AVAILABILITY_ZONE_VAR: &str = "CLUSTER_AVAILABILITY_ZONE";
pub const INSTANCE_TYPE_VAR: &str = "CLUSTER_INSTANCE_TYPE";
pub const AMI_VAR: &str = "CLUSTER_AMI";
pub const WORKER_COUNT_VAR: &str = "CLUSTER_WORKER_COUNT";
pub const KEY_NAME_VAR: &str = "CLUSTER_KEY_NAME";

/// Resource name carried by configuration errors
pub const CONFIG_RESOURCE: &str = "cluster-config";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub availability_zone: String,
    pub vpc_cidr: String,
    pub public_subnet_cidr: String,
    pub private_subnet_cidr: String,
    pub instance_type: String,
    pub ami: String,
    /// Logical name of the key pair
    pub key_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub worker_count: usize,
    /// TCP ports opened on the cluster security group
    pub ingress_ports: Vec<u16>,
    pub ingress_cidrs: Vec<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            availability_zone: "ap-southeast-1a".to_string(),
            vpc_cidr: "10.0.0.0/16".to_string(),
            public_subnet_cidr: "10.0.1.0/24".to_string(),
            private_subnet_cidr: "10.0.2.0/24".to_string(),
            instance_type: "t3.small".to_string(),
            ami: "ami-003c463c8207b4dfa".to_string(),
            key_name: "my-key-pair".to_string(),
            public_key: None,
            worker_count: 2,
            ingress_ports: vec![22, 6443],
            ingress_cidrs: vec!["0.0.0.0/0".to_string()],
        }
    }
}

impl ClusterConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> TopologyResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> TopologyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let worker_count = match value(WORKER_COUNT_VAR) {
            Some(raw) => parse_worker_count(&raw)?,
            None => defaults.worker_count,
        };

        Ok(Self {
            availability_zone: value(AVAILABILITY_ZONE_VAR).unwrap_or(defaults.availability_zone),
            instance_type: value(INSTANCE_TYPE_VAR).unwrap_or(defaults.instance_type),
            ami: value(AMI_VAR).unwrap_or(defaults.ami),
            key_name: value(KEY_NAME_VAR).unwrap_or(defaults.key_name),
            public_key: lookup(PUBLIC_KEY_VAR),
            worker_count,
            ..defaults
        })
    }

    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }
}

fn parse_worker_count(raw: &str) -> TopologyResult<usize> {
    let count: usize = raw.trim().parse().map_err(|err| {
        TopologyError::config(CONFIG_RESOURCE, format!("{WORKER_COUNT_VAR}={raw:?}: {err}"))
    })?;

    if count == 0 {
        return Err(TopologyError::config(
            CONFIG_RESOURCE,
            format!("{WORKER_COUNT_VAR} must be at least 1"),
        ));
    }
    Ok(count)
}
