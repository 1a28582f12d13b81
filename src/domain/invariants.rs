// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Topology Invariants
//!
//! Structural rules a declaration must satisfy before it enters the
//! resource graph. All functions are pure (no I/O, no mutation) and
//! deterministic; the builder attaches the offending resource name.

use std::collections::HashSet;

use super::network::{Ipv4Cidr, Protocol};
use super::resources::{Route, SecurityRule};

/// Validation result with detailed error information
pub type ValidationResult<T = ()> = Result<T, ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is not inside an RFC 1918 private range")]
    NotPrivate(Ipv4Cidr),

    #[error("{subnet} is not contained in network block {network}")]
    OutsideNetwork { subnet: Ipv4Cidr, network: Ipv4Cidr },

    #[error("{cidr} overlaps subnet '{existing}' ({existing_cidr})")]
    Overlap {
        cidr: Ipv4Cidr,
        existing: String,
        existing_cidr: Ipv4Cidr,
    },

    #[error("route table has {0} default routes (at most one allowed)")]
    MultipleDefaultRoutes(usize),

    #[error("duplicate route destination {0}")]
    DuplicateDestination(Ipv4Cidr),

    #[error("invalid security rule: {0}")]
    InvalidRule(String),

    #[error("public key material is absent or empty")]
    MissingKeyMaterial,

    #[error("{field} must not be blank")]
    Blank { field: &'static str },
}

/// Validate a VPC block
///
/// # Rules
/// - Must lie inside 10/8, 172.16/12 or 192.168/16
pub fn validate_network_block(cidr: &Ipv4Cidr) -> ValidationResult {
    if !cidr.is_private() {
        return Err(ValidationError::NotPrivate(*cidr));
    }
    Ok(())
}

/// Validate a subnet block against its network and sibling subnets
///
/// # Rules
/// - Contained in the network block
/// - No overlap with any existing subnet of the same network
pub fn validate_subnet_placement<'a>(
    network: &Ipv4Cidr,
    cidr: &Ipv4Cidr,
    existing: impl IntoIterator<Item = (&'a str, &'a Ipv4Cidr)>,
) -> ValidationResult {
    if !network.contains(cidr) {
        return Err(ValidationError::OutsideNetwork {
            subnet: *cidr,
            network: *network,
        });
    }

    for (name, other) in existing {
        if cidr.overlaps(other) {
            return Err(ValidationError::Overlap {
                cidr: *cidr,
                existing: name.to_string(),
                existing_cidr: *other,
            });
        }
    }

    Ok(())
}

/// Validate the route set of one table
///
/// # Rules
/// - At most one `0.0.0.0/0` route
/// - Destinations are unique
pub fn validate_routes(routes: &[Route]) -> ValidationResult {
    let defaults = routes
        .iter()
        .filter(|route| route.cidr_block.is_default_route())
        .count();
    if defaults > 1 {
        return Err(ValidationError::MultipleDefaultRoutes(defaults));
    }

    let mut seen = HashSet::new();
    for route in routes {
        if !seen.insert(route.cidr_block) {
            return Err(ValidationError::DuplicateDestination(route.cidr_block));
        }
    }

    Ok(())
}

/// Validate one security group rule
///
/// # Rules
/// - `from_port <= to_port`
/// - Protocol `-1` uses ports `0..0`
/// - At least one CIDR block
pub fn validate_security_rule(rule: &SecurityRule) -> ValidationResult {
    if rule.from_port > rule.to_port {
        return Err(ValidationError::InvalidRule(format!(
            "port range {}-{} is reversed",
            rule.from_port, rule.to_port
        )));
    }

    if rule.protocol == Protocol::All && (rule.from_port != 0 || rule.to_port != 0) {
        return Err(ValidationError::InvalidRule(
            "protocol -1 requires ports 0-0".to_string(),
        ));
    }

    if rule.cidr_blocks.is_empty() {
        return Err(ValidationError::InvalidRule(
            "rule has no CIDR blocks".to_string(),
        ));
    }

    Ok(())
}

/// Validate SSH public key material and return it trimmed
///
/// # Rules
/// - Present
/// - Not blank
pub fn validate_public_key(material: Option<&str>) -> ValidationResult<String> {
    match material.map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(ValidationError::MissingKeyMaterial),
    }
}

/// Validate a required free-form field
pub fn validate_not_blank(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { field });
    }
    Ok(())
}
