// Copyright (c) 2025 - Cowboy AI, Inc.
//! Logical Resource Name Value Object

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Logical name validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("Logical name is empty")]
    Empty,

    #[error("Logical name exceeds maximum length of 255 characters: {0}")]
    TooLong(usize),

    #[error("Invalid character in logical name: {0:?}")]
    InvalidCharacter(char),

    #[error("Logical name cannot start or end with hyphen: {0}")]
    InvalidFormat(String),
}

/// Identity of a declared resource
///
/// Invariants:
/// - Non-empty, at most 255 characters
/// - ASCII lowercase letters, digits and hyphens only
/// - Does not start or end with a hyphen
///
/// # Examples
///
/// ```rust
/// use cim_cluster_topology::domain::LogicalName;
///
/// let name = LogicalName::new("public-subnet").unwrap();
/// assert_eq!(name.as_str(), "public-subnet");
///
/// assert!(LogicalName::new("").is_err());
/// assert!(LogicalName::new("-vpc").is_err());
/// assert!(LogicalName::new("My VPC").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalName(String);

impl LogicalName {
    pub const MAX_LENGTH: usize = 255;

    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();

        if name.is_empty() {
            return Err(NameError::Empty);
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(NameError::TooLong(name.len()));
        }

        if let Some(ch) = name
            .chars()
            .find(|ch| !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || *ch == '-'))
        {
            return Err(NameError::InvalidCharacter(ch));
        }

        if name.starts_with('-') || name.ends_with('-') {
            return Err(NameError::InvalidFormat(name));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogicalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LogicalName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for LogicalName {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LogicalName> for String {
    fn from(name: LogicalName) -> Self {
        name.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["my-vpc", "worker-instance-1", "nat-eip", "a", "web-secgrp"] {
            assert!(LogicalName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(LogicalName::new(""), Err(NameError::Empty));
        assert_eq!(
            LogicalName::new("Master"),
            Err(NameError::InvalidCharacter('M'))
        );
        assert_eq!(
            LogicalName::new("worker_1"),
            Err(NameError::InvalidCharacter('_'))
        );
        assert!(matches!(
            LogicalName::new("nat-"),
            Err(NameError::InvalidFormat(_))
        ));
        assert!(matches!(
            LogicalName::new("x".repeat(256)),
            Err(NameError::TooLong(256))
        ));
    }

    #[test]
    fn test_serde_rejects_invalid() {
        assert!(serde_json::from_str::<LogicalName>("\"my-vpc\"").is_ok());
        assert!(serde_json::from_str::<LogicalName>("\"My VPC\"").is_err());
    }
}
