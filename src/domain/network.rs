// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IPv4 address: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32)")]
    InvalidPrefixLength(u8),

    #[error("Address {0} has host bits set for its prefix")]
    HostBitsSet(String),

    #[error("Invalid port range: {from}-{to}")]
    InvalidPortRange { from: u16, to: u16 },

    #[error("Unknown protocol: {0}")]
    UnknownProtocol(String),
}

/// IPv4 network block in CIDR notation
///
/// Invariants:
/// - Valid dotted-quad address
/// - Prefix length 0-32
/// - No host bits set (`10.0.1.0/24`, never `10.0.1.7/24`)
///
/// # Examples
///
/// ```rust
/// use cim_cluster_topology::domain::Ipv4Cidr;
///
/// let vpc: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
/// let subnet: Ipv4Cidr = "10.0.1.0/24".parse().unwrap();
/// assert!(vpc.contains(&subnet));
/// assert!(vpc.is_private());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    address: Ipv4Addr,
    prefix_len: u8,
}

/// RFC 1918 private address blocks
const PRIVATE_RANGES: [Ipv4Cidr; 3] = [
    Ipv4Cidr::from_octets([10, 0, 0, 0], 8),
    Ipv4Cidr::from_octets([172, 16, 0, 0], 12),
    Ipv4Cidr::from_octets([192, 168, 0, 0], 16),
];

impl Ipv4Cidr {
    /// The default route, `0.0.0.0/0`
    pub const ANY: Ipv4Cidr = Ipv4Cidr::from_octets([0, 0, 0, 0], 0);

    /// TEST-NET-3 (RFC 5737), public addresses safe to hand out in simulation
    pub const TEST_NET_3: Ipv4Cidr = Ipv4Cidr::from_octets([203, 0, 113, 0], 24);

    const fn from_octets(octets: [u8; 4], prefix_len: u8) -> Self {
        Self {
            address: Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]),
            prefix_len,
        }
    }

    /// Create from an address and prefix length
    ///
    /// # Invariants
    /// - Prefix length ≤ 32
    /// - Address is the network address of the block
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, NetworkError> {
        if prefix_len > 32 {
            return Err(NetworkError::InvalidPrefixLength(prefix_len));
        }

        let cidr = Self {
            address,
            prefix_len,
        };

        if u32::from(address) & !cidr.mask() != 0 {
            return Err(NetworkError::HostBitsSet(format!("{}/{}", address, prefix_len)));
        }

        Ok(cidr)
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    fn mask(&self) -> u32 {
        match self.prefix_len {
            0 => 0,
            len => u32::MAX << (32 - u32::from(len)),
        }
    }

    fn first(&self) -> u32 {
        u32::from(self.address)
    }

    fn last(&self) -> u32 {
        self.first() | !self.mask()
    }

    /// Number of addresses in the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_len))
    }

    /// Whether `other` lies entirely inside this block
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix_len >= self.prefix_len && other.first() & self.mask() == self.first()
    }

    /// Whether an address lies inside this block
    pub fn contains_addr(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & self.mask() == self.first()
    }

    /// Whether the two blocks share at least one address
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }

    /// Whether the block lies inside an RFC 1918 private range
    pub fn is_private(&self) -> bool {
        PRIVATE_RANGES.iter().any(|range| range.contains(self))
    }

    /// Whether this is the `0.0.0.0/0` default route destination
    pub fn is_default_route(&self) -> bool {
        self.prefix_len == 0
    }

    /// The `offset`-th address of the block, if it is not past the end
    pub fn nth_address(&self, offset: u32) -> Option<Ipv4Addr> {
        if u64::from(offset) >= self.size() {
            return None;
        }
        Some(Ipv4Addr::from(self.first() + offset))
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, prefix_str) = s
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(s.to_string()))?;

        let address = addr_str
            .parse::<Ipv4Addr>()
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_len = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(s.to_string()))?;

        Self::new(address, prefix_len)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(cidr: Ipv4Cidr) -> Self {
        cidr.to_string()
    }
}

/// IP protocol of a security group rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "tcp")]
    Tcp,
    #[serde(rename = "udp")]
    Udp,
    #[serde(rename = "icmp")]
    Icmp,
    /// Every protocol (`-1`)
    #[serde(rename = "-1")]
    All,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Icmp => "icmp",
            Self::All => "-1",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tcp" | "6" => Ok(Self::Tcp),
            "udp" | "17" => Ok(Self::Udp),
            "icmp" | "1" => Ok(Self::Icmp),
            "-1" | "all" => Ok(Self::All),
            other => Err(NetworkError::UnknownProtocol(other.to_string())),
        }
    }
}

/// Inclusive port range of a security group rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRange {
    pub from_port: u16,
    pub to_port: u16,
}

impl PortRange {
    /// Create a port range
    ///
    /// # Invariants
    /// - `from <= to`
    pub fn new(from: u16, to: u16) -> Result<Self, NetworkError> {
        if from > to {
            return Err(NetworkError::InvalidPortRange { from, to });
        }
        Ok(Self {
            from_port: from,
            to_port: to,
        })
    }

    /// A single port
    pub fn single(port: u16) -> Self {
        Self {
            from_port: port,
            to_port: port,
        }
    }

    /// The `0-0` range used with protocol `-1`
    pub fn any() -> Self {
        Self::single(0)
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.from_port..=self.to_port).contains(&port)
    }
}
