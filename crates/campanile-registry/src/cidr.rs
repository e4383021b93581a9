//! IPv4 CIDR parsing and containment.
//!
//! Trusted IP ranges are entered by administrators as `a.b.c.d/len` strings.
//! Parsing happens once at resource-add time so malformed input is rejected
//! with a user-facing error instead of silently never matching.

use std::fmt::{self, Display};
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A parsed IPv4 CIDR block, e.g. `10.0.0.0/8`.
///
/// Host bits below the prefix are masked off at parse time, so
/// `10.1.2.3/8` and `10.0.0.0/8` denote the same block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr {
    network: u32,
    prefix_len: u8,
}

impl Cidr {
    /// Parses a CIDR string of the form `a.b.c.d/len`.
    ///
    /// A bare address without `/len` is accepted as a /32 host block,
    /// matching how administrators commonly enter single addresses.
    pub fn parse(input: &str) -> Result<Self, CidrParseError> {
        let input = input.trim();
        let (addr_part, len_part) = match input.split_once('/') {
            Some((a, l)) => (a, Some(l)),
            None => (input, None),
        };

        let addr = Ipv4Addr::from_str(addr_part)
            .map_err(|_| CidrParseError::new(input, "invalid IPv4 address"))?;
        let prefix_len: u8 = match len_part {
            Some(l) => l
                .parse()
                .map_err(|_| CidrParseError::new(input, "prefix length is not a number"))?,
            None => 32,
        };
        if prefix_len > 32 {
            return Err(CidrParseError::new(input, "prefix length exceeds 32"));
        }

        let network = u32::from(addr) & Self::mask(prefix_len);
        Ok(Self {
            network,
            prefix_len,
        })
    }

    /// Whether `ip` falls inside this block.
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & Self::mask(self.prefix_len) == self.network
    }

    /// The prefix length in bits.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    fn mask(prefix_len: u8) -> u32 {
        if prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix_len))
        }
    }
}

impl Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", Ipv4Addr::from(self.network), self.prefix_len)
    }
}

impl FromStr for Cidr {
    type Err = CidrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Cidr {
    type Error = CidrParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cidr> for String {
    fn from(value: Cidr) -> Self {
        value.to_string()
    }
}

/// Error produced when a CIDR string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid CIDR '{input}': {reason}")]
pub struct CidrParseError {
    /// The rejected input, as entered.
    pub input: String,
    /// What was wrong with it.
    pub reason: &'static str,
}

impl CidrParseError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
