//! IPv4 CIDR blocks and same-size partitioning.
//!
//! Pure arithmetic on `u32` address bits, no I/O.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::domain::error::NetworkError;

/// Maximum IPv4 prefix length.
pub const MAX_PREFIX: u8 = 32;

/// Netmask bits for a prefix length. `prefix` must be `<= 32`.
fn mask_bits(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (MAX_PREFIX - prefix)
    }
}

/// An IPv4 address range expressed as network address + prefix length.
///
/// Construction rejects host bits, so `addr` is always the network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkBlock {
    addr: Ipv4Addr,
    prefix: u8,
}

impl NetworkBlock {
    /// Create a block from a network address and prefix length.
    ///
    /// # Errors
    ///
    /// Returns an error if `prefix > 32` or `addr` has bits set below the mask.
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, NetworkError> {
        if prefix > MAX_PREFIX {
            return Err(NetworkError::PrefixTooLong(prefix));
        }
        let bits = u32::from(addr);
        if bits & !mask_bits(prefix) != 0 {
            return Err(NetworkError::HostBitsSet {
                cidr: format!("{addr}/{prefix}"),
                network: Ipv4Addr::from(bits & mask_bits(prefix)).to_string(),
            });
        }
        Ok(Self { addr, prefix })
    }

    /// Network (lowest) address.
    #[must_use]
    pub fn network(&self) -> Ipv4Addr {
        self.addr
    }

    /// Prefix length.
    #[must_use]
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Broadcast (highest) address.
    #[must_use]
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.first() | !mask_bits(self.prefix))
    }

    /// Number of addresses covered by the block.
    #[must_use]
    pub fn size(&self) -> u64 {
        1u64 << (MAX_PREFIX - self.prefix)
    }

    fn first(&self) -> u32 {
        u32::from(self.addr)
    }

    fn last(&self) -> u32 {
        u32::from(self.broadcast())
    }

    /// `true` when every address of `other` lies inside `self`.
    #[must_use]
    pub fn contains(&self, other: &NetworkBlock) -> bool {
        other.prefix >= self.prefix && other.first() >= self.first() && other.last() <= self.last()
    }

    /// `true` when the two blocks share at least one address.
    #[must_use]
    pub fn overlaps(&self, other: &NetworkBlock) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }

    /// How many subnets of length `prefix` the block partitions into.
    ///
    /// # Errors
    ///
    /// Returns an error unless `self.prefix < prefix <= 32`.
    pub fn subnet_count(&self, prefix: u8) -> Result<u64, NetworkError> {
        self.check_subnet_prefix(prefix)?;
        Ok(1u64 << (prefix - self.prefix))
    }

    /// Lazily partition the block into same-size subnets, lowest first.
    ///
    /// The returned iterator is finite and `Clone`; the same block and
    /// prefix always yield the same sequence.
    ///
    /// # Errors
    ///
    /// Returns an error unless `self.prefix < prefix <= 32`.
    pub fn subnets(&self, prefix: u8) -> Result<Subnets, NetworkError> {
        let total = self.subnet_count(prefix)?;
        Ok(Subnets {
            base: u64::from(self.first()),
            step: 1u64 << (MAX_PREFIX - prefix),
            prefix,
            next: 0,
            total,
        })
    }

    fn check_subnet_prefix(&self, prefix: u8) -> Result<(), NetworkError> {
        if prefix > MAX_PREFIX {
            return Err(NetworkError::PrefixTooLong(prefix));
        }
        if prefix <= self.prefix {
            return Err(NetworkError::PrefixNotLonger {
                parent: self.to_string(),
                prefix,
            });
        }
        Ok(())
    }
}

impl FromStr for NetworkBlock {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(s.to_string()))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| NetworkError::InvalidAddress(addr.to_string()))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| NetworkError::InvalidCidr(s.to_string()))?;
        Self::new(addr, prefix)
    }
}

impl fmt::Display for NetworkBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl Serialize for NetworkBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NetworkBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Ordered same-size partition of a parent block. See [`NetworkBlock::subnets`].
#[derive(Debug, Clone)]
pub struct Subnets {
    base: u64,
    step: u64,
    prefix: u8,
    next: u64,
    total: u64,
}

impl Iterator for Subnets {
    type Item = NetworkBlock;

    fn next(&mut self) -> Option<NetworkBlock> {
        if self.next >= self.total {
            return None;
        }
        let start = self.base + self.next * self.step;
        self.next += 1;
        // start < 2^32 because the partition never leaves the parent block
        let addr = Ipv4Addr::from(u32::try_from(start).ok()?);
        Some(NetworkBlock {
            addr,
            prefix: self.prefix,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::try_from(self.total - self.next).unwrap_or(usize::MAX);
        (left, Some(left))
    }
}
