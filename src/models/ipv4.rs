//! IPv4 address and CIDR block utilities.
//!
//! Provides the [`Ipv4`] struct for representing block-aligned CIDR networks,
//! along with the pure address math used by the partition tree and allocator.

use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::net::Ipv4Addr;
use std::str::FromStr;

use super::OperatingMode;

/// Maximum length for an IPv4 subnet mask (32 bits).
pub const MAX_LENGTH: u8 = 32;

/// Convert a CIDR prefix length to a subnet mask as u32.
///
/// # Examples
/// ```
/// use subnet_planner::models::cidr_mask;
/// assert_eq!(cidr_mask(24).unwrap(), 0xFFFFFF00);
/// ```
pub fn cidr_mask(len: u8) -> Result<u32, Box<dyn Error>> {
    if len > MAX_LENGTH {
        Err("Network length is too long".into())
    } else {
        // Shift in u64 so len 0 and 32 never hit an undefined 32-bit shift.
        let right_len = MAX_LENGTH - len;
        let all_bits = u32::MAX as u64;

        let mask = (all_bits >> right_len) << right_len;

        Ok(mask as u32)
    }
}

/// Convert a CIDR prefix length to a dotted-quad subnet mask.
pub fn cidr_mask_addr(len: u8) -> Result<Ipv4Addr, Box<dyn Error>> {
    Ok(Ipv4Addr::from(cidr_mask(len)?))
}

/// Number of addresses in a block of the given prefix length.
///
/// Returned as u64 so a /0 block does not overflow.
pub fn block_size(len: u8) -> u64 {
    assert!(len <= MAX_LENGTH, "prefix length {len} > 32");
    1u64 << (MAX_LENGTH - len)
}

/// Zero the host bits of an address, producing its block-aligned base.
pub fn normalize_to_block(addr: Ipv4Addr, len: u8) -> Result<Ipv4Addr, Box<dyn Error>> {
    if len > MAX_LENGTH {
        Err("Network length is too long".into())
    } else {
        let bits = u32::from(addr);
        Ok(Ipv4Addr::from(bits & cidr_mask(len)?))
    }
}

/// True if the address sits on a block boundary for the given prefix length.
pub fn is_block_aligned(addr: Ipv4Addr, len: u8) -> bool {
    u64::from(u32::from(addr)) % block_size(len) == 0
}

/// Last (broadcast) address of the block starting at `network`.
pub fn last_address(network: u32, len: u8) -> u32 {
    (u64::from(network) + block_size(len) - 1) as u32
}

/// First usable address of a subnet under the given operating mode.
///
/// /31 and /32 networks have no reserved addresses. Otherwise the head
/// reservation is mode dependent (network address plus provider overhead).
pub fn usable_first(network: u32, len: u8, mode: OperatingMode) -> u32 {
    if len >= 31 {
        network
    } else {
        network + u32::from(mode.reserved_head())
    }
}

/// Last usable address of a subnet. The broadcast address is always
/// reserved except for /31 and /32 networks.
pub fn usable_last(network: u32, len: u8) -> u32 {
    let last = last_address(network, len);
    if len >= 31 {
        last
    } else {
        last - 1
    }
}

/// Number of usable host addresses under the given operating mode.
pub fn host_count(network: u32, len: u8, mode: OperatingMode) -> u64 {
    1 + u64::from(usable_last(network, len)) - u64::from(usable_first(network, len, mode))
}

/// Check if an address is in RFC1918 private address space.
pub fn is_rfc1918(addr: Ipv4Addr) -> bool {
    let bits = u32::from(addr);

    // 10.0.0.0/8
    if (0x0A00_0000..=0x0AFF_FFFF).contains(&bits) {
        return true;
    }
    // 172.16.0.0/12
    if (0xAC10_0000..=0xAC1F_FFFF).contains(&bits) {
        return true;
    }
    // 192.168.0.0/16
    (0xC0A8_0000..=0xC0A8_FFFF).contains(&bits)
}

/// Check if an address is in RFC6598 shared address space (CGNAT).
pub fn is_rfc6598(addr: Ipv4Addr) -> bool {
    let bits = u32::from(addr);

    // 100.64.0.0/10
    (0x6440_0000..=0x647F_FFFF).contains(&bits)
}

/// Classification of an address for display purposes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddressType {
    /// RFC1918 private space.
    Rfc1918,
    /// RFC6598 shared space (CGNAT).
    Rfc6598,
    /// Everything else.
    Public,
}

impl std::fmt::Display for AddressType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AddressType::Rfc1918 => write!(f, "RFC1918"),
            AddressType::Rfc6598 => write!(f, "RFC6598"),
            AddressType::Public => write!(f, "Public"),
        }
    }
}

/// Classify an address as private, shared or public.
pub fn address_type(addr: Ipv4Addr) -> AddressType {
    if is_rfc1918(addr) {
        AddressType::Rfc1918
    } else if is_rfc6598(addr) {
        AddressType::Rfc6598
    } else {
        AddressType::Public
    }
}

/// A block-aligned IPv4 CIDR network.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ipv4 {
    /// Base address of the block.
    pub addr: Ipv4Addr,
    /// The subnet mask length (0-32).
    pub mask: u8,
}

impl Ipv4 {
    /// Create a new [`Ipv4`] from a CIDR string (e.g., "10.0.0.0/24").
    ///
    /// The address is normalized down to its block boundary, so
    /// `10.0.0.77/24` yields `10.0.0.0/24`.
    pub fn new(addr_cidr: &str) -> Result<Ipv4, Box<dyn Error>> {
        let addr_cidr = addr_cidr.trim();
        let parts: Vec<&str> = addr_cidr.split('/').collect();
        if parts.len() != 2 {
            return Err("Invalid address/mask".into());
        }
        let addr: Ipv4Addr = parts[0]
            .parse()
            .map_err(|_| format!("Invalid address {}", parts[0]))?;
        let mask: u8 = parts[1].parse()?;
        Ipv4::from_parts(addr, mask)
    }

    /// Create a new [`Ipv4`] from an address and prefix length, normalizing
    /// the address to its block boundary.
    pub fn from_parts(addr: Ipv4Addr, mask: u8) -> Result<Ipv4, Box<dyn Error>> {
        if mask > MAX_LENGTH {
            return Err("Network length is too long".into());
        }
        Ok(Ipv4 {
            addr: normalize_to_block(addr, mask)?,
            mask,
        })
    }

    /// Base address as an integer.
    pub fn base(&self) -> u32 {
        u32::from(self.addr)
    }

    /// Number of addresses covered by this block.
    pub fn size(&self) -> u64 {
        block_size(self.mask)
    }

    /// Last (broadcast) address of this block.
    pub fn last(&self) -> Ipv4Addr {
        Ipv4Addr::from(last_address(self.base(), self.mask))
    }

    /// True if `ip` falls inside this block.
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let bits = u32::from(ip);
        bits >= self.base() && bits <= last_address(self.base(), self.mask)
    }

    /// True if `other` is a sub-block of (or equal to) this block.
    pub fn contains_block(&self, other: &Ipv4) -> bool {
        other.mask >= self.mask && self.contains(other.addr)
    }

    /// The two equal halves of this block, each one bit longer.
    pub fn halves(&self) -> Result<(Ipv4, Ipv4), Box<dyn Error>> {
        if self.mask >= MAX_LENGTH {
            return Err(format!("{self} cannot be split below a /32").into());
        }
        let child_mask = self.mask + 1;
        let low = Ipv4 {
            addr: self.addr,
            mask: child_mask,
        };
        let high = Ipv4 {
            addr: Ipv4Addr::from((u64::from(self.base()) + block_size(child_mask)) as u32),
            mask: child_mask,
        };
        Ok((low, high))
    }
}

impl Serialize for Ipv4 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        let cidr = format!("{}/{}", self.addr, self.mask);
        serializer.serialize_str(&cidr)
    }
}

impl<'de> Deserialize<'de> for Ipv4 {
    fn deserialize<D>(deserializer: D) -> Result<Ipv4, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 {
            return Err(de::Error::custom(format!("invalid CIDR format: {}", s)));
        }

        let addr = Ipv4Addr::from_str(parts[0])
            .map_err(|_| de::Error::custom(format!("invalid IP address: {}", parts[0])))?;
        let mask = u8::from_str(parts[1])
            .map_err(|_| de::Error::custom(format!("invalid subnet mask: {}", parts[1])))?;

        Ipv4::from_parts(addr, mask).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl std::fmt::Display for Ipv4 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask)
    }
}
