//! Core protocol types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::{ProtocolError, Result};

/// Records embedded in control messages are aligned to this many bytes
pub const WIRE_ALIGNMENT: usize = 4;

/// Size of an IPv4 address on the wire
pub const IPV4_ADDR_SIZE: usize = 4;

/// Size of an IPv6 address on the wire
pub const IPV6_ADDR_SIZE: usize = 16;

/// Round a field length up to the next multiple of [`WIRE_ALIGNMENT`]
pub const fn padded_len(len: usize) -> usize {
    (len + WIRE_ALIGNMENT - 1) & !(WIRE_ALIGNMENT - 1)
}

/// Quantize a link quality in `[0, 1]` to its 8-bit wire form.
///
/// Out-of-range and NaN inputs are clamped, so the result is always a valid
/// byte. Values are rounded; peers that truncate encode up to one step lower.
pub fn quantize_lq(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Inverse of [`quantize_lq`]
pub fn dequantize_lq(byte: u8) -> f32 {
    byte as f32 / 255.0
}

/// IP version shared by every node of the mesh.
///
/// Nothing on the wire says which version a record was encoded with, so both
/// sides must be configured identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IpVersion {
    #[default]
    #[serde(rename = "ipv4")]
    V4,
    #[serde(rename = "ipv6")]
    V6,
}

impl IpVersion {
    /// Number of address bytes carried on the wire
    pub fn address_len(&self) -> usize {
        match self {
            IpVersion::V4 => IPV4_ADDR_SIZE,
            IpVersion::V6 => IPV6_ADDR_SIZE,
        }
    }

    /// The all-zero address of this version
    pub fn unspecified(&self) -> IpAddr {
        match self {
            IpVersion::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpVersion::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    /// Version of an address
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    /// Check that an address can be carried with this version
    pub fn check(&self, addr: &IpAddr) -> Result<()> {
        if IpVersion::of(addr) == *self {
            Ok(())
        } else {
            Err(ProtocolError::AddressFamilyMismatch {
                address: addr.to_string(),
                version: self.to_string(),
            })
        }
    }

    /// Append the octets of `addr` in network order.
    ///
    /// An address of the other family is converted (IPv4-mapped IPv6, or the
    /// embedded IPv4 address); if that is impossible the unspecified address
    /// is written so the record keeps its fixed size.
    pub fn write_address(&self, addr: &IpAddr, out: &mut Vec<u8>) {
        match (self, addr) {
            (IpVersion::V4, IpAddr::V4(v4)) => out.extend_from_slice(&v4.octets()),
            (IpVersion::V4, IpAddr::V6(v6)) => {
                let v4 = v6.to_ipv4().unwrap_or(Ipv4Addr::UNSPECIFIED);
                out.extend_from_slice(&v4.octets());
            }
            (IpVersion::V6, IpAddr::V6(v6)) => out.extend_from_slice(&v6.octets()),
            (IpVersion::V6, IpAddr::V4(v4)) => {
                out.extend_from_slice(&v4.to_ipv6_mapped().octets())
            }
        }
    }

    /// Read an address from exactly [`address_len`](Self::address_len) bytes
    pub fn read_address(&self, bytes: &[u8]) -> IpAddr {
        match self {
            IpVersion::V4 => {
                let mut octets = [0u8; IPV4_ADDR_SIZE];
                octets.copy_from_slice(&bytes[..IPV4_ADDR_SIZE]);
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            IpVersion::V6 => {
                let mut octets = [0u8; IPV6_ADDR_SIZE];
                octets.copy_from_slice(&bytes[..IPV6_ADDR_SIZE]);
                IpAddr::V6(Ipv6Addr::from(octets))
            }
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => write!(f, "ipv4"),
            IpVersion::V6 => write!(f, "ipv6"),
        }
    }
}

impl FromStr for IpVersion {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "4" | "ipv4" | "v4" => Ok(IpVersion::V4),
            "6" | "ipv6" | "v6" => Ok(IpVersion::V6),
            _ => Err(ProtocolError::UnknownIpVersion(s.to_string())),
        }
    }
}

/// Split `needed` bytes off the front of a decode cursor.
///
/// The cursor is left untouched when too few bytes remain.
pub(crate) fn take<'a>(cursor: &mut &'a [u8], needed: usize) -> Result<&'a [u8]> {
    if cursor.len() < needed {
        return Err(ProtocolError::Truncated {
            needed,
            available: cursor.len(),
        });
    }
    let (head, tail) = cursor.split_at(needed);
    *cursor = tail;
    Ok(head)
}

/// Hex dump of encoded bytes, for trace logging
pub fn hex_dump(bytes: &[u8]) -> String {
    hex::encode(bytes)
}
