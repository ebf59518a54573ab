//! Link-quality pair records carried in HELLO and TC messages
//!
//! HELLO and TC messages use the same record for a given variant. Every record
//! is padded with zero bytes to a 4-byte boundary and carries no length or
//! version tag, so the receiver must know the variant and IP version in advance.
//!
//! Lite record (8 bytes):
//! - LQ (1 byte): round(lq * 255)
//! - NLQ (1 byte): round(nlq * 255)
//! - MLQ (4 bytes): f32 multiplier, native byte order
//! - Padding (2 bytes)
//!
//! Pud record (8 bytes for IPv4, 20 bytes for IPv6):
//! - LQ (1 byte): round(lq * 255)
//! - NLQ (1 byte): round(nlq * 255)
//! - Sender main address (4 or 16 bytes), network order
//! - Padding to the next 4-byte boundary

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::error::Result;
use crate::types::{dequantize_lq, padded_len, quantize_lq, take, IpVersion};

/// Size of the lite LQ pair on the wire
pub const LITE_LQ_PAIR_SIZE: usize = padded_len(2 + 4);

/// Size of the pud LQ pair on the wire for a given IP version
pub const fn pud_lq_pair_size(version: IpVersion) -> usize {
    match version {
        IpVersion::V4 => padded_len(2 + crate::types::IPV4_ADDR_SIZE),
        IpVersion::V6 => padded_len(2 + crate::types::IPV6_ADDR_SIZE),
    }
}

/// Link quality as seen by the lite variant.
///
/// This is both the neighbor/TC view record and the wire content of the lite
/// LQ pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiteLq {
    /// Fraction of the neighbor's Hellos we received
    pub lq: f32,
    /// Fraction of our Hellos the neighbor received
    pub nlq: f32,
    /// Motion multiplier, 1.0 when neutral
    pub mlq: f32,
}

impl Default for LiteLq {
    fn default() -> Self {
        LiteLq {
            lq: 0.0,
            nlq: 0.0,
            mlq: 1.0,
        }
    }
}

impl LiteLq {
    pub fn new(lq: f32, nlq: f32, mlq: f32) -> Self {
        LiteLq { lq, nlq, mlq }
    }

    /// Append the wire form and return the number of bytes written
    pub fn encode(&self, out: &mut Vec<u8>) -> usize {
        let start = out.len();

        out.push(quantize_lq(self.lq));
        out.push(quantize_lq(self.nlq));
        out.extend_from_slice(&self.mlq.to_ne_bytes());
        out.resize(start + LITE_LQ_PAIR_SIZE, 0);

        LITE_LQ_PAIR_SIZE
    }

    /// Decode the wire form, advancing the cursor by [`LITE_LQ_PAIR_SIZE`]
    pub fn decode(cursor: &mut &[u8]) -> Result<Self> {
        let bytes = take(cursor, LITE_LQ_PAIR_SIZE)?;

        Ok(LiteLq {
            lq: dequantize_lq(bytes[0]),
            nlq: dequantize_lq(bytes[1]),
            mlq: f32::from_ne_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]),
        })
    }
}

/// Wire content of the pud LQ pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PudLqPair {
    pub lq: f32,
    pub nlq: f32,
    /// Main address of the node that sent the record
    pub address: IpAddr,
}

impl PudLqPair {
    /// Append the wire form and return the number of bytes written
    pub fn encode(&self, version: IpVersion, out: &mut Vec<u8>) -> usize {
        let start = out.len();
        let size = pud_lq_pair_size(version);

        out.push(quantize_lq(self.lq));
        out.push(quantize_lq(self.nlq));
        version.write_address(&self.address, out);
        out.resize(start + size, 0);

        size
    }

    /// Decode the wire form, advancing the cursor by [`pud_lq_pair_size`]
    pub fn decode(version: IpVersion, cursor: &mut &[u8]) -> Result<Self> {
        let bytes = take(cursor, pud_lq_pair_size(version))?;

        Ok(PudLqPair {
            lq: dequantize_lq(bytes[0]),
            nlq: dequantize_lq(bytes[1]),
            address: version.read_address(&bytes[2..]),
        })
    }
}
