//! GeoLQ Protocol Module
//!
//! This module defines the on-wire records that carry link-quality metrics
//! inside HELLO and TC control messages:
//! - LQ pair records for the lite and pud variants
//! - The global position record broadcast by the lite variant
//! - The 4-byte alignment rule shared by every record

pub mod error;
pub mod lq_pair;
pub mod position;
pub mod types;

pub use error::{ProtocolError, Result};
pub use lq_pair::{pud_lq_pair_size, LiteLq, PudLqPair, LITE_LQ_PAIR_SIZE};
pub use position::{GeoPosition, GpsRecord, GLOBAL_RECORD_SIZE};
pub use types::{dequantize_lq, hex_dump, padded_len, quantize_lq, IpVersion, WIRE_ALIGNMENT};
