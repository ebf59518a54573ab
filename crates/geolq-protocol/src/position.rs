//! GPS position types
//!
//! Two shapes exist:
//! - [`GeoPosition`]: the compact position broadcast by the lite variant in
//!   the global section of every control packet
//! - [`GpsRecord`]: the extended, timestamped record handed to the pud
//!   variant by an external position subsystem
//!
//! Global position record layout (12 bytes, native byte order):
//! - Latitude (4 bytes): f32, degrees
//! - Longitude (4 bytes): f32, degrees
//! - Altitude (4 bytes): i32, meters

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::types::{padded_len, take};

/// Unpadded size of the global position record
const GEO_POSITION_RAW_SIZE: usize = 4 + 4 + 4;

/// Size of the global position record on the wire
pub const GLOBAL_RECORD_SIZE: usize = padded_len(GEO_POSITION_RAW_SIZE);

/// Position of a node as broadcast by the lite variant
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPosition {
    /// Latitude in degrees
    pub lat: f32,
    /// Longitude in degrees
    pub lon: f32,
    /// Altitude in meters
    pub alt: i32,
}

impl GeoPosition {
    pub fn new(lat: f32, lon: f32, alt: i32) -> Self {
        GeoPosition { lat, lon, alt }
    }

    /// Append the global record and return the number of bytes written
    pub fn encode(&self, out: &mut Vec<u8>) -> usize {
        let start = out.len();

        out.extend_from_slice(&self.lat.to_ne_bytes());
        out.extend_from_slice(&self.lon.to_ne_bytes());
        out.extend_from_slice(&self.alt.to_ne_bytes());
        out.resize(start + GLOBAL_RECORD_SIZE, 0);

        GLOBAL_RECORD_SIZE
    }

    /// Decode a global record, advancing the cursor by [`GLOBAL_RECORD_SIZE`]
    pub fn decode(cursor: &mut &[u8]) -> Result<Self> {
        let bytes = take(cursor, GLOBAL_RECORD_SIZE)?;

        let lat = f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let lon = f32::from_ne_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let alt = i32::from_ne_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

        Ok(GeoPosition { lat, lon, alt })
    }
}

impl fmt::Display for GeoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPS({:7.4}, {:7.3}, {:5})", self.lat, self.lon, self.alt)
    }
}

/// Timestamped GPS fix as produced by an external position subsystem
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GpsRecord {
    /// Time of the fix; records of one node must have increasing times
    pub time: u32,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Elevation in meters
    pub elv: i32,
    /// Ground speed
    #[serde(default)]
    pub speed: u32,
    /// Track angle
    #[serde(default)]
    pub track: u32,
    /// Horizontal dilution of precision
    #[serde(default)]
    pub hdop: f64,
}

impl GpsRecord {
    /// Create a record with only time and coordinates set
    pub fn new(time: u32, lat: f64, lon: f64, elv: i32) -> Self {
        GpsRecord {
            time,
            lat,
            lon,
            elv,
            ..Default::default()
        }
    }
}
