//! Geodesic distances between GPS positions
//!
//! Lite uses the surface haversine arc and ignores altitude. Pud projects
//! both points to cartesian coordinates offset by their elevation and takes
//! the straight line between them. Nodes of one mesh must use the same
//! variant, so the two never mix.

use geolq_protocol::{GeoPosition, GpsRecord};

/// Degrees to radians, truncated to nine digits
pub const DEG2RAD: f64 = 0.017453292;

/// Earth radius for the lite haversine distance (meters)
pub const LITE_EARTH_RADIUS: f64 = 6_371_000.0;

/// Earth radius for the pud line-of-sight distance (meters)
pub const PUD_EARTH_RADIUS: f64 = 6_378_000.0;

/// Great-circle surface distance in meters (haversine), altitude ignored
pub fn haversine_distance(a: &GeoPosition, b: &GeoPosition) -> f64 {
    let lat_a = a.lat as f64 * DEG2RAD;
    let lat_b = b.lat as f64 * DEG2RAD;
    let lon_a = a.lon as f64 * DEG2RAD;
    let lon_b = b.lon as f64 * DEG2RAD;

    let sin_dlat = ((lat_a - lat_b) * 0.5).sin();
    let sin_dlon = ((lon_a - lon_b) * 0.5).sin();

    // Rounding can push the haversine term marginally outside [0, 1]
    let h = (sin_dlat.powi(2) + sin_dlon.powi(2) * lat_a.cos() * lat_b.cos()).clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    LITE_EARTH_RADIUS * c
}

/// Straight-line distance in meters between two elevated points
pub fn line_of_sight_distance(a: &GpsRecord, b: &GpsRecord) -> f64 {
    let lat_a = a.lat * DEG2RAD;
    let lat_b = b.lat * DEG2RAD;
    let lon_a = a.lon * DEG2RAD;
    let lon_b = b.lon * DEG2RAD;
    let r_a = PUD_EARTH_RADIUS + a.elv as f64;
    let r_b = PUD_EARTH_RADIUS + b.elv as f64;

    let x = r_b * lat_b.cos() * lon_b.sin() - r_a * lat_a.cos() * lon_a.sin();
    let y = r_b * lat_b.cos() * lon_b.cos() - r_a * lat_a.cos() * lon_a.cos();
    let z = r_b * lat_b.sin() - r_a * lat_a.sin();

    (x * x + y * y + z * z).sqrt()
}
