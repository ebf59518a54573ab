//! Position tables printed when debugging is enabled

use chrono::Local;
use std::net::IpAddr;

use crate::position_cache::NodePosition;
use geolq_protocol::{GeoPosition, GpsRecord};

/// One link row of the lite table
#[derive(Debug, Clone, Copy)]
pub struct LiteRow<'a> {
    pub address: &'a IpAddr,
    pub position: GeoPosition,
    pub distance: f32,
    pub speed: f32,
    pub mlq: f32,
}

/// Current wall-clock time as shown in table headers
pub fn wallclock() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}

fn header(wallclock: &str, title: &str) -> String {
    format!(
        "\n--- {} -------------------------------------- {}\n",
        wallclock, title
    )
}

/// Lite table: our position and last update, then one row per link
pub fn lite_table<'a, I>(wallclock: &str, local: &GeoPosition, last_update: u32, rows: I) -> String
where
    I: IntoIterator<Item = LiteRow<'a>>,
{
    let mut out = header(wallclock, "GPS_LITE INFORMATION");
    out.push_str("     IP Address      Lat     Long    Alt distance   speed     MLQ\n");
    out.push_str(&format!(
        "           self  {:7.4}  {:7.3}  {:4}  {:7.2}\n",
        local.lat,
        local.lon,
        local.alt,
        last_update as f64 / 1000.0
    ));

    for row in rows {
        out.push_str(&format!(
            "{:>15}  {:7.4}  {:7.3}  {:4}  {:7.1}  {:6.2}  {:6.3}\n",
            row.address.to_string(),
            row.position.lat,
            row.position.lon,
            row.position.alt,
            row.distance,
            row.speed,
            row.mlq
        ));
    }
    out
}

/// Pud table: our record, then every cached node in address order
pub fn pud_table<'a, I>(wallclock: &str, local: &GpsRecord, entries: I) -> String
where
    I: IntoIterator<Item = &'a NodePosition>,
{
    let mut out = header(wallclock, "GPS INFORMATION");
    out.push_str("     IP address      Lat     Long    Alt distance  delta_d  delta_t  lq_mult\n");
    out.push_str(&format!(
        "           self  {:7.4}  {:7.3}  {:4}\n",
        local.lat, local.lon, local.elv
    ));

    for entry in entries {
        out.push_str(&format!(
            "{:>15}  {:7.4}  {:7.3}  {:4}  {:7.2}  {:7.2}  {:7.1}  {:7.3}\n",
            entry.address.to_string(),
            entry.record.lat,
            entry.record.lon,
            entry.record.elv,
            entry.distance,
            entry.delta_distance,
            entry.delta_time,
            entry.multiplier
        ));
    }
    out
}
