//! GeoLQ Link-Quality Metric Engine
//!
//! This crate implements the link-quality plugins used by the routing core:
//! - Cost model (ETX-style aging, quickstart, motion multipliers)
//! - Geodesic distances for both GPS variants
//! - Position cache keyed by main address (pud variant)
//! - The [`LqHandler`] contract with its lite and pud implementations

pub mod config;
pub mod cost;
pub mod error;
pub mod geo;
pub mod handler;
pub mod lite;
pub mod mid;
pub mod position_cache;
pub mod pud;
pub mod report;

pub use config::{LqAlgorithm, LqConfig};
pub use cost::{combine_cost, AgingPhase, LinkCost};
pub use error::{MetricError, Result};
pub use handler::{HandlerSizes, LinkCostObserver, LinkEntry, LqHandler};
pub use lite::{LiteHandler, LiteLinkState};
pub use mid::{MidResolver, NoMid};
pub use position_cache::{Admission, NodePosition, PositionCache};
pub use pud::{PudHandler, PudLq};

pub use geolq_protocol::{GeoPosition, GpsRecord, IpVersion, LiteLq};

/// Scale applied to `1 / (lq * nlq)` to obtain an integer link cost
pub const LQ_PLUGIN_LC_MULTIPLIER: u32 = 1024;

/// Cost of a link that must not be used by the shortest-path computation
pub const LINK_COST_BROKEN: LinkCost = 1 << 22;

/// Below this quality in either direction a link is considered broken
pub const MINIMAL_USEFUL_LQ: f32 = 0.1;

/// Number of packet outcomes aged with the quickstart factor
pub const LQ_QUICKSTART_STEPS: u16 = 12;

/// Aging factor used during quickstart
pub const LQ_QUICKSTART_AGING: f32 = 0.25;

/// Fixed-point 1.0 of a link's loss multiplier
pub const LOSS_LINK_MULTIPLIER_ONE: u32 = 65536;

/// Instantaneous speeds beyond this (m/s) are treated as GPS noise
pub const MAX_PLAUSIBLE_SPEED: f32 = 25.0;
