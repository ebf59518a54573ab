//! GeoLQ daemon
//!
//! Loads the node configuration, selects the link-quality handler and drives
//! it with recorded event traces.

pub mod config;
pub mod replay;
pub mod trace;

pub use config::Config;
pub use replay::{run_trace, ReplayCore, ReplayHandler};
pub use trace::{HelloEvent, PositionFix, Trace, TraceEvent};
