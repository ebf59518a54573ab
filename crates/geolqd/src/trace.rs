//! Recorded event traces
//!
//! A trace is a YAML document listing what a routing core would observe:
//! clock ticks, GPS fixes, received HELLOs and Hello outcomes.
//!
//! ```yaml
//! start: 0
//! mid:
//!   10.0.1.2: 10.0.0.2
//! events:
//!   - event: clock
//!     now: 1000
//!   - event: local_position
//!     lat: 46.0
//!     lon: 6.0
//!     alt: 400
//!   - event: hello
//!     from: 10.0.0.2
//!     lq: 0.9
//!     nlq: 0.9
//!     position: { lat: 46.001, lon: 6.0, alt: 400 }
//!   - event: outcome
//!     link: 10.0.0.2
//!     lost: false
//!   - event: report
//! ```

use anyhow::{Context, Result};
use geolq_metric::GeoPosition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::net::IpAddr;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Clock value passed to the handler's initialization (ms)
    #[serde(default)]
    pub start: u32,
    /// Interface address to main address table
    #[serde(default)]
    pub mid: BTreeMap<IpAddr, IpAddr>,
    pub events: Vec<TraceEvent>,
}

/// GPS fix for this node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub lat: f64,
    pub lon: f64,
    pub alt: i32,
    /// Fix time; the current clock when absent
    #[serde(default)]
    pub time: Option<u32>,
}

/// HELLO received from a neighbor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelloEvent {
    /// Interface address of the sender
    pub from: IpAddr,
    /// Quality the sender measures for its link to us
    pub lq: f32,
    pub nlq: f32,
    #[serde(default)]
    pub mlq: Option<f32>,
    /// Sender position carried in the global section
    #[serde(default)]
    pub position: Option<GeoPosition>,
    /// Whether the sender lists us as a neighbor
    #[serde(default = "default_listed")]
    pub listed: bool,
}

fn default_listed() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// Advance the core clock to `now` ms
    Clock { now: u32 },
    LocalPosition(PositionFix),
    /// Position of another node delivered by the position subsystem
    RemotePosition {
        address: IpAddr,
        time: u32,
        lat: f64,
        lon: f64,
        alt: i32,
    },
    Hello(HelloEvent),
    /// A Hello from `link` arrived or timed out
    Outcome { link: IpAddr, lost: bool },
    /// Set the expected-Hello ratio of `link`
    LinkMultiplier { link: IpAddr, value: f32 },
    /// Emit the position table
    Report,
}

impl Trace {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).context("Failed to parse trace")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read trace {}", path.display()))?;
        Self::from_yaml(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_events() {
        let trace = Trace::from_yaml(
            r#"
mid:
  10.0.1.2: 10.0.0.2
events:
  - event: clock
    now: 1000
  - event: local_position
    lat: 46.0
    lon: 6.0
    alt: 400
  - event: remote_position
    address: 10.0.0.2
    time: 5
    lat: 46.001
    lon: 6.0
    alt: 400
  - event: hello
    from: 10.0.0.2
    lq: 0.9
    nlq: 0.8
    position: { lat: 46.001, lon: 6.0, alt: 400 }
  - event: outcome
    link: 10.0.0.2
    lost: true
  - event: link_multiplier
    link: 10.0.0.2
    value: 0.5
  - event: report
"#,
        )
        .unwrap();

        assert_eq!(trace.start, 0);
        assert_eq!(trace.events.len(), 7);
        assert_eq!(trace.mid.len(), 1);
        assert_eq!(trace.events[0], TraceEvent::Clock { now: 1000 });
        match &trace.events[1] {
            TraceEvent::LocalPosition(fix) => assert_eq!(fix.time, None),
            other => panic!("unexpected event {:?}", other),
        }
        match &trace.events[3] {
            TraceEvent::Hello(hello) => {
                assert!(hello.listed);
                assert_eq!(hello.mlq, None);
                assert_eq!(hello.position, Some(GeoPosition::new(46.001, 6.0, 400)));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(trace.events[6], TraceEvent::Report);
    }

    #[test]
    fn test_unknown_event_rejected() {
        let err = Trace::from_yaml("events:\n  - event: teleport\n").unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse trace"));
    }
}
