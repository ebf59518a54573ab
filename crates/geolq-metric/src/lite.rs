//! Lite GPS link quality (`etx_gps_lite`)
//!
//! Every control packet carries the sender's position in its global section.
//! The receiver tracks the distance to each neighbor, smooths the radial speed
//! and turns it into a multiplier: links to approaching neighbors get cheaper,
//! links to departing ones more expensive.

use std::mem::size_of;
use std::net::IpAddr;
use tracing::{debug, info, trace};

use crate::config::{LqAlgorithm, LqConfig};
use crate::cost::{self, combine_cost, AgingPhase, LinkCost};
use crate::error::{MetricError, Result};
use crate::geo::haversine_distance;
use crate::handler::{HandlerSizes, LinkCostObserver, LinkEntry, LqHandler};
use crate::report::{self, LiteRow};
use geolq_protocol::{GeoPosition, LiteLq, GLOBAL_RECORD_SIZE, LITE_LQ_PAIR_SIZE};

/// Per-link state of the lite variant
#[derive(Debug, Clone, PartialEq)]
pub struct LiteLinkState {
    pub lq: LiteLq,
    pub quickstart: u16,
    /// Last position received from the neighbor, if any
    pub neighbor_position: Option<GeoPosition>,
    /// Time the neighbor position was last taken (ms)
    pub last_gps_update: u32,
    /// Time the multiplier was last computed (ms)
    pub last_multiplier_calc: u32,
    /// Distance to the neighbor in meters
    pub distance: f32,
    /// Smoothed radial speed in m/s, positive when moving apart
    pub speed: f32,
}

impl Default for LiteLinkState {
    fn default() -> Self {
        LiteLinkState {
            lq: LiteLq::default(),
            quickstart: 0,
            neighbor_position: None,
            last_gps_update: 0,
            last_multiplier_calc: 0,
            distance: 0.0,
            speed: 0.0,
        }
    }
}

impl LiteLinkState {
    pub fn phase(&self) -> AgingPhase {
        AgingPhase::of(self.quickstart)
    }
}

#[derive(Debug, Clone, Copy)]
struct LocalPosition {
    position: GeoPosition,
    last_gps_update: u32,
}

/// Handler of the lite variant
#[derive(Debug, Clone)]
pub struct LiteHandler {
    config: LqConfig,
    local: LocalPosition,
    buffered_position: GeoPosition,
}

impl LiteHandler {
    pub fn new(config: LqConfig) -> Result<Self> {
        config.validate()?;
        if config.algorithm != LqAlgorithm::EtxGpsLite {
            return Err(MetricError::InvalidConfig(format!(
                "{} configuration given to the etx_gps_lite handler",
                config.algorithm
            )));
        }

        Ok(LiteHandler {
            local: LocalPosition {
                position: config.initial_position,
                last_gps_update: 0,
            },
            buffered_position: GeoPosition::default(),
            config,
        })
    }

    pub fn config(&self) -> &LqConfig {
        &self.config
    }

    /// Our own position as broadcast in the global section
    pub fn local_position(&self) -> &GeoPosition {
        &self.local.position
    }

    pub fn last_local_update(&self) -> u32 {
        self.local.last_gps_update
    }

    /// Peer position decoded from the last global section
    pub fn buffered_position(&self) -> &GeoPosition {
        &self.buffered_position
    }

    /// GPS feed entry point. Ignored unless `now` is newer than the last fix.
    pub fn update_local_position(&mut self, now: u32, lat: f32, lon: f32, alt: i32) -> bool {
        if now <= self.local.last_gps_update {
            trace!(
                "Ignoring local position at {} (last update {})",
                now,
                self.local.last_gps_update
            );
            return false;
        }

        self.local.position = GeoPosition::new(lat, lon, alt);
        self.local.last_gps_update = now;
        true
    }

    /// Recompute distance, speed and multiplier after a new neighbor position.
    ///
    /// The distance of a fresh link starts at zero, so the first position
    /// counts as motion from there and usually falls to the plausibility gate.
    fn update_multiplier(&self, state: &mut LiteLinkState) {
        let neighbor = state.neighbor_position.unwrap_or_default();
        let last_update = self.local.last_gps_update.max(state.last_gps_update);

        let distance = haversine_distance(&self.local.position, &neighbor) as f32;
        let delta_distance = distance - state.distance;
        state.distance = distance;

        let elapsed = last_update.saturating_sub(state.last_multiplier_calc);
        let instantaneous = cost::instantaneous_speed(delta_distance, elapsed);
        state.speed = cost::smooth_speed(state.speed, instantaneous, self.config.gamma);
        state.lq.mlq = cost::speed_multiplier(state.speed, self.config.beta);
        state.last_multiplier_calc = last_update;

        debug!(
            "Neighbor at {}: {:.1} m, speed {:.2} m/s, mlq {:.3}",
            neighbor, state.distance, state.speed, state.lq.mlq
        );
    }
}

impl LqHandler for LiteHandler {
    type Record = LiteLq;
    type LinkState = LiteLinkState;

    fn algorithm(&self) -> LqAlgorithm {
        LqAlgorithm::EtxGpsLite
    }

    fn initialize(&mut self, now: u32) {
        self.local = LocalPosition {
            position: self.config.initial_position,
            last_gps_update: now,
        };
        self.buffered_position = GeoPosition::default();
        info!(
            "Initialized {} handler at {}",
            self.name(),
            self.local.position
        );
    }

    fn sizes(&self) -> HandlerSizes {
        HandlerSizes {
            neighbor_record: size_of::<LiteLq>(),
            tc_record: size_of::<LiteLq>(),
            link_state: size_of::<LiteLinkState>(),
            hello_wire: LITE_LQ_PAIR_SIZE,
            tc_wire: LITE_LQ_PAIR_SIZE,
        }
    }

    fn new_record(&self) -> LiteLq {
        LiteLq::default()
    }

    fn new_link_state(&self) -> LiteLinkState {
        LiteLinkState::default()
    }

    fn calculate_cost(&mut self, record: &LiteLq) -> LinkCost {
        combine_cost(record.lq, record.nlq, record.mlq)
    }

    fn link_cost(&mut self, state: &LiteLinkState) -> LinkCost {
        self.calculate_cost(&state.lq)
    }

    fn on_packet_outcome(
        &mut self,
        link: &mut LinkEntry<LiteLinkState>,
        lost: bool,
        observer: &mut dyn LinkCostObserver,
    ) {
        let ratio = link.observed_ratio();
        let state = &mut link.quality;
        state.lq.lq = cost::age(
            state.lq.lq,
            &mut state.quickstart,
            self.config.aging,
            lost,
            ratio,
        );

        link.link_cost = self.calculate_cost(&link.quality.lq);
        trace!(
            "Link {} aged ({}): lq {:.3}, cost {}",
            link.neighbor_iface_addr,
            if lost { "lost" } else { "received" },
            link.quality.lq.lq,
            link.link_cost
        );
        observer.relevant_linkcost_change();
    }

    fn absorb_foreign_report(
        &mut self,
        now: u32,
        state: &mut LiteLinkState,
        foreign: Option<&LiteLq>,
    ) {
        let Some(foreign) = foreign else {
            state.lq.nlq = 0.0;
            return;
        };

        state.lq.nlq = foreign.lq;

        if now > state.last_gps_update {
            state.neighbor_position = Some(self.buffered_position);
            state.last_gps_update = now;
            self.update_multiplier(state);
        }
    }

    fn copy_for_neighbor_view(&self, target: &mut LiteLq, source: &LiteLinkState) {
        *target = source.lq;
    }

    fn serialize_hello_lq(&self, record: &LiteLq, out: &mut Vec<u8>) -> usize {
        record.encode(out)
    }

    fn deserialize_hello_lq(&self, cursor: &mut &[u8], record: &mut LiteLq) -> Result<()> {
        *record = LiteLq::decode(cursor)?;
        Ok(())
    }

    /// Only HELLOs carry our position; TC messages keep the empty default
    fn serialize_hello_global(&self, out: &mut Vec<u8>) -> usize {
        self.local.position.encode(out)
    }

    fn deserialize_hello_global(&mut self, cursor: &mut &[u8]) -> Result<()> {
        self.buffered_position = GeoPosition::decode(cursor)?;
        trace!(
            "Buffered peer position {} ({} bytes)",
            self.buffered_position,
            GLOBAL_RECORD_SIZE
        );
        Ok(())
    }

    fn print_link_lq(&self, state: &LiteLinkState, separator: char) -> String {
        self.print_tc_lq(&state.lq, separator)
    }

    fn print_tc_lq(&self, record: &LiteLq, separator: char) -> String {
        format!(
            "{:.2}{}{:.2}{}{:5.2}",
            record.lq, separator, record.nlq, separator, record.mlq
        )
    }

    fn position_report<'a, I>(&self, links: I) -> Option<String>
    where
        I: IntoIterator<Item = (&'a IpAddr, &'a LiteLinkState)>,
    {
        if self.config.debug_level == 0 {
            return None;
        }

        let rows = links.into_iter().map(|(address, state)| LiteRow {
            address,
            position: state.neighbor_position.unwrap_or_default(),
            distance: state.distance,
            speed: state.speed,
            mlq: state.lq.mlq,
        });

        Some(report::lite_table(
            &report::wallclock(),
            &self.local.position,
            self.local.last_gps_update,
            rows,
        ))
    }
}
