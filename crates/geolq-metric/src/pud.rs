//! Pud GPS link quality (`etx_gps_pud`)
//!
//! Positions come from an external position subsystem and are kept in a
//! [`PositionCache`]. Each LQ pair carries the sender's main address so the
//! receiver can look up the sender's position when costing the link.

use std::mem::size_of;
use std::net::IpAddr;
use tracing::{info, trace};

use crate::config::{LqAlgorithm, LqConfig};
use crate::cost::{self, combine_cost, AgingPhase, LinkCost};
use crate::error::{MetricError, Result};
use crate::handler::{HandlerSizes, LinkCostObserver, LinkEntry, LqHandler};
use crate::mid::MidResolver;
use crate::position_cache::{Admission, PositionCache};
use crate::report;
use geolq_protocol::{pud_lq_pair_size, GpsRecord, IpVersion, PudLqPair};

/// Link quality of the pud variant: neighbor view, TC view and link state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PudLq {
    pub lq: f32,
    pub nlq: f32,
    pub quickstart: u16,
    /// Main address of the neighbor, as announced in its LQ pairs
    pub neighbor_main_address: IpAddr,
}

impl PudLq {
    /// Cleared value for a mesh of the given IP version
    pub fn cleared(version: IpVersion) -> Self {
        PudLq {
            lq: 0.0,
            nlq: 0.0,
            quickstart: 0,
            neighbor_main_address: version.unspecified(),
        }
    }

    pub fn phase(&self) -> AgingPhase {
        AgingPhase::of(self.quickstart)
    }
}

/// Handler of the pud variant
#[derive(Debug, Clone)]
pub struct PudHandler {
    config: LqConfig,
    cache: PositionCache,
}

impl PudHandler {
    pub fn new(config: LqConfig) -> Result<Self> {
        config.validate()?;
        if config.algorithm != LqAlgorithm::EtxGpsPud {
            return Err(MetricError::InvalidConfig(format!(
                "{} configuration given to the etx_gps_pud handler",
                config.algorithm
            )));
        }

        Ok(PudHandler {
            cache: PositionCache::new(config.main_address),
            config,
        })
    }

    pub fn config(&self) -> &LqConfig {
        &self.config
    }

    pub fn cache(&self) -> &PositionCache {
        &self.cache
    }

    /// GPS feed entry point for our own position
    pub fn update_local_record(&mut self, record: GpsRecord) -> bool {
        self.cache.update_local(record)
    }

    /// GPS feed entry point for a position received about another node
    pub fn update_remote_record(
        &mut self,
        address: IpAddr,
        record: GpsRecord,
        mid: &dyn MidResolver,
    ) -> Admission {
        self.cache.update_remote(address, record, mid)
    }
}

impl LqHandler for PudHandler {
    type Record = PudLq;
    type LinkState = PudLq;

    fn algorithm(&self) -> LqAlgorithm {
        LqAlgorithm::EtxGpsPud
    }

    fn initialize(&mut self, _now: u32) {
        self.cache = PositionCache::new(self.config.main_address);
        info!(
            "Initialized {} handler for {} ({})",
            self.name(),
            self.config.main_address,
            self.config.ip_version
        );
    }

    fn sizes(&self) -> HandlerSizes {
        let wire = pud_lq_pair_size(self.config.ip_version);
        HandlerSizes {
            neighbor_record: size_of::<PudLq>(),
            tc_record: size_of::<PudLq>(),
            link_state: size_of::<PudLq>(),
            hello_wire: wire,
            tc_wire: wire,
        }
    }

    fn new_record(&self) -> PudLq {
        PudLq::cleared(self.config.ip_version)
    }

    fn new_link_state(&self) -> PudLq {
        PudLq::cleared(self.config.ip_version)
    }

    fn calculate_cost(&mut self, record: &PudLq) -> LinkCost {
        let multiplier = self.cache.multiplier(
            &record.neighbor_main_address,
            self.config.alpha,
            self.config.beta,
        );
        combine_cost(record.lq, record.nlq, multiplier)
    }

    fn link_cost(&mut self, state: &PudLq) -> LinkCost {
        self.calculate_cost(state)
    }

    fn on_packet_outcome(
        &mut self,
        link: &mut LinkEntry<PudLq>,
        lost: bool,
        observer: &mut dyn LinkCostObserver,
    ) {
        let ratio = link.observed_ratio();
        let state = &mut link.quality;
        state.lq = cost::age(
            state.lq,
            &mut state.quickstart,
            self.config.aging,
            lost,
            ratio,
        );

        link.link_cost = self.calculate_cost(&link.quality);
        trace!(
            "Link {} aged ({}): lq {:.3}, cost {}",
            link.neighbor_iface_addr,
            if lost { "lost" } else { "received" },
            link.quality.lq,
            link.link_cost
        );
        observer.relevant_linkcost_change();
    }

    fn absorb_foreign_report(&mut self, _now: u32, state: &mut PudLq, foreign: Option<&PudLq>) {
        match foreign {
            Some(foreign) => {
                state.nlq = foreign.lq;
                state.neighbor_main_address = foreign.neighbor_main_address;
            }
            None => state.nlq = 0.0,
        }
    }

    fn copy_for_neighbor_view(&self, target: &mut PudLq, source: &PudLq) {
        *target = *source;
    }

    /// The pair always carries our own main address, whatever the record says
    fn serialize_hello_lq(&self, record: &PudLq, out: &mut Vec<u8>) -> usize {
        PudLqPair {
            lq: record.lq,
            nlq: record.nlq,
            address: self.config.main_address,
        }
        .encode(self.config.ip_version, out)
    }

    fn deserialize_hello_lq(&self, cursor: &mut &[u8], record: &mut PudLq) -> Result<()> {
        let pair = PudLqPair::decode(self.config.ip_version, cursor)?;
        record.lq = pair.lq;
        record.nlq = pair.nlq;
        record.neighbor_main_address = pair.address;
        Ok(())
    }

    fn print_link_lq(&self, state: &PudLq, separator: char) -> String {
        self.print_tc_lq(state, separator)
    }

    fn print_tc_lq(&self, record: &PudLq, separator: char) -> String {
        format!("{:.2}{}{:.2}", record.lq, separator, record.nlq)
    }

    fn position_report<'a, I>(&self, _links: I) -> Option<String>
    where
        I: IntoIterator<Item = (&'a IpAddr, &'a PudLq)>,
    {
        if self.config.debug_level == 0 {
            return None;
        }

        Some(report::pud_table(
            &report::wallclock(),
            self.cache.local(),
            self.cache.iter(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mid::NoMid;
    use crate::LINK_COST_BROKEN;
    use std::collections::HashMap;

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn handler() -> PudHandler {
        let config = LqConfig::for_node(LqAlgorithm::EtxGpsPud, addr("10.0.0.1"));
        let mut handler = PudHandler::new(config).unwrap();
        handler.initialize(0);
        handler
    }

    #[test]
    fn test_rejects_mismatched_configuration() {
        let config = LqConfig::for_node(LqAlgorithm::EtxGpsLite, addr("10.0.0.1"));
        assert!(PudHandler::new(config).is_err());

        let mut config = LqConfig::for_node(LqAlgorithm::EtxGpsPud, addr("10.0.0.1"));
        config.ip_version = IpVersion::V6;
        assert!(PudHandler::new(config).is_err());
    }

    #[test]
    fn test_cleared_record_is_all_zero() {
        let handler = handler();
        let record = handler.new_record();
        assert_eq!(record.lq, 0.0);
        assert_eq!(record.nlq, 0.0);
        assert_eq!(record.neighbor_main_address, addr("0.0.0.0"));
        assert_eq!(record.phase(), AgingPhase::Quickstart(0));

        let config = LqConfig::for_node(LqAlgorithm::EtxGpsPud, addr("fd00::1"));
        let handler = PudHandler::new(config).unwrap();
        assert_eq!(handler.new_link_state().neighbor_main_address, addr("::"));
    }

    #[test]
    fn test_serialize_writes_local_address() {
        let handler = handler();
        let record = PudLq {
            lq: 1.0,
            nlq: 0.5,
            quickstart: 3,
            neighbor_main_address: addr("10.0.0.9"),
        };

        let mut out = Vec::new();
        assert_eq!(handler.serialize_hello_lq(&record, &mut out), 8);
        assert_eq!(&out[2..6], &[10, 0, 0, 1]);
        assert_eq!(&out[6..], &[0, 0]);

        let mut decoded = handler.new_record();
        let mut cursor = out.as_slice();
        handler.deserialize_hello_lq(&mut cursor, &mut decoded).unwrap();
        assert!(cursor.is_empty());
        assert_eq!(decoded.neighbor_main_address, addr("10.0.0.1"));
        assert_eq!(decoded.lq, 1.0);
        assert_eq!(decoded.quickstart, 0);
    }

    #[test]
    fn test_ipv6_wire_size() {
        let config = LqConfig::for_node(LqAlgorithm::EtxGpsPud, addr("fd00::1"));
        let handler = PudHandler::new(config).unwrap();
        assert_eq!(handler.sizes().hello_wire, 20);
        assert_eq!(handler.sizes().tc_wire, 20);

        let mut out = Vec::new();
        assert_eq!(handler.serialize_tc_lq(&handler.new_record(), &mut out), 20);
        assert_eq!(out.len(), 20);

        let short = &out[..19];
        let mut cursor = short;
        let mut record = handler.new_record();
        assert!(handler.deserialize_tc_lq(&mut cursor, &mut record).is_err());
        assert_eq!(cursor.len(), 19);
    }

    #[test]
    fn test_no_global_section() {
        let mut handler = handler();
        let mut out = Vec::new();
        assert_eq!(handler.serialize_hello_global(&mut out), 0);
        assert_eq!(handler.serialize_tc_global(&mut out), 0);
        assert!(out.is_empty());

        let bytes = [1u8, 2, 3, 4];
        let mut cursor = &bytes[..];
        handler.deserialize_hello_global(&mut cursor).unwrap();
        handler.deserialize_tc_global(&mut cursor).unwrap();
        assert_eq!(cursor.len(), 4);
    }

    #[test]
    fn test_absorb_copies_address() {
        let mut handler = handler();
        let mut state = handler.new_link_state();
        let foreign = PudLq {
            lq: 0.8,
            nlq: 0.1,
            quickstart: 0,
            neighbor_main_address: addr("10.0.0.2"),
        };

        handler.absorb_foreign_report(0, &mut state, Some(&foreign));
        assert_eq!(state.nlq, 0.8);
        assert_eq!(state.neighbor_main_address, addr("10.0.0.2"));

        handler.absorb_foreign_report(0, &mut state, None);
        assert_eq!(state.nlq, 0.0);
        assert_eq!(state.neighbor_main_address, addr("10.0.0.2"));
    }

    #[test]
    fn test_cost_without_position_is_neutral() {
        let mut handler = handler();
        let record = PudLq {
            lq: 0.9,
            nlq: 0.9,
            quickstart: 0,
            neighbor_main_address: addr("10.0.0.2"),
        };
        assert_eq!(handler.calculate_cost(&record), 1264);

        let broken = PudLq { lq: 0.05, ..record };
        assert_eq!(handler.calculate_cost(&broken), LINK_COST_BROKEN);
    }

    #[test]
    fn test_departing_node_costs_more() {
        let mut handler = handler();
        let neighbor = addr("10.0.0.2");
        let record = PudLq {
            lq: 1.0,
            nlq: 1.0,
            quickstart: 0,
            neighbor_main_address: neighbor,
        };

        // A new entry starts at distance zero: 111 m in one time unit saturates
        handler.update_local_record(GpsRecord::new(1, 46.0, 6.0, 400));
        handler.update_remote_record(neighbor, GpsRecord::new(1, 46.001, 6.0, 400), &NoMid);
        assert_eq!(handler.calculate_cost(&record), LINK_COST_BROKEN);

        // Standing still prices the link at its plain ETX
        handler.update_remote_record(neighbor, GpsRecord::new(11, 46.001, 6.0, 400), &NoMid);
        assert_eq!(handler.calculate_cost(&record), 1024);

        handler.update_remote_record(neighbor, GpsRecord::new(21, 46.002, 6.0, 400), &NoMid);
        assert!(handler.calculate_cost(&record) > 1024);
    }

    #[test]
    fn test_self_report_via_alias() {
        let mut handler = handler();
        let mut mid = HashMap::new();
        mid.insert(addr("192.168.1.1"), addr("10.0.0.1"));

        let admission =
            handler.update_remote_record(addr("192.168.1.1"), GpsRecord::new(5, 1.0, 2.0, 0), &mid);
        assert_eq!(admission, Admission::SelfReport);
        assert!(handler.cache().is_empty());
    }

    #[test]
    fn test_packet_outcome() {
        let mut handler = handler();
        let mut link = LinkEntry::new(addr("10.0.0.2"), handler.new_link_state());
        link.quality.nlq = 1.0;
        let mut changes = 0;

        handler.on_packet_outcome(&mut link, false, &mut || changes += 1);
        assert_eq!(link.quality.lq, 0.25);
        assert_eq!(link.link_cost, 4096);

        handler.on_packet_outcome(&mut link, true, &mut || changes += 1);
        assert_eq!(link.quality.lq, 0.1875);
        assert_eq!(changes, 2);
        assert_eq!(link.quality.phase(), AgingPhase::Quickstart(2));
    }

    #[test]
    fn test_print_formats() {
        let handler = handler();
        let record = PudLq {
            lq: 1.0,
            nlq: 0.456,
            quickstart: 0,
            neighbor_main_address: addr("10.0.0.2"),
        };
        assert_eq!(handler.print_tc_lq(&record, '/'), "1.00/0.46");
        assert_eq!(handler.print_link_lq(&record, ' '), "1.00 0.46");
        assert_eq!(handler.print_cost(2048), " 2.000");
    }

    #[test]
    fn test_position_report_lists_cache() {
        let config = LqConfig {
            debug_level: 2,
            ..LqConfig::for_node(LqAlgorithm::EtxGpsPud, addr("10.0.0.1"))
        };
        let mut handler = PudHandler::new(config).unwrap();
        handler.update_remote_record(addr("10.0.0.3"), GpsRecord::new(1, 1.0, 2.0, 3), &NoMid);
        handler.update_remote_record(addr("10.0.0.2"), GpsRecord::new(1, 1.0, 2.0, 3), &NoMid);

        let links: Vec<(&IpAddr, &PudLq)> = Vec::new();
        let table = handler.position_report(links).unwrap();
        let first = table.find("10.0.0.2").unwrap();
        let second = table.find("10.0.0.3").unwrap();
        assert!(first < second);
    }
}
