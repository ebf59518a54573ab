//! Trace replay driver
//!
//! [`ReplayCore`] stands in for the routing core: it owns the link table,
//! feeds recorded events through a link-quality handler exactly as the core
//! would, and counts the cost-change notifications it receives.

use anyhow::{Context, Result};
use geolq_metric::{
    Admission, GpsRecord, LinkEntry, LiteHandler, LiteLq, LqAlgorithm, LqConfig, LqHandler,
    MidResolver, PudHandler, LOSS_LINK_MULTIPLIER_ONE,
};
use geolq_protocol::{hex_dump, PudLqPair};
use std::collections::BTreeMap;
use std::net::IpAddr;
use tracing::{debug, info, trace, warn};

use crate::trace::{HelloEvent, PositionFix, Trace, TraceEvent};

/// What the replay driver needs beyond the handler contract: the GPS feed
/// entry points and a way to build the packet a neighbor would have sent
pub trait ReplayHandler: LqHandler {
    /// Append the HELLO LQ pair and global section sent by `sender_main`
    fn encode_hello(&self, sender_main: IpAddr, hello: &HelloEvent, out: &mut Vec<u8>) -> usize;

    fn local_fix(&mut self, now: u32, fix: &PositionFix) -> bool;

    /// `None` when the handler has no use for remote positions
    fn remote_fix(
        &mut self,
        address: IpAddr,
        record: GpsRecord,
        mid: &dyn MidResolver,
    ) -> Option<Admission>;
}

impl ReplayHandler for LiteHandler {
    fn encode_hello(&self, _sender_main: IpAddr, hello: &HelloEvent, out: &mut Vec<u8>) -> usize {
        let record = LiteLq::new(hello.lq, hello.nlq, hello.mlq.unwrap_or(1.0));
        let mut written = record.encode(out);
        if let Some(position) = &hello.position {
            written += position.encode(out);
        }
        written
    }

    fn local_fix(&mut self, now: u32, fix: &PositionFix) -> bool {
        self.update_local_position(
            fix.time.unwrap_or(now),
            fix.lat as f32,
            fix.lon as f32,
            fix.alt,
        )
    }

    fn remote_fix(
        &mut self,
        _address: IpAddr,
        _record: GpsRecord,
        _mid: &dyn MidResolver,
    ) -> Option<Admission> {
        None
    }
}

impl ReplayHandler for PudHandler {
    fn encode_hello(&self, sender_main: IpAddr, hello: &HelloEvent, out: &mut Vec<u8>) -> usize {
        PudLqPair {
            lq: hello.lq,
            nlq: hello.nlq,
            address: sender_main,
        }
        .encode(self.config().ip_version, out)
    }

    fn local_fix(&mut self, now: u32, fix: &PositionFix) -> bool {
        let record = GpsRecord::new(fix.time.unwrap_or(now), fix.lat, fix.lon, fix.alt);
        self.update_local_record(record)
    }

    fn remote_fix(
        &mut self,
        address: IpAddr,
        record: GpsRecord,
        mid: &dyn MidResolver,
    ) -> Option<Admission> {
        Some(self.update_remote_record(address, record, mid))
    }
}

/// Minimal routing core driving one handler
pub struct ReplayCore<H: LqHandler> {
    handler: H,
    links: BTreeMap<IpAddr, LinkEntry<H::LinkState>>,
    mid: BTreeMap<IpAddr, IpAddr>,
    now: u32,
    cost_changes: u64,
    reports: Vec<String>,
}

impl<H: ReplayHandler> ReplayCore<H> {
    pub fn new(mut handler: H, start: u32, mid: BTreeMap<IpAddr, IpAddr>) -> Self {
        handler.initialize(start);
        ReplayCore {
            handler,
            links: BTreeMap::new(),
            mid,
            now: start,
            cost_changes: 0,
            reports: Vec::new(),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn now(&self) -> u32 {
        self.now
    }

    pub fn link(&self, address: &IpAddr) -> Option<&LinkEntry<H::LinkState>> {
        self.links.get(address)
    }

    /// Number of cost-change notifications received from the handler
    pub fn cost_changes(&self) -> u64 {
        self.cost_changes
    }

    /// Position tables produced by `report` events
    pub fn reports(&self) -> &[String] {
        &self.reports
    }

    pub fn run(&mut self, events: &[TraceEvent]) -> Result<()> {
        info!(
            "Replaying {} events with {}",
            events.len(),
            self.handler.name()
        );
        for (index, event) in events.iter().enumerate() {
            self.apply(event)
                .with_context(|| format!("Event {} ({:?}) failed", index, event))?;
        }
        self.report();
        Ok(())
    }

    pub fn apply(&mut self, event: &TraceEvent) -> Result<()> {
        trace!("t={} {:?}", self.now, event);

        match event {
            TraceEvent::Clock { now } => {
                if *now < self.now {
                    warn!("Clock moved backwards from {} to {}", self.now, now);
                }
                self.now = *now;
            }
            TraceEvent::LocalPosition(fix) => {
                if !self.handler.local_fix(self.now, fix) {
                    debug!("Local fix at t={} not newer than the current one", self.now);
                }
            }
            TraceEvent::RemotePosition {
                address,
                time,
                lat,
                lon,
                alt,
            } => {
                let record = GpsRecord::new(*time, *lat, *lon, *alt);
                match self.handler.remote_fix(*address, record, &self.mid) {
                    Some(admission) => debug!("Position of {}: {:?}", address, admission),
                    None => warn!(
                        "{} does not use remote positions, ignoring {}",
                        self.handler.name(),
                        address
                    ),
                }
            }
            TraceEvent::Hello(hello) => self.receive_hello(hello)?,
            TraceEvent::Outcome { link, lost } => {
                let entry = link_entry(&mut self.links, &self.handler, *link);
                let changes = &mut self.cost_changes;
                self.handler
                    .on_packet_outcome(entry, *lost, &mut || *changes += 1);
            }
            TraceEvent::LinkMultiplier { link, value } => {
                let multiplier = (value.max(0.0) * LOSS_LINK_MULTIPLIER_ONE as f32) as u32;
                link_entry(&mut self.links, &self.handler, *link).loss_link_multiplier = multiplier;
            }
            TraceEvent::Report => self.report(),
        }
        Ok(())
    }

    /// One line per link: address, link quality and cost
    pub fn summary(&self) -> Vec<String> {
        self.links
            .iter()
            .map(|(address, link)| {
                format!(
                    "{:<15}  {}  {}",
                    address.to_string(),
                    self.handler.print_link_lq(&link.quality, '/'),
                    self.handler.print_cost(link.link_cost)
                )
            })
            .collect()
    }

    /// Encode the neighbor's HELLO, decode it as received and absorb it
    fn receive_hello(&mut self, hello: &HelloEvent) -> Result<()> {
        let sender_main = self.mid.resolve(&hello.from);
        let mut packet = Vec::new();
        self.handler.encode_hello(sender_main, hello, &mut packet);
        trace!("HELLO from {}: {}", hello.from, hex_dump(&packet));

        let mut cursor = packet.as_slice();
        let mut foreign = self.handler.new_record();
        self.handler
            .deserialize_hello_lq(&mut cursor, &mut foreign)
            .context("Failed to decode HELLO LQ pair")?;
        if !cursor.is_empty() {
            self.handler
                .deserialize_hello_global(&mut cursor)
                .context("Failed to decode global section")?;
        }

        let now = self.now;
        let foreign = hello.listed.then_some(&foreign);
        let entry = link_entry(&mut self.links, &self.handler, hello.from);
        self.handler
            .absorb_foreign_report(now, &mut entry.quality, foreign);
        entry.link_cost = self.handler.link_cost(&entry.quality);
        Ok(())
    }

    fn report(&mut self) {
        let links = self.links.iter().map(|(address, link)| (address, &link.quality));
        if let Some(table) = self.handler.position_report(links) {
            debug!("{}", table);
            self.reports.push(table);
        }
    }
}

/// Link to `address`, created with a cleared state on first use
fn link_entry<'a, H: LqHandler>(
    links: &'a mut BTreeMap<IpAddr, LinkEntry<H::LinkState>>,
    handler: &H,
    address: IpAddr,
) -> &'a mut LinkEntry<H::LinkState> {
    links.entry(address).or_insert_with(|| {
        debug!("New link to {}", address);
        LinkEntry::new(address, handler.new_link_state())
    })
}

/// Replay `trace` with the handler selected by `config`
pub fn run_trace(config: &LqConfig, trace: &Trace) -> Result<Vec<String>> {
    match config.algorithm {
        LqAlgorithm::EtxGpsLite => {
            let handler = LiteHandler::new(config.clone())?;
            replay(handler, trace)
        }
        LqAlgorithm::EtxGpsPud => {
            let handler = PudHandler::new(config.clone())?;
            replay(handler, trace)
        }
    }
}

fn replay<H: ReplayHandler>(handler: H, trace: &Trace) -> Result<Vec<String>> {
    let mut core = ReplayCore::new(handler, trace.start, trace.mid.clone());
    core.run(&trace.events)?;
    info!(
        "Replay finished at t={} with {} links and {} cost changes",
        core.now(),
        core.summary().len(),
        core.cost_changes()
    );
    Ok(core.summary())
}
