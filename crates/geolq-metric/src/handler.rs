//! Link-quality handler contract
//!
//! The routing core talks to a link-quality algorithm only through
//! [`LqHandler`]. A handler owns its algorithm-wide state (local position,
//! buffered peer position, position cache); per-link and per-neighbor state
//! live in the core's tables and are passed in by reference.

use std::fmt;
use std::net::IpAddr;

use crate::config::LqAlgorithm;
use crate::cost::{cost_to_etx, LinkCost};
use crate::error::Result;
use crate::{LINK_COST_BROKEN, LOSS_LINK_MULTIPLIER_ONE};

/// Storage and wire sizes the routing core needs when registering a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerSizes {
    /// In-memory size of the neighbor view record
    pub neighbor_record: usize,
    /// In-memory size of the TC view record
    pub tc_record: usize,
    /// In-memory size of the per-link state
    pub link_state: usize,
    /// Bytes of one LQ pair in a HELLO message
    pub hello_wire: usize,
    /// Bytes of one LQ pair in a TC message
    pub tc_wire: usize,
}

/// Notified whenever a link cost may have changed
pub trait LinkCostObserver {
    fn relevant_linkcost_change(&mut self);
}

impl<F: FnMut()> LinkCostObserver for F {
    fn relevant_linkcost_change(&mut self) {
        self()
    }
}

/// A link as the routing core stores it
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEntry<S> {
    /// Interface address of the neighbor on this link
    pub neighbor_iface_addr: IpAddr,
    /// Fixed-point (65536 = 1.0) fraction of Hellos expected to arrive
    pub loss_link_multiplier: u32,
    /// Last cost computed for this link
    pub link_cost: LinkCost,
    /// Handler-specific link quality state
    pub quality: S,
}

impl<S> LinkEntry<S> {
    pub fn new(neighbor_iface_addr: IpAddr, quality: S) -> Self {
        LinkEntry {
            neighbor_iface_addr,
            loss_link_multiplier: LOSS_LINK_MULTIPLIER_ONE,
            link_cost: LINK_COST_BROKEN,
            quality,
        }
    }

    /// Loss link multiplier as a ratio
    pub fn observed_ratio(&self) -> f32 {
        self.loss_link_multiplier as f32 / LOSS_LINK_MULTIPLIER_ONE as f32
    }
}

/// Capability set of a link-quality algorithm.
///
/// `Record` is the neighbor and TC view of a link's quality and the content
/// of its wire form; `LinkState` is the richer per-link state aged by packet
/// outcomes.
pub trait LqHandler {
    type Record: Clone + fmt::Debug;
    type LinkState: Clone + fmt::Debug;

    fn algorithm(&self) -> LqAlgorithm;

    fn name(&self) -> &'static str {
        self.algorithm().name()
    }

    /// Reset algorithm-wide state at startup; `now` is the core's clock in ms
    fn initialize(&mut self, now: u32);

    fn sizes(&self) -> HandlerSizes;

    /// Cleared neighbor/TC record
    fn new_record(&self) -> Self::Record;

    /// Cleared link state
    fn new_link_state(&self) -> Self::LinkState;

    /// Cost of a neighbor or TC view record
    fn calculate_cost(&mut self, record: &Self::Record) -> LinkCost;

    /// Cost of a link, computed on its neighbor view
    fn link_cost(&mut self, state: &Self::LinkState) -> LinkCost {
        let mut record = self.new_record();
        self.copy_for_neighbor_view(&mut record, state);
        self.calculate_cost(&record)
    }

    /// Age the link with one Hello outcome, store the new cost and notify
    fn on_packet_outcome(
        &mut self,
        link: &mut LinkEntry<Self::LinkState>,
        lost: bool,
        observer: &mut dyn LinkCostObserver,
    );

    /// Take the neighbor's report of our own link quality, `None` when the
    /// neighbor did not list us
    fn absorb_foreign_report(
        &mut self,
        now: u32,
        state: &mut Self::LinkState,
        foreign: Option<&Self::Record>,
    );

    fn copy_for_neighbor_view(&self, target: &mut Self::Record, source: &Self::LinkState);

    fn copy_for_tc_view(&self, target: &mut Self::Record, source: &Self::LinkState) {
        self.copy_for_neighbor_view(target, source)
    }

    fn reset_for_neighbor(&self, target: &mut Self::Record) {
        *target = self.new_record();
    }

    fn reset_for_tc(&self, target: &mut Self::Record) {
        *target = self.new_record();
    }

    fn reset_link_state(&self, target: &mut Self::LinkState) {
        *target = self.new_link_state();
    }

    /// Append the HELLO LQ pair and return the number of bytes written
    fn serialize_hello_lq(&self, record: &Self::Record, out: &mut Vec<u8>) -> usize;

    fn serialize_tc_lq(&self, record: &Self::Record, out: &mut Vec<u8>) -> usize {
        self.serialize_hello_lq(record, out)
    }

    /// Decode a HELLO LQ pair into `record`, advancing the cursor
    fn deserialize_hello_lq(&self, cursor: &mut &[u8], record: &mut Self::Record) -> Result<()>;

    fn deserialize_tc_lq(&self, cursor: &mut &[u8], record: &mut Self::Record) -> Result<()> {
        self.deserialize_hello_lq(cursor, record)
    }

    /// Append the global section of a HELLO; nothing by default
    fn serialize_hello_global(&self, _out: &mut Vec<u8>) -> usize {
        0
    }

    /// Append the global section of a TC; nothing by default
    fn serialize_tc_global(&self, _out: &mut Vec<u8>) -> usize {
        0
    }

    /// Decode the global section of a HELLO; consumes nothing by default
    fn deserialize_hello_global(&mut self, _cursor: &mut &[u8]) -> Result<()> {
        Ok(())
    }

    /// Decode the global section of a TC; consumes nothing by default
    fn deserialize_tc_global(&mut self, _cursor: &mut &[u8]) -> Result<()> {
        Ok(())
    }

    fn print_link_lq(&self, state: &Self::LinkState, separator: char) -> String;

    fn print_tc_lq(&self, record: &Self::Record, separator: char) -> String;

    fn print_cost(&self, cost: LinkCost) -> String {
        format!(" {:.3}", cost_to_etx(cost))
    }

    /// Position table for diagnostics, `None` unless debugging is enabled
    fn position_report<'a, I>(&self, links: I) -> Option<String>
    where
        I: IntoIterator<Item = (&'a IpAddr, &'a Self::LinkState)>,
        Self::LinkState: 'a;
}
