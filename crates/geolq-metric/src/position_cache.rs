//! Position cache for the pud variant
//!
//! Keeps the most recent GPS record of every remote node, keyed by main
//! address, together with the distance bookkeeping needed for the distance
//! multiplier. Records of one node are admitted only with strictly increasing
//! timestamps.

use std::collections::BTreeMap;
use std::net::IpAddr;
use tracing::{debug, trace};

use crate::cost::distance_multiplier;
use crate::geo::line_of_sight_distance;
use crate::mid::MidResolver;
use geolq_protocol::GpsRecord;

/// Outcome of a remote position report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First record for this node; a new entry was created
    Created,
    /// Record replaced an older one
    Updated,
    /// Timestamp not newer than the stored record; discarded
    Stale,
    /// Report about this node itself; discarded
    SelfReport,
}

impl Admission {
    /// Whether the report was stored
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Created | Admission::Updated)
    }
}

/// Cached position of one remote node
#[derive(Debug, Clone, PartialEq)]
pub struct NodePosition {
    /// Main address of the node
    pub address: IpAddr,
    /// Latest admitted GPS record
    pub record: GpsRecord,
    /// Newest of the remote and local record times at the last recomputation
    pub last_update_time: u32,
    /// Line-of-sight distance to this node in meters
    pub distance: f32,
    /// Distance change at the last recomputation
    pub delta_distance: f32,
    /// Time elapsed between the last two recomputations
    pub delta_time: f32,
    /// `last_update_time` when the multiplier was last computed
    pub last_computed_time: u32,
    /// Cached distance multiplier
    pub multiplier: f32,
}

impl NodePosition {
    fn new(address: IpAddr, record: GpsRecord) -> Self {
        NodePosition {
            address,
            record,
            last_update_time: 0,
            distance: 0.0,
            delta_distance: 0.0,
            delta_time: 0.0,
            last_computed_time: 0,
            multiplier: 1.0,
        }
    }

    /// Recompute the distance to `local` if either record moved time forward.
    ///
    /// Returns whether anything changed. A new entry starts at distance zero,
    /// so its first measurement counts the whole distance as change.
    fn update_distance(&mut self, local: &GpsRecord) -> bool {
        let newest = self.record.time.max(local.time);
        if newest <= self.last_update_time {
            return false;
        }

        let distance = line_of_sight_distance(local, &self.record) as f32;

        self.delta_time = (newest - self.last_update_time) as f32;
        self.last_update_time = newest;
        self.delta_distance = distance - self.distance;
        self.distance = distance;

        debug!(
            "Updated distance to {}: {:.1} m ({:+.2} m over {})",
            self.address, self.distance, self.delta_distance, self.delta_time
        );
        true
    }

    /// Distance multiplier, recomputed only after a distance update
    fn multiplier(&mut self, alpha: f32, beta: f32) -> f32 {
        if self.last_update_time != self.last_computed_time {
            self.multiplier =
                distance_multiplier(alpha, self.delta_distance, self.delta_time, beta);
            self.last_computed_time = self.last_update_time;
        }
        self.multiplier
    }
}

/// Address-ordered store of remote positions plus the local record
#[derive(Debug, Clone)]
pub struct PositionCache {
    local_address: IpAddr,
    local: GpsRecord,
    nodes: BTreeMap<IpAddr, NodePosition>,
}

impl PositionCache {
    /// Empty cache for the node with main address `local_address`
    pub fn new(local_address: IpAddr) -> Self {
        PositionCache {
            local_address,
            local: GpsRecord::default(),
            nodes: BTreeMap::new(),
        }
    }

    pub fn local_address(&self) -> IpAddr {
        self.local_address
    }

    /// Current local GPS record
    pub fn local(&self) -> &GpsRecord {
        &self.local
    }

    /// Store a position reported for `address`.
    ///
    /// The address is first resolved to its main address. Reports about this
    /// node and reports not strictly newer than the stored one are discarded.
    pub fn update_remote(
        &mut self,
        address: IpAddr,
        record: GpsRecord,
        mid: &dyn MidResolver,
    ) -> Admission {
        let main = mid.resolve(&address);

        let admission = match self.nodes.get_mut(&main) {
            Some(entry) => {
                if record.time <= entry.record.time {
                    trace!(
                        "Discarding stale position of {} (time {} <= {})",
                        main,
                        record.time,
                        entry.record.time
                    );
                    return Admission::Stale;
                }
                entry.record = record;
                Admission::Updated
            }
            None => {
                if main == self.local_address {
                    trace!("Discarding position report about ourselves ({})", main);
                    return Admission::SelfReport;
                }
                debug!("New position entry for {}", main);
                self.nodes.insert(main, NodePosition::new(main, record));
                Admission::Created
            }
        };

        if let Some(entry) = self.nodes.get_mut(&main) {
            entry.update_distance(&self.local);
        }

        admission
    }

    /// Replace the local record if strictly newer and recompute every entry
    pub fn update_local(&mut self, record: GpsRecord) -> bool {
        if record.time <= self.local.time {
            trace!(
                "Discarding stale local position (time {} <= {})",
                record.time,
                self.local.time
            );
            return false;
        }

        self.local = record;
        let local = self.local;
        for entry in self.nodes.values_mut() {
            entry.update_distance(&local);
        }
        true
    }

    pub fn get(&self, address: &IpAddr) -> Option<&NodePosition> {
        self.nodes.get(address)
    }

    /// Distance multiplier for `address`, neutral when the node is unknown
    pub fn multiplier(&mut self, address: &IpAddr, alpha: f32, beta: f32) -> f32 {
        match self.nodes.get_mut(address) {
            Some(entry) => entry.multiplier(alpha, beta),
            None => 1.0,
        }
    }

    /// Entries in address order
    pub fn iter(&self) -> impl Iterator<Item = &NodePosition> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
