//! Main address resolution
//!
//! Nodes with several interfaces announce one main address; the MID table
//! maintained by the routing core maps every interface address to it.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;

/// Lookup into the routing core's multiple-interface table
pub trait MidResolver {
    /// Main address of `addr`, or `None` when `addr` is not an alias
    fn main_address(&self, addr: &IpAddr) -> Option<IpAddr>;

    /// Main address of `addr`, falling back to `addr` itself
    fn resolve(&self, addr: &IpAddr) -> IpAddr {
        self.main_address(addr).unwrap_or(*addr)
    }
}

/// Resolver for single-interface meshes: every address is a main address
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMid;

impl MidResolver for NoMid {
    fn main_address(&self, _addr: &IpAddr) -> Option<IpAddr> {
        None
    }
}

impl MidResolver for HashMap<IpAddr, IpAddr> {
    fn main_address(&self, addr: &IpAddr) -> Option<IpAddr> {
        self.get(addr).copied()
    }
}

impl MidResolver for BTreeMap<IpAddr, IpAddr> {
    fn main_address(&self, addr: &IpAddr) -> Option<IpAddr> {
        self.get(addr).copied()
    }
}
