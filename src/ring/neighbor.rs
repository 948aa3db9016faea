use crate::ring::key_range::NodeId;
use std::fmt;
use std::sync::Mutex;

/// NodeAddress is where a node listens for protocol messages.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NodeAddress {
    pub ip: String,
    pub port: u16,
}

impl NodeAddress {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        NodeAddress { ip: ip.into(), port }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// NeighborInfo is a snapshot of a ring neighbor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeighborInfo {
    pub address: NodeAddress,
    pub id: NodeId,
}

impl NeighborInfo {
    pub fn new(address: NodeAddress, id: NodeId) -> Self {
        NeighborInfo { address, id }
    }
}

/// Neighbor is a successor or predecessor reference. It is mutated in place by `set_next` /
/// `set_prev`, and every access goes through its own lock. Callers get clones, so the lock is
/// never held across a send.
pub(crate) struct Neighbor {
    info: Mutex<NeighborInfo>,
}

impl Neighbor {
    pub(crate) fn new(info: NeighborInfo) -> Self {
        Neighbor { info: Mutex::new(info) }
    }

    pub(crate) fn get(&self) -> NeighborInfo {
        self.info.lock().expect("Neighbor.get() mutex guard poison").clone()
    }

    pub(crate) fn id(&self) -> NodeId {
        self.info.lock().expect("Neighbor.id() mutex guard poison").id
    }

    /// Replaces the neighbor and returns the previous one.
    pub(crate) fn set(&self, new_info: NeighborInfo) -> NeighborInfo {
        let mut info = self.info.lock().expect("Neighbor.set() mutex guard poison");
        std::mem::replace(&mut *info, new_info)
    }
}
