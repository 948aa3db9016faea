use crate::ring::key_range::{KeyRange, NodeId};
use crate::ring::lifecycle::NodeLifecycle;
use crate::ring::neighbor::{NeighborInfo, NodeAddress};
use crate::ring::partition_store::Entry;
use crate::transport::SendError;
use std::fmt;

/// NodeRole is fixed at construction. The bootstrap seeds the ring as its sole initial member and is
/// where key-operation reports are printed; every other node joins through it.
#[derive(Clone, Debug)]
pub enum NodeRole {
    Bootstrap { seed_entries: Vec<Entry> },
    Member { bootstrap: NodeAddress },
}

/// What a node did with an inbound request.
#[derive(Debug, PartialEq)]
pub(crate) enum RouteOutcome {
    /// This node owned the key (or matched the membership change) and acted on it.
    Handled,
    /// Passed on to the successor with this id.
    Forwarded(NodeId),
    /// Logged and dropped: rejected, malformed for this node's state, or nowhere to forward.
    Dropped,
}

#[derive(Debug, thiserror::Error)]
pub enum OperatorCommandError {
    #[error("Value \"{0}\" must be a single word without ',' or ';'.")]
    InvalidValue(String),
    #[error("Already in system")]
    AlreadyInSystem,
    #[error("Must be in the system to exit.")]
    NotInSystem,
    #[error("Already left the system.")]
    AlreadyLeft,
    #[error("The bootstrap name server cannot leave the ring.")]
    BootstrapCannotLeave,
    #[error("Communication with the ring failed: {0}")]
    Send(#[from] SendError),
}

/// LeaveNotice is what the leaving node tells its operator right away, without waiting for the
/// hand-off to finish.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveNotice {
    pub id: NodeId,
    pub range: Option<KeyRange>,
    pub predecessor: NodeId,
}

impl fmt::Display for LeaveNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Successful exit")?;
        match self.range {
            Some(range) => write!(
                f,
                "Key range [{}, {}] handed over to Name Server {}",
                range.start(),
                range.end(),
                self.predecessor
            ),
            None => write!(f, "No key range to hand over to Name Server {}", self.predecessor),
        }
    }
}

/// NodeStatus is a point-in-time view of a node. The fields are read one lock at a time, so during
/// a reconfiguration they may not agree with each other.
#[derive(Debug, Clone)]
pub struct NodeStatus {
    pub id: NodeId,
    pub is_bootstrap: bool,
    pub lifecycle: NodeLifecycle,
    pub range: Option<KeyRange>,
    pub predecessor: NeighborInfo,
    pub successor: NeighborInfo,
    pub entries: Vec<Entry>,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_bootstrap && !self.lifecycle.is_in_system() {
            return write!(f, "Not in system.");
        }

        for (key, value) in &self.entries {
            writeln!(f, "{} {}", key, value)?;
        }
        writeln!(f)?;
        match self.range {
            Some(range) => writeln!(f, "Covering the range {} to {}", range.start(), range.end())?,
            None => writeln!(f, "Not covering any range yet")?,
        }
        writeln!(f, "Previous Name Server: {}", self.predecessor.id)?;
        write!(f, "Next Name Server: {}", self.successor.id)
    }
}
