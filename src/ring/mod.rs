//! The ring itself: key space, per-node partition, neighbors, and the protocol handlers.
mod key_range;
mod lifecycle;
mod neighbor;
mod partition_store;
mod ring_node;
mod ring_node_api;
mod trace;

pub use key_range::Key;
pub use key_range::KeyError;
pub use key_range::KeyRange;
pub use key_range::NodeId;
pub use key_range::HASH_SIZE;
pub use lifecycle::LifecycleListener;
pub use lifecycle::NodeLifecycle;
pub use neighbor::NeighborInfo;
pub use neighbor::NodeAddress;
pub use partition_store::Entry;
pub use ring_node_api::LeaveNotice;
pub use ring_node_api::NodeRole;
pub use ring_node_api::NodeStatus;
pub use ring_node_api::OperatorCommandError;
pub use trace::Trace;

pub(crate) use ring_node::RingNode;
pub(crate) use ring_node_api::RouteOutcome;
