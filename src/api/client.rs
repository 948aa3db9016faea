use crate::api::ConsoleStream;
use crate::ring::{
    Key, LeaveNotice, LifecycleListener, NodeAddress, NodeId, NodeStatus, OperatorCommandError, RingNode,
};
use crate::server::ServerShutdownHandle;
use std::sync::Arc;

/// RingNodeClient is everything an application gets back for a running node. The parts are split
/// so that one task can drive operator commands while another drains the console stream.
pub struct RingNodeClient {
    pub handle: RingNodeHandle,
    pub console_stream: ConsoleStream,
    pub lifecycle_listener: LifecycleListener,
}

/// RingNodeHandle issues operator commands against the local node.
///
/// Commands start protocol work and return once their first message is out. Results that arrive
/// later (join welcome, lookup reports) show up on the `ConsoleStream`.
pub struct RingNodeHandle {
    node: Arc<RingNode>,
    address: NodeAddress,
    server_shutdown_handle: ServerShutdownHandle,
}

impl RingNodeHandle {
    pub(super) fn new(node: Arc<RingNode>, address: NodeAddress, server_shutdown_handle: ServerShutdownHandle) -> Self {
        RingNodeHandle {
            node,
            address,
            server_shutdown_handle,
        }
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// The address peers reach this node at.
    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    pub fn is_bootstrap(&self) -> bool {
        self.node.is_bootstrap()
    }

    pub async fn enter(&self) -> Result<(), OperatorCommandError> {
        self.node.enter().await
    }

    pub async fn leave(&self) -> Result<LeaveNotice, OperatorCommandError> {
        self.node.leave().await
    }

    pub async fn lookup(&self, key: Key) -> Result<(), OperatorCommandError> {
        self.node.lookup(key).await
    }

    pub async fn insert(&self, key: Key, value: String) -> Result<(), OperatorCommandError> {
        self.node.insert(key, value).await
    }

    pub async fn delete(&self, key: Key) -> Result<(), OperatorCommandError> {
        self.node.delete(key).await
    }

    pub fn status(&self) -> NodeStatus {
        self.node.status()
    }

    /// Stops accepting protocol messages. Handlers already running finish on their own.
    pub fn shutdown(&mut self) {
        self.server_shutdown_handle.shutdown();
    }
}
