use crate::ring::NodeAddress;
use crate::wire::Message;
use std::io;

/// MessageSender delivers one protocol message to one node. Delivery is one-way: success means
/// the message was written to a connection, not that the receiver acted on it.
#[async_trait::async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, to: &NodeAddress, message: &Message) -> Result<(), SendError>;
}

/// A failed send means the message is lost. Nothing queues or retries it later.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("could not connect to {address} after {attempts} attempts")]
    ConnectRetriesExhausted { address: NodeAddress, attempts: u32 },
    #[error("failed to write message to {address}: {source}")]
    Io {
        address: NodeAddress,
        #[source]
        source: io::Error,
    },
}
