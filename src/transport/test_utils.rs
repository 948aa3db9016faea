use crate::ring::NodeAddress;
use crate::transport::{MessageSender, SendError};
use crate::wire::Message;
use std::collections::HashSet;
use std::sync::Mutex;

/// RecordingSender keeps every message instead of putting it on the network. Sends to addresses
/// marked unreachable fail the same way an exhausted connect does.
#[derive(Default)]
pub(crate) struct RecordingSender {
    sent: Mutex<Vec<(NodeAddress, Message)>>,
    unreachable: Mutex<HashSet<NodeAddress>>,
}

impl RecordingSender {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn mark_unreachable(&self, address: NodeAddress) {
        self.unreachable.lock().unwrap().insert(address);
    }

    pub(crate) fn take_sent(&self) -> Vec<(NodeAddress, Message)> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

#[async_trait::async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, to: &NodeAddress, message: &Message) -> Result<(), SendError> {
        if self.unreachable.lock().unwrap().contains(to) {
            return Err(SendError::ConnectRetriesExhausted {
                address: to.clone(),
                attempts: 1,
            });
        }

        self.sent.lock().unwrap().push((to.clone(), message.clone()));
        Ok(())
    }
}
