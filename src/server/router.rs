use crate::ring::{RingNode, RouteOutcome};
use crate::wire::Message;
use std::sync::Arc;

/// MessageRouter dispatches an inbound protocol message to the matching `RingNode` handler.
///
/// Send failures while handling a message stop that handler where it is. There is nobody to report
/// them to, so they are logged and the message counts as dropped.
pub(crate) struct MessageRouter {
    logger: slog::Logger,
    node: Arc<RingNode>,
}

impl MessageRouter {
    pub(crate) fn new(logger: slog::Logger, node: Arc<RingNode>) -> Self {
        MessageRouter { logger, node }
    }

    pub(crate) async fn route(&self, message: Message) -> RouteOutcome {
        let command = message.command();

        let result = match message {
            Message::Register { joiner, trace } => self.node.handle_register(joiner, trace).await,
            Message::Exit { id } => self.node.handle_exit(id).await,
            Message::RemoveSelf => self.node.handle_remove_self().await,
            Message::Lookup { key, trace } => self.node.handle_lookup(key, trace).await,
            Message::Insert { key, value, trace } => self.node.handle_insert(key, value, trace).await,
            Message::Delete { key, trace } => self.node.handle_delete(key, trace).await,
            Message::Transfer { end, entries } => Ok(self.node.handle_transfer(end, entries)),
            Message::TransferRequest { destination } => self.node.handle_transfer_request(destination).await,
            Message::SetNext(next) => Ok(self.node.handle_set_next(next)),
            Message::SetPrev(prev) => Ok(self.node.handle_set_prev(prev)),
            Message::Print { text } => Ok(self.node.handle_print(text)),
        };

        match result {
            Ok(outcome) => {
                slog::debug!(self.logger, "Handled '{}': {:?}", command, outcome);
                outcome
            }
            Err(e) => {
                slog::error!(self.logger, "Failed while handling '{}': {}", command, e);
                RouteOutcome::Dropped
            }
        }
    }
}
