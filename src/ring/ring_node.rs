use crate::api::ConsoleStreamPublisher;
use crate::ring::key_range::{Key, KeyRange, NodeId};
use crate::ring::lifecycle::{self, LifecycleListener, LifecycleState, NodeLifecycle};
use crate::ring::neighbor::{Neighbor, NeighborInfo, NodeAddress};
use crate::ring::partition_store::{Entry, PartitionStore, PutOutcome, RemoveOutcome, SplitError};
use crate::ring::ring_node_api::{LeaveNotice, NodeRole, NodeStatus, OperatorCommandError, RouteOutcome};
use crate::ring::trace::Trace;
use crate::transport::{MessageSender, SendError};
use crate::wire::{is_wire_safe_value, Message};
use std::sync::Arc;

/// RingNode is one member of the ring: its partition of the key space, its two neighbor
/// references, and the protocol handlers that route requests and change membership.
///
/// The store, the successor and the predecessor each have their own lock. Handlers take what they
/// need, copy it out, and release it before any send.
pub(crate) struct RingNode {
    logger: slog::Logger,
    me: NeighborInfo,
    bootstrap: NodeAddress,
    is_bootstrap: bool,
    store: PartitionStore,
    successor: Neighbor,
    predecessor: Neighbor,
    lifecycle: LifecycleState,
    console: ConsoleStreamPublisher,
    sender: Arc<dyn MessageSender>,
}

impl RingNode {
    pub(crate) fn new(
        logger: slog::Logger,
        me: NeighborInfo,
        role: NodeRole,
        sender: Arc<dyn MessageSender>,
        console: ConsoleStreamPublisher,
    ) -> (Self, LifecycleListener) {
        let (is_bootstrap, bootstrap, owned, initial_lifecycle, seed_entries) = match role {
            // Sole initial member: owns every key, starting at its own id.
            NodeRole::Bootstrap { seed_entries } => (
                true,
                me.address.clone(),
                Some(KeyRange::full_ring_from(me.id)),
                NodeLifecycle::Active,
                seed_entries,
            ),
            NodeRole::Member { bootstrap } => (false, bootstrap, None, NodeLifecycle::Unregistered, vec![]),
        };

        let store = PartitionStore::new(me.id, owned);
        store.seed(seed_entries);

        let (lifecycle, lifecycle_listener) = lifecycle::new(initial_lifecycle);

        let node = RingNode {
            logger,
            successor: Neighbor::new(me.clone()),
            predecessor: Neighbor::new(me.clone()),
            me,
            bootstrap,
            is_bootstrap,
            store,
            lifecycle,
            console,
            sender,
        };

        (node, lifecycle_listener)
    }

    pub(crate) fn id(&self) -> NodeId {
        self.me.id
    }

    pub(crate) fn is_bootstrap(&self) -> bool {
        self.is_bootstrap
    }

    // ------- Membership: join --------

    /// A node wants to join. If we own its id, we split our range at that id, ship the upper part
    /// and its data to the joiner, and splice the joiner in as our successor. Otherwise the request
    /// moves on to our successor.
    ///
    /// Between the split and the last rewiring message, requests for the handed-off keys can still
    /// arrive at our old successor and get misrouted. That window is accepted.
    ///
    /// If the joiner cannot be reached with its range, we take the range back and nothing changes.
    /// Once it has the range, our own neighbors are updated before any rewiring message goes out.
    pub(crate) async fn handle_register(&self, joiner: NeighborInfo, trace: Trace) -> Result<RouteOutcome, SendError> {
        let trace = trace.extended(self.me.id);

        let split = match self.store.split_off(joiner.id) {
            Ok(split) => split,
            Err(SplitError::DuplicateId(id)) => {
                slog::error!(
                    self.logger,
                    "Rejecting join of {:?} at {}: id {} already exists",
                    joiner.id,
                    joiner.address,
                    id
                );
                return Ok(RouteOutcome::Dropped);
            }
            Err(SplitError::NotOwned(_)) => {
                return self.forward(Message::Register { joiner, trace }).await;
            }
        };

        slog::info!(
            self.logger,
            "Accepting join of {:?}. Keeping {:?}, handing off {:?} with {} entries.",
            joiner.id,
            split.kept,
            split.handed_off,
            split.entries.len()
        );

        self.send_transfer(&joiner.address, split.handed_off.end(), split.entries).await?;

        let old_successor = self.successor.set(joiner.clone());
        if old_successor.id == self.me.id {
            self.predecessor.set(joiner.clone());
        }
        slog::info!(self.logger, "Successor is now {:?}", joiner.id);

        let mut rewiring = vec![
            (joiner.address.clone(), Message::SetNext(old_successor.clone())),
            (joiner.address.clone(), Message::SetPrev(self.me.clone())),
        ];
        if old_successor.id != self.me.id {
            rewiring.push((old_successor.address.clone(), Message::SetPrev(joiner.clone())));
        }

        let mut first_error = None;
        for (to, message) in rewiring {
            if let Err(e) = self.send(&to, message).await {
                slog::warn!(self.logger, "Failed to rewire {} for join of {:?}: {}", to, joiner.id, e);
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        self.deliver_report(format!("Name Server {} successfully added to the system.", joiner.id))
            .await?;

        let welcome = format!(
            "Successful entry\n\
             Managing keys on the range [{}, {}]\n\
             Preceded by Name Server {}\n\
             Succeeded by Name Server {}\n\
             Enter Sequence: \n{}",
            split.handed_off.start(),
            split.handed_off.end(),
            self.me.id,
            old_successor.id,
            trace.report(false)
        );
        self.send(&joiner.address, Message::Print { text: welcome }).await?;

        Ok(RouteOutcome::Handled)
    }

    // ------- Membership: leave --------

    /// Node `id` is leaving. The exit request travels the ring until it reaches the node right
    /// before `id`, which pulls the leaver's data and then tells the leaver to unlink itself.
    pub(crate) async fn handle_exit(&self, id: NodeId) -> Result<RouteOutcome, SendError> {
        let successor = self.successor.get();

        if successor.id == id {
            slog::info!(self.logger, "Our successor {:?} is leaving. Requesting its range.", id);
            self.send(
                &successor.address,
                Message::TransferRequest {
                    destination: self.me.address.clone(),
                },
            )
            .await?;
            self.send(&successor.address, Message::RemoveSelf).await?;
            return Ok(RouteOutcome::Handled);
        }

        if id == self.me.id {
            // Went all the way around without finding our predecessor.
            slog::warn!(self.logger, "Exit request for ourselves came back around. Dropping.");
            return Ok(RouteOutcome::Dropped);
        }

        self.forward(Message::Exit { id }).await
    }

    /// We are leaving: tell our neighbors to link to each other.
    pub(crate) async fn handle_remove_self(&self) -> Result<RouteOutcome, SendError> {
        let predecessor = self.predecessor.get();
        let successor = self.successor.get();

        slog::info!(
            self.logger,
            "Unlinking. Joining predecessor {:?} to successor {:?}.",
            predecessor.id,
            successor.id
        );

        self.send(&predecessor.address, Message::SetNext(successor.clone())).await?;
        self.send(&successor.address, Message::SetPrev(predecessor)).await?;

        Ok(RouteOutcome::Handled)
    }

    /// Drains our whole range and ships it to `destination`, the predecessor taking it over.
    pub(crate) async fn handle_transfer_request(&self, destination: NodeAddress) -> Result<RouteOutcome, SendError> {
        let hand_off = match self.store.hand_off_all() {
            Some(hand_off) => hand_off,
            None => {
                slog::warn!(self.logger, "Transfer requested by {} but we own no range. Dropping.", destination);
                return Ok(RouteOutcome::Dropped);
            }
        };

        slog::info!(
            self.logger,
            "Handing off {:?} with {} entries to {}",
            hand_off.range,
            hand_off.entries.len(),
            destination
        );

        self.send_transfer(&destination, hand_off.range.end(), hand_off.entries).await?;

        Ok(RouteOutcome::Handled)
    }

    /// Takes over `[id, end]` and its entries. For a joiner this is the first sign it is in the
    /// ring; for a predecessor it extends the range over a leaver's keys.
    pub(crate) fn handle_transfer(&self, end: Key, entries: Vec<Entry>) -> RouteOutcome {
        let count = entries.len();
        let range = self.store.absorb(end, entries);
        slog::info!(self.logger, "Now covering {:?} after receiving {} entries", range, count);

        if self
            .lifecycle
            .transition(&[NodeLifecycle::Registering], NodeLifecycle::Active)
            .is_ok()
        {
            slog::info!(self.logger, "Lifecycle: {} -> {}", NodeLifecycle::Registering, NodeLifecycle::Active);
        }

        RouteOutcome::Handled
    }

    pub(crate) fn handle_set_next(&self, next: NeighborInfo) -> RouteOutcome {
        let previous = self.successor.set(next.clone());
        slog::info!(self.logger, "Successor {:?} -> {:?}", previous.id, next.id);
        RouteOutcome::Handled
    }

    pub(crate) fn handle_set_prev(&self, prev: NeighborInfo) -> RouteOutcome {
        let previous = self.predecessor.set(prev.clone());
        slog::info!(self.logger, "Predecessor {:?} -> {:?}", previous.id, prev.id);
        RouteOutcome::Handled
    }

    pub(crate) fn handle_print(&self, text: String) -> RouteOutcome {
        if !self.console.publish(text) {
            slog::debug!(self.logger, "Console is gone. Dropping print.");
        }
        RouteOutcome::Handled
    }

    // ------- Request routing --------

    pub(crate) async fn handle_lookup(&self, key: Key, trace: Trace) -> Result<RouteOutcome, SendError> {
        let trace = trace.extended(self.me.id);
        if !self.store.is_in_range(key) {
            return self.forward(Message::Lookup { key, trace }).await;
        }

        let result = match self.store.get(key) {
            Some(value) => format!("Success! Found \"{}\" on Name Server {}", value, self.me.id),
            None => "Key not found".to_string(),
        };

        self.deliver_report(format!("{}{}", trace.report(true), result)).await?;
        Ok(RouteOutcome::Handled)
    }

    pub(crate) async fn handle_insert(&self, key: Key, value: String, trace: Trace) -> Result<RouteOutcome, SendError> {
        let trace = trace.extended(self.me.id);
        if !self.store.is_in_range(key) {
            return self.forward(Message::Insert { key, value, trace }).await;
        }

        let result = match self.store.put(key, value.clone()) {
            PutOutcome::Inserted => format!("Successfully added ({}, {}) to Name Server {}", key, value, self.me.id),
            PutOutcome::AlreadyPresent(existing) => {
                format!("Error : Value \"{}\" already associated with key {}", existing, key)
            }
        };

        self.deliver_report(format!("{}{}", trace.report(true), result)).await?;
        Ok(RouteOutcome::Handled)
    }

    pub(crate) async fn handle_delete(&self, key: Key, trace: Trace) -> Result<RouteOutcome, SendError> {
        let trace = trace.extended(self.me.id);
        if !self.store.is_in_range(key) {
            return self.forward(Message::Delete { key, trace }).await;
        }

        let result = match self.store.remove(key) {
            RemoveOutcome::Removed(_) => "Successful deletion",
            RemoveOutcome::NotFound => "Key not found.",
        };

        self.deliver_report(format!("{}{}", trace.report(true), result)).await?;
        Ok(RouteOutcome::Handled)
    }

    // ------- Operator commands --------

    /// Starts the join. The reply comes back asynchronously; this does not wait for it.
    pub(crate) async fn enter(&self) -> Result<(), OperatorCommandError> {
        self.lifecycle
            .transition(&[NodeLifecycle::Unregistered], NodeLifecycle::Registering)
            .map_err(|e| match e.from {
                NodeLifecycle::Exiting => OperatorCommandError::AlreadyLeft,
                _ => OperatorCommandError::AlreadyInSystem,
            })?;

        let register = Message::Register {
            joiner: self.me.clone(),
            trace: Trace::starting_at(self.me.id),
        };

        if let Err(e) = self.send(&self.bootstrap, register).await {
            // Nothing reached the ring, so let the operator try again.
            let _ = self
                .lifecycle
                .transition(&[NodeLifecycle::Registering], NodeLifecycle::Unregistered);
            return Err(e.into());
        }

        slog::info!(self.logger, "Lifecycle: {} -> {}", NodeLifecycle::Unregistered, NodeLifecycle::Registering);
        Ok(())
    }

    /// Starts the leave and returns the hand-off notice without waiting for the hand-off.
    pub(crate) async fn leave(&self) -> Result<LeaveNotice, OperatorCommandError> {
        if self.is_bootstrap {
            return Err(OperatorCommandError::BootstrapCannotLeave);
        }

        // Not while Registering: that join may still be dropped as a duplicate id.
        self.lifecycle
            .transition(&[NodeLifecycle::Active], NodeLifecycle::Exiting)
            .map_err(|e| match e.from {
                NodeLifecycle::Exiting => OperatorCommandError::AlreadyLeft,
                _ => OperatorCommandError::NotInSystem,
            })?;

        let notice = LeaveNotice {
            id: self.me.id,
            range: self.store.owned_range(),
            predecessor: self.predecessor.id(),
        };

        if let Err(e) = self.send(&self.bootstrap, Message::Exit { id: self.me.id }).await {
            let _ = self
                .lifecycle
                .transition(&[NodeLifecycle::Exiting], NodeLifecycle::Active);
            return Err(e.into());
        }

        slog::info!(self.logger, "Lifecycle: {} -> {}", NodeLifecycle::Active, NodeLifecycle::Exiting);
        Ok(notice)
    }

    pub(crate) async fn lookup(&self, key: Key) -> Result<(), OperatorCommandError> {
        self.handle_lookup(key, Trace::new()).await?;
        Ok(())
    }

    pub(crate) async fn insert(&self, key: Key, value: String) -> Result<(), OperatorCommandError> {
        if !is_wire_safe_value(&value) {
            return Err(OperatorCommandError::InvalidValue(value));
        }

        self.handle_insert(key, value, Trace::new()).await?;
        Ok(())
    }

    pub(crate) async fn delete(&self, key: Key) -> Result<(), OperatorCommandError> {
        self.handle_delete(key, Trace::new()).await?;
        Ok(())
    }

    pub(crate) fn status(&self) -> NodeStatus {
        NodeStatus {
            id: self.me.id,
            is_bootstrap: self.is_bootstrap,
            lifecycle: self.lifecycle.current(),
            range: self.store.owned_range(),
            predecessor: self.predecessor.get(),
            successor: self.successor.get(),
            entries: self.store.entries(),
        }
    }

    // ------- Helpers --------

    async fn forward(&self, message: Message) -> Result<RouteOutcome, SendError> {
        let successor = self.successor.get();
        if successor.id == self.me.id {
            // Alone in the ring but not the owner: we have not joined, or already left.
            slog::warn!(self.logger, "No successor to forward '{}' to. Dropping.", message.command());
            return Ok(RouteOutcome::Dropped);
        }

        self.send(&successor.address, message).await?;
        Ok(RouteOutcome::Forwarded(successor.id))
    }

    /// Key-operation results go to the operator console on the bootstrap.
    async fn deliver_report(&self, text: String) -> Result<(), SendError> {
        if self.is_bootstrap {
            self.handle_print(text);
            return Ok(());
        }

        let bootstrap = self.bootstrap.clone();
        self.send(&bootstrap, Message::Print { text }).await
    }

    async fn send(&self, to: &NodeAddress, message: Message) -> Result<(), SendError> {
        slog::debug!(self.logger, "Sending to {}: '{}'", to, message);
        self.sender.send(to, &message).await
    }

    /// Ships `[id, end]` and its entries to `to`. If that fails the range and entries come back
    /// into our own store.
    async fn send_transfer(&self, to: &NodeAddress, end: Key, entries: Vec<Entry>) -> Result<(), SendError> {
        let transfer = Message::Transfer { end, entries };
        slog::debug!(self.logger, "Sending to {}: '{}'", to, transfer.command());
        let result = self.sender.send(to, &transfer).await;

        if let (Err(e), Message::Transfer { end, entries }) = (&result, transfer) {
            let range = self.store.absorb(end, entries);
            slog::warn!(self.logger, "Transfer to {} failed: {}. Keeping {:?}.", to, e, range);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{create_console_stream, ConsoleStream};
    use crate::transport::RecordingSender;
    use tokio::time::{timeout, Duration};

    const BOOT_PORT: u16 = 5000;

    fn key(v: u32) -> Key {
        Key::new(v).unwrap()
    }

    fn info(port: u16, id: u32) -> NeighborInfo {
        NeighborInfo::new(NodeAddress::new("127.0.0.1", port), key(id))
    }

    fn boot_address() -> NodeAddress {
        NodeAddress::new("127.0.0.1", BOOT_PORT)
    }

    fn node(me: NeighborInfo, role: NodeRole) -> (RingNode, Arc<RecordingSender>, ConsoleStream) {
        let sender = Arc::new(RecordingSender::new());
        let (publisher, stream) = create_console_stream();
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let (node, _listener) = RingNode::new(logger, me, role, sender.clone(), publisher);
        (node, sender, stream)
    }

    fn bootstrap(seed: Vec<(u32, &str)>) -> (RingNode, Arc<RecordingSender>, ConsoleStream) {
        let seed_entries = seed.into_iter().map(|(k, v)| (key(k), v.to_string())).collect();
        node(info(BOOT_PORT, 0), NodeRole::Bootstrap { seed_entries })
    }

    fn member(port: u16, id: u32) -> (RingNode, Arc<RecordingSender>, ConsoleStream) {
        node(
            info(port, id),
            NodeRole::Member {
                bootstrap: boot_address(),
            },
        )
    }

    /// A member that already owns `[id, end]` between the given neighbors.
    fn joined_member(
        port: u16,
        id: u32,
        end: u32,
        prev: NeighborInfo,
        next: NeighborInfo,
    ) -> (RingNode, Arc<RecordingSender>, ConsoleStream) {
        let (node, sender, stream) = member(port, id);
        node.lifecycle
            .transition(&[NodeLifecycle::Unregistered], NodeLifecycle::Registering)
            .unwrap();
        node.handle_transfer(key(end), vec![]);
        node.handle_set_prev(prev);
        node.handle_set_next(next);
        (node, sender, stream)
    }

    async fn next_console_line(stream: &mut ConsoleStream) -> String {
        timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("Unexpected timeout")
            .expect("Console stream closed")
    }

    #[tokio::test]
    async fn bootstrap_answers_own_keys_locally() {
        let (boot, sender, mut console) = bootstrap(vec![(42, "answer")]);

        boot.lookup(key(42)).await.unwrap();
        assert_eq!(
            "\tChecked Name Server 0\nSuccess! Found \"answer\" on Name Server 0",
            next_console_line(&mut console).await
        );

        boot.lookup(key(43)).await.unwrap();
        assert_eq!("\tChecked Name Server 0\nKey not found", next_console_line(&mut console).await);

        assert!(sender.take_sent().is_empty());
    }

    #[tokio::test]
    async fn insert_twice_keeps_first_value() {
        let (boot, _sender, mut console) = bootstrap(vec![]);

        boot.insert(key(7), "first".into()).await.unwrap();
        assert_eq!(
            "\tChecked Name Server 0\nSuccessfully added (7, first) to Name Server 0",
            next_console_line(&mut console).await
        );

        boot.insert(key(7), "second".into()).await.unwrap();
        assert_eq!(
            "\tChecked Name Server 0\nError : Value \"first\" already associated with key 7",
            next_console_line(&mut console).await
        );
        assert_eq!(Some("first".to_string()), boot.store.get(key(7)));
    }

    #[tokio::test]
    async fn delete_then_lookup_reports_not_found() {
        let (boot, _sender, mut console) = bootstrap(vec![(9, "nine")]);

        boot.delete(key(9)).await.unwrap();
        assert_eq!("\tChecked Name Server 0\nSuccessful deletion", next_console_line(&mut console).await);

        boot.delete(key(9)).await.unwrap();
        assert_eq!("\tChecked Name Server 0\nKey not found.", next_console_line(&mut console).await);

        boot.lookup(key(9)).await.unwrap();
        assert_eq!("\tChecked Name Server 0\nKey not found", next_console_line(&mut console).await);
    }

    #[tokio::test]
    async fn insert_rejects_values_that_break_the_wire_format() {
        let (boot, _sender, _console) = bootstrap(vec![]);

        let result = boot.insert(key(1), "a;b".into()).await;
        assert!(matches!(result, Err(OperatorCommandError::InvalidValue(_))));
        assert_eq!(None, boot.store.get(key(1)));
    }

    #[tokio::test]
    async fn join_on_single_node_ring_splits_range_and_rewires() {
        let (boot, sender, mut console) = bootstrap(vec![(100, "low"), (700, "high")]);
        let joiner = info(5001, 512);

        let outcome = boot
            .handle_register(joiner.clone(), Trace::starting_at(key(512)))
            .await
            .unwrap();
        assert_eq!(RouteOutcome::Handled, outcome);

        let sent = sender.take_sent();
        assert_eq!(4, sent.len());
        assert_eq!(
            (
                joiner.address.clone(),
                Message::Transfer {
                    end: key(1023),
                    entries: vec![(key(700), "high".into())],
                }
            ),
            sent[0]
        );
        assert_eq!((joiner.address.clone(), Message::SetNext(info(BOOT_PORT, 0))), sent[1]);
        assert_eq!((joiner.address.clone(), Message::SetPrev(info(BOOT_PORT, 0))), sent[2]);
        match &sent[3] {
            (to, Message::Print { text }) => {
                assert_eq!(&joiner.address, to);
                assert_eq!(
                    "Successful entry\n\
                     Managing keys on the range [512, 1023]\n\
                     Preceded by Name Server 0\n\
                     Succeeded by Name Server 0\n\
                     Enter Sequence: \n\tContacted Name Server 0\n",
                    text
                );
            }
            other => panic!("Unexpected message: {:?}", other),
        }

        assert_eq!(
            "Name Server 512 successfully added to the system.",
            next_console_line(&mut console).await
        );

        let status = boot.status();
        assert_eq!(Some(KeyRange::new(key(0), key(511))), status.range);
        assert_eq!(joiner, status.successor);
        assert_eq!(joiner, status.predecessor);
        assert_eq!(vec![(key(100), "low".to_string())], status.entries);
    }

    #[tokio::test]
    async fn join_in_larger_ring_tells_old_successor() {
        let (node, sender, _console) = joined_member(5001, 512, 1023, info(5002, 768), info(5002, 768));
        // Pretend 768 sits after us; a joiner at 600 lands in our range.
        node.store.absorb(key(767), vec![]);
        let joiner = info(5003, 600);

        node.handle_register(joiner.clone(), Trace::starting_at(key(600)).extended(key(0)))
            .await
            .unwrap();

        let sent = sender.take_sent();
        assert!(sent.contains(&(info(5002, 768).address, Message::SetPrev(joiner.clone()))));
        assert_eq!(joiner, node.successor.get());
        assert_eq!(info(5002, 768), node.predecessor.get());
        assert_eq!(Some(KeyRange::new(key(512), key(599))), node.store.owned_range());

        // Reports go to the bootstrap, not to a local console.
        assert!(sent.contains(&(
            boot_address(),
            Message::Print {
                text: "Name Server 600 successfully added to the system.".into()
            }
        )));
    }

    #[tokio::test]
    async fn join_outside_range_is_forwarded_with_trace() {
        let (node, sender, _console) = joined_member(5001, 512, 1023, info(BOOT_PORT, 0), info(BOOT_PORT, 0));
        let joiner = info(5003, 100);

        let outcome = node
            .handle_register(joiner.clone(), Trace::starting_at(key(100)))
            .await
            .unwrap();
        assert_eq!(RouteOutcome::Forwarded(key(0)), outcome);
        assert_eq!(
            vec![(
                boot_address(),
                Message::Register {
                    joiner,
                    trace: Trace::starting_at(key(100)).extended(key(512)),
                }
            )],
            sender.take_sent()
        );
    }

    #[tokio::test]
    async fn bootstrap_range_can_cross_the_seam() {
        let seed_entries = vec![(key(50), "low".to_string()), (key(150), "mid".to_string())];
        let (boot, sender, mut console) = node(info(BOOT_PORT, 300), NodeRole::Bootstrap { seed_entries });
        assert_eq!(Some(KeyRange::new(key(300), key(299))), boot.store.owned_range());

        boot.lookup(key(50)).await.unwrap();
        assert_eq!(
            "\tChecked Name Server 300\nSuccess! Found \"low\" on Name Server 300",
            next_console_line(&mut console).await
        );

        boot.handle_register(info(5001, 100), Trace::starting_at(key(100)))
            .await
            .unwrap();
        assert_eq!(Some(KeyRange::new(key(300), key(99))), boot.store.owned_range());
        assert_eq!(
            (
                info(5001, 100).address,
                Message::Transfer {
                    end: key(299),
                    entries: vec![(key(150), "mid".into())],
                }
            ),
            sender.take_sent()[0]
        );
        assert_eq!(Some("low".to_string()), boot.store.get(key(50)));
    }

    #[tokio::test]
    async fn duplicate_join_is_dropped() {
        let (boot, sender, _console) = bootstrap(vec![]);

        let outcome = boot
            .handle_register(info(5009, 0), Trace::starting_at(key(0)))
            .await
            .unwrap();
        assert_eq!(RouteOutcome::Dropped, outcome);
        assert!(sender.take_sent().is_empty());
        assert_eq!(Some(KeyRange::full_ring_from(key(0))), boot.store.owned_range());
    }

    #[tokio::test]
    async fn unreachable_joiner_leaves_range_untouched() {
        let (boot, sender, _console) = bootstrap(vec![(100, "low"), (700, "high")]);
        let joiner = info(5001, 512);
        sender.mark_unreachable(joiner.address.clone());

        let result = boot.handle_register(joiner, Trace::starting_at(key(512))).await;
        assert!(matches!(result, Err(SendError::ConnectRetriesExhausted { .. })));

        let status = boot.status();
        assert_eq!(Some(KeyRange::full_ring_from(key(0))), status.range);
        assert_eq!(
            vec![(key(100), "low".to_string()), (key(700), "high".to_string())],
            status.entries
        );
        assert_eq!(info(BOOT_PORT, 0), status.successor);
        assert_eq!(info(BOOT_PORT, 0), status.predecessor);
        assert!(sender.take_sent().is_empty());
    }

    #[tokio::test]
    async fn join_rewires_locally_when_old_successor_is_unreachable() {
        let (node, sender, _console) = joined_member(5001, 512, 767, info(BOOT_PORT, 0), info(5002, 768));
        sender.mark_unreachable(info(5002, 768).address);
        let joiner = info(5003, 600);

        let result = node.handle_register(joiner.clone(), Trace::starting_at(key(600))).await;
        assert!(result.is_err());

        // The joiner owns [600, 767] now and we point at it, so no key is left without an owner.
        assert_eq!(Some(KeyRange::new(key(512), key(599))), node.store.owned_range());
        assert_eq!(joiner, node.successor.get());
        assert_eq!(info(BOOT_PORT, 0), node.predecessor.get());

        // The joiner still got its range and both of its neighbors.
        let sent = sender.take_sent();
        assert_eq!(
            vec![
                (
                    joiner.address.clone(),
                    Message::Transfer {
                        end: key(767),
                        entries: vec![],
                    }
                ),
                (joiner.address.clone(), Message::SetNext(info(5002, 768))),
                (joiner.address.clone(), Message::SetPrev(info(5001, 512))),
            ],
            sent
        );
    }

    #[tokio::test]
    async fn requests_outside_range_are_forwarded_to_successor() {
        let (node, sender, _console) = joined_member(5001, 512, 1023, info(BOOT_PORT, 0), info(BOOT_PORT, 0));

        let outcome = node.handle_lookup(key(3), Trace::starting_at(key(768))).await.unwrap();
        assert_eq!(RouteOutcome::Forwarded(key(0)), outcome);

        node.handle_insert(key(4), "four".into(), Trace::starting_at(key(768)))
            .await
            .unwrap();
        node.handle_delete(key(5), Trace::starting_at(key(768))).await.unwrap();

        let trace = Trace::starting_at(key(768)).extended(key(512));
        assert_eq!(
            vec![
                (
                    boot_address(),
                    Message::Lookup {
                        key: key(3),
                        trace: trace.clone()
                    }
                ),
                (
                    boot_address(),
                    Message::Insert {
                        key: key(4),
                        value: "four".into(),
                        trace: trace.clone()
                    }
                ),
                (boot_address(), Message::Delete { key: key(5), trace }),
            ],
            sender.take_sent()
        );
    }

    #[tokio::test]
    async fn owner_reports_to_bootstrap_with_full_trace() {
        let (node, sender, _console) = joined_member(5001, 512, 1023, info(BOOT_PORT, 0), info(BOOT_PORT, 0));
        node.store.put(key(600), "six-hundred".into());

        node.handle_lookup(key(600), Trace::starting_at(key(0))).await.unwrap();

        assert_eq!(
            vec![(
                boot_address(),
                Message::Print {
                    text: "\tChecked Name Server 0\n\
                           \tContacted Name Server 512\n\
                           Success! Found \"six-hundred\" on Name Server 512"
                        .into()
                }
            )],
            sender.take_sent()
        );
    }

    #[tokio::test]
    async fn exit_reaching_predecessor_pulls_data_and_unlinks() {
        let (boot, sender, _console) = bootstrap(vec![]);
        boot.handle_set_next(info(5001, 512));

        assert_eq!(RouteOutcome::Handled, boot.handle_exit(key(512)).await.unwrap());
        assert_eq!(
            vec![
                (
                    info(5001, 512).address,
                    Message::TransferRequest {
                        destination: boot_address()
                    }
                ),
                (info(5001, 512).address, Message::RemoveSelf),
            ],
            sender.take_sent()
        );
    }

    #[tokio::test]
    async fn exit_for_someone_else_is_forwarded() {
        let (boot, sender, _console) = bootstrap(vec![]);
        boot.handle_set_next(info(5001, 256));

        assert_eq!(RouteOutcome::Forwarded(key(256)), boot.handle_exit(key(512)).await.unwrap());
        assert_eq!(
            vec![(info(5001, 256).address, Message::Exit { id: key(512) })],
            sender.take_sent()
        );
    }

    #[tokio::test]
    async fn exit_on_single_node_ring_is_dropped() {
        let (boot, sender, _console) = bootstrap(vec![]);

        assert_eq!(RouteOutcome::Dropped, boot.handle_exit(key(512)).await.unwrap());
        assert!(sender.take_sent().is_empty());
    }

    #[tokio::test]
    async fn remove_self_links_neighbors_together() {
        let (node, sender, _console) = joined_member(5001, 512, 767, info(BOOT_PORT, 0), info(5002, 768));

        node.handle_remove_self().await.unwrap();
        assert_eq!(
            vec![
                (boot_address(), Message::SetNext(info(5002, 768))),
                (info(5002, 768).address, Message::SetPrev(info(BOOT_PORT, 0))),
            ],
            sender.take_sent()
        );
    }

    #[tokio::test]
    async fn transfer_request_hands_whole_range_to_predecessor() {
        let (node, sender, _console) = joined_member(5001, 512, 1023, info(BOOT_PORT, 0), info(BOOT_PORT, 0));
        node.store.put(key(513), "a".into());
        node.store.put(key(1000), "b".into());

        node.handle_transfer_request(boot_address()).await.unwrap();
        assert_eq!(
            vec![(
                boot_address(),
                Message::Transfer {
                    end: key(1023),
                    entries: vec![(key(513), "a".into()), (key(1000), "b".into())],
                }
            )],
            sender.take_sent()
        );
        assert_eq!(None, node.store.owned_range());

        // A second request finds nothing to hand off.
        assert_eq!(
            RouteOutcome::Dropped,
            node.handle_transfer_request(boot_address()).await.unwrap()
        );
    }

    #[tokio::test]
    async fn unreachable_predecessor_keeps_range_with_leaver() {
        let (node, sender, _console) = joined_member(5001, 512, 1023, info(BOOT_PORT, 0), info(BOOT_PORT, 0));
        node.store.put(key(513), "a".into());
        sender.mark_unreachable(boot_address());

        assert!(node.handle_transfer_request(boot_address()).await.is_err());
        assert_eq!(Some(KeyRange::new(key(512), key(1023))), node.store.owned_range());
        assert_eq!(vec![(key(513), "a".to_string())], node.store.entries());
        assert!(node.store.is_in_range(key(1000)));
    }

    #[tokio::test]
    async fn predecessor_absorbs_leaving_range() {
        let (boot, _sender, _console) = bootstrap(vec![]);
        boot.store.split_off(key(512)).unwrap();

        boot.handle_transfer(key(1023), vec![(key(900), "kept".into())]);
        assert_eq!(Some(KeyRange::full_ring_from(key(0))), boot.store.owned_range());
        assert_eq!(Some("kept".to_string()), boot.store.get(key(900)));
        assert_eq!(NodeLifecycle::Active, boot.lifecycle.current());
    }

    #[tokio::test]
    async fn enter_and_leave_walk_the_lifecycle() {
        let (node, sender, _console) = member(5001, 512);

        node.enter().await.unwrap();
        assert_eq!(NodeLifecycle::Registering, node.lifecycle.current());
        assert!(matches!(node.enter().await, Err(OperatorCommandError::AlreadyInSystem)));
        assert_eq!(
            vec![(
                boot_address(),
                Message::Register {
                    joiner: info(5001, 512),
                    trace: Trace::starting_at(key(512)),
                }
            )],
            sender.take_sent()
        );

        node.handle_transfer(key(1023), vec![]);
        assert_eq!(NodeLifecycle::Active, node.lifecycle.current());
        node.handle_set_prev(info(BOOT_PORT, 0));

        let notice = node.leave().await.unwrap();
        assert_eq!(
            LeaveNotice {
                id: key(512),
                range: Some(KeyRange::new(key(512), key(1023))),
                predecessor: key(0),
            },
            notice
        );
        assert_eq!(vec![(boot_address(), Message::Exit { id: key(512) })], sender.take_sent());
        assert_eq!(NodeLifecycle::Exiting, node.lifecycle.current());

        assert!(matches!(node.leave().await, Err(OperatorCommandError::AlreadyLeft)));
        assert!(matches!(node.enter().await, Err(OperatorCommandError::AlreadyLeft)));
    }

    #[tokio::test]
    async fn failed_enter_can_be_retried() {
        let (node, sender, _console) = member(5001, 512);
        sender.mark_unreachable(boot_address());

        assert!(matches!(node.enter().await, Err(OperatorCommandError::Send(_))));
        assert_eq!(NodeLifecycle::Unregistered, node.lifecycle.current());
    }

    #[tokio::test]
    async fn leave_waits_for_join_to_complete() {
        let (node, sender, _console) = member(5001, 512);
        node.enter().await.unwrap();
        sender.take_sent();

        // Registering: the join may still be dropped as a duplicate, so no exit goes out.
        assert!(matches!(node.leave().await, Err(OperatorCommandError::NotInSystem)));
        assert_eq!(NodeLifecycle::Registering, node.lifecycle.current());
        assert!(sender.take_sent().is_empty());
    }

    #[tokio::test]
    async fn failed_leave_stays_active() {
        let (node, sender, _console) = joined_member(5001, 512, 1023, info(BOOT_PORT, 0), info(BOOT_PORT, 0));
        sender.mark_unreachable(boot_address());

        assert!(matches!(node.leave().await, Err(OperatorCommandError::Send(_))));
        assert_eq!(NodeLifecycle::Active, node.lifecycle.current());
    }

    #[tokio::test]
    async fn leave_requires_membership() {
        let (node, _sender, _console) = member(5001, 512);
        assert!(matches!(node.leave().await, Err(OperatorCommandError::NotInSystem)));

        let (boot, _sender, _console) = bootstrap(vec![]);
        assert!(matches!(boot.leave().await, Err(OperatorCommandError::BootstrapCannotLeave)));
    }

    #[tokio::test]
    async fn unjoined_member_drops_instead_of_looping() {
        let (node, sender, _console) = member(5001, 512);

        assert_eq!(
            RouteOutcome::Dropped,
            node.handle_lookup(key(1), Trace::starting_at(key(0))).await.unwrap()
        );
        assert!(sender.take_sent().is_empty());
    }
}
