use std::fmt;
use std::sync::Mutex;
use tokio::sync::watch;

/// NodeLifecycle tracks a node's membership from its own point of view. `Removed` is never stored;
/// it is reached by the process ending.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeLifecycle {
    Unregistered,
    /// `register` was sent. The reply arrives asynchronously as a `transfer` + `print`.
    Registering,
    Active,
    /// `exit` was sent. The node keeps serving until its range has been handed off.
    Exiting,
}

impl NodeLifecycle {
    /// Registered in the operator's sense: `enter` was issued and `exit` was not.
    pub fn is_in_system(&self) -> bool {
        matches!(self, NodeLifecycle::Registering | NodeLifecycle::Active)
    }
}

impl fmt::Display for NodeLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeLifecycle::Unregistered => "unregistered",
            NodeLifecycle::Registering => "registering",
            NodeLifecycle::Active => "active",
            NodeLifecycle::Exiting => "exiting",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("cannot move from {from} to {to}")]
pub(crate) struct IllegalTransition {
    pub(crate) from: NodeLifecycle,
    pub(crate) to: NodeLifecycle,
}

pub(crate) fn new(initial: NodeLifecycle) -> (LifecycleState, LifecycleListener) {
    let (snd, rcv) = watch::channel(initial);

    (
        LifecycleState {
            current: Mutex::new(initial),
            snd,
        },
        LifecycleListener { rcv },
    )
}

/// LifecycleState owns the current state and publishes every transition.
pub(crate) struct LifecycleState {
    current: Mutex<NodeLifecycle>,
    snd: watch::Sender<NodeLifecycle>,
}

impl LifecycleState {
    pub(crate) fn current(&self) -> NodeLifecycle {
        *self.current.lock().expect("LifecycleState mutex guard poison")
    }

    /// Moves to `to` iff the current state is one of `allowed_from`. Returns the state we left.
    pub(crate) fn transition(
        &self,
        allowed_from: &[NodeLifecycle],
        to: NodeLifecycle,
    ) -> Result<NodeLifecycle, IllegalTransition> {
        let mut current = self.current.lock().expect("LifecycleState mutex guard poison");
        let from = *current;
        if !allowed_from.contains(&from) {
            return Err(IllegalTransition { from, to });
        }

        *current = to;
        let _ = self.snd.send(to);
        Ok(from)
    }
}

/// LifecycleListener observes lifecycle changes. Like any watch, intermediate states may be
/// skipped when several transitions happen between two reads.
#[derive(Clone)]
pub struct LifecycleListener {
    rcv: watch::Receiver<NodeLifecycle>,
}

impl LifecycleListener {
    pub fn current(&self) -> NodeLifecycle {
        *self.rcv.borrow()
    }

    pub async fn next(&mut self) -> Option<NodeLifecycle> {
        match self.rcv.changed().await {
            Ok(_) => Some(*self.rcv.borrow()),
            Err(_) => None,
        }
    }

    /// Waits until the lifecycle reaches `target`. Returns false if the node went away first.
    pub async fn wait_for(&mut self, target: NodeLifecycle) -> bool {
        if self.current() == target {
            return true;
        }

        while let Some(state) = self.next().await {
            if state == target {
                return true;
            }
        }

        false
    }
}
