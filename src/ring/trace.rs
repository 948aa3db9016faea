use crate::ring::key_range::{KeyError, NodeId};
use std::fmt;
use std::str::FromStr;

/// Trace is the ordered list of node ids a request has passed through. It only feeds the
/// human-readable report at the end of a request; routing never looks at it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Trace(Vec<NodeId>);

impl Trace {
    pub fn new() -> Self {
        Trace(Vec::new())
    }

    pub fn starting_at(id: NodeId) -> Self {
        Trace(vec![id])
    }

    /// Returns this trace with `id` appended. Every node handling a request extends the trace
    /// before it either answers or forwards.
    pub fn extended(mut self, id: NodeId) -> Self {
        self.0.push(id);
        self
    }

    pub fn hops(&self) -> &[NodeId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the provenance report. The first id is the node that was checked first; every
    /// later id is a node that got contacted on the way. With `include_first` unset, only the
    /// contacted nodes are listed (used for the join welcome, where the first id is the joiner).
    pub fn report(&self, include_first: bool) -> String {
        let mut report = String::new();

        if let Some((first, rest)) = self.0.split_first() {
            if include_first {
                report.push_str(&format!("\tChecked Name Server {}\n", first));
            }
            for id in rest {
                report.push_str(&format!("\tContacted Name Server {}\n", id));
            }
        }

        report
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.0.iter().map(|id| id.to_string()).collect();
        write!(f, "{}", ids.join(","))
    }
}

impl fmt::Debug for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trace({})", self)
    }
}

impl FromStr for Trace {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Trace::new());
        }

        s.split(',')
            .map(|id| id.parse::<NodeId>())
            .collect::<Result<Vec<_>, _>>()
            .map(Trace)
    }
}
