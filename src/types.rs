use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for nodes in the workflow graph.
///
/// The set of nodes is closed so routing targets can be validated at graph
/// construction time rather than discovered broken mid-run.
///
/// # Examples
///
/// ```
/// use selvage::types::NodeId;
///
/// assert_eq!(NodeId::decode("planner"), Some(NodeId::Planner));
/// assert_eq!(NodeId::Tools.encode(), "tools");
/// assert!(NodeId::End.is_terminal());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeId {
    /// Entry point of every run. Virtual: no user code executes here.
    Start,
    /// Produces the next assistant message, possibly proposing an operation.
    Planner,
    /// Suspends for human review of a protected operation.
    Approval,
    /// Executes the pending operation call with retry handling.
    Tools,
    /// Exit point. Virtual: reaching it completes the run.
    End,
}

impl NodeId {
    /// Stable string form used in checkpoints and logs.
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            NodeId::Start => "start",
            NodeId::Planner => "planner",
            NodeId::Approval => "approval",
            NodeId::Tools => "tools",
            NodeId::End => "end",
        }
    }

    /// Inverse of [`encode`](Self::encode). Returns `None` for unknown input.
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        match raw {
            "start" => Some(NodeId::Start),
            "planner" => Some(NodeId::Planner),
            "approval" => Some(NodeId::Approval),
            "tools" => Some(NodeId::Tools),
            "end" => Some(NodeId::End),
            _ => None,
        }
    }

    /// True for the virtual endpoints that never run user code.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeId::Start | NodeId::End)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode())
    }
}
