//! The node abstraction.
//!
//! A node is one unit of workflow work: it reads an immutable snapshot,
//! does its job, and returns a [`NodeOutcome`] describing the state patch
//! and where control should go. Suspension is explicit: a node that needs
//! human input calls [`NodeContext::interrupt`] and returns
//! [`NodeOutcome::Suspend`] when no decision has been delivered yet.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::control::NodeOutcome;
use crate::event_bus::{EventBus, RunEventKind};
use crate::interrupt::{Decision, Interrupt, InterruptPayload};
use crate::message::Message;
use crate::state::StateSnapshot;
use crate::types::NodeId;

/// Errors a node run can surface.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// The review protocol was violated (missing data, malformed payload).
    #[error("review protocol violation: {0}")]
    #[diagnostic(
        code(selvage::node::protocol),
        help("resume the thread again with a well-formed decision")
    )]
    Protocol(String),

    /// The node needs state that is not present.
    #[error("missing input: {what}")]
    #[diagnostic(code(selvage::node::missing_input))]
    MissingInput { what: String },

    /// JSON handling failed inside the node.
    #[error("serialization error")]
    #[diagnostic(code(selvage::node::serde))]
    Serde(#[from] serde_json::Error),

    /// An external provider (planner backend) failed.
    #[error("provider {provider} failed: {message}")]
    #[diagnostic(code(selvage::node::provider))]
    Provider { provider: String, message: String },
}

/// Per-run context handed to a node.
pub struct NodeContext {
    /// Thread this run belongs to.
    pub thread: String,
    /// Which node is running.
    pub node: NodeId,
    /// Executor step counter at the time of the run.
    pub step: u64,
    resume: Option<Decision>,
    events: EventBus,
}

impl NodeContext {
    #[must_use]
    pub fn new(
        thread: String,
        node: NodeId,
        step: u64,
        resume: Option<Decision>,
        events: EventBus,
    ) -> Self {
        Self {
            thread,
            node,
            step,
            resume,
            events,
        }
    }

    /// Asks for human input.
    ///
    /// If a decision was delivered for this suspension it is consumed and
    /// returned; asking twice in one run yields [`Interrupt::Pending`] again,
    /// so each delivered decision answers exactly one interrupt.
    pub fn interrupt(&mut self, payload: InterruptPayload) -> Interrupt {
        match self.resume.take() {
            Some(decision) => Interrupt::Resumed(decision),
            None => Interrupt::Pending(payload),
        }
    }

    /// Emits a progress message on the event stream.
    pub fn emit_message(&self, message: Message) {
        self.events.emit(
            &self.thread,
            self.step,
            RunEventKind::NodeMessage {
                node: self.node,
                message,
            },
        );
    }
}

impl std::fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContext")
            .field("thread", &self.thread)
            .field("node", &self.node)
            .field("step", &self.step)
            .field("has_resume", &self.resume.is_some())
            .finish()
    }
}

/// One unit of workflow work.
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: &mut NodeContext,
    ) -> Result<NodeOutcome, NodeError>;
}
