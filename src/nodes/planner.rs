//! Planning node: produces the next assistant turn.

use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;
use tracing::instrument;

use crate::control::{NodeOutcome, StatePatch};
use crate::message::{Message, OperationCall};
use crate::node::{Node, NodeContext, NodeError};
use crate::state::StateSnapshot;

/// What the planner decided to do next.
#[derive(Clone, Debug, PartialEq)]
pub enum PlannerReply {
    /// A plain assistant message; the run will end if nothing else is pending.
    Message(String),
    /// An assistant message proposing an operation call.
    OpCall {
        content: String,
        call: OperationCall,
    },
}

/// Planner backend failure.
#[derive(Debug, Error, Diagnostic)]
#[error("planner backend '{provider}' failed: {message}")]
#[diagnostic(code(selvage::planner::backend))]
pub struct PlannerError {
    pub provider: String,
    pub message: String,
}

impl PlannerError {
    #[must_use]
    pub fn new(provider: &str, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

/// Produces the next assistant turn from the conversation so far.
///
/// Implementations wrap whatever backend plans the workflow: an LLM, a rules
/// engine, or a scripted sequence in tests.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(
        &self,
        system_prompt: &str,
        history: &[Message],
    ) -> Result<PlannerReply, PlannerError>;
}

/// Node wrapping a [`Planner`] backend.
pub struct PlannerNode {
    planner: Arc<dyn Planner>,
    system_prompt: String,
}

impl PlannerNode {
    #[must_use]
    pub fn new(planner: Arc<dyn Planner>, system_prompt: &str) -> Self {
        Self {
            planner,
            system_prompt: system_prompt.to_string(),
        }
    }
}

#[async_trait]
impl Node for PlannerNode {
    #[instrument(skip_all, fields(thread = %ctx.thread, step = ctx.step))]
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: &mut NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let reply = self
            .planner
            .plan(&self.system_prompt, &snapshot.history)
            .await
            .map_err(|e| NodeError::Provider {
                provider: e.provider,
                message: e.message,
            })?;

        let message = match reply {
            PlannerReply::Message(content) => Message::assistant(&content),
            PlannerReply::OpCall { content, call } => {
                Message::assistant_with_call(&content, call)
            }
        };
        ctx.emit_message(message.clone());
        Ok(NodeOutcome::Advance(StatePatch::new().with_message(message)))
    }
}

impl std::fmt::Debug for PlannerNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannerNode")
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}
