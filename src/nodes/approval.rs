//! Human review node.
//!
//! Suspends the run when a protected operation is pending and, once a
//! decision arrives, translates it into routing. The match over
//! [`ReviewAction`] is exhaustive on purpose: a new action variant must be
//! handled here explicitly, and an unknown tag never falls through to
//! approval (it is already rejected at decision parse time).

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};

use crate::control::{Command, NodeOutcome, StatePatch};
use crate::interrupt::{Decision, Interrupt, InterruptPayload, ReviewAction};
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError};
use crate::state::StateSnapshot;
use crate::types::NodeId;

const REJECTION_NOTICE: &str = "The proposed operation was rejected by the reviewer. \
     Ask for clarification or suggest alternative approaches.";

#[derive(Debug, Default)]
pub struct ApprovalNode;

impl ApprovalNode {
    fn apply_decision(
        decision: Decision,
        payload: &InterruptPayload,
    ) -> Result<NodeOutcome, NodeError> {
        info!(action = %decision.action, "review decision received");
        match decision.action {
            ReviewAction::Continue => Ok(NodeOutcome::Command(Command::goto(NodeId::Tools))),
            ReviewAction::Update => {
                let raw = decision.data.ok_or_else(|| {
                    NodeError::Protocol("update decision requires replacement arguments".into())
                })?;
                let args: Value = serde_json::from_str(&raw).map_err(|e| {
                    NodeError::Protocol(format!("update arguments are not valid JSON: {e}"))
                })?;
                Ok(NodeOutcome::Command(
                    Command::goto(NodeId::Tools)
                        .with_patch(StatePatch::new().with_call_args(args)),
                ))
            }
            ReviewAction::Feedback => {
                let feedback = decision.data.ok_or_else(|| {
                    NodeError::Protocol("feedback decision requires feedback text".into())
                })?;
                let record = Message::tool_result(
                    &payload.call,
                    &format!("Reviewer feedback on the proposed operation: {feedback}"),
                );
                Ok(NodeOutcome::Command(
                    Command::goto(NodeId::Planner)
                        .with_patch(StatePatch::new().with_message(record)),
                ))
            }
            ReviewAction::Reject => {
                let record = Message::tool_result(&payload.call, REJECTION_NOTICE);
                Ok(NodeOutcome::Command(
                    Command::goto(NodeId::Planner)
                        .with_patch(StatePatch::new().with_message(record)),
                ))
            }
            ReviewAction::Exit => Ok(NodeOutcome::Exit(StatePatch::new())),
        }
    }
}

#[async_trait]
impl Node for ApprovalNode {
    #[instrument(skip_all, fields(thread = %ctx.thread, step = ctx.step))]
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: &mut NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let call = snapshot
            .pending_call()
            .ok_or_else(|| NodeError::Protocol("no pending operation call to review".into()))?;
        let payload =
            InterruptPayload::for_call(call, snapshot.original_request().unwrap_or_default());

        match ctx.interrupt(payload.clone()) {
            Interrupt::Pending(pending) => Ok(NodeOutcome::Suspend(pending)),
            Interrupt::Resumed(decision) => Self::apply_decision(decision, &payload),
        }
    }
}
