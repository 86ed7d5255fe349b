//! Operation execution node.
//!
//! Runs the pending operation call through the retry controller: transient
//! failures back off and retry, fatal failures and exhausted retries fall
//! through to a repaired stand-in result. The node always produces a tool
//! record for the pending call; a flaky dependency degrades the answer, it
//! never kills the run.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::control::{NodeOutcome, StatePatch};
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError};
use crate::ops::{OperationRegistry, OperationResult};
use crate::retry::{self, FailureKind, OperationFailure, RetryDecision, RetryPolicy};
use crate::state::StateSnapshot;

pub struct ToolsNode {
    registry: OperationRegistry,
    policy: RetryPolicy,
}

impl ToolsNode {
    #[must_use]
    pub fn new(registry: OperationRegistry) -> Self {
        Self {
            registry,
            policy: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl Node for ToolsNode {
    #[instrument(skip_all, fields(thread = %ctx.thread, step = ctx.step))]
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: &mut NodeContext,
    ) -> Result<NodeOutcome, NodeError> {
        let Some(call) = snapshot.pending_call() else {
            // Nothing to execute; routing sent us here spuriously.
            return Ok(NodeOutcome::Advance(StatePatch::new()));
        };
        let op = self
            .registry
            .get(&call.name)
            .ok_or_else(|| NodeError::MissingInput {
                what: format!("operation '{}' in registry", call.name),
            })?;
        let policy = RetryPolicy {
            max_attempts: snapshot.max_attempts,
            base_delay: self.policy.base_delay,
        };

        // Failed calls of the current pending operation. The loop never
        // suspends, so the counter lives here; state keeps the final value.
        let mut attempts: u32 = 0;
        loop {
            let result = OperationResult::from_call(op.call(&call.args).await);
            let (kind, reason) = match result {
                OperationResult::Success(value) => {
                    info!(operation = %call.name, attempts, "operation succeeded");
                    let record = Message::tool_result(call, &value.to_string());
                    return Ok(NodeOutcome::Advance(
                        StatePatch::new()
                            .with_message(record)
                            .with_attempts(0)
                            .clearing_last_error()
                            .with_last_good(value),
                    ));
                }
                OperationResult::Retryable(reason) => (FailureKind::Transient, reason),
                OperationResult::Fatal(reason) => (FailureKind::Fatal, reason),
            };

            attempts += 1;
            warn!(
                operation = %call.name,
                attempts,
                ?kind,
                %reason,
                "operation call failed"
            );
            match retry::decide(kind, attempts, &policy) {
                RetryDecision::Retry { delay } => {
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    let repaired = retry::repair(snapshot.last_good.as_ref(), &reason);
                    let record = Message::tool_result(call, &repaired.to_string());
                    return Ok(NodeOutcome::Advance(
                        StatePatch::new()
                            .with_message(record)
                            .with_attempts(attempts)
                            .with_last_error(OperationFailure::new(kind, reason)),
                    ));
                }
            }
        }
    }
}

impl std::fmt::Debug for ToolsNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsNode")
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .finish()
    }
}
