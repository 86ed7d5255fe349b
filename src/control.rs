//! Node outcomes: state patches, routing commands, and suspension.
//!
//! Nodes never mutate shared state directly. Each run returns a
//! [`NodeOutcome`] whose patch the executor applies atomically before
//! deciding where to go next. A [`Command`] both patches state and overrides
//! routing in one step, so the two can never be observed out of sync.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::interrupt::InterruptPayload;
use crate::message::Message;
use crate::retry::OperationFailure;
use crate::types::NodeId;

/// Declarative state update produced by a node.
///
/// Unset fields leave the corresponding state untouched. Messages are
/// appended to history, never replacing it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePatch {
    /// Messages to append to the conversation history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
    /// Replacement arguments for the pending operation call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_args: Option<Value>,
    /// New value for the failed-call counter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    /// Record the most recent classified failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<OperationFailure>,
    /// Clear any recorded failure (takes effect after `last_error`).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clear_last_error: bool,
    /// Record a successful result for later stale fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_good: Option<Value>,
}

impl StatePatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.get_or_insert_with(Vec::new).push(message);
        self
    }

    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages.get_or_insert_with(Vec::new).extend(messages);
        self
    }

    #[must_use]
    pub fn with_call_args(mut self, args: Value) -> Self {
        self.call_args = Some(args);
        self
    }

    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    #[must_use]
    pub fn with_last_error(mut self, failure: OperationFailure) -> Self {
        self.last_error = Some(failure);
        self
    }

    #[must_use]
    pub fn clearing_last_error(mut self) -> Self {
        self.clear_last_error = true;
        self
    }

    #[must_use]
    pub fn with_last_good(mut self, value: Value) -> Self {
        self.last_good = Some(value);
        self
    }

    /// True when applying the patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_none()
            && self.call_args.is_none()
            && self.attempts.is_none()
            && self.last_error.is_none()
            && !self.clear_last_error
            && self.last_good.is_none()
    }
}

/// A state patch paired with an explicit routing override.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    pub goto: NodeId,
    pub patch: StatePatch,
}

impl Command {
    #[must_use]
    pub fn goto(goto: NodeId) -> Self {
        Self {
            goto,
            patch: StatePatch::new(),
        }
    }

    #[must_use]
    pub fn with_patch(mut self, patch: StatePatch) -> Self {
        self.patch = patch;
        self
    }
}

/// What a node run produced.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeOutcome {
    /// Apply the patch and follow the node's configured edge or router.
    Advance(StatePatch),
    /// Apply the command's patch and jump to its target, skipping routing.
    Command(Command),
    /// Persist a checkpoint with this pending interrupt and stop until a
    /// decision arrives. No state change.
    Suspend(InterruptPayload),
    /// Apply the patch and end the run as an explicit exit.
    Exit(StatePatch),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_patch() {
        assert!(StatePatch::new().is_empty());
        assert!(!StatePatch::new().with_attempts(0).is_empty());
        assert!(!StatePatch::new().clearing_last_error().is_empty());
    }

    #[test]
    fn test_builder_accumulates_messages() {
        let patch = StatePatch::new()
            .with_message(Message::assistant("one"))
            .with_messages(vec![Message::assistant("two")]);
        assert_eq!(patch.messages.map(|m| m.len()), Some(2));
    }

    #[test]
    fn test_command_builder() {
        let cmd = Command::goto(NodeId::Tools)
            .with_patch(StatePatch::new().with_call_args(json!({"sql_query": "SELECT 1"})));
        assert_eq!(cmd.goto, NodeId::Tools);
        assert!(cmd.patch.call_args.is_some());
    }
}
