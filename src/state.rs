//! Workflow state and snapshots.
//!
//! [`WorkflowState`] is the single mutable record a run operates on. Nodes
//! never touch it directly: they receive an immutable [`StateSnapshot`] and
//! return patches that the executor applies between steps, bumping the
//! history version whenever messages land.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::channels::{Channel, HistoryChannel};
use crate::control::StatePatch;
use crate::message::{Message, OperationCall};
use crate::retry::OperationFailure;

/// The complete mutable state of one workflow thread.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Versioned conversation history.
    pub history: HistoryChannel,
    /// When set, protected operations run without human review.
    pub auto_approve: bool,
    /// Operation names that require review before execution.
    pub protected_operations: FxHashSet<String>,
    /// Failed calls of the current pending operation.
    pub attempts: u32,
    /// Retries permitted per operation after the initial call.
    pub max_attempts: u32,
    /// Most recent classified failure, if the last call did not succeed.
    pub last_error: Option<OperationFailure>,
    /// Most recent successful operation result, kept for stale fallback.
    pub last_good: Option<Value>,
}

impl WorkflowState {
    /// Fresh state seeded with one user message.
    #[must_use]
    pub fn new_with_user_message(content: &str) -> Self {
        WorkflowStateBuilder::new().with_user_message(content).build()
    }

    #[must_use]
    pub fn builder() -> WorkflowStateBuilder {
        WorkflowStateBuilder::new()
    }

    /// Immutable view handed to nodes.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            history: self.history.snapshot(),
            history_version: self.history.version(),
            auto_approve: self.auto_approve,
            protected_operations: self.protected_operations.clone(),
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            last_error: self.last_error.clone(),
            last_good: self.last_good.clone(),
        }
    }

    /// Applies a patch atomically. The history version is bumped exactly
    /// once when messages were appended.
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(args) = patch.call_args {
            // The pending call is the op_call on the last message; an
            // answered proposal is no longer pending.
            let pending = self
                .history
                .get_mut()
                .last_mut()
                .and_then(|m| m.op_call.as_mut());
            match pending {
                Some(call) => {
                    call.args = args;
                    self.history.bump_version();
                }
                None => warn!("call_args patch with no pending operation call, ignoring"),
            }
        }
        if let Some(messages) = patch.messages {
            if !messages.is_empty() {
                self.history.extend(messages);
                self.history.bump_version();
            }
        }
        if let Some(attempts) = patch.attempts {
            self.attempts = attempts;
        }
        if let Some(failure) = patch.last_error {
            self.last_error = Some(failure);
        }
        if patch.clear_last_error {
            self.last_error = None;
        }
        if let Some(value) = patch.last_good {
            self.last_good = Some(value);
        }
    }
}

/// Read-only view of [`WorkflowState`] at the start of a node run.
#[derive(Clone, Debug, PartialEq)]
pub struct StateSnapshot {
    pub history: Vec<Message>,
    pub history_version: u32,
    pub auto_approve: bool,
    pub protected_operations: FxHashSet<String>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_error: Option<OperationFailure>,
    pub last_good: Option<Value>,
}

impl StateSnapshot {
    /// The operation call awaiting execution, if any. A call is pending only
    /// while its proposal is the last message in history; once a tool record
    /// answers it, it no longer is.
    #[must_use]
    pub fn pending_call(&self) -> Option<&OperationCall> {
        self.history.last().and_then(|m| m.op_call.as_ref())
    }

    /// The first user message of the thread, for review context.
    #[must_use]
    pub fn original_request(&self) -> Option<&str> {
        self.history
            .iter()
            .find(|m| m.has_role(Message::USER))
            .map(|m| m.content.as_str())
    }

    #[must_use]
    pub fn is_protected(&self, name: &str) -> bool {
        self.protected_operations.contains(name)
    }
}

/// Builder for seeding a thread's initial state.
#[derive(Debug, Default)]
pub struct WorkflowStateBuilder {
    messages: Vec<Message>,
    auto_approve: bool,
    protected_operations: FxHashSet<String>,
    max_attempts: u32,
}

impl WorkflowStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_user_message(mut self, content: &str) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    #[must_use]
    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    #[must_use]
    pub fn with_protected_operation(mut self, name: &str) -> Self {
        self.protected_operations.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn build(self) -> WorkflowState {
        let version = u32::from(!self.messages.is_empty());
        WorkflowState {
            history: HistoryChannel::new(self.messages, version),
            auto_approve: self.auto_approve,
            protected_operations: self.protected_operations,
            attempts: 0,
            max_attempts: self.max_attempts,
            last_error: None,
            last_good: None,
        }
    }
}
