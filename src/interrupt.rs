//! Interrupt payloads and the human review protocol.
//!
//! When a workflow proposes a protected operation, the run suspends and
//! surfaces an [`InterruptPayload`] describing exactly what awaits approval.
//! The human answers with a [`Decision`], parsed strictly: an unrecognized
//! action tag is an error, never a silent approval.

use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::message::OperationCall;

/// Structured summary of the operation awaiting review, built from the call
/// arguments so the reviewer sees what will actually run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryInfo {
    /// What kind of operation this is (currently the operation name).
    pub kind: String,
    /// Planner-provided description of intent, if any.
    pub description: String,
    /// The concrete query or argument text to be executed.
    pub query: String,
}

/// Everything a reviewer needs to decide on a suspended operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterruptPayload {
    /// Prompt shown to the reviewer.
    pub message: String,
    /// The full proposed call, args included.
    pub call: OperationCall,
    /// Human-oriented digest of the call.
    pub query: QueryInfo,
    /// The first user message of the thread, for context.
    pub original_request: String,
}

impl InterruptPayload {
    /// Builds the review payload for a pending call.
    ///
    /// The digest pulls `description` and `sql_query` out of the call
    /// arguments when present, falling back to the call's own description and
    /// the raw argument JSON.
    #[must_use]
    pub fn for_call(call: &OperationCall, original_request: &str) -> Self {
        let description = call
            .args
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| call.description.clone())
            .unwrap_or_default();
        let query = call
            .args
            .get("sql_query")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| call.args.to_string());

        Self {
            message: format!(
                "The workflow wants to run the protected operation '{}'. Approve, edit, or reject it.",
                call.name
            ),
            call: call.clone(),
            query: QueryInfo {
                kind: call.name.clone(),
                description,
                query,
            },
            original_request: original_request.to_string(),
        }
    }
}

/// The closed set of review actions a human can take on a pending operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    /// Run the operation as proposed.
    Continue,
    /// Run the operation with replacement arguments.
    Update,
    /// Do not run it; route the supplied feedback back to planning.
    Feedback,
    /// Do not run it; record a canned rejection and replan.
    Reject,
    /// Stop the workflow entirely.
    Exit,
}

impl ReviewAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewAction::Continue => "continue",
            ReviewAction::Update => "update",
            ReviewAction::Feedback => "feedback",
            ReviewAction::Reject => "reject",
            ReviewAction::Exit => "exit",
        }
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while parsing a reviewer decision.
#[derive(Debug, Error, Diagnostic)]
pub enum DecisionParseError {
    /// The action tag is not one of the known review actions.
    #[error("unknown review action: {tag:?}")]
    #[diagnostic(
        code(selvage::interrupt::unknown_action),
        help("valid actions: continue (or c), update, feedback, reject, exit")
    )]
    UnknownAction { tag: String },

    /// The decision text was not valid JSON of the expected shape.
    #[error("malformed decision payload")]
    #[diagnostic(code(selvage::interrupt::malformed_decision))]
    Json(#[from] serde_json::Error),
}

impl FromStr for ReviewAction {
    type Err = DecisionParseError;

    /// Accepts the canonical tags plus the `c` shorthand for `continue`,
    /// case-insensitively. Anything else is rejected.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "continue" | "c" => Ok(ReviewAction::Continue),
            "update" => Ok(ReviewAction::Update),
            "feedback" => Ok(ReviewAction::Feedback),
            "reject" => Ok(ReviewAction::Reject),
            "exit" => Ok(ReviewAction::Exit),
            other => Err(DecisionParseError::UnknownAction {
                tag: other.to_string(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for ReviewAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// A reviewer's answer to a pending interrupt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: ReviewAction,
    /// Replacement arguments (`update`) or feedback text (`feedback`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Decision {
    #[must_use]
    pub fn new(action: ReviewAction) -> Self {
        Self { action, data: None }
    }

    #[must_use]
    pub fn with_data(action: ReviewAction, data: &str) -> Self {
        Self {
            action,
            data: Some(data.to_string()),
        }
    }

    /// Parses a decision from JSON text, rejecting unknown action tags.
    pub fn parse(raw: &str) -> Result<Self, DecisionParseError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// What a node sees when it asks for human input.
#[derive(Clone, Debug, PartialEq)]
pub enum Interrupt {
    /// A decision was already delivered for this suspension; proceed with it.
    Resumed(Decision),
    /// No decision yet: the run must suspend with this payload.
    Pending(InterruptPayload),
}
