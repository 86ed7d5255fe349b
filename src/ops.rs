//! Operation trait and registry.
//!
//! Operations are the unreliable side of the workflow: database queries,
//! API calls, anything that can time out or fail outright. The executor
//! looks them up by name from a [`OperationRegistry`] and wraps every call
//! in the retry controller.

use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::retry::{self, FailureKind};

/// A completed call, classified. Nothing an operation does propagates past
/// this boundary as a raw error; the retry controller acts on the variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationResult {
    Success(Value),
    /// Failed in a way worth retrying (timeout, rate limit).
    Retryable(String),
    /// Failed in a way retrying cannot help.
    Fatal(String),
}

impl OperationResult {
    /// Classifies a raw call outcome by its failure reason.
    #[must_use]
    pub fn from_call(outcome: Result<Value, OperationError>) -> Self {
        match outcome {
            Ok(value) => OperationResult::Success(value),
            Err(err) => match retry::classify(&err.reason) {
                FailureKind::Transient => OperationResult::Retryable(err.reason),
                FailureKind::Fatal => OperationResult::Fatal(err.reason),
            },
        }
    }
}

/// A failed operation call, carrying the raw reason for classification.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
#[error("operation call failed: {reason}")]
#[diagnostic(
    code(selvage::ops::call_failed),
    help("the reason text decides whether the call is retried")
)]
pub struct OperationError {
    pub reason: String,
}

impl OperationError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// An invocable external operation.
///
/// Implementations should return `Err` with a descriptive reason on failure;
/// the retry controller classifies the reason text, so transient conditions
/// should mention "timeout", "rate", or "transient".
#[async_trait]
pub trait Operation: Send + Sync {
    async fn call(&self, args: &Value) -> Result<Value, OperationError>;
}

/// Name-indexed set of operations available to a workflow.
#[derive(Clone, Default)]
pub struct OperationRegistry {
    ops: FxHashMap<String, Arc<dyn Operation>>,
}

impl OperationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an operation under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, op: Arc<dyn Operation>) -> &mut Self {
        self.ops.insert(name.to_string(), op);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.ops.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl std::fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.ops.keys().collect();
        names.sort();
        f.debug_struct("OperationRegistry")
            .field("ops", &names)
            .finish()
    }
}
