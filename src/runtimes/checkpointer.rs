//! Checkpoint storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::interrupt::InterruptPayload;
use crate::state::WorkflowState;
use crate::types::NodeId;

/// Durable record of a thread between steps.
///
/// Saved after every applied patch and before any event about the step is
/// emitted, so a crashed process can always resume from the latest one
/// without replaying side effects.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    pub thread_id: String,
    /// Steps executed so far in this run segment.
    pub step: u64,
    pub state: WorkflowState,
    /// Where execution continues.
    pub next: NodeId,
    /// Set iff the thread is suspended awaiting a review decision.
    pub pending_interrupt: Option<InterruptPayload>,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    #[must_use]
    pub fn new(
        thread_id: &str,
        step: u64,
        state: WorkflowState,
        next: NodeId,
        pending_interrupt: Option<InterruptPayload>,
    ) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            step,
            state,
            next,
            pending_interrupt,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.pending_interrupt.is_some()
    }
}

/// Storage backend failures.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    #[error("checkpoint store backend failed: {0}")]
    #[diagnostic(code(selvage::checkpointer::backend))]
    Backend(String),

    #[error("failed to encode or decode a checkpoint")]
    #[diagnostic(code(selvage::checkpointer::persistence))]
    Persistence(#[from] super::persistence::PersistenceError),
}

/// Persists and recalls per-thread checkpoints.
///
/// Implementations keep the latest checkpoint per thread at minimum; history
/// retention is up to the backend.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Saves `checkpoint` as the latest for its thread.
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError>;

    /// Latest checkpoint for `thread_id`, or `None` for an unknown thread.
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointerError>;

    /// Ids of all threads with at least one checkpoint.
    async fn list_threads(&self) -> Result<Vec<String>, CheckpointerError>;
}

/// Process-local checkpoint store keeping the latest checkpoint per thread.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    store: RwLock<FxHashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        self.store
            .write()
            .insert(checkpoint.thread_id.clone(), checkpoint);
        Ok(())
    }

    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointerError> {
        Ok(self.store.read().get(thread_id).cloned())
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointerError> {
        let mut threads: Vec<String> = self.store.read().keys().cloned().collect();
        threads.sort();
        Ok(threads)
    }
}
