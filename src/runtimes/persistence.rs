//! Serialized checkpoint form for storage backends.
//!
//! Backends that persist checkpoints as JSON (files, databases) go through
//! [`PersistedCheckpoint`] rather than serializing [`Checkpoint`] directly:
//! the persisted form pins the wire representation (string node ids, RFC
//! 3339 timestamps) so in-memory refactors cannot silently change stored
//! data.

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interrupt::InterruptPayload;
use crate::state::WorkflowState;
use crate::types::NodeId;

use super::checkpointer::Checkpoint;

#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("unknown node id in stored checkpoint: {raw:?}")]
    #[diagnostic(
        code(selvage::persistence::unknown_node_id),
        help("the checkpoint was written by an incompatible version")
    )]
    UnknownNodeId { raw: String },

    #[error("checkpoint serialization failed")]
    #[diagnostic(code(selvage::persistence::serde))]
    Serde(#[from] serde_json::Error),
}

/// Wire form of a [`Checkpoint`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedCheckpoint {
    pub thread_id: String,
    pub step: u64,
    pub state: WorkflowState,
    pub next: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_interrupt: Option<InterruptPayload>,
    pub created_at: DateTime<Utc>,
}

impl PersistedCheckpoint {
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl From<Checkpoint> for PersistedCheckpoint {
    fn from(cp: Checkpoint) -> Self {
        Self {
            thread_id: cp.thread_id,
            step: cp.step,
            state: cp.state,
            next: cp.next.encode().to_string(),
            pending_interrupt: cp.pending_interrupt,
            created_at: cp.created_at,
        }
    }
}

impl TryFrom<PersistedCheckpoint> for Checkpoint {
    type Error = PersistenceError;

    fn try_from(persisted: PersistedCheckpoint) -> Result<Self, Self::Error> {
        let next = NodeId::decode(&persisted.next)
            .ok_or(PersistenceError::UnknownNodeId {
                raw: persisted.next,
            })?;
        Ok(Checkpoint {
            thread_id: persisted.thread_id,
            step: persisted.step,
            state: persisted.state,
            next,
            pending_interrupt: persisted.pending_interrupt,
            created_at: persisted.created_at,
        })
    }
}
