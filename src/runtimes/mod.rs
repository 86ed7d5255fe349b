//! Execution runtime: the step loop, checkpoints, and thread lifecycle.
//!
//! [`Runner`] drives a compiled [`Workflow`](crate::workflow::Workflow) one
//! thread at a time, persisting a [`Checkpoint`] through the configured
//! [`Checkpointer`] after every applied step. Suspended threads resume from
//! their latest checkpoint with the reviewer's decision delivered exactly
//! once.

mod checkpointer;
mod persistence;
mod runner;
mod runtime_config;

pub use checkpointer::{Checkpoint, Checkpointer, CheckpointerError, InMemoryCheckpointer};
pub use persistence::{PersistedCheckpoint, PersistenceError};
pub use runner::{RunOutcome, Runner, RunnerError};
pub use runtime_config::RuntimeConfig;
