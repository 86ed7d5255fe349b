//! The step loop.

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::control::NodeOutcome;
use crate::event_bus::{EventBus, RunEvent, RunEventKind, TerminalReason};
use crate::interrupt::{Decision, InterruptPayload};
use crate::node::{NodeContext, NodeError};
use crate::state::WorkflowState;
use crate::types::NodeId;
use crate::workflow::Workflow;

use super::checkpointer::{Checkpoint, Checkpointer, CheckpointerError};
use super::runtime_config::RuntimeConfig;

/// How a run segment ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    /// Routing reached the exit point.
    Completed(WorkflowState),
    /// A node requested an explicit stop.
    Exited(WorkflowState),
    /// The thread suspended awaiting a review decision.
    Interrupted(InterruptPayload),
}

#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    #[error("unknown thread: {thread_id}")]
    #[diagnostic(code(selvage::runner::thread_not_found))]
    ThreadNotFound { thread_id: String },

    #[error("thread {thread_id} has no pending interrupt to resume")]
    #[diagnostic(
        code(selvage::runner::no_pending_interrupt),
        help("each suspension accepts exactly one decision; this one was already consumed")
    )]
    NoPendingInterrupt { thread_id: String },

    #[error("thread {thread_id} is suspended awaiting a review decision")]
    #[diagnostic(
        code(selvage::runner::interrupt_pending),
        help("answer the pending interrupt with resume() instead of starting the thread")
    )]
    InterruptPending { thread_id: String },

    #[error("step limit of {limit} node executions exceeded")]
    #[diagnostic(
        code(selvage::runner::step_limit),
        help("a routing cycle is the usual cause; raise RuntimeConfig::step_limit only if the workflow is legitimately long")
    )]
    StepLimitExceeded { limit: u64 },

    #[error("node {from} routed to unknown target {to}")]
    #[diagnostic(code(selvage::runner::unknown_route_target))]
    UnknownRouteTarget { from: NodeId, to: NodeId },

    #[error("node {node} has no successor at runtime")]
    #[diagnostic(code(selvage::runner::missing_successor))]
    MissingSuccessor { node: NodeId },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Checkpointer(#[from] CheckpointerError),
}

/// Drives workflow threads: starts them, suspends them on interrupts, and
/// resumes them with review decisions. One runner serves many threads; each
/// thread's lifecycle is serialized through its checkpoints.
pub struct Runner {
    workflow: Arc<Workflow>,
    checkpointer: Arc<dyn Checkpointer>,
    events: EventBus,
}

impl Runner {
    #[must_use]
    pub fn new(workflow: Arc<Workflow>, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            workflow,
            checkpointer,
            events: EventBus::with_tracing(),
        }
    }

    #[must_use]
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Attaches a subscriber to the run event stream.
    #[must_use]
    pub fn subscribe(&self) -> flume::Receiver<RunEvent> {
        self.events.subscribe()
    }

    /// Threads known to the checkpoint store.
    pub async fn list_threads(&self) -> Result<Vec<String>, RunnerError> {
        Ok(self.checkpointer.list_threads().await?)
    }

    /// Starts a run under a freshly generated thread id.
    pub async fn start_new(
        &self,
        state: WorkflowState,
    ) -> Result<(String, RunOutcome), RunnerError> {
        let thread_id = Uuid::new_v4().to_string();
        let outcome = self.start(&thread_id, state).await?;
        Ok((thread_id, outcome))
    }

    /// Starts or continues the thread.
    ///
    /// A fresh thread gets a step-zero checkpoint before the first node runs.
    /// A thread with history continues from its latest checkpoint (the given
    /// state is ignored). A suspended thread refuses to start; it must be
    /// resumed with a decision instead.
    #[instrument(skip(self, state), fields(thread = %thread_id))]
    pub async fn start(
        &self,
        thread_id: &str,
        state: WorkflowState,
    ) -> Result<RunOutcome, RunnerError> {
        match self.checkpointer.load_latest(thread_id).await? {
            Some(cp) if cp.is_suspended() => Err(RunnerError::InterruptPending {
                thread_id: thread_id.to_string(),
            }),
            Some(cp) => {
                info!(step = cp.step, next = %cp.next, "continuing thread from checkpoint");
                self.drive(thread_id, cp.state, cp.next, cp.step, None).await
            }
            None => {
                let entry = self.workflow.entry(&state.snapshot());
                self.checkpointer
                    .save(Checkpoint::new(thread_id, 0, state.clone(), entry, None))
                    .await?;
                self.events.emit(thread_id, 0, RunEventKind::Checkpointed);
                self.drive(thread_id, state, entry, 0, None).await
            }
        }
    }

    /// Answers the thread's pending interrupt and continues execution.
    ///
    /// The decision is delivered to the suspended node exactly once. If the
    /// node rejects it (protocol violation), the stored checkpoint keeps its
    /// pending interrupt, so the thread can be resumed again with a
    /// corrected decision.
    #[instrument(skip(self, decision), fields(thread = %thread_id, action = %decision.action))]
    pub async fn resume(
        &self,
        thread_id: &str,
        decision: Decision,
    ) -> Result<RunOutcome, RunnerError> {
        let cp = self
            .checkpointer
            .load_latest(thread_id)
            .await?
            .ok_or_else(|| RunnerError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })?;
        if !cp.is_suspended() {
            return Err(RunnerError::NoPendingInterrupt {
                thread_id: thread_id.to_string(),
            });
        }
        self.drive(thread_id, cp.state, cp.next, cp.step, Some(decision))
            .await
    }

    async fn drive(
        &self,
        thread_id: &str,
        mut state: WorkflowState,
        mut current: NodeId,
        mut step: u64,
        mut resume: Option<Decision>,
    ) -> Result<RunOutcome, RunnerError> {
        let RuntimeConfig { step_limit } = *self.workflow.runtime_config();
        let mut executed: u64 = 0;

        while current != NodeId::End {
            if executed >= step_limit {
                let err = RunnerError::StepLimitExceeded { limit: step_limit };
                self.events.emit(
                    thread_id,
                    step,
                    RunEventKind::Error {
                        message: err.to_string(),
                    },
                );
                return Err(err);
            }
            executed += 1;
            step += 1;

            let node = self
                .workflow
                .node(current)
                .ok_or(RunnerError::UnknownRouteTarget {
                    from: current,
                    to: current,
                })?;
            self.events
                .emit(thread_id, step, RunEventKind::NodeStarted { node: current });

            let mut ctx = NodeContext::new(
                thread_id.to_string(),
                current,
                step,
                resume.take(),
                self.events.clone(),
            );
            let outcome = match node.run(state.snapshot(), &mut ctx).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    // No checkpoint is written here: a suspended thread keeps
                    // its pending interrupt and can be resumed again.
                    self.events.emit(
                        thread_id,
                        step,
                        RunEventKind::Error {
                            message: err.to_string(),
                        },
                    );
                    return Err(err.into());
                }
            };

            let next = match outcome {
                NodeOutcome::Suspend(payload) => {
                    self.checkpointer
                        .save(Checkpoint::new(
                            thread_id,
                            step,
                            state.clone(),
                            current,
                            Some(payload.clone()),
                        ))
                        .await?;
                    self.events.emit(thread_id, step, RunEventKind::Checkpointed);
                    self.events.emit(
                        thread_id,
                        step,
                        RunEventKind::Interrupted(payload.clone()),
                    );
                    return Ok(RunOutcome::Interrupted(payload));
                }
                NodeOutcome::Exit(patch) => {
                    state.apply(patch);
                    self.checkpointer
                        .save(Checkpoint::new(
                            thread_id,
                            step,
                            state.clone(),
                            NodeId::End,
                            None,
                        ))
                        .await?;
                    self.events.emit(thread_id, step, RunEventKind::Checkpointed);
                    self.events.emit(
                        thread_id,
                        step,
                        RunEventKind::NodeFinished {
                            node: current,
                            next: NodeId::End,
                        },
                    );
                    self.events.emit(
                        thread_id,
                        step,
                        RunEventKind::Terminal(TerminalReason::Exited),
                    );
                    return Ok(RunOutcome::Exited(state));
                }
                NodeOutcome::Advance(patch) => {
                    state.apply(patch);
                    let snapshot = state.snapshot();
                    let next = self.workflow.successor(current, &snapshot).ok_or(
                        RunnerError::MissingSuccessor { node: current },
                    )?;
                    if self
                        .workflow
                        .router_targets(current)
                        .is_some_and(|targets| !targets.contains(&next))
                    {
                        return Err(RunnerError::UnknownRouteTarget {
                            from: current,
                            to: next,
                        });
                    }
                    next
                }
                NodeOutcome::Command(cmd) => {
                    state.apply(cmd.patch);
                    if !self.workflow.contains(cmd.goto) {
                        return Err(RunnerError::UnknownRouteTarget {
                            from: current,
                            to: cmd.goto,
                        });
                    }
                    cmd.goto
                }
            };

            self.checkpointer
                .save(Checkpoint::new(
                    thread_id,
                    step,
                    state.clone(),
                    next,
                    None,
                ))
                .await?;
            self.events.emit(thread_id, step, RunEventKind::Checkpointed);
            self.events.emit(
                thread_id,
                step,
                RunEventKind::NodeFinished {
                    node: current,
                    next,
                },
            );
            current = next;
        }

        self.events.emit(
            thread_id,
            step,
            RunEventKind::Terminal(TerminalReason::Completed),
        );
        Ok(RunOutcome::Completed(state))
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("workflow", &self.workflow)
            .field("events", &self.events)
            .finish()
    }
}
