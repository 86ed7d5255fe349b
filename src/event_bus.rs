//! Run event stream.
//!
//! The executor emits a [`RunEvent`] for every observable transition of a
//! thread. Sinks fan the stream out: the default [`TracingSink`] turns
//! events into structured log records, and a [`ChannelSink`] feeds a flume
//! channel for callers that want to consume events programmatically.
//!
//! Ordering guarantee: the checkpoint for a step is persisted before any
//! event describing that step is emitted, so an observer never learns about
//! progress that could be lost.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::interrupt::InterruptPayload;
use crate::message::Message;
use crate::types::NodeId;

/// Why a run reached a terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// Routing reached the exit point.
    Completed,
    /// A node requested an explicit stop.
    Exited,
}

/// What happened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunEventKind {
    NodeStarted {
        node: NodeId,
    },
    /// A node surfaced a message mid-run (progress, provider chatter).
    NodeMessage {
        node: NodeId,
        message: Message,
    },
    NodeFinished {
        node: NodeId,
        next: NodeId,
    },
    /// State was durably saved for this step.
    Checkpointed,
    /// The run suspended awaiting a review decision.
    Interrupted(InterruptPayload),
    Terminal(TerminalReason),
    Error {
        message: String,
    },
}

/// One observable transition of a workflow thread.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub thread: String,
    pub step: u64,
    #[serde(flatten)]
    pub kind: RunEventKind,
}

/// Receives the event stream. Sinks must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RunEvent);
}

/// Logs every event via `tracing` at info level (warn for errors).
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &RunEvent) {
        match &event.kind {
            RunEventKind::NodeStarted { node } => {
                tracing::info!(thread = %event.thread, step = event.step, node = %node, "node started");
            }
            RunEventKind::NodeMessage { node, message } => {
                tracing::info!(
                    thread = %event.thread,
                    step = event.step,
                    node = %node,
                    content = %message.content,
                    "node message"
                );
            }
            RunEventKind::NodeFinished { node, next } => {
                tracing::info!(thread = %event.thread, step = event.step, node = %node, next = %next, "node finished");
            }
            RunEventKind::Checkpointed => {
                tracing::debug!(thread = %event.thread, step = event.step, "checkpoint saved");
            }
            RunEventKind::Interrupted(payload) => {
                tracing::info!(
                    thread = %event.thread,
                    step = event.step,
                    operation = %payload.call.name,
                    "run suspended for review"
                );
            }
            RunEventKind::Terminal(reason) => {
                tracing::info!(thread = %event.thread, step = event.step, ?reason, "run finished");
            }
            RunEventKind::Error { message } => {
                tracing::warn!(thread = %event.thread, step = event.step, %message, "run error");
            }
        }
    }
}

/// Forwards events into a flume channel. Sends never block; if the receiver
/// is gone the event is dropped.
#[derive(Debug)]
pub struct ChannelSink {
    tx: flume::Sender<RunEvent>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(tx: flume::Sender<RunEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &RunEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Cloneable handle fanning events out to all attached sinks.
#[derive(Clone, Default)]
pub struct EventBus {
    sinks: Arc<Mutex<Vec<Box<dyn EventSink>>>>,
}

impl EventBus {
    /// Bus with a [`TracingSink`] already attached.
    #[must_use]
    pub fn with_tracing() -> Self {
        let bus = Self::default();
        bus.attach(Box::new(TracingSink));
        bus
    }

    pub fn attach(&self, sink: Box<dyn EventSink>) {
        self.sinks.lock().push(sink);
    }

    /// Attaches a channel sink and returns its receiver.
    #[must_use]
    pub fn subscribe(&self) -> flume::Receiver<RunEvent> {
        let (tx, rx) = flume::unbounded();
        self.attach(Box::new(ChannelSink::new(tx)));
        rx
    }

    pub fn emit(&self, thread: &str, step: u64, kind: RunEventKind) {
        let event = RunEvent {
            thread: thread.to_string(),
            step,
            kind,
        };
        for sink in self.sinks.lock().iter() {
            sink.emit(&event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("sinks", &self.sinks.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_receives_events() {
        let bus = EventBus::default();
        let rx = bus.subscribe();

        bus.emit("t1", 0, RunEventKind::NodeStarted { node: NodeId::Planner });
        bus.emit("t1", 0, RunEventKind::Checkpointed);

        let first = rx.recv().expect("event");
        assert_eq!(first.thread, "t1");
        assert_eq!(first.kind, RunEventKind::NodeStarted { node: NodeId::Planner });
        assert_eq!(rx.recv().expect("event").kind, RunEventKind::Checkpointed);
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let bus = EventBus::default();
        let rx = bus.subscribe();
        drop(rx);
        bus.emit("t1", 0, RunEventKind::Checkpointed);
    }

    #[test]
    fn test_clone_shares_sinks() {
        let bus = EventBus::default();
        let cloned = bus.clone();
        let rx = bus.subscribe();
        cloned.emit("t1", 3, RunEventKind::Terminal(TerminalReason::Completed));
        assert_eq!(rx.recv().expect("event").step, 3);
    }
}
