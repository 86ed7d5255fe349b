//! Checkpointed human-in-the-loop workflow engine.
//!
//! Selvage runs small directed workflows over versioned conversational
//! state. Nodes read immutable snapshots and return patches plus routing;
//! protected operations suspend the run for human review and resume from a
//! durable checkpoint once a decision arrives; unreliable operations are
//! wrapped in a classifying retry controller that degrades gracefully
//! instead of failing the run.
//!
//! The pieces, roughly bottom-up:
//!
//! - [`message`], [`channels`], [`state`]: conversation records and the
//!   versioned state they live in.
//! - [`types`], [`control`]: the closed node id set and node outcomes
//!   (patches, commands, suspension).
//! - [`interrupt`]: review payloads and the strict decision protocol.
//! - [`ops`], [`retry`]: operation registry, failure classification,
//!   backoff, and result repair.
//! - [`node`], [`nodes`]: the node trait plus the built-in planner,
//!   approval, and tools nodes.
//! - [`graphs`], [`workflow`]: graph declaration and compile-time
//!   validation.
//! - [`runtimes`]: the step loop, checkpoint store, and event stream.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use selvage::graphs::GraphBuilder;
//! use selvage::nodes::{route_after_planner, ApprovalNode, PlannerNode, ToolsNode};
//! use selvage::ops::OperationRegistry;
//! use selvage::runtimes::{InMemoryCheckpointer, Runner};
//! use selvage::state::WorkflowState;
//! use selvage::types::NodeId;
//!
//! # async fn demo(planner: Arc<dyn selvage::nodes::Planner>) -> miette::Result<()> {
//! let registry = OperationRegistry::new();
//! let workflow = GraphBuilder::new()
//!     .add_node(NodeId::Planner, Arc::new(PlannerNode::new(planner, "be helpful")))
//!     .add_node(NodeId::Approval, Arc::new(ApprovalNode))
//!     .add_node(NodeId::Tools, Arc::new(ToolsNode::new(registry)))
//!     .add_edge(NodeId::Start, NodeId::Planner)
//!     .add_edge(NodeId::Approval, NodeId::Tools)
//!     .add_edge(NodeId::Tools, NodeId::Planner)
//!     .add_router_fn(
//!         NodeId::Planner,
//!         vec![NodeId::Approval, NodeId::Tools, NodeId::End],
//!         route_after_planner,
//!     )
//!     .compile()?;
//!
//! let runner = Runner::new(Arc::new(workflow), Arc::new(InMemoryCheckpointer::new()));
//! let state = WorkflowState::builder()
//!     .with_user_message("how many users signed up last week?")
//!     .with_protected_operation("executeQuery")
//!     .build();
//! let (_thread, _outcome) = runner.start_new(state).await?;
//! # Ok(())
//! # }
//! ```

pub mod channels;
pub mod control;
pub mod event_bus;
pub mod graphs;
pub mod interrupt;
pub mod message;
pub mod node;
pub mod nodes;
pub mod ops;
pub mod retry;
pub mod runtimes;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod workflow;
