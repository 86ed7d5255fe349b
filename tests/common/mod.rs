#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use selvage::graphs::GraphBuilder;
use selvage::message::OperationCall;
use selvage::nodes::{
    ApprovalNode, Planner, PlannerError, PlannerNode, PlannerReply, ToolsNode,
    route_after_planner,
};
use selvage::ops::{Operation, OperationError, OperationRegistry};
use selvage::runtimes::RuntimeConfig;
use selvage::state::WorkflowState;
use selvage::types::NodeId;
use selvage::workflow::Workflow;

pub const SYSTEM_PROMPT: &str = "You answer questions by querying the warehouse.";

/// Planner that replays a scripted sequence of replies, one per call.
pub struct ScriptedPlanner {
    replies: Mutex<VecDeque<PlannerReply>>,
}

impl ScriptedPlanner {
    pub fn new(replies: Vec<PlannerReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(
        &self,
        _system_prompt: &str,
        _history: &[selvage::message::Message],
    ) -> Result<PlannerReply, PlannerError> {
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| PlannerError::new("scripted", "script exhausted"))
    }
}

pub fn propose_query(id: &str, sql: &str) -> PlannerReply {
    PlannerReply::OpCall {
        content: format!("Running: {sql}"),
        call: OperationCall::new(
            id,
            "executeQuery",
            json!({"sql_query": sql, "description": "scripted query"}),
        ),
    }
}

pub fn final_reply(text: &str) -> PlannerReply {
    PlannerReply::Message(text.to_string())
}

/// Succeeds every call with a fixed value and counts invocations.
pub struct CountingOp {
    calls: AtomicUsize,
    result: Value,
}

impl CountingOp {
    pub fn new(result: Value) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            result,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Operation for CountingOp {
    async fn call(&self, _args: &Value) -> Result<Value, OperationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

/// Fails with `reason` for the first `failures` calls, then succeeds.
pub struct FlakyOp {
    calls: AtomicUsize,
    failures: usize,
    reason: String,
    result: Value,
}

impl FlakyOp {
    pub fn new(failures: usize, reason: &str, result: Value) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failures,
            reason: reason.to_string(),
            result,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Operation for FlakyOp {
    async fn call(&self, _args: &Value) -> Result<Value, OperationError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err(OperationError::new(self.reason.clone()))
        } else {
            Ok(self.result.clone())
        }
    }
}

/// Fails every call with the same reason.
pub struct FixedFailOp {
    calls: AtomicUsize,
    reason: String,
}

impl FixedFailOp {
    pub fn new(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reason: reason.to_string(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Operation for FixedFailOp {
    async fn call(&self, _args: &Value) -> Result<Value, OperationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(OperationError::new(self.reason.clone()))
    }
}

pub fn registry_with(name: &str, op: Arc<dyn Operation>) -> OperationRegistry {
    let mut registry = OperationRegistry::new();
    registry.register(name, op);
    registry
}

/// The standard review graph: planner routes to approval, tools, or end;
/// approval and tools both feed back through the planner.
pub fn review_workflow(
    planner: Arc<dyn Planner>,
    tools: ToolsNode,
    config: RuntimeConfig,
) -> Workflow {
    GraphBuilder::new()
        .add_node(
            NodeId::Planner,
            Arc::new(PlannerNode::new(planner, SYSTEM_PROMPT)),
        )
        .add_node(NodeId::Approval, Arc::new(ApprovalNode))
        .add_node(NodeId::Tools, Arc::new(tools))
        .add_edge(NodeId::Start, NodeId::Planner)
        .add_edge(NodeId::Approval, NodeId::Tools)
        .add_edge(NodeId::Tools, NodeId::Planner)
        .add_router_fn(
            NodeId::Planner,
            vec![NodeId::Approval, NodeId::Tools, NodeId::End],
            route_after_planner,
        )
        .with_runtime_config(config)
        .compile()
        .expect("review workflow compiles")
}

pub fn protected_state(request: &str) -> WorkflowState {
    WorkflowState::builder()
        .with_user_message(request)
        .with_protected_operation("executeQuery")
        .build()
}
