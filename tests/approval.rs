mod common;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use selvage::event_bus::EventBus;
use selvage::interrupt::{Decision, ReviewAction};
use selvage::message::Message;
use selvage::node::NodeError;
use selvage::nodes::ToolsNode;
use selvage::ops::{Operation, OperationError, OperationRegistry};
use selvage::runtimes::{InMemoryCheckpointer, RunOutcome, Runner, RunnerError, RuntimeConfig};

use common::{ScriptedPlanner, final_reply, propose_query, protected_state, review_workflow};

/// Records the arguments of every call and succeeds.
struct RecordingOp {
    seen: Mutex<Vec<Value>>,
}

impl RecordingOp {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<Value> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Operation for RecordingOp {
    async fn call(&self, args: &Value) -> Result<Value, OperationError> {
        self.seen.lock().push(args.clone());
        Ok(json!({"ok": true}))
    }
}

fn runner_with_recorder(op: Arc<RecordingOp>, script: Vec<selvage::nodes::PlannerReply>) -> Runner {
    let mut registry = OperationRegistry::new();
    registry.register("executeQuery", op);
    let workflow = review_workflow(
        ScriptedPlanner::new(script),
        ToolsNode::new(registry),
        RuntimeConfig::default(),
    );
    Runner::new(Arc::new(workflow), Arc::new(InMemoryCheckpointer::new()))
        .with_event_bus(EventBus::default())
}

#[tokio::test]
async fn update_replaces_call_arguments() {
    let op = RecordingOp::new();
    let runner = runner_with_recorder(
        op.clone(),
        vec![
            propose_query("c1", "SELECT * FROM users"),
            final_reply("done"),
        ],
    );

    runner
        .start("t1", protected_state("list users"))
        .await
        .expect("start");
    let outcome = runner
        .resume(
            "t1",
            Decision::with_data(
                ReviewAction::Update,
                r#"{"sql_query": "SELECT * FROM users LIMIT 10"}"#,
            ),
        )
        .await
        .expect("resume");

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    let seen = op.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], json!({"sql_query": "SELECT * FROM users LIMIT 10"}));
}

#[tokio::test]
async fn update_without_valid_json_is_a_protocol_error_and_stays_resumable() {
    let op = RecordingOp::new();
    let runner = runner_with_recorder(
        op.clone(),
        vec![
            propose_query("c1", "SELECT * FROM users"),
            final_reply("done"),
        ],
    );

    runner
        .start("t1", protected_state("list users"))
        .await
        .expect("start");

    let err = runner
        .resume("t1", Decision::with_data(ReviewAction::Update, "not json"))
        .await
        .expect_err("malformed update");
    assert!(matches!(err, RunnerError::Node(NodeError::Protocol(_))));

    let err = runner
        .resume("t1", Decision::new(ReviewAction::Update))
        .await
        .expect_err("update without data");
    assert!(matches!(err, RunnerError::Node(NodeError::Protocol(_))));

    // The interrupt survived both bad decisions; a good one still works.
    let outcome = runner
        .resume("t1", Decision::new(ReviewAction::Continue))
        .await
        .expect("corrected resume");
    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(op.seen().len(), 1);
}

#[tokio::test]
async fn feedback_reaches_the_planner_without_executing() {
    let op = RecordingOp::new();
    let runner = runner_with_recorder(
        op.clone(),
        vec![
            propose_query("c1", "SELECT * FROM users"),
            final_reply("ok, adjusting the approach"),
        ],
    );

    runner
        .start("t1", protected_state("list users"))
        .await
        .expect("start");
    let outcome = runner
        .resume(
            "t1",
            Decision::with_data(ReviewAction::Feedback, "add a LIMIT clause"),
        )
        .await
        .expect("resume");

    let state = match outcome {
        RunOutcome::Completed(state) => state,
        other => panic!("expected completion, got {other:?}"),
    };
    assert!(op.seen().is_empty(), "feedback must not execute the call");

    let record = state
        .history
        .get()
        .iter()
        .find(|m| m.has_role(Message::TOOL))
        .expect("feedback record");
    assert!(record.content.contains("add a LIMIT clause"));
    assert_eq!(record.call_id.as_deref(), Some("c1"));
}

#[tokio::test]
async fn feedback_without_text_is_a_protocol_error() {
    let op = RecordingOp::new();
    let runner = runner_with_recorder(
        op.clone(),
        vec![propose_query("c1", "SELECT 1"), final_reply("done")],
    );

    runner
        .start("t1", protected_state("check"))
        .await
        .expect("start");
    let err = runner
        .resume("t1", Decision::new(ReviewAction::Feedback))
        .await
        .expect_err("feedback without data");
    assert!(matches!(err, RunnerError::Node(NodeError::Protocol(_))));
}

#[tokio::test]
async fn reject_records_a_rejection_and_replans() {
    let op = RecordingOp::new();
    let runner = runner_with_recorder(
        op.clone(),
        vec![
            propose_query("c1", "DROP TABLE users"),
            final_reply("understood, I will not run that"),
        ],
    );

    runner
        .start("t1", protected_state("clean up"))
        .await
        .expect("start");
    let outcome = runner
        .resume("t1", Decision::new(ReviewAction::Reject))
        .await
        .expect("resume");

    let state = match outcome {
        RunOutcome::Completed(state) => state,
        other => panic!("expected completion, got {other:?}"),
    };
    assert!(op.seen().is_empty(), "rejected call must not execute");

    let record = state
        .history
        .get()
        .iter()
        .find(|m| m.has_role(Message::TOOL))
        .expect("rejection record");
    assert!(record.content.contains("rejected"));
}

#[test]
fn unknown_decision_tags_never_reach_the_workflow() {
    // Rejected at parse time, before any resume call can be made.
    assert!(Decision::parse(r#"{"action": "approve"}"#).is_err());
    assert!(Decision::parse(r#"{"action": ""}"#).is_err());
    assert!(Decision::parse(r#"{"action": "continue "}"#).is_ok());
}
