//! Built-in nodes for the review workflow: planning, human approval, and
//! retried operation execution, plus the router wiring them together.

mod approval;
mod planner;
mod tools;

pub use approval::ApprovalNode;
pub use planner::{Planner, PlannerError, PlannerNode, PlannerReply};
pub use tools::ToolsNode;

use crate::state::StateSnapshot;
use crate::types::NodeId;

/// Routes after planning: a pending protected call goes to review (unless
/// auto-approve is set), an unprotected one straight to execution, and a
/// plain reply ends the run.
#[must_use]
pub fn route_after_planner(snapshot: &StateSnapshot) -> NodeId {
    match snapshot.pending_call() {
        Some(call) if snapshot.is_protected(&call.name) && !snapshot.auto_approve => {
            NodeId::Approval
        }
        Some(_) => NodeId::Tools,
        None => NodeId::End,
    }
}
