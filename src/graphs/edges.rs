use std::sync::Arc;

use crate::state::StateSnapshot;
use crate::types::NodeId;

/// Pure routing function: inspects a snapshot and names the next node.
///
/// Routers must be deterministic for a given snapshot and must only return
/// nodes listed in their edge's declared targets.
pub type Router = Arc<dyn Fn(&StateSnapshot) -> NodeId + Send + Sync>;

/// Conditional edge: after `from` runs, the router picks one of `targets`.
#[derive(Clone)]
pub struct RouterEdge {
    pub from: NodeId,
    /// Every node the router may return, declared up front so compilation
    /// can validate reachability.
    pub targets: Vec<NodeId>,
    pub router: Router,
}

impl std::fmt::Debug for RouterEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterEdge")
            .field("from", &self.from)
            .field("targets", &self.targets)
            .finish()
    }
}
