//! Compiled workflow.
//!
//! A [`Workflow`] is the immutable product of [`GraphBuilder::compile`]:
//! validated nodes, edges, and routers plus the runtime configuration. The
//! executor in [`crate::runtimes`] drives it; the workflow itself only
//! answers structural questions.
//!
//! [`GraphBuilder::compile`]: crate::graphs::GraphBuilder::compile

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::graphs::RouterEdge;
use crate::node::Node;
use crate::runtimes::RuntimeConfig;
use crate::state::StateSnapshot;
use crate::types::NodeId;

#[derive(Clone)]
pub struct Workflow {
    nodes: FxHashMap<NodeId, Arc<dyn Node>>,
    edges: FxHashMap<NodeId, NodeId>,
    routers: FxHashMap<NodeId, RouterEdge>,
    runtime_config: RuntimeConfig,
}

impl Workflow {
    pub(crate) fn from_parts(
        nodes: FxHashMap<NodeId, Arc<dyn Node>>,
        edges: FxHashMap<NodeId, NodeId>,
        routers: FxHashMap<NodeId, RouterEdge>,
        runtime_config: RuntimeConfig,
    ) -> Self {
        Self {
            nodes,
            edges,
            routers,
            runtime_config,
        }
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<Arc<dyn Node>> {
        self.nodes.get(&id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id == NodeId::End || self.nodes.contains_key(&id)
    }

    #[must_use]
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime_config
    }

    /// First node after the virtual start.
    #[must_use]
    pub fn entry(&self, snapshot: &StateSnapshot) -> NodeId {
        self.successor(NodeId::Start, snapshot)
            .unwrap_or(NodeId::End)
    }

    /// Next node after `from`, per its static edge or router. `None` when
    /// `from` has neither (only possible for `End`).
    #[must_use]
    pub fn successor(&self, from: NodeId, snapshot: &StateSnapshot) -> Option<NodeId> {
        if let Some(&next) = self.edges.get(&from) {
            return Some(next);
        }
        self.routers.get(&from).map(|edge| (edge.router)(snapshot))
    }

    /// Declared targets of the router on `from`, if it has one.
    #[must_use]
    pub fn router_targets(&self, from: NodeId) -> Option<&[NodeId]> {
        self.routers.get(&from).map(|edge| edge.targets.as_slice())
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("routers", &self.routers.keys().collect::<Vec<_>>())
            .field("runtime_config", &self.runtime_config)
            .finish()
    }
}
