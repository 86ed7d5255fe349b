use std::collections::VecDeque;
use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::graphs::edges::{Router, RouterEdge};
use crate::node::Node;
use crate::runtimes::RuntimeConfig;
use crate::state::StateSnapshot;
use crate::types::NodeId;
use crate::workflow::Workflow;

/// Structural problems caught at compile time.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum GraphCompileError {
    #[error("no entry edge from the start node")]
    #[diagnostic(
        code(selvage::graph::no_entry),
        help("add an edge from NodeId::Start to the first node")
    )]
    NoEntryPoint,

    #[error("edge from {from} targets unregistered node {to}")]
    #[diagnostic(code(selvage::graph::dangling_edge))]
    DanglingEdge { from: NodeId, to: NodeId },

    #[error("router on {from} declares unregistered target {to}")]
    #[diagnostic(code(selvage::graph::dangling_router_target))]
    DanglingRouterTarget { from: NodeId, to: NodeId },

    #[error("node {node} has both a static edge and a router")]
    #[diagnostic(
        code(selvage::graph::conflicting_successors),
        help("a node routes either statically or conditionally, not both")
    )]
    ConflictingSuccessors { node: NodeId },

    #[error("node {node} has no outgoing edge or router")]
    #[diagnostic(code(selvage::graph::no_successor))]
    MissingSuccessor { node: NodeId },

    #[error("node {node} is registered but unreachable from start")]
    #[diagnostic(code(selvage::graph::unreachable))]
    Unreachable { node: NodeId },

    #[error("edge declared for {node} which has no registered node")]
    #[diagnostic(code(selvage::graph::unknown_source))]
    UnknownSource { node: NodeId },
}

/// Declarative workflow graph under construction.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use selvage::graphs::GraphBuilder;
/// use selvage::types::NodeId;
/// # fn nodes() -> (Arc<dyn selvage::node::Node>, Arc<dyn selvage::node::Node>) { unimplemented!() }
///
/// let (planner, tools) = nodes();
/// let workflow = GraphBuilder::new()
///     .add_node(NodeId::Planner, planner)
///     .add_node(NodeId::Tools, tools)
///     .add_edge(NodeId::Start, NodeId::Planner)
///     .add_edge(NodeId::Tools, NodeId::Planner)
///     .add_router(NodeId::Planner, vec![NodeId::Tools, NodeId::End], Arc::new(|_| NodeId::End))
///     .compile()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct GraphBuilder {
    nodes: FxHashMap<NodeId, Arc<dyn Node>>,
    edges: FxHashMap<NodeId, NodeId>,
    routers: FxHashMap<NodeId, RouterEdge>,
    runtime_config: RuntimeConfig,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node implementation. Terminal ids are rejected by
    /// [`compile`](Self::compile) through the reachability rules, so only
    /// runnable nodes belong here.
    #[must_use]
    pub fn add_node(mut self, id: NodeId, node: Arc<dyn Node>) -> Self {
        self.nodes.insert(id, node);
        self
    }

    /// Declares a static successor: after `from` runs, control moves to `to`.
    #[must_use]
    pub fn add_edge(mut self, from: NodeId, to: NodeId) -> Self {
        self.edges.insert(from, to);
        self
    }

    /// Declares a conditional successor chosen by `router` among `targets`.
    #[must_use]
    pub fn add_router(
        mut self,
        from: NodeId,
        targets: Vec<NodeId>,
        router: Router,
    ) -> Self {
        self.routers.insert(
            from,
            RouterEdge {
                from,
                targets,
                router,
            },
        );
        self
    }

    /// Convenience wrapper taking a plain closure.
    #[must_use]
    pub fn add_router_fn(
        self,
        from: NodeId,
        targets: Vec<NodeId>,
        router: impl Fn(&StateSnapshot) -> NodeId + Send + Sync + 'static,
    ) -> Self {
        self.add_router(from, targets, Arc::new(router))
    }

    #[must_use]
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Validates the graph shape and produces a runnable [`Workflow`].
    pub fn compile(self) -> Result<Workflow, GraphCompileError> {
        let registered =
            |id: NodeId| id == NodeId::End || self.nodes.contains_key(&id);

        if !self.edges.contains_key(&NodeId::Start) && !self.routers.contains_key(&NodeId::Start) {
            return Err(GraphCompileError::NoEntryPoint);
        }

        for (&from, &to) in &self.edges {
            if from != NodeId::Start && !self.nodes.contains_key(&from) {
                return Err(GraphCompileError::UnknownSource { node: from });
            }
            if !registered(to) {
                return Err(GraphCompileError::DanglingEdge { from, to });
            }
            if self.routers.contains_key(&from) {
                return Err(GraphCompileError::ConflictingSuccessors { node: from });
            }
        }

        for (&from, edge) in &self.routers {
            if from != NodeId::Start && !self.nodes.contains_key(&from) {
                return Err(GraphCompileError::UnknownSource { node: from });
            }
            for &to in &edge.targets {
                if !registered(to) {
                    return Err(GraphCompileError::DanglingRouterTarget { from, to });
                }
            }
        }

        for &node in self.nodes.keys() {
            if !self.edges.contains_key(&node) && !self.routers.contains_key(&node) {
                return Err(GraphCompileError::MissingSuccessor { node });
            }
        }

        // Breadth-first walk over static edges and declared router targets.
        let mut reachable: FxHashSet<NodeId> = FxHashSet::default();
        let mut frontier = VecDeque::from([NodeId::Start]);
        while let Some(current) = frontier.pop_front() {
            if !reachable.insert(current) {
                continue;
            }
            if let Some(&next) = self.edges.get(&current) {
                frontier.push_back(next);
            }
            if let Some(edge) = self.routers.get(&current) {
                frontier.extend(edge.targets.iter().copied());
            }
        }
        for &node in self.nodes.keys() {
            if !reachable.contains(&node) {
                return Err(GraphCompileError::Unreachable { node });
            }
        }

        Ok(Workflow::from_parts(
            self.nodes,
            self.edges,
            self.routers,
            self.runtime_config,
        ))
    }
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("routers", &self.routers.keys().collect::<Vec<_>>())
            .finish()
    }
}
