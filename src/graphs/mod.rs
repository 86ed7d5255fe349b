//! Graph construction and validation.
//!
//! A workflow graph is declared with [`GraphBuilder`] and checked by
//! [`GraphBuilder::compile`], which rejects unreachable nodes, dangling
//! targets, and missing successors before anything runs.

mod builder;
mod edges;

pub use builder::{GraphBuilder, GraphCompileError};
pub use edges::{Router, RouterEdge};
