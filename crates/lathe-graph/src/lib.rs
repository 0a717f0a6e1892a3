//! Lathe Graph
//!
//! Deferred operation graphs with content-addressed nodes.
//!
//! Operations are declared once in an [`OperationRegistry`]. A [`Builder`]
//! then records calls to them as nodes: each call binds its raw arguments
//! against the operation's parameter spec and returns an [`Op`] that can be
//! passed as an argument or chained from. A node's [`NodeId`] is a hash of
//! its operation name, input and bound arguments, so two calls describing
//! the same work share an id.
//!
//! Chaining `a.call("x", args![b])` where `b` is a fresh node with no input
//! gives `b` the same input as `x`, making `a.x(b())` equivalent to
//! `a.x(a.b())`.

mod builder;
mod context;
mod error;
mod id;
mod operation;

pub use builder::{Builder, Graph, GraphNode, Op};
pub use context::Context;
pub use error::GraphError;
pub use id::{Input, NodeId};
pub use operation::{Implementation, OpCall, Operation, OperationRegistry, Preprocess, number_json};
