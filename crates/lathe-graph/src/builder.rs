//! Build sessions.
//!
//! A [`Builder`] records every node created while a graph is being described.
//! Nodes live in an append-only arena addressed by [`NodeHandle`]; their ids
//! are computed on first request and cached in a side table, after which the
//! node can no longer change.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use lathe_spec::{BindError, Caller, External, NodeHandle, NodeRef, Produces, Value, destructure};
use tracing::trace;

use crate::id::{Input, NodeId, digest};
use crate::operation::{Operation, OperationRegistry};

struct OpNode {
  operation: Arc<Operation>,
  input: Option<Input>,
  args: Vec<Value>,
}

/// One graph construction session.
pub struct Builder {
  registry: Arc<OperationRegistry>,
  nodes: RefCell<Vec<OpNode>>,
  ids: RefCell<Vec<Option<NodeId>>>,
}

impl Builder {
  pub fn new(registry: Arc<OperationRegistry>) -> Self {
    Self {
      registry,
      nodes: RefCell::new(Vec::new()),
      ids: RefCell::new(Vec::new()),
    }
  }

  pub fn registry(&self) -> &OperationRegistry {
    &self.registry
  }

  /// Call an operation with no input.
  pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Op<'_>, BindError> {
    self.create(None, name, args)
  }

  /// Call an operation chained from a value supplied outside the graph.
  pub fn call_on(&self, input: External, name: &str, args: Vec<Value>) -> Result<Op<'_>, BindError> {
    self.create(Some(Input::External(input)), name, args)
  }

  /// Number of nodes created so far.
  pub fn len(&self) -> usize {
    self.nodes.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.borrow().is_empty()
  }

  /// Close the session, fixing the id of every node.
  pub fn finish(self) -> Graph {
    let count = self.len();
    let ids: Vec<NodeId> = (0..count).map(|h| self.node_id(NodeHandle(h))).collect();
    let nodes = self
      .nodes
      .into_inner()
      .into_iter()
      .enumerate()
      .map(|(h, node)| GraphNode {
        handle: NodeHandle(h),
        id: ids[h],
        operation: node.operation,
        input: node.input,
        args: node.args,
      })
      .collect();
    Graph { nodes, ids }
  }

  fn create(&self, input: Option<Input>, name: &str, args: Vec<Value>) -> Result<Op<'_>, BindError> {
    let operation = self
      .registry
      .get(name)
      .cloned()
      .ok_or_else(|| BindError::UnknownOperation {
        name: name.to_string(),
      })?;

    let args = match &operation.preprocess {
      Some(preprocess) => preprocess(self, input.as_ref(), args)?,
      None => args,
    };

    self.check_refs(name, input.as_ref(), &args)?;

    let mut adoptions = Vec::new();
    if let Some(input) = &input {
      for arg in &args {
        arg.for_each_ref(&mut |node| {
          if self.can_adopt(node.handle, input) {
            adoptions.push(node.handle);
          }
        });
      }
    }

    let call_site = CallSite {
      builder: self,
      name,
    };
    let bound = destructure(self.registry.handlers(), &call_site, &operation.params, args)?;

    // Only a call that binds hands its input to its arguments.
    if let Some(input) = &input {
      for handle in adoptions {
        self.adopt(handle, input);
      }
    }

    let handle = {
      let mut nodes = self.nodes.borrow_mut();
      nodes.push(OpNode {
        operation,
        input,
        args: bound,
      });
      self.ids.borrow_mut().push(None);
      NodeHandle(nodes.len() - 1)
    };
    trace!(op = name, handle = handle.0, "node_created");

    Ok(Op {
      builder: self,
      node: NodeRef::new(handle),
    })
  }

  fn check_refs(&self, name: &str, input: Option<&Input>, args: &[Value]) -> Result<(), BindError> {
    let len = self.len();
    let mut unknown = None;
    if let Some(Input::Node(node)) = input {
      if node.handle.0 >= len {
        unknown = Some(node.handle);
      }
    }
    for arg in args {
      arg.for_each_ref(&mut |node| {
        if node.handle.0 >= len {
          unknown.get_or_insert(node.handle);
        }
      });
    }
    match unknown {
      Some(handle) => Err(BindError::UnknownNode {
        op: name.to_string(),
        handle: handle.0,
      }),
      None => Ok(()),
    }
  }

  /// Whether a node may take the caller's input.
  ///
  /// Not when the node already has an input, its id has been taken, or the
  /// new edge would close a cycle.
  fn can_adopt(&self, handle: NodeHandle, input: &Input) -> bool {
    if self.ids.borrow()[handle.0].is_some() || self.nodes.borrow()[handle.0].input.is_some() {
      return false;
    }
    match input {
      Input::Node(source) => !self.reaches(source.handle, handle),
      Input::External(_) => true,
    }
  }

  /// Give a fresh node the caller's input. A node referenced twice keeps
  /// the first adoption.
  fn adopt(&self, handle: NodeHandle, input: &Input) {
    let mut nodes = self.nodes.borrow_mut();
    if nodes[handle.0].input.is_none() {
      nodes[handle.0].input = Some(input.clone());
      trace!(handle = handle.0, "input_adopted");
    }
  }

  /// Whether `target` is `from` or one of its transitive dependencies.
  fn reaches(&self, from: NodeHandle, target: NodeHandle) -> bool {
    let nodes = self.nodes.borrow();
    let mut seen = HashSet::new();
    let mut stack = vec![from];

    while let Some(handle) = stack.pop() {
      if handle == target {
        return true;
      }
      if !seen.insert(handle) {
        continue;
      }
      let node = &nodes[handle.0];
      if let Some(Input::Node(input)) = &node.input {
        stack.push(input.handle);
      }
      for arg in &node.args {
        arg.for_each_ref(&mut |r| stack.push(r.handle));
      }
    }
    false
  }

  /// Compute and record the id of `handle` and every node it depends on.
  ///
  /// Dependencies are walked with an explicit stack so long chains cannot
  /// exhaust the call stack.
  fn node_id(&self, handle: NodeHandle) -> NodeId {
    if let Some(id) = self.ids.borrow()[handle.0] {
      return id;
    }

    let mut stack = vec![(handle, false)];
    while let Some((current, expanded)) = stack.pop() {
      if self.ids.borrow()[current.0].is_some() {
        continue;
      }

      if !expanded {
        stack.push((current, true));
        let nodes = self.nodes.borrow();
        let node = &nodes[current.0];
        let ids = self.ids.borrow();
        let mut push = |r: NodeRef| {
          if ids[r.handle.0].is_none() {
            stack.push((r.handle, false));
          }
        };
        if let Some(Input::Node(input)) = &node.input {
          push(*input);
        }
        for arg in &node.args {
          arg.for_each_ref(&mut push);
        }
        continue;
      }

      let id = {
        let nodes = self.nodes.borrow();
        let node = &nodes[current.0];
        // Every dependency was recorded before `current` was popped again.
        digest(
          &node.operation.name,
          node.input.as_ref(),
          &node.args,
          &mut |r| {
            let known = self.ids.borrow()[r.handle.0];
            known.unwrap_or_else(|| self.node_id(r.handle))
          },
        )
      };
      self.ids.borrow_mut()[current.0] = Some(id);
    }

    let id = self.ids.borrow()[handle.0];
    id.unwrap_or_else(|| self.node_id(handle))
  }

  fn produces(&self, handle: NodeHandle) -> Option<Produces> {
    self
      .nodes
      .borrow()
      .get(handle.0)
      .map(|node| node.operation.produces.clone())
  }
}

impl fmt::Debug for Builder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Builder").field("nodes", &self.len()).finish()
  }
}

struct CallSite<'a> {
  builder: &'a Builder,
  name: &'a str,
}

impl Caller for CallSite<'_> {
  fn op_name(&self) -> &str {
    self.name
  }

  fn produces(&self, node: NodeHandle) -> Option<Produces> {
    self.builder.produces(node)
  }
}

/// A node in a build session, usable as an argument or as the start of a chain.
#[derive(Clone, Copy)]
pub struct Op<'b> {
  builder: &'b Builder,
  node: NodeRef,
}

impl<'b> Op<'b> {
  /// Call an operation chained from this node.
  pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Op<'b>, BindError> {
    self.builder.create(Some(Input::Node(self.node)), name, args)
  }

  /// This node's content id. Taking it freezes the node.
  pub fn id(&self) -> NodeId {
    self.builder.node_id(self.node.handle)
  }

  /// Refer to one element of a multi-valued output.
  pub fn select(self, index: usize) -> Op<'b> {
    Op {
      node: self.node.select(index),
      ..self
    }
  }

  pub fn handle(&self) -> NodeHandle {
    self.node.handle
  }

  pub fn node_ref(&self) -> NodeRef {
    self.node
  }

  pub fn produces(&self) -> Option<Produces> {
    self.builder.produces(self.node.handle)
  }

  pub fn builder(&self) -> &'b Builder {
    self.builder
  }
}

impl From<Op<'_>> for Value {
  fn from(op: Op<'_>) -> Self {
    Value::Op(op.node)
  }
}

impl fmt::Debug for Op<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Op").field("node", &self.node).finish()
  }
}

/// A node after its session closed.
#[derive(Debug, Clone)]
pub struct GraphNode {
  pub handle: NodeHandle,
  pub id: NodeId,
  pub operation: Arc<Operation>,
  pub input: Option<Input>,
  pub args: Vec<Value>,
}

/// Every node of a closed session, in creation order.
#[derive(Debug, Clone)]
pub struct Graph {
  nodes: Vec<GraphNode>,
  ids: Vec<NodeId>,
}

impl Graph {
  pub fn nodes(&self) -> &[GraphNode] {
    &self.nodes
  }

  pub fn id_of(&self, handle: NodeHandle) -> Option<NodeId> {
    self.ids.get(handle.0).copied()
  }

  pub fn node(&self, handle: NodeHandle) -> Option<&GraphNode> {
    self.nodes.get(handle.0)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Number of distinct ids.
  pub fn distinct(&self) -> usize {
    self.ids.iter().collect::<HashSet<_>>().len()
  }
}
