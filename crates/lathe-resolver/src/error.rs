use std::error::Error;
use std::fmt;
use std::sync::Arc;

use lathe_graph::NodeId;
use lathe_spec::{BindError, BoxError};
use thiserror::Error;

/// An operation's error, shared by every node that depended on it.
#[derive(Debug, Clone)]
pub struct SharedError(Arc<BoxError>);

impl SharedError {
  pub fn new(error: BoxError) -> Self {
    Self(Arc::new(error))
  }

  pub(crate) fn from_arc(error: Arc<BoxError>) -> Self {
    Self(error)
  }

  /// The error exactly as the implementation returned it.
  pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
    &**self.0
  }

  pub fn downcast_ref<T: Error + 'static>(&self) -> Option<&T> {
    self.0.downcast_ref()
  }
}

impl fmt::Display for SharedError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.0, f)
  }
}

impl Error for SharedError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    self.0.source()
  }
}

impl PartialEq for SharedError {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

/// Errors that fail a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
  /// The graph could not be built.
  #[error("failed to build graph: {0}")]
  Bind(#[from] BindError),

  /// An operation implementation failed. Nodes depending on it fail with
  /// this same value.
  #[error("operation '{op}' failed at node {node_id}: {source}")]
  Evaluation {
    op: String,
    node_id: NodeId,
    #[source]
    source: SharedError,
  },

  /// A pending external value failed.
  #[error("external value '{key}' failed: {source}")]
  External {
    key: String,
    #[source]
    source: SharedError,
  },

  /// A selection indexed past the end of a node's output.
  #[error("node {node_id} has no output element {index}")]
  Selection { node_id: NodeId, index: usize },

  /// A reference to a node that was not part of the run.
  #[error("node #{handle} is not part of this run")]
  MissingNode { handle: usize },

  /// The run was dropped before its nodes were released.
  #[error("run aborted before evaluation started")]
  Aborted,
}

impl ResolveError {
  /// Id of the node whose implementation failed, if any.
  pub fn node_id(&self) -> Option<NodeId> {
    match self {
      ResolveError::Evaluation { node_id, .. } | ResolveError::Selection { node_id, .. } => Some(*node_id),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Error)]
  #[error("disk full")]
  struct DiskFull;

  #[test]
  fn test_shared_error_keeps_the_original() {
    let shared = SharedError::new(Box::new(DiskFull));
    assert_eq!(shared.to_string(), "disk full");
    assert!(shared.downcast_ref::<DiskFull>().is_some());
    assert_eq!(shared.clone(), shared);
    assert_ne!(shared, SharedError::new(Box::new(DiskFull)));
  }
}
