use thiserror::Error;

/// Errors in assembling an operation registry or handling node ids.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
  /// Two operations were registered under the same name.
  #[error("operation '{name}' is already registered")]
  DuplicateOperation { name: String },

  /// A string is not a 64 character hex node id.
  #[error("invalid node id: {0}")]
  InvalidNodeId(String),
}
