//! Binding errors.

use thiserror::Error;

/// Errors raised while turning call arguments into bound parameters.
///
/// All of these surface synchronously at graph-construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
  /// No operation with this name is registered.
  #[error("unknown operation '{name}'")]
  UnknownOperation { name: String },

  /// No spec handler matches the tag.
  #[error("no spec handler for tag '{tag}' in '{op}'")]
  NoHandler { op: String, tag: String },

  /// More than one spec handler matches the tag.
  #[error("{count} spec handlers match tag '{tag}' in '{op}'")]
  AmbiguousHandler {
    op: String,
    tag: String,
    count: usize,
  },

  /// A required parameter could not be matched.
  #[error("missing required '{tag}' argument for '{op}'")]
  MissingArgument { op: String, tag: String },

  /// Arguments remained after the last parameter was bound.
  #[error("'{op}' received {count} unexpected argument(s): {rest}")]
  ExtraArguments {
    op: String,
    count: usize,
    rest: String,
  },

  /// A matched value failed the tag's validity check.
  #[error("invalid '{tag}' argument for '{op}': {message}")]
  Coercion {
    op: String,
    tag: String,
    message: String,
  },

  /// An argument references a node outside the current build session.
  #[error("'{op}' references unknown node #{handle}")]
  UnknownNode { op: String, handle: usize },

  /// An operation's args preprocessor rejected the call.
  #[error("failed to prepare arguments for '{op}': {message}")]
  Preprocess { op: String, message: String },
}
