use thiserror::Error;

/// Error type for result store operations.
#[derive(Debug, Error)]
pub enum StoreError {
  /// The id cannot be used as a storage key.
  #[error("invalid result id: {0}")]
  InvalidId(String),

  /// A stored entry could not be encoded or decoded.
  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}
