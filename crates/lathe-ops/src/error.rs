use thiserror::Error;

/// Failures raised by the stock operation implementations.
#[derive(Debug, Error)]
pub enum OpsError {
  #[error("'{op}' expected {expected}, got {got}")]
  Type {
    op: &'static str,
    expected: &'static str,
    got: String,
  },

  #[error("'{op}' must be chained from a value")]
  MissingInput { op: &'static str },

  #[error("failed to write '{path}': {source}")]
  Write {
    path: String,
    #[source]
    source: std::io::Error,
  },
}

impl OpsError {
  pub(crate) fn type_error(op: &'static str, expected: &'static str, got: &serde_json::Value) -> Self {
    OpsError::Type {
      op,
      expected,
      got: got.to_string(),
    }
  }
}
