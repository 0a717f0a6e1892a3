use thiserror::Error;

/// Problems found while validating a plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("step id must not be empty")]
  EmptyStepId,

  #[error("step '{0}' is defined more than once")]
  DuplicateStep(String),

  #[error("step '{step}' refers to unknown step '{reference}'")]
  UnknownStep { step: String, reference: String },

  #[error("step '{step}' refers to unknown external '{key}'")]
  UnknownExternal { step: String, key: String },

  #[error("steps form a cycle through '{0}'")]
  Cycle(String),
}
