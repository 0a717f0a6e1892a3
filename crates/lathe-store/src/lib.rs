//! Lathe Store
//!
//! Cross-run result stores. A resolved node's value is saved under the
//! node's content id so a later run building the same node can skip the
//! evaluation entirely.
//!
//! The [`ResultStore`] trait is the only thing the resolver depends on.
//! [`InMemoryResultStore`] lives for the lifetime of the process and
//! [`FsResultStore`] persists results as JSON files.

mod error;
mod fs;
mod memory;

pub use error::StoreError;
pub use fs::FsResultStore;
pub use memory::InMemoryResultStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A cached node value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
  pub value: serde_json::Value,
}

impl StoredResult {
  pub fn new(value: serde_json::Value) -> Self {
    Self { value }
  }
}

/// Result store keyed by node content id.
///
/// Implementations must tolerate concurrent reads of the same id.
#[async_trait]
pub trait ResultStore: Send + Sync {
  /// Look up a previous result. A missing entry is `Ok(None)`.
  async fn get_result(&self, id: &str) -> Result<Option<StoredResult>, StoreError>;

  /// Save a result, replacing any previous entry.
  async fn set_result(&self, id: &str, result: StoredResult) -> Result<(), StoreError>;

  /// Forget a result. Removing a missing entry is not an error.
  async fn remove_result(&self, id: &str) -> Result<(), StoreError>;
}
