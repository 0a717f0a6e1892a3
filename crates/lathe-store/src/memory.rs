use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{ResultStore, StoreError, StoredResult};

/// In-memory result store.
///
/// Entries are kept as serialized JSON text so a read hands back a fresh
/// copy, the same as a persistent store would. Suitable for tests and for
/// sharing results between runs within one process.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
  data: RwLock<HashMap<String, String>>,
}

impl InMemoryResultStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of stored results.
  pub async fn len(&self) -> usize {
    self.data.read().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.data.read().await.is_empty()
  }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
  async fn get_result(&self, id: &str) -> Result<Option<StoredResult>, StoreError> {
    let data = self.data.read().await;
    match data.get(id) {
      Some(text) => Ok(Some(serde_json::from_str(text)?)),
      None => Ok(None),
    }
  }

  async fn set_result(&self, id: &str, result: StoredResult) -> Result<(), StoreError> {
    let text = serde_json::to_string(&result)?;
    self.data.write().await.insert(id.to_string(), text);
    Ok(())
  }

  async fn remove_result(&self, id: &str) -> Result<(), StoreError> {
    self.data.write().await.remove(id);
    Ok(())
  }
}
