//! Cross-run result caching around operation implementations.

use lathe_graph::{OpCall, Operation};
use lathe_spec::BoxError;
use lathe_store::StoredResult;
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::result::CacheCounters;

/// Invoke `operation`, short-circuiting through the context's result store.
///
/// A stored result is returned without invoking the implementation unless
/// the operation is effectful. Every fresh result is written back. Store
/// failures never fail the node: a failed read is a miss and a failed write
/// is dropped.
pub(crate) async fn invoke_cached(
  operation: &Operation,
  call: OpCall,
  counters: &CacheCounters,
) -> Result<Json, BoxError> {
  let store = call.context.store().cloned();
  let key = call.id.to_hex();

  if let Some(store) = store.as_ref().filter(|_| !operation.effectful) {
    match store.get_result(&key).await {
      Ok(Some(stored)) => {
        counters.hit();
        debug!(op = %operation.name, node_id = %key, "cache_hit");
        return Ok(stored.value);
      }
      Ok(None) => counters.miss(),
      Err(e) => {
        counters.miss();
        warn!(op = %operation.name, node_id = %key, error = %e, "cache_read_failed");
      }
    }
  }

  counters.evaluation();
  let value = operation.invoke(call).await?;

  if let Some(store) = &store {
    match store.set_result(&key, StoredResult::new(value.clone())).await {
      Ok(()) => counters.write(),
      Err(e) => warn!(op = %operation.name, node_id = %key, error = %e, "cache_write_failed"),
    }
  }

  Ok(value)
}
