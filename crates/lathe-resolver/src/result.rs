use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use lathe_graph::NodeId;
use serde::Serialize;
use serde_json::Value as Json;
use uuid::Uuid;

/// Result cache activity during one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
  pub hits: u64,
  pub misses: u64,
  pub writes: u64,
  /// Implementation invocations.
  pub evaluations: u64,
}

#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
  hits: AtomicU64,
  misses: AtomicU64,
  writes: AtomicU64,
  evaluations: AtomicU64,
}

impl CacheCounters {
  pub(crate) fn hit(&self) {
    self.hits.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn miss(&self) {
    self.misses.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn write(&self) {
    self.writes.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn evaluation(&self) {
    self.evaluations.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn snapshot(&self) -> CacheStats {
    CacheStats {
      hits: self.hits.load(Ordering::Relaxed),
      misses: self.misses.load(Ordering::Relaxed),
      writes: self.writes.load(Ordering::Relaxed),
      evaluations: self.evaluations.load(Ordering::Relaxed),
    }
  }
}

/// Final value of every distinct node in a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedGraph {
  values: HashMap<NodeId, Json>,
  #[serde(skip)]
  order: Vec<NodeId>,
}

impl ResolvedGraph {
  pub(crate) fn with_capacity(capacity: usize) -> Self {
    Self {
      values: HashMap::with_capacity(capacity),
      order: Vec::with_capacity(capacity),
    }
  }

  pub(crate) fn insert(&mut self, id: NodeId, value: Json) {
    if self.values.insert(id, value).is_none() {
      self.order.push(id);
    }
  }

  pub fn get(&self, id: &NodeId) -> Option<&Json> {
    self.values.get(id)
  }

  pub fn contains(&self, id: &NodeId) -> bool {
    self.values.contains_key(id)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Entries in the order their nodes were first created.
  pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Json)> {
    self
      .order
      .iter()
      .filter_map(|id| self.values.get(id).map(|value| (id, value)))
  }

  pub fn into_map(self) -> HashMap<NodeId, Json> {
    self.values
  }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct Resolution<R> {
  pub run_id: Uuid,
  /// Whatever the build closure returned.
  pub output: R,
  pub graph: ResolvedGraph,
  pub stats: CacheStats,
}

impl<R> Resolution<R> {
  pub fn value(&self, id: &NodeId) -> Option<&Json> {
    self.graph.get(id)
  }
}
