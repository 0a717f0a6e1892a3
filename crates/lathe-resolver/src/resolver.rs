//! Graph evaluation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared, join_all};
use lathe_graph::{Builder, Context, Graph, Input, NodeId, OpCall, OperationRegistry, number_json};
use lathe_spec::{BindError, External, NodeRef, Value};
use serde_json::Value as Json;
use tokio::sync::watch;
use tracing::{Span, debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::cache::invoke_cached;
use crate::error::{ResolveError, SharedError};
use crate::result::{CacheCounters, Resolution, ResolvedGraph};

type NodeFuture = Shared<BoxFuture<'static, Result<Json, ResolveError>>>;

/// Builds graphs against a fixed operation registry and evaluates them.
#[derive(Debug, Clone)]
pub struct Resolver {
  registry: Arc<OperationRegistry>,
}

/// State shared by every node future of one run.
struct Scope {
  graph: Graph,
  context: Context,
  futures: Mutex<HashMap<NodeId, NodeFuture>>,
  release: watch::Receiver<bool>,
  counters: CacheCounters,
}

impl Resolver {
  pub fn new(registry: Arc<OperationRegistry>) -> Self {
    Self { registry }
  }

  pub fn registry(&self) -> &Arc<OperationRegistry> {
    &self.registry
  }

  /// Run a build closure in a fresh session without evaluating anything.
  pub fn build<R>(&self, build: impl FnOnce(&Builder) -> Result<R, BindError>) -> Result<(R, Graph), BindError> {
    let builder = Builder::new(self.registry.clone());
    let output = build(&builder)?;
    Ok((output, builder.finish()))
  }

  /// Build a graph and evaluate every distinct node in it exactly once.
  ///
  /// Nodes run interleaved on the calling task. Each one starts only after
  /// every node has been registered, then waits for its input and argument
  /// references to settle. If any node fails, the run fails with the first
  /// failure in creation order once all nodes have settled.
  #[instrument(name = "resolver_run", skip_all, fields(run_id = tracing::field::Empty))]
  pub async fn run<R>(
    &self,
    context: Context,
    build: impl FnOnce(&Builder) -> Result<R, BindError>,
  ) -> Result<Resolution<R>, ResolveError> {
    let run_id = Uuid::new_v4();
    Span::current().record("run_id", tracing::field::display(&run_id));

    let (output, graph) = self.build(build).inspect_err(|e| {
      error!(run_id = %run_id, error = %e, "build_failed");
    })?;

    let (release, latch) = watch::channel(false);
    let scope = Arc::new(Scope {
      graph,
      context,
      futures: Mutex::new(HashMap::new()),
      release: latch,
      counters: CacheCounters::default(),
    });
    let _futures = ClearFutures(scope.clone());

    let mut order = Vec::new();
    {
      let mut futures = lock(&scope.futures);
      for (index, node) in scope.graph.nodes().iter().enumerate() {
        if futures.contains_key(&node.id) {
          continue;
        }
        let future = evaluate(scope.clone(), index).boxed().shared();
        futures.insert(node.id, future);
        order.push(node.id);
      }
    }

    info!(
      run_id = %run_id,
      nodes = scope.graph.len(),
      distinct = order.len(),
      "run_started"
    );

    release.send_replace(true);

    let pending: Vec<NodeFuture> = {
      let futures = lock(&scope.futures);
      order.iter().filter_map(|id| futures.get(id).cloned()).collect()
    };
    let results = join_all(pending).await;

    let mut graph = ResolvedGraph::with_capacity(order.len());
    let mut failure = None;
    for (id, result) in order.into_iter().zip(results) {
      match result {
        Ok(value) => graph.insert(id, value),
        Err(e) => {
          failure.get_or_insert(e);
        }
      }
    }

    let stats = scope.counters.snapshot();

    if let Some(e) = failure {
      error!(run_id = %run_id, error = %e, "run_failed");
      return Err(e);
    }

    info!(
      run_id = %run_id,
      values = graph.len(),
      cache_hits = stats.hits,
      evaluations = stats.evaluations,
      "run_completed"
    );

    Ok(Resolution {
      run_id,
      output,
      graph,
      stats,
    })
  }
}

/// Node futures hold the scope that holds them. Emptying the table when
/// `run` returns or is dropped mid-flight breaks that cycle.
struct ClearFutures(Arc<Scope>);

impl Drop for ClearFutures {
  fn drop(&mut self) {
    let futures = std::mem::take(&mut *lock(&self.0.futures));
    drop(futures);
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn evaluate(scope: Arc<Scope>, index: usize) -> Result<Json, ResolveError> {
  let mut release = scope.release.clone();
  release
    .wait_for(|released| *released)
    .await
    .map_err(|_| ResolveError::Aborted)?;

  let node = scope
    .graph
    .nodes()
    .get(index)
    .ok_or(ResolveError::MissingNode { handle: index })?;

  let input = match &node.input {
    None => None,
    Some(Input::Node(input)) => Some(scope.reference(*input).await?),
    Some(Input::External(external)) => Some(external_value(external).await?),
  };

  let mut args = Vec::with_capacity(node.args.len());
  for arg in &node.args {
    args.push(scope.resolve(arg).await?);
  }

  debug!(op = %node.operation.name, node_id = %node.id, "node_started");

  let call = OpCall {
    id: node.id,
    context: scope.context.clone(),
    input,
    args,
  };

  match invoke_cached(&node.operation, call, &scope.counters).await {
    Ok(value) => {
      debug!(op = %node.operation.name, node_id = %node.id, "node_completed");
      Ok(value)
    }
    Err(e) => {
      warn!(op = %node.operation.name, node_id = %node.id, error = %e, "node_failed");
      Err(ResolveError::Evaluation {
        op: node.operation.name.clone(),
        node_id: node.id,
        source: SharedError::new(e),
      })
    }
  }
}

impl Scope {
  /// Await another node's value, applying any selection.
  async fn reference(&self, node: NodeRef) -> Result<Json, ResolveError> {
    let id = self
      .graph
      .id_of(node.handle)
      .ok_or(ResolveError::MissingNode { handle: node.handle.0 })?;

    let future = lock(&self.futures).get(&id).cloned();
    let value = match future {
      Some(future) => future.await?,
      None => return Err(ResolveError::MissingNode { handle: node.handle.0 }),
    };

    match node.select {
      None => Ok(value),
      Some(index) => match value {
        Json::Array(mut items) if index < items.len() => Ok(items.swap_remove(index)),
        _ => Err(ResolveError::Selection { node_id: id, index }),
      },
    }
  }

  /// Turn a bound argument into the plain value an implementation receives.
  fn resolve<'a>(&'a self, value: &'a Value) -> BoxFuture<'a, Result<Json, ResolveError>> {
    async move {
      match value {
        Value::Undefined | Value::Null => Ok(Json::Null),
        Value::Bool(b) => Ok(Json::Bool(*b)),
        Value::Number(n) => Ok(number_json(*n)),
        Value::String(s) => Ok(Json::String(s.clone())),
        Value::List(items) => {
          let mut out = Vec::with_capacity(items.len());
          for item in items {
            out.push(self.resolve(item).await?);
          }
          Ok(Json::Array(out))
        }
        Value::Keyed(map) => {
          let mut out = serde_json::Map::new();
          for (key, item) in map {
            out.insert(key.clone(), self.resolve(item).await?);
          }
          Ok(Json::Object(out))
        }
        Value::Op(node) => self.reference(*node).await,
        Value::External(external) => external_value(external).await,
      }
    }
    .boxed()
  }
}

async fn external_value(external: &External) -> Result<Json, ResolveError> {
  external
    .value()
    .await
    .map_err(|e| ResolveError::External {
      key: external.key().to_string(),
      source: SharedError::from_arc(e),
    })
}
