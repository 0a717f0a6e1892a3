//! Operation definitions and the registry that names them.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use lathe_spec::{BindError, Binding, BoxError, HandlerRegistry, Param, Produces, Tag, Value};
use serde_json::Value as Json;

use crate::builder::Builder;
use crate::context::Context;
use crate::error::GraphError;
use crate::id::{Input, NodeId};

/// The body of an operation.
pub type Implementation = Arc<dyn Fn(OpCall) -> BoxFuture<'static, Result<Json, BoxError>> + Send + Sync>;

/// Rewrites raw call arguments before they are bound.
pub type Preprocess =
  Arc<dyn Fn(&Builder, Option<&Input>, Vec<Value>) -> Result<Vec<Value>, BindError> + Send + Sync>;

static NULL: Json = Json::Null;

/// A number as JSON. Integral values within the exactly representable
/// range stay integers so `5` reads back as `5`; non-finite values are `null`.
pub fn number_json(n: f64) -> Json {
  const SAFE: f64 = 9_007_199_254_740_992.0;
  if n.fract() == 0.0 && n.abs() <= SAFE {
    Json::from(n as i64)
  } else {
    serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number)
  }
}

/// One invocation of an operation with fully resolved values.
#[derive(Debug, Clone)]
pub struct OpCall {
  pub id: NodeId,
  pub context: Context,
  /// Value of the node this one is chained from.
  pub input: Option<Json>,
  /// Bound parameters, in declaration order. Unbound optionals are `null`.
  pub args: Vec<Json>,
}

impl OpCall {
  /// The `index`th argument, `null` when absent.
  pub fn arg(&self, index: usize) -> &Json {
    self.args.get(index).unwrap_or(&NULL)
  }

  pub fn number(&self, index: usize) -> Result<f64, BoxError> {
    self
      .arg(index)
      .as_f64()
      .ok_or_else(|| format!("argument {} is not a number: {}", index, self.arg(index)).into())
  }

  pub fn input_number(&self) -> Result<f64, BoxError> {
    match &self.input {
      Some(value) => value
        .as_f64()
        .ok_or_else(|| format!("input is not a number: {}", value).into()),
      None => Err("operation needs an input".into()),
    }
  }
}

/// A named operation: its parameters, declared output and implementation.
#[derive(Clone)]
pub struct Operation {
  pub name: String,
  pub params: Vec<Param>,
  pub produces: Produces,
  /// Always executed, even when a cached result exists.
  pub effectful: bool,
  pub preprocess: Option<Preprocess>,
  pub implementation: Implementation,
}

impl Operation {
  pub fn new<F, Fut>(name: impl Into<String>, produces: Produces, body: F) -> Self
  where
    F: Fn(OpCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Json, BoxError>> + Send + 'static,
  {
    Self {
      name: name.into(),
      params: Vec::new(),
      produces,
      effectful: false,
      preprocess: None,
      implementation: Arc::new(move |call| body(call).boxed()),
    }
  }

  /// An operation whose body does not await anything.
  pub fn sync<F>(name: impl Into<String>, produces: Produces, body: F) -> Self
  where
    F: Fn(OpCall) -> Result<Json, BoxError> + Send + Sync + 'static,
  {
    let body = Arc::new(body);
    Self::new(name, produces, move |call| {
      let body = body.clone();
      async move { body(call) }
    })
  }

  pub fn param(mut self, param: Param) -> Self {
    self.params.push(param);
    self
  }

  pub fn params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
    self.params.extend(params);
    self
  }

  pub fn effectful(mut self) -> Self {
    self.effectful = true;
    self
  }

  pub fn preprocess<F>(mut self, preprocess: F) -> Self
  where
    F: Fn(&Builder, Option<&Input>, Vec<Value>) -> Result<Vec<Value>, BindError> + Send + Sync + 'static,
  {
    self.preprocess = Some(Arc::new(preprocess));
    self
  }

  pub fn invoke(&self, call: OpCall) -> BoxFuture<'static, Result<Json, BoxError>> {
    (self.implementation)(call)
  }
}

impl fmt::Debug for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Operation")
      .field("name", &self.name)
      .field("params", &self.params)
      .field("produces", &self.produces)
      .field("effectful", &self.effectful)
      .field("preprocess", &self.preprocess.is_some())
      .finish()
  }
}

/// Every operation callable in a build, plus the spec handlers that bind
/// their arguments.
#[derive(Debug, Default)]
pub struct OperationRegistry {
  operations: HashMap<String, Arc<Operation>>,
  handlers: HandlerRegistry,
}

impl OperationRegistry {
  /// An empty registry using the built-in spec handlers.
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, operation: Operation) -> Result<(), GraphError> {
    if self.operations.contains_key(&operation.name) {
      return Err(GraphError::DuplicateOperation {
        name: operation.name,
      });
    }
    self
      .operations
      .insert(operation.name.clone(), Arc::new(operation));
    Ok(())
  }

  /// Add a spec handler for tags not covered by the built-ins.
  pub fn register_handler<P, H>(&mut self, predicate: P, handler: H)
  where
    P: Fn(&Tag) -> bool + Send + Sync + 'static,
    H: Fn(&Binding<'_>, &Tag, &mut VecDeque<Value>, &mut Vec<Value>) -> Result<Option<Value>, BindError>
      + Send
      + Sync
      + 'static,
  {
    self.handlers.register(predicate, handler);
  }

  pub fn get(&self, name: &str) -> Option<&Arc<Operation>> {
    self.operations.get(name)
  }

  pub fn handlers(&self) -> &HandlerRegistry {
    &self.handlers
  }

  /// Registered operation names, sorted.
  pub fn names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }

  pub fn len(&self) -> usize {
    self.operations.len()
  }

  pub fn is_empty(&self) -> bool {
    self.operations.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn id() -> NodeId {
    "0000000000000000000000000000000000000000000000000000000000000000"
      .parse()
      .unwrap()
  }

  #[test]
  fn test_number_json_keeps_integers_integral() {
    assert_eq!(number_json(5.0), json!(5));
    assert_eq!(number_json(-0.0), json!(0));
    assert_eq!(number_json(0.125), json!(0.125));
    assert_eq!(number_json(9_007_199_254_740_992.0), json!(9_007_199_254_740_992_i64));
    assert_eq!(number_json(1.0e300), json!(1.0e300));
    assert_eq!(number_json(f64::NAN), Json::Null);
  }

  #[test]
  fn test_duplicate_operation_is_rejected() {
    let mut registry = OperationRegistry::new();
    registry
      .register(Operation::sync("a", Produces::one("number"), |_| Ok(json!(1))))
      .unwrap();

    let err = registry
      .register(Operation::sync("a", Produces::one("number"), |_| Ok(json!(2))))
      .unwrap_err();
    assert_eq!(
      err,
      GraphError::DuplicateOperation {
        name: "a".to_string()
      }
    );
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn test_names_are_sorted() {
    let mut registry = OperationRegistry::new();
    for name in ["mul", "add", "box"] {
      registry
        .register(Operation::sync(name, Produces::one("number"), |_| Ok(json!(null))))
        .unwrap();
    }
    assert_eq!(registry.names(), vec!["add", "box", "mul"]);
  }

  #[tokio::test]
  async fn test_sync_operation_invoke() {
    let add = Operation::sync("add", Produces::one("number"), |call| {
      Ok(json!(call.input_number()? + call.number(0)?))
    })
    .param(Param::required(Tag::Number));

    let call = OpCall {
      id: id(),
      context: Context::new(),
      input: Some(json!(2)),
      args: vec![json!(3)],
    };
    assert_eq!(add.invoke(call).await.unwrap(), json!(5.0));
  }

  #[tokio::test]
  async fn test_call_helpers_report_bad_arguments() {
    let call = OpCall {
      id: id(),
      context: Context::new(),
      input: None,
      args: vec![json!("x")],
    };
    assert!(call.number(0).is_err());
    assert!(call.input_number().is_err());
    assert_eq!(call.arg(4), &Json::Null);
  }
}
