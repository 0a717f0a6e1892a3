//! Raw argument and bound parameter values.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};

/// Boxed error returned by operation implementations and external values.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A keyed value: string keys in canonical (sorted) order.
pub type Keyed = BTreeMap<String, Value>;

/// A pending external value that any number of consumers can await.
pub type ExternalFuture = Shared<BoxFuture<'static, Result<serde_json::Value, Arc<BoxError>>>>;

/// Index of a node in the build session that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub usize);

/// A reference to another node, optionally selecting one element of its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
  pub handle: NodeHandle,
  pub select: Option<usize>,
}

impl NodeRef {
  pub fn new(handle: NodeHandle) -> Self {
    Self {
      handle,
      select: None,
    }
  }

  /// Reference only the `index`th element of the node's output.
  pub fn select(self, index: usize) -> Self {
    Self {
      select: Some(index),
      ..self
    }
  }
}

/// Where an external value comes from.
#[derive(Clone)]
pub enum ExternalSource {
  Ready(serde_json::Value),
  Pending(ExternalFuture),
}

/// A value supplied from outside the graph.
///
/// The graph never looks inside an external value when computing identities;
/// the caller-chosen `key` stands in for it.
#[derive(Clone)]
pub struct External {
  key: String,
  source: ExternalSource,
}

impl External {
  /// A value that is already known.
  ///
  /// Node ids see only `key`, so results cached for one value are served
  /// for any other value given the same key. Use a key that changes with
  /// the value, or [`External::content`].
  pub fn ready(key: impl Into<String>, value: serde_json::Value) -> Self {
    Self {
      key: key.into(),
      source: ExternalSource::Ready(value),
    }
  }

  /// A ready value keyed by its own serialized form, so ids and cached
  /// results follow the value.
  pub fn content(value: serde_json::Value) -> Self {
    Self::ready(format!("content:{}", value), value)
  }

  /// A value that settles later. As with [`External::ready`], the key alone
  /// identifies it to node ids and the result cache.
  pub fn pending<F>(key: impl Into<String>, future: F) -> Self
  where
    F: Future<Output = Result<serde_json::Value, BoxError>> + Send + 'static,
  {
    Self {
      key: key.into(),
      source: ExternalSource::Pending(future.map(|r| r.map_err(Arc::new)).boxed().shared()),
    }
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  pub fn source(&self) -> &ExternalSource {
    &self.source
  }

  /// Wait for the value, if it is still pending.
  pub async fn value(&self) -> Result<serde_json::Value, Arc<BoxError>> {
    match &self.source {
      ExternalSource::Ready(value) => Ok(value.clone()),
      ExternalSource::Pending(future) => future.clone().await,
    }
  }
}

impl fmt::Debug for External {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = match &self.source {
      ExternalSource::Ready(_) => "ready",
      ExternalSource::Pending(_) => "pending",
    };
    f.debug_struct("External")
      .field("key", &self.key)
      .field("state", &state)
      .finish()
  }
}

impl PartialEq for External {
  fn eq(&self, other: &Self) -> bool {
    self.key == other.key
  }
}

/// A raw call argument, or a parameter value after binding.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
  /// Nothing was supplied.
  #[default]
  Undefined,
  Null,
  Bool(bool),
  Number(f64),
  String(String),
  List(Vec<Value>),
  Keyed(Keyed),
  Op(NodeRef),
  External(External),
}

impl Value {
  pub fn is_undefined(&self) -> bool {
    matches!(self, Value::Undefined)
  }

  pub fn is_number(&self) -> bool {
    matches!(self, Value::Number(_))
  }

  pub fn is_string(&self) -> bool {
    matches!(self, Value::String(_))
  }

  pub fn is_bool(&self) -> bool {
    matches!(self, Value::Bool(_))
  }

  /// An ordered triple of numbers.
  pub fn is_vector3(&self) -> bool {
    match self {
      Value::List(items) => items.len() == 3 && items.iter().all(Value::is_number),
      _ => false,
    }
  }

  pub fn as_number(&self) -> Option<f64> {
    match self {
      Value::Number(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[Value]> {
    match self {
      Value::List(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_keyed(&self) -> Option<&Keyed> {
    match self {
      Value::Keyed(map) => Some(map),
      _ => None,
    }
  }

  pub fn as_op(&self) -> Option<NodeRef> {
    match self {
      Value::Op(node) => Some(*node),
      _ => None,
    }
  }

  /// Visit every node reference in this value, depth first.
  pub fn for_each_ref(&self, f: &mut impl FnMut(NodeRef)) {
    match self {
      Value::Op(node) => f(*node),
      Value::List(items) => items.iter().for_each(|item| item.for_each_ref(f)),
      Value::Keyed(map) => map.values().for_each(|item| item.for_each_ref(f)),
      _ => {}
    }
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Value::Number(value)
  }
}

impl From<f32> for Value {
  fn from(value: f32) -> Self {
    Value::Number(value as f64)
  }
}

impl From<i32> for Value {
  fn from(value: i32) -> Self {
    Value::Number(value as f64)
  }
}

impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Value::Number(value as f64)
  }
}

impl From<u32> for Value {
  fn from(value: u32) -> Self {
    Value::Number(value as f64)
  }
}

impl From<usize> for Value {
  fn from(value: usize) -> Self {
    Value::Number(value as f64)
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Value::Bool(value)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::String(value.to_string())
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Value::String(value)
  }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
  fn from(items: Vec<T>) -> Self {
    Value::List(items.into_iter().map(Into::into).collect())
  }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
  fn from(items: [T; N]) -> Self {
    Value::List(items.into_iter().map(Into::into).collect())
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(value: Option<T>) -> Self {
    value.map(Into::into).unwrap_or(Value::Undefined)
  }
}

impl From<Keyed> for Value {
  fn from(map: Keyed) -> Self {
    Value::Keyed(map)
  }
}

impl From<NodeRef> for Value {
  fn from(node: NodeRef) -> Self {
    Value::Op(node)
  }
}

impl From<External> for Value {
  fn from(external: External) -> Self {
    Value::External(external)
  }
}

impl From<serde_json::Value> for Value {
  fn from(json: serde_json::Value) -> Self {
    match json {
      serde_json::Value::Null => Value::Null,
      serde_json::Value::Bool(b) => Value::Bool(b),
      serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
      serde_json::Value::String(s) => Value::String(s),
      serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
      serde_json::Value::Object(map) => {
        Value::Keyed(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
      }
    }
  }
}

/// Build a raw argument list, converting each element with `Value::from`.
#[macro_export]
macro_rules! args {
  () => {
    ::std::vec::Vec::<$crate::Value>::new()
  };
  ($($arg:expr),+ $(,)?) => {
    ::std::vec![$($crate::Value::from($arg)),+]
  };
}

/// Build a keyed value: `keyed! { "by" => 0.5, "lt" => 2 }`.
#[macro_export]
macro_rules! keyed {
  ($($key:expr => $value:expr),* $(,)?) => {{
    #[allow(unused_mut)]
    let mut map = $crate::Keyed::new();
    $(map.insert(::std::string::String::from($key), $crate::Value::from($value));)*
    $crate::Value::Keyed(map)
  }};
}
