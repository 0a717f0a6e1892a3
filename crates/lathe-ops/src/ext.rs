//! Typed wrappers over `call` for the stock operations.

use lathe_graph::{Builder, Op};
use lathe_spec::{BindError, Value};

/// Stock operations callable without an input.
pub trait BuilderExt {
  fn number(&self, value: f64) -> Result<Op<'_>, BindError>;

  /// A list of numbers from literals, range descriptors or number ops.
  fn seq(&self, items: Vec<Value>) -> Result<Op<'_>, BindError>;

  fn point(&self, at: [f64; 3]) -> Result<Op<'_>, BindError>;

  /// A cube spanning `size`, which is a number or an interval.
  fn cube(&self, size: impl Into<Value>) -> Result<Op<'_>, BindError>;

  fn group(&self, shapes: &[Op<'_>]) -> Result<Op<'_>, BindError>;
}

impl BuilderExt for Builder {
  fn number(&self, value: f64) -> Result<Op<'_>, BindError> {
    self.call("number", vec![Value::Number(value)])
  }

  fn seq(&self, items: Vec<Value>) -> Result<Op<'_>, BindError> {
    self.call("seq", items)
  }

  fn point(&self, at: [f64; 3]) -> Result<Op<'_>, BindError> {
    self.call("point", vec![Value::from(at)])
  }

  fn cube(&self, size: impl Into<Value>) -> Result<Op<'_>, BindError> {
    self.call("box", vec![size.into()])
  }

  fn group(&self, shapes: &[Op<'_>]) -> Result<Op<'_>, BindError> {
    self.call("group", shapes.iter().copied().map(Value::from).collect())
  }
}

/// Stock operations chained from an existing node.
pub trait OpExt<'b> {
  fn add(&self, value: impl Into<Value>) -> Result<Op<'b>, BindError>;

  fn mul(&self, value: impl Into<Value>) -> Result<Op<'b>, BindError>;

  fn translate(&self, offset: [f64; 3]) -> Result<Op<'b>, BindError>;

  fn write(&self, path: &str) -> Result<Op<'b>, BindError>;
}

impl<'b> OpExt<'b> for Op<'b> {
  fn add(&self, value: impl Into<Value>) -> Result<Op<'b>, BindError> {
    self.call("add", vec![value.into()])
  }

  fn mul(&self, value: impl Into<Value>) -> Result<Op<'b>, BindError> {
    self.call("mul", vec![value.into()])
  }

  fn translate(&self, offset: [f64; 3]) -> Result<Op<'b>, BindError> {
    self.call("translate", vec![Value::from(offset)])
  }

  fn write(&self, path: &str) -> Result<Op<'b>, BindError> {
    self.call("write", vec![Value::from(path)])
  }
}
