use std::collections::VecDeque;

use lathe_graph::{OpCall, Operation, number_json};
use lathe_spec::{BindError, Binding, BoxError, NUMBERS, Param, Produces, Tag, Value};
use serde_json::{Value as Json, json};

use crate::NUMBER;
use crate::error::OpsError;

const SCALAR: &str = "scalar";

/// A number, or a reference to an operation producing one.
pub fn scalar() -> Tag {
  Tag::custom(SCALAR)
}

pub(crate) fn is_scalar(tag: &Tag) -> bool {
  matches!(tag, Tag::Custom(name) if name == SCALAR)
}

/// Spec handler for [`scalar`] parameters.
pub fn bind_scalar(
  cx: &Binding<'_>,
  _: &Tag,
  args: &mut VecDeque<Value>,
  overflow: &mut Vec<Value>,
) -> Result<Option<Value>, BindError> {
  match args.pop_front() {
    None | Some(Value::Undefined) => Ok(None),
    Some(Value::Number(n)) => Ok(Some(Value::Number(n))),
    Some(Value::Op(node)) if cx.produces(node.handle).is_some_and(|p| p.is(NUMBER)) => {
      Ok(Some(Value::Op(node)))
    }
    Some(other) => {
      overflow.push(other);
      Ok(None)
    }
  }
}

pub(crate) fn operations() -> Vec<Operation> {
  vec![
    Operation::sync("number", Produces::one(NUMBER), |call| Ok(call.arg(0).clone()))
      .param(Param::required(Tag::Number)),
    Operation::sync("add", Produces::one(NUMBER), |call| {
      Ok(number_json(input(&call, "add")? + call.number(0)?))
    })
    .param(Param::required(scalar())),
    Operation::sync("mul", Produces::one(NUMBER), |call| {
      Ok(number_json(input(&call, "mul")? * call.number(0)?))
    })
    .param(Param::required(scalar())),
    Operation::sync("seq", Produces::one(NUMBERS), |call| {
      let mut numbers = Vec::new();
      flatten("seq", call.arg(0), &mut numbers)?;
      Ok(json!(numbers.into_iter().map(number_json).collect::<Vec<_>>()))
    })
    .param(Param::required(Tag::Numbers)),
    Operation::sync("sum", Produces::one(NUMBER), |call| {
      let mut numbers = Vec::new();
      if let Some(input) = &call.input {
        flatten("sum", input, &mut numbers)?;
      }
      flatten("sum", call.arg(0), &mut numbers)?;
      Ok(number_json(numbers.into_iter().sum()))
    })
    .param(Param::required(Tag::Numbers)),
  ]
}

fn input(call: &OpCall, op: &'static str) -> Result<f64, BoxError> {
  match &call.input {
    None => Err(OpsError::MissingInput { op }.into()),
    Some(value) => value
      .as_f64()
      .ok_or_else(|| OpsError::type_error(op, "a number", value).into()),
  }
}

/// Collect numbers from a number or an arbitrarily nested list of them.
fn flatten(op: &'static str, value: &Json, out: &mut Vec<f64>) -> Result<(), OpsError> {
  match value {
    Json::Number(n) => {
      out.push(n.as_f64().unwrap_or(f64::NAN));
      Ok(())
    }
    Json::Array(items) => items.iter().try_for_each(|item| flatten(op, item, out)),
    other => Err(OpsError::type_error(op, "numbers", other)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_flatten_nested() {
    let mut out = Vec::new();
    flatten("sum", &json!([1, [2.5, [3]], 4]), &mut out).unwrap();
    assert_eq!(out, vec![1.0, 2.5, 3.0, 4.0]);
  }

  #[test]
  fn test_flatten_rejects_non_numbers() {
    let mut out = Vec::new();
    let err = flatten("sum", &json!([1, "two"]), &mut out).unwrap_err();
    assert_eq!(err.to_string(), "'sum' expected numbers, got \"two\"");
  }

  #[test]
  fn test_is_scalar() {
    assert!(is_scalar(&scalar()));
    assert!(!is_scalar(&Tag::Number));
  }
}
