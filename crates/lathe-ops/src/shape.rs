//! Shape records.
//!
//! A point is `{"kind": "point", "at": [x, y, z]}`; a box is
//! `{"kind": "box", "min": [..], "max": [..]}`. Groups are lists of shapes.

use lathe_graph::{OpCall, Operation, number_json};
use lathe_spec::{BoxError, Param, Produces, SHAPE, Tag, Value};
use serde_json::{Value as Json, json};

use crate::error::OpsError;

const AXES: [&str; 3] = ["x", "y", "z"];

pub(crate) fn operations() -> Vec<Operation> {
  vec![
    Operation::sync("point", Produces::one(SHAPE), |call| {
      let at = vector("point", call.arg(0))?;
      Ok(json!({ "kind": "point", "at": coords(at) }))
    })
    .param(Param::with_default(Tag::Vector3, [0, 0, 0])),
    Operation::sync("box", Produces::one(SHAPE), make_box).params([
      Param::with_default(Tag::Interval, 1),
      Param::optional(Tag::options(AXES.map(|axis| (axis, Tag::Interval)))),
    ]),
    Operation::sync("translate", Produces::one(SHAPE), |call| {
      let offset = vector("translate", call.arg(0))?;
      let shape = call
        .input
        .as_ref()
        .ok_or(OpsError::MissingInput { op: "translate" })?;
      Ok(translate(shape, offset)?)
    })
    .param(Param::required(Tag::Vector3))
    .preprocess(|_, _, args| Ok(args.into_iter().map(offset_from_keyed).collect())),
    Operation::sync("group", Produces::many(SHAPE), |call| {
      let mut members = Vec::new();
      if let Some(input) = &call.input {
        collect(input, &mut members);
      }
      collect(call.arg(0), &mut members);
      Ok(Json::Array(members))
    })
    .param(Param::required(Tag::Shapes)),
  ]
}

fn make_box(call: OpCall) -> Result<Json, BoxError> {
  let size = interval("box", call.arg(0))?;
  let mut min = [size[0]; 3];
  let mut max = [size[1]; 3];
  if let Some(axes) = call.arg(1).as_object() {
    for (i, axis) in AXES.iter().enumerate() {
      if let Some(bounds) = axes.get(*axis) {
        let [lo, hi] = interval("box", bounds)?;
        min[i] = lo;
        max[i] = hi;
      }
    }
  }
  Ok(json!({ "kind": "box", "min": coords(min), "max": coords(max) }))
}

/// `translate({y: 2})` means `translate([0, 2, 0])`.
fn offset_from_keyed(arg: Value) -> Value {
  match arg {
    Value::Keyed(offset) if offset.keys().all(|key| AXES.contains(&key.as_str())) => {
      let axis = |key: &str| offset.get(key).and_then(Value::as_number).unwrap_or(0.0);
      Value::from([axis("x"), axis("y"), axis("z")])
    }
    other => other,
  }
}

fn translate(shape: &Json, offset: [f64; 3]) -> Result<Json, OpsError> {
  if let Json::Array(members) = shape {
    return members
      .iter()
      .map(|member| translate(member, offset))
      .collect::<Result<Vec<_>, _>>()
      .map(Json::Array);
  }

  let mut moved = shape.clone();
  let fields: &[&str] = match shape.get("kind").and_then(Json::as_str) {
    Some("point") => &["at"],
    Some("box") => &["min", "max"],
    _ => return Err(OpsError::type_error("translate", "a shape", shape)),
  };
  for field in fields {
    let at = vector("translate", &shape[*field])?;
    moved[*field] = coords([at[0] + offset[0], at[1] + offset[1], at[2] + offset[2]]);
  }
  Ok(moved)
}

fn collect(value: &Json, out: &mut Vec<Json>) {
  match value {
    Json::Array(items) => items.iter().for_each(|item| collect(item, out)),
    Json::Null => {}
    shape => out.push(shape.clone()),
  }
}

fn vector(op: &'static str, value: &Json) -> Result<[f64; 3], OpsError> {
  let items = value.as_array().filter(|items| items.len() == 3);
  match items.map(|items| items.iter().map(Json::as_f64).collect::<Option<Vec<_>>>()) {
    Some(Some(v)) => Ok([v[0], v[1], v[2]]),
    _ => Err(OpsError::type_error(op, "three numbers", value)),
  }
}

fn interval(op: &'static str, value: &Json) -> Result<[f64; 2], OpsError> {
  let items = value.as_array().filter(|items| items.len() == 2);
  match items.map(|items| items.iter().map(Json::as_f64).collect::<Option<Vec<_>>>()) {
    Some(Some(v)) => Ok([v[0], v[1]]),
    _ => Err(OpsError::type_error(op, "an interval", value)),
  }
}

fn coords<const N: usize>(values: [f64; N]) -> Json {
  Json::Array(values.into_iter().map(number_json).collect())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_translate_box() {
    let shape = json!({ "kind": "box", "min": [-1, -1, -1], "max": [1, 1, 1] });
    let moved = translate(&shape, [0.0, 2.0, 0.5]).unwrap();
    assert_eq!(moved, json!({ "kind": "box", "min": [-1, 1, -0.5], "max": [1, 3, 1.5] }));
  }

  #[test]
  fn test_translate_group_moves_each_member() {
    let group = json!([{ "kind": "point", "at": [0, 0, 0] }, { "kind": "point", "at": [1, 1, 1] }]);
    let moved = translate(&group, [1.0, 0.0, 0.0]).unwrap();
    assert_eq!(
      moved,
      json!([{ "kind": "point", "at": [1, 0, 0] }, { "kind": "point", "at": [2, 1, 1] }])
    );
  }

  #[test]
  fn test_translate_rejects_non_shapes() {
    assert!(translate(&json!(4), [0.0; 3]).is_err());
  }

  #[test]
  fn test_offset_from_keyed() {
    let mut offset = lathe_spec::Keyed::new();
    offset.insert("y".to_string(), Value::Number(2.0));
    assert_eq!(offset_from_keyed(Value::Keyed(offset)), Value::from([0.0, 2.0, 0.0]));
    assert_eq!(offset_from_keyed(Value::Number(1.0)), Value::Number(1.0));
  }

  #[test]
  fn test_collect_flattens_groups() {
    let mut out = Vec::new();
    collect(&json!([[{ "kind": "point" }], { "kind": "box" }, null]), &mut out);
    assert_eq!(out.len(), 2);
  }
}
