//! Building a graph from a plan file.

use std::collections::{BTreeMap, HashMap};

use lathe_config::{PlanDef, Reference, StepDef};
use lathe_graph::{Builder, NodeId, Op};
use lathe_spec::{BindError, Keyed, Value};
use serde_json::Value as Json;

/// Create a node for every step, in dependency order.
///
/// `{"$external": key}` arguments are replaced by the plan's value for `key`,
/// so a node's id changes with the external values it was built from.
/// Returns each step's id in declared order. Ids are read only once every
/// step exists, so steps built as free arguments can still adopt the input
/// of the step that uses them. The plan must already be validated.
pub fn build_plan(builder: &Builder, plan: &PlanDef) -> Result<Vec<(String, NodeId)>, BindError> {
  let order = plan.build_order().map_err(|e| BindError::Preprocess {
    op: plan.name.clone(),
    message: e.to_string(),
  })?;

  let mut built: HashMap<&str, Op<'_>> = HashMap::with_capacity(order.len());
  for step in order {
    let op = build_step(builder, step, &built, &plan.externals)?;
    built.insert(step.step_id.as_str(), op);
  }

  let mut ids = Vec::with_capacity(plan.steps.len());
  for step in &plan.steps {
    let op = built
      .get(step.step_id.as_str())
      .ok_or_else(|| unknown_step(step, &step.step_id))?;
    ids.push((step.step_id.clone(), op.id()));
  }
  Ok(ids)
}

fn build_step<'b>(
  builder: &'b Builder,
  step: &StepDef,
  built: &HashMap<&str, Op<'b>>,
  externals: &BTreeMap<String, Json>,
) -> Result<Op<'b>, BindError> {
  let args = step
    .args
    .iter()
    .map(|arg| to_value(step, arg, built, externals))
    .collect::<Result<Vec<_>, _>>()?;

  match &step.on {
    None => builder.call(&step.op, args),
    Some(on) => built
      .get(on.as_str())
      .ok_or_else(|| unknown_step(step, on))?
      .call(&step.op, args),
  }
}

fn to_value(
  step: &StepDef,
  arg: &Json,
  built: &HashMap<&str, Op<'_>>,
  externals: &BTreeMap<String, Json>,
) -> Result<Value, BindError> {
  match Reference::parse(arg) {
    Some(Reference::Step(id)) => built
      .get(id)
      .map(|op| Value::from(*op))
      .ok_or_else(|| unknown_step(step, id)),
    Some(Reference::External(key)) => externals
      .get(key)
      .map(|value| Value::from(value.clone()))
      .ok_or_else(|| BindError::Preprocess {
        op: step.op.clone(),
        message: format!("step '{}' refers to unknown external '{}'", step.step_id, key),
      }),
    None => match arg {
      Json::Array(items) => items
        .iter()
        .map(|item| to_value(step, item, built, externals))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::List),
      Json::Object(map) => map
        .iter()
        .map(|(key, item)| Ok((key.clone(), to_value(step, item, built, externals)?)))
        .collect::<Result<Keyed, _>>()
        .map(Value::Keyed),
      other => Ok(Value::from(other.clone())),
    },
  }
}

fn unknown_step(step: &StepDef, reference: &str) -> BindError {
  BindError::Preprocess {
    op: step.op.clone(),
    message: format!("step '{}' refers to unknown step '{}'", step.step_id, reference),
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use lathe_graph::OperationRegistry;
  use serde_json::json;

  use super::*;

  fn builder() -> Builder {
    let mut registry = OperationRegistry::new();
    lathe_ops::register_all(&mut registry).unwrap();
    Builder::new(Arc::new(registry))
  }

  fn plan(value: Json) -> PlanDef {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn test_build_plan_matches_builder_calls() {
    let plan = plan(json!({
      "name": "p",
      "steps": [
        { "step_id": "moved", "op": "translate", "on": "base", "args": [{ "y": 2 }] },
        { "step_id": "base", "op": "box", "args": [10] }
      ]
    }));

    let from_plan = builder();
    let ids = build_plan(&from_plan, &plan).unwrap();

    let by_hand = builder();
    let base = by_hand.call("box", vec![Value::from(10)]).unwrap();
    let moved = base.call("translate", vec![Value::from([0, 2, 0])]).unwrap();

    assert_eq!(ids[0], ("moved".to_string(), moved.id()));
    assert_eq!(ids[1], ("base".to_string(), base.id()));
  }

  #[test]
  fn test_free_step_adopts_chain_input() {
    let plan = plan(json!({
      "name": "p",
      "steps": [
        { "step_id": "ten", "op": "number", "args": [10] },
        { "step_id": "two", "op": "number", "args": [2] },
        { "step_id": "total", "op": "add", "on": "ten", "args": [{ "$step": "two" }] }
      ]
    }));

    let from_plan = builder();
    let ids = build_plan(&from_plan, &plan).unwrap();

    let by_hand = builder();
    let ten = by_hand.call("number", vec![Value::from(10)]).unwrap();
    let two = ten.call("number", vec![Value::from(2)]).unwrap();
    assert_eq!(ids[1].1, two.id());
  }

  #[test]
  fn test_externals_are_substituted_by_value() {
    let plan = plan(json!({
      "name": "p",
      "externals": { "size": 3 },
      "steps": [{ "step_id": "n", "op": "number", "args": [{ "$external": "size" }] }]
    }));

    let from_plan = builder();
    let ids = build_plan(&from_plan, &plan).unwrap();

    let by_hand = builder();
    let three = by_hand.call("number", vec![Value::from(3)]).unwrap();
    assert_eq!(ids[0].1, three.id());
  }

  #[test]
  fn test_object_arguments_become_keyed() {
    let plan = plan(json!({
      "name": "p",
      "steps": [
        { "step_id": "odds", "op": "seq", "args": [1, 3, { "ge": 5, "le": 9, "by": 2 }] }
      ]
    }));

    let from_plan = builder();
    let ids = build_plan(&from_plan, &plan).unwrap();

    let by_hand = builder();
    let range = lathe_spec::keyed! { "ge" => 5, "le" => 9, "by" => 2 };
    let odds = by_hand
      .call("seq", vec![Value::from(1), Value::from(3), range])
      .unwrap();
    assert_eq!(ids[0].1, odds.id());
  }

  #[test]
  fn test_cycle_is_reported() {
    let plan = plan(json!({
      "name": "p",
      "steps": [
        { "step_id": "a", "op": "add", "on": "b", "args": [1] },
        { "step_id": "b", "op": "add", "on": "a", "args": [1] }
      ]
    }));
    assert!(matches!(
      build_plan(&builder(), &plan),
      Err(BindError::Preprocess { .. })
    ));
  }
}
