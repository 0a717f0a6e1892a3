use crate::error::BindError;
use crate::registry::{Binding, Caller, HandlerRegistry};
use crate::tag::Param;
use crate::value::Value;

/// Bind raw call arguments to an operation's declared parameters.
///
/// Parameters are processed left to right. Each one's handler consumes a
/// prefix of the remaining arguments; anything it examined but rejected is
/// offered to the next parameter. Trailing `Undefined` arguments are
/// ignored, any other leftover argument is an error.
pub fn destructure(
  handlers: &HandlerRegistry,
  caller: &dyn Caller,
  params: &[Param],
  args: Vec<Value>,
) -> Result<Vec<Value>, BindError> {
  Binding::new(handlers, caller).destructure(params, args)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tag::{Produces, SHAPE, Tag};
  use crate::value::{NodeHandle, NodeRef};
  use crate::{args, keyed};

  struct BoxCall;

  impl Caller for BoxCall {
    fn op_name(&self) -> &str {
      "box"
    }

    fn produces(&self, _node: NodeHandle) -> Option<Produces> {
      Some(Produces::one(SHAPE))
    }
  }

  fn box_params() -> Vec<Param> {
    vec![
      Param::with_default(Tag::Interval, [-0.5, 0.5]),
      Param::optional(Tag::options([("x", Tag::Interval), ("y", Tag::Interval), ("z", Tag::Interval)])),
      Param::optional(Tag::flags(["hollow"])),
    ]
  }

  #[test]
  fn test_destructure_binds_in_declared_order() {
    let registry = HandlerRegistry::with_builtins();
    let bound = destructure(
      &registry,
      &BoxCall,
      &box_params(),
      args![10, keyed! { "z" => [0, 4] }, "hollow"],
    )
    .unwrap();

    assert_eq!(bound[0], Value::from([-5.0, 5.0]));
    assert_eq!(bound[1], keyed! { "z" => [0.0, 4.0] });
    assert_eq!(bound[2], keyed! { "hollow" => true });
  }

  #[test]
  fn test_destructure_skips_to_later_params() {
    let registry = HandlerRegistry::with_builtins();
    let bound = destructure(&registry, &BoxCall, &box_params(), args!["hollow"]).unwrap();

    assert_eq!(bound[0], Value::from([-0.5, 0.5]));
    assert_eq!(bound[1], Value::Undefined);
    assert_eq!(bound[2], keyed! { "hollow" => true });
  }

  #[test]
  fn test_destructure_is_deterministic() {
    let registry = HandlerRegistry::with_builtins();
    let shape = Value::Op(NodeRef::new(NodeHandle(4)));
    let params = [Param::required(Tag::Shape), Param::optional(Tag::Vector3)];
    let args = vec![shape.clone(), Value::from([1, 2, 3])];

    let first = destructure(&registry, &BoxCall, &params, args.clone()).unwrap();
    let second = destructure(&registry, &BoxCall, &params, args).unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0], shape);
  }

  #[test]
  fn test_destructure_reports_unconsumed_argument() {
    let registry = HandlerRegistry::with_builtins();
    let err = destructure(&registry, &BoxCall, &box_params(), args![10, true]).unwrap_err();
    assert!(matches!(err, BindError::ExtraArguments { ref op, count: 1, .. } if op == "box"));
  }
}
