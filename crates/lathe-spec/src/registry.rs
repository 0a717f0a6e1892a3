//! Spec handler registry.

use std::collections::VecDeque;
use std::fmt;

use crate::error::BindError;
use crate::handlers;
use crate::tag::{Param, Produces, Requirement, Tag};
use crate::value::{NodeHandle, Value};

/// A spec handler.
///
/// Receives the remaining arguments and an overflow bucket. It consumes a
/// prefix of `args`, pushes anything it examined but rejected onto `overflow`
/// (in order) and returns the bound value, or `None` when nothing matched so
/// the parameter's default applies.
pub type HandlerFn = dyn Fn(&Binding<'_>, &Tag, &mut VecDeque<Value>, &mut Vec<Value>) -> Result<Option<Value>, BindError>
  + Send
  + Sync;

type Predicate = dyn Fn(&Tag) -> bool + Send + Sync;

/// The node on whose behalf arguments are being bound.
pub trait Caller {
  /// Name of the operation being called.
  fn op_name(&self) -> &str;

  /// Declared output of a node referenced by one of the arguments.
  fn produces(&self, node: NodeHandle) -> Option<Produces>;
}

/// Maps tags to the handlers that bind them.
///
/// Lookup is by predicate; exactly one registered predicate must match a tag.
pub struct HandlerRegistry {
  entries: Vec<(Box<Predicate>, Box<HandlerFn>)>,
}

impl HandlerRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self {
      entries: Vec::new(),
    }
  }

  /// A registry with every built-in tag handled.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    registry.register(|t| matches!(t, Tag::Number), handlers::number);
    registry.register(|t| matches!(t, Tag::String), handlers::string);
    registry.register(|t| matches!(t, Tag::Boolean), handlers::boolean);
    registry.register(|t| matches!(t, Tag::Vector3), handlers::vector3);
    registry.register(|t| matches!(t, Tag::Interval), handlers::interval);
    registry.register(|t| matches!(t, Tag::Options(_)), handlers::options);
    registry.register(|t| matches!(t, Tag::Flags(_)), handlers::flags);
    registry.register(|t| matches!(t, Tag::Numbers), handlers::numbers);
    registry.register(|t| matches!(t, Tag::Shape), handlers::shape);
    registry.register(|t| matches!(t, Tag::Shapes), handlers::shapes);
    registry.register(|t| matches!(t, Tag::Op), handlers::op);
    registry
  }

  /// Register a handler for every tag `predicate` accepts.
  pub fn register<P, H>(&mut self, predicate: P, handler: H)
  where
    P: Fn(&Tag) -> bool + Send + Sync + 'static,
    H: Fn(&Binding<'_>, &Tag, &mut VecDeque<Value>, &mut Vec<Value>) -> Result<Option<Value>, BindError>
      + Send
      + Sync
      + 'static,
  {
    self.entries.push((Box::new(predicate), Box::new(handler)));
  }

  /// Find the single handler for `tag`.
  pub fn lookup(&self, op: &str, tag: &Tag) -> Result<&HandlerFn, BindError> {
    let mut matching = self
      .entries
      .iter()
      .filter(|(predicate, _)| predicate(tag))
      .map(|(_, handler)| handler.as_ref());

    let Some(handler) = matching.next() else {
      return Err(BindError::NoHandler {
        op: op.to_string(),
        tag: tag.to_string(),
      });
    };

    let others = matching.count();
    if others > 0 {
      return Err(BindError::AmbiguousHandler {
        op: op.to_string(),
        tag: tag.to_string(),
        count: others + 1,
      });
    }

    Ok(handler)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl Default for HandlerRegistry {
  fn default() -> Self {
    Self::with_builtins()
  }
}

impl fmt::Debug for HandlerRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HandlerRegistry")
      .field("handlers", &self.entries.len())
      .finish()
  }
}

/// State shared by every handler invoked while binding one call.
pub struct Binding<'a> {
  pub handlers: &'a HandlerRegistry,
  pub caller: &'a dyn Caller,
}

impl<'a> Binding<'a> {
  pub fn new(handlers: &'a HandlerRegistry, caller: &'a dyn Caller) -> Self {
    Self { handlers, caller }
  }

  pub fn op_name(&self) -> &str {
    self.caller.op_name()
  }

  pub fn produces(&self, node: NodeHandle) -> Option<Produces> {
    self.caller.produces(node)
  }

  /// Build a coercion error for `tag` attributed to the calling operation.
  pub fn coercion(&self, tag: &Tag, message: impl Into<String>) -> BindError {
    BindError::Coercion {
      op: self.op_name().to_string(),
      tag: tag.to_string(),
      message: message.into(),
    }
  }

  /// Bind `args` against `params`, left to right.
  pub fn destructure(&self, params: &[Param], args: Vec<Value>) -> Result<Vec<Value>, BindError> {
    let mut remaining: VecDeque<Value> = args.into();
    let mut bound = Vec::with_capacity(params.len());

    for param in params {
      let handler = self.handlers.lookup(self.op_name(), &param.tag)?;
      let mut overflow = Vec::new();
      let value = handler(self, &param.tag, &mut remaining, &mut overflow)?;

      // Rejected arguments are retried against the following tags.
      for rejected in overflow.into_iter().rev() {
        remaining.push_front(rejected);
      }

      let value = match value {
        Some(value) => value,
        None => match &param.requirement {
          Requirement::Required => {
            return Err(BindError::MissingArgument {
              op: self.op_name().to_string(),
              tag: param.tag.to_string(),
            });
          }
          Requirement::Optional => Value::Undefined,
          Requirement::Default(value) => value.clone(),
        },
      };
      bound.push(value);
    }

    while remaining.back().is_some_and(Value::is_undefined) {
      remaining.pop_back();
    }

    if !remaining.is_empty() {
      let rest: Vec<String> = remaining.iter().map(describe).collect();
      return Err(BindError::ExtraArguments {
        op: self.op_name().to_string(),
        count: remaining.len(),
        rest: rest.join(", "),
      });
    }

    Ok(bound)
  }
}

fn describe(value: &Value) -> String {
  match value {
    Value::Undefined => "undefined".to_string(),
    Value::Null => "null".to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    Value::String(s) => format!("{:?}", s),
    Value::List(items) => format!("list({})", items.len()),
    Value::Keyed(map) => {
      let keys: Vec<&str> = map.keys().map(String::as_str).collect();
      format!("{{{}}}", keys.join(","))
    }
    Value::Op(node) => format!("op#{}", node.handle.0),
    Value::External(external) => format!("external({})", external.key()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Root;

  impl Caller for Root {
    fn op_name(&self) -> &str {
      "root"
    }

    fn produces(&self, _node: NodeHandle) -> Option<Produces> {
      None
    }
  }

  #[test]
  fn test_builtins_cover_every_builtin_tag() {
    let registry = HandlerRegistry::with_builtins();
    let tags = [
      Tag::Number,
      Tag::String,
      Tag::Boolean,
      Tag::Vector3,
      Tag::Interval,
      Tag::options([("size", Tag::Number)]),
      Tag::flags(["center"]),
      Tag::Numbers,
      Tag::Shape,
      Tag::Shapes,
      Tag::Op,
    ];
    for tag in tags {
      assert!(registry.lookup("root", &tag).is_ok(), "no handler for {}", tag);
    }
  }

  #[test]
  fn test_custom_tag_without_handler_fails() {
    let registry = HandlerRegistry::with_builtins();
    let err = registry
      .lookup("root", &Tag::custom("angle"))
      .err()
      .unwrap();
    assert_eq!(
      err,
      BindError::NoHandler {
        op: "root".to_string(),
        tag: "angle".to_string(),
      }
    );
  }

  #[test]
  fn test_overlapping_predicates_are_ambiguous() {
    let mut registry = HandlerRegistry::with_builtins();
    registry.register(
      |t| matches!(t, Tag::Number),
      |_: &Binding<'_>, _: &Tag, _: &mut VecDeque<Value>, _: &mut Vec<Value>| Ok(None),
    );

    let err = registry.lookup("box", &Tag::Number).err().unwrap();
    assert!(matches!(err, BindError::AmbiguousHandler { count: 2, .. }));
  }

  #[test]
  fn test_registered_custom_handler_is_used() {
    let mut registry = HandlerRegistry::with_builtins();
    registry.register(
      |t| matches!(t, Tag::Custom(name) if name == "angle"),
      |_: &Binding<'_>, _: &Tag, args: &mut VecDeque<Value>, overflow: &mut Vec<Value>| {
        match args.pop_front() {
          Some(Value::Number(degrees)) => Ok(Some(Value::Number(degrees.to_radians()))),
          Some(other) => {
            overflow.push(other);
            Ok(None)
          }
          None => Ok(None),
        }
      },
    );

    let binding = Binding::new(&registry, &Root);
    let bound = binding
      .destructure(&[Param::required(Tag::custom("angle"))], vec![Value::Number(180.0)])
      .unwrap();
    assert_eq!(bound, vec![Value::Number(std::f64::consts::PI)]);
  }

  #[test]
  fn test_rejected_argument_is_retried_by_next_tag() {
    let registry = HandlerRegistry::with_builtins();
    let binding = Binding::new(&registry, &Root);
    let params = [
      Param::with_default(Tag::Number, 1),
      Param::required(Tag::String),
    ];

    let bound = binding
      .destructure(&params, vec![Value::from("label")])
      .unwrap();
    assert_eq!(bound, vec![Value::Number(1.0), Value::from("label")]);
  }

  #[test]
  fn test_missing_required_argument() {
    let registry = HandlerRegistry::with_builtins();
    let binding = Binding::new(&registry, &Root);

    let err = binding
      .destructure(&[Param::required(Tag::Number)], vec![])
      .unwrap_err();
    assert_eq!(
      err,
      BindError::MissingArgument {
        op: "root".to_string(),
        tag: "number".to_string(),
      }
    );
  }

  #[test]
  fn test_extra_arguments_are_an_error() {
    let registry = HandlerRegistry::with_builtins();
    let binding = Binding::new(&registry, &Root);

    let err = binding
      .destructure(
        &[Param::required(Tag::Number)],
        vec![Value::Number(1.0), Value::from("extra")],
      )
      .unwrap_err();
    assert!(matches!(err, BindError::ExtraArguments { count: 1, .. }));
    assert!(err.to_string().contains("\"extra\""));
  }

  #[test]
  fn test_trailing_undefined_is_ignored() {
    let registry = HandlerRegistry::with_builtins();
    let binding = Binding::new(&registry, &Root);

    let bound = binding
      .destructure(
        &[Param::required(Tag::Number)],
        vec![Value::Number(1.0), Value::Undefined],
      )
      .unwrap();
    assert_eq!(bound, vec![Value::Number(1.0)]);
  }

  #[test]
  fn test_undefined_argument_takes_default() {
    let registry = HandlerRegistry::with_builtins();
    let binding = Binding::new(&registry, &Root);
    let params = [
      Param::with_default(Tag::Number, 7),
      Param::required(Tag::Number),
    ];

    let bound = binding
      .destructure(&params, vec![Value::Undefined, Value::Number(2.0)])
      .unwrap();
    assert_eq!(bound, vec![Value::Number(7.0), Value::Number(2.0)]);
  }
}
