//! Parameter tags and declared operation outputs.

use std::fmt;

use crate::value::Value;

/// Output tag of operations producing shapes.
pub const SHAPE: &str = "shape";

/// Output tag of operations producing a list of numbers.
pub const NUMBERS: &str = "numbers";

/// The declared type of one formal parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
  Number,
  String,
  Boolean,
  /// An ordered triple of numbers.
  Vector3,
  /// A number `n` (meaning `[-n/2, n/2]`) or a one/two element endpoint list.
  Interval,
  /// A keyed value whose fields are each bound against their own tag.
  Options(Vec<(String, Tag)>),
  /// A closed set of literal tokens.
  Flags(Vec<String>),
  /// Zero or more numbers, range descriptors or number-producing ops.
  Numbers,
  /// One op producing a shape.
  Shape,
  /// Zero or more ops producing shapes.
  Shapes,
  /// One op of any kind.
  Op,
  /// A tag bound by a caller-registered handler.
  Custom(String),
}

impl Tag {
  pub fn options<K: Into<String>>(fields: impl IntoIterator<Item = (K, Tag)>) -> Self {
    Tag::Options(fields.into_iter().map(|(k, t)| (k.into(), t)).collect())
  }

  pub fn flags<K: Into<String>>(tokens: impl IntoIterator<Item = K>) -> Self {
    Tag::Flags(tokens.into_iter().map(Into::into).collect())
  }

  pub fn custom(name: impl Into<String>) -> Self {
    Tag::Custom(name.into())
  }
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Tag::Number => write!(f, "number"),
      Tag::String => write!(f, "string"),
      Tag::Boolean => write!(f, "boolean"),
      Tag::Vector3 => write!(f, "vector3"),
      Tag::Interval => write!(f, "interval"),
      Tag::Options(fields) => {
        let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
        write!(f, "options{{{}}}", names.join(","))
      }
      Tag::Flags(tokens) => write!(f, "flags[{}]", tokens.join(",")),
      Tag::Numbers => write!(f, "numbers"),
      Tag::Shape => write!(f, "shape"),
      Tag::Shapes => write!(f, "shapes"),
      Tag::Op => write!(f, "op"),
      Tag::Custom(name) => write!(f, "{}", name),
    }
  }
}

/// What happens when no argument matched a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Requirement {
  /// Binding fails.
  Required,
  /// The parameter binds `Undefined`.
  Optional,
  /// The parameter binds this value.
  Default(Value),
}

/// One formal parameter of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
  pub tag: Tag,
  pub requirement: Requirement,
}

impl Param {
  pub fn required(tag: Tag) -> Self {
    Self {
      tag,
      requirement: Requirement::Required,
    }
  }

  pub fn optional(tag: Tag) -> Self {
    Self {
      tag,
      requirement: Requirement::Optional,
    }
  }

  pub fn with_default(tag: Tag, value: impl Into<Value>) -> Self {
    Self {
      tag,
      requirement: Requirement::Default(value.into()),
    }
  }
}

/// The declared output of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Produces {
  pub tag: String,
  /// The operation yields a list of values of `tag` rather than one.
  pub multiple: bool,
}

impl Produces {
  pub fn one(tag: impl Into<String>) -> Self {
    Self {
      tag: tag.into(),
      multiple: false,
    }
  }

  pub fn many(tag: impl Into<String>) -> Self {
    Self {
      tag: tag.into(),
      multiple: true,
    }
  }

  pub fn is(&self, tag: &str) -> bool {
    self.tag == tag
  }
}
