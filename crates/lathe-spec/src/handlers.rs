//! Built-in spec handlers.
//!
//! Single-value handlers examine exactly one argument. An `Undefined`
//! argument counts as "not supplied": it is consumed and the parameter's
//! default applies. Repetition handlers (`numbers`, `shapes`) collect a run
//! of matching arguments, stop at the first non-matching one and drop a
//! terminating `Undefined`.

use std::collections::VecDeque;

use crate::error::BindError;
use crate::registry::Binding;
use crate::tag::{NUMBERS, Param, SHAPE, Tag};
use crate::value::{Keyed, NodeRef, Value};

/// Range expansions longer than this are rejected.
const MAX_RANGE_LEN: usize = 1 << 20;

const RANGE_KEYS: [&str; 5] = ["ge", "gt", "le", "lt", "by"];

type Bound = Result<Option<Value>, BindError>;

/// Consume the next argument if `accept` holds for it.
fn take_if(args: &mut VecDeque<Value>, overflow: &mut Vec<Value>, accept: impl FnOnce(&Value) -> bool) -> Option<Value> {
  match args.pop_front() {
    None | Some(Value::Undefined) => None,
    Some(value) if accept(&value) => Some(value),
    Some(value) => {
      overflow.push(value);
      None
    }
  }
}

pub(crate) fn number(_: &Binding<'_>, _: &Tag, args: &mut VecDeque<Value>, overflow: &mut Vec<Value>) -> Bound {
  Ok(take_if(args, overflow, Value::is_number))
}

pub(crate) fn string(_: &Binding<'_>, _: &Tag, args: &mut VecDeque<Value>, overflow: &mut Vec<Value>) -> Bound {
  Ok(take_if(args, overflow, Value::is_string))
}

pub(crate) fn boolean(_: &Binding<'_>, _: &Tag, args: &mut VecDeque<Value>, overflow: &mut Vec<Value>) -> Bound {
  Ok(take_if(args, overflow, Value::is_bool))
}

pub(crate) fn vector3(_: &Binding<'_>, _: &Tag, args: &mut VecDeque<Value>, overflow: &mut Vec<Value>) -> Bound {
  Ok(take_if(args, overflow, Value::is_vector3))
}

/// Order the endpoints of `[a, b]`, with `b` defaulting to `0`.
pub fn normalize_interval(a: f64, b: Option<f64>) -> [f64; 2] {
  let (a, b) = match b {
    Some(b) => (a, b),
    None => (a, 0.0),
  };
  if b < a { [b, a] } else { [a, b] }
}

pub(crate) fn interval(cx: &Binding<'_>, tag: &Tag, args: &mut VecDeque<Value>, overflow: &mut Vec<Value>) -> Bound {
  let endpoint = |value: &Value| {
    value
      .as_number()
      .ok_or_else(|| cx.coercion(tag, format!("interval endpoint must be a number, got {:?}", value)))
  };

  let [min, max] = match args.pop_front() {
    None | Some(Value::Undefined) => return Ok(None),
    Some(Value::Number(n)) => normalize_interval(n / 2.0, Some(-n / 2.0)),
    Some(Value::List(items)) if (1..=2).contains(&items.len()) => {
      let a = endpoint(&items[0])?;
      let b = match items.get(1) {
        None | Some(Value::Undefined) => None,
        Some(value) => Some(endpoint(value)?),
      };
      normalize_interval(a, b)
    }
    Some(other) => {
      overflow.push(other);
      return Ok(None);
    }
  };

  Ok(Some(Value::List(vec![Value::Number(min), Value::Number(max)])))
}

pub(crate) fn options(cx: &Binding<'_>, tag: &Tag, args: &mut VecDeque<Value>, overflow: &mut Vec<Value>) -> Bound {
  let Tag::Options(schema) = tag else {
    return Err(cx.coercion(tag, "options handler bound to a non-options tag"));
  };
  let subtag = |key: &str| schema.iter().find(|(name, _)| name == key).map(|(_, t)| t);

  let fields = match args.pop_front() {
    None | Some(Value::Undefined) => return Ok(None),
    Some(Value::Keyed(fields)) if fields.keys().all(|key| subtag(key).is_some()) => fields,
    Some(other) => {
      overflow.push(other);
      return Ok(None);
    }
  };

  let mut resolved = Keyed::new();
  for (key, value) in fields {
    let Some(field_tag) = subtag(&key) else {
      continue;
    };
    let bound = cx
      .destructure(&[Param::optional(field_tag.clone())], vec![value])
      .map_err(|e| match e {
        BindError::ExtraArguments { .. } => {
          cx.coercion(tag, format!("field '{}' is not a valid {}", key, field_tag))
        }
        other => other,
      })?;
    match bound.into_iter().next() {
      Some(Value::Undefined) | None => {}
      Some(value) => {
        resolved.insert(key, value);
      }
    }
  }

  Ok(Some(Value::Keyed(resolved)))
}

pub(crate) fn flags(cx: &Binding<'_>, tag: &Tag, args: &mut VecDeque<Value>, _: &mut Vec<Value>) -> Bound {
  let Tag::Flags(tokens) = tag else {
    return Err(cx.coercion(tag, "flags handler bound to a non-flags tag"));
  };

  let mut set = Keyed::new();
  while let Some(Value::String(token)) = args.front() {
    if !tokens.contains(token) {
      break;
    }
    set.insert(token.clone(), Value::Bool(true));
    args.pop_front();
  }

  Ok(Some(Value::Keyed(set)))
}

fn is_range(map: &Keyed) -> bool {
  map.keys().all(|key| RANGE_KEYS.contains(&key.as_str()))
    && map
      .get("by")
      .and_then(Value::as_number)
      .is_some_and(|by| by != 0.0)
}

/// Expand a `{ge?, gt?, le?, lt?, by}` descriptor into its arithmetic sequence.
///
/// Starts at `ge`, else one step past `gt`, else `0`. Continues while below
/// `lt`; without `lt`, while at most `le`; with neither, while below `1`.
pub fn expand_range(range: &Keyed) -> Result<Vec<f64>, String> {
  let bound = |key: &str| -> Result<Option<f64>, String> {
    match range.get(key) {
      None | Some(Value::Undefined) => Ok(None),
      Some(Value::Number(n)) if n.is_finite() => Ok(Some(*n)),
      Some(other) => Err(format!("range bound '{}' must be a finite number, got {:?}", key, other)),
    }
  };

  let by = bound("by")?.ok_or("range needs a non-zero 'by'")?;
  if by <= 0.0 {
    return Err(format!("range step must be positive, got {}", by));
  }

  let mut cursor = match (bound("ge")?, bound("gt")?) {
    (Some(ge), _) => ge,
    (None, Some(gt)) => gt + by,
    (None, None) => 0.0,
  };

  let (limit, inclusive) = match (bound("lt")?, bound("le")?) {
    (Some(lt), _) => (lt, false),
    (None, Some(le)) => (le, true),
    (None, None) => (1.0, false),
  };

  let mut out = Vec::new();
  while cursor < limit || (inclusive && cursor == limit) {
    if out.len() == MAX_RANGE_LEN {
      return Err(format!("range expands past {} values", MAX_RANGE_LEN));
    }
    out.push(cursor);
    cursor += by;
  }
  Ok(out)
}

pub(crate) fn numbers(cx: &Binding<'_>, tag: &Tag, args: &mut VecDeque<Value>, overflow: &mut Vec<Value>) -> Bound {
  let mut numbers = Vec::new();

  while let Some(value) = args.pop_front() {
    match value {
      Value::Undefined => break,
      Value::Number(n) => numbers.push(Value::Number(n)),
      Value::Keyed(range) if is_range(&range) => {
        let expanded = expand_range(&range).map_err(|message| cx.coercion(tag, message))?;
        numbers.extend(expanded.into_iter().map(Value::Number));
      }
      Value::Op(node) if cx.produces(node.handle).is_some_and(|p| p.is(NUMBERS)) => {
        numbers.push(Value::Op(node));
      }
      other => {
        overflow.push(other);
        break;
      }
    }
  }

  Ok(Some(Value::List(numbers)))
}

/// A reference to a shape-producing op, selecting the first value of a multi-producer.
fn shape_ref(cx: &Binding<'_>, value: &Value) -> Option<NodeRef> {
  let node = value.as_op()?;
  let produces = cx.produces(node.handle)?;
  if !produces.is(SHAPE) {
    return None;
  }
  if produces.multiple && node.select.is_none() {
    Some(node.select(0))
  } else {
    Some(node)
  }
}

pub(crate) fn shape(cx: &Binding<'_>, _: &Tag, args: &mut VecDeque<Value>, overflow: &mut Vec<Value>) -> Bound {
  match args.pop_front() {
    None | Some(Value::Undefined) => Ok(None),
    Some(value) => match shape_ref(cx, &value) {
      Some(node) => Ok(Some(Value::Op(node))),
      None => {
        overflow.push(value);
        Ok(None)
      }
    },
  }
}

pub(crate) fn shapes(cx: &Binding<'_>, _: &Tag, args: &mut VecDeque<Value>, overflow: &mut Vec<Value>) -> Bound {
  let mut shapes = Vec::new();

  while let Some(value) = args.pop_front() {
    if value.is_undefined() {
      break;
    }
    match value.as_op() {
      Some(node) if cx.produces(node.handle).is_some_and(|p| p.is(SHAPE)) => {
        shapes.push(Value::Op(node));
      }
      _ => {
        overflow.push(value);
        break;
      }
    }
  }

  Ok(Some(Value::List(shapes)))
}

pub(crate) fn op(_: &Binding<'_>, _: &Tag, args: &mut VecDeque<Value>, overflow: &mut Vec<Value>) -> Bound {
  Ok(take_if(args, overflow, |value| matches!(value, Value::Op(_))))
}
