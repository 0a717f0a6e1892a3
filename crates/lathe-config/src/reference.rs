use serde_json::Value;

const STEP: &str = "$step";
const EXTERNAL: &str = "$external";

/// A reference embedded in a plan argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
  Step(&'a str),
  External(&'a str),
}

impl<'a> Reference<'a> {
  /// Recognize `{"$step": id}` or `{"$external": key}`.
  pub fn parse(value: &'a Value) -> Option<Self> {
    let object = value.as_object()?;
    if object.len() != 1 {
      return None;
    }
    let (key, target) = object.iter().next()?;
    let target = target.as_str()?;
    match key.as_str() {
      STEP => Some(Reference::Step(target)),
      EXTERNAL => Some(Reference::External(target)),
      _ => None,
    }
  }

  /// Every reference inside `value`, depth first.
  pub fn collect(value: &'a Value, out: &mut Vec<Reference<'a>>) {
    if let Some(reference) = Reference::parse(value) {
      out.push(reference);
      return;
    }
    match value {
      Value::Array(items) => items.iter().for_each(|item| Reference::collect(item, out)),
      Value::Object(map) => map.values().for_each(|item| Reference::collect(item, out)),
      _ => {}
    }
  }
}
