//! Canonical node identity.

use std::fmt;
use std::str::FromStr;

use lathe_spec::{External, NodeRef, Value};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as Json, json};

use crate::error::GraphError;

const DOMAIN: &[u8] = b"lathe:op:";

/// Content id of an op node: a BLAKE3 digest of its canonical description.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId([u8; 32]);

impl NodeId {
  pub fn as_bytes(&self) -> &[u8; 32] {
    &self.0
  }

  /// The 64 character lowercase hex form used as the result store key.
  pub fn to_hex(&self) -> String {
    blake3::Hash::from(self.0).to_hex().to_string()
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_hex())
  }
}

impl fmt::Debug for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "NodeId({})", self.to_hex())
  }
}

impl FromStr for NodeId {
  type Err = GraphError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    blake3::Hash::from_hex(s)
      .map(|hash| NodeId(*hash.as_bytes()))
      .map_err(|_| GraphError::InvalidNodeId(s.to_string()))
  }
}

impl Serialize for NodeId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_hex())
  }
}

impl<'de> Deserialize<'de> for NodeId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

/// What a node is chained from.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
  Node(NodeRef),
  External(External),
}

/// Hash a node description. `id_of` supplies the ids of referenced nodes.
pub(crate) fn digest(
  name: &str,
  input: Option<&Input>,
  args: &[Value],
  id_of: &mut impl FnMut(NodeRef) -> NodeId,
) -> NodeId {
  let input = match input {
    None => Json::Null,
    Some(Input::Node(node)) => reference(*node, id_of),
    Some(Input::External(external)) => json!({ "external": external.key() }),
  };
  let args: Vec<Json> = args.iter().map(|arg| canonical_value(arg, id_of)).collect();
  let text = json!({ "name": name, "input": input, "args": args }).to_string();

  let mut hasher = blake3::Hasher::new();
  hasher.update(DOMAIN);
  hasher.update(text.as_bytes());
  NodeId(*hasher.finalize().as_bytes())
}

fn reference(node: NodeRef, id_of: &mut impl FnMut(NodeRef) -> NodeId) -> Json {
  let id = id_of(node).to_hex();
  match node.select {
    None => json!({ "ref": id }),
    Some(index) => json!({ "ref": id, "select": index }),
  }
}

/// Every value is externally tagged by variant so a reference can never
/// collide with a literal of the same text.
fn canonical_value(value: &Value, id_of: &mut impl FnMut(NodeRef) -> NodeId) -> Json {
  match value {
    Value::Undefined => json!("undefined"),
    Value::Null => json!("null"),
    Value::Bool(b) => json!({ "bool": b }),
    Value::Number(n) => json!({ "number": canonical_number(*n) }),
    Value::String(s) => json!({ "string": s }),
    Value::List(items) => {
      let items: Vec<Json> = items.iter().map(|item| canonical_value(item, id_of)).collect();
      json!({ "list": items })
    }
    Value::Keyed(map) => {
      let mut fields = Map::new();
      for (key, item) in map {
        fields.insert(key.clone(), canonical_value(item, id_of));
      }
      json!({ "keyed": fields })
    }
    Value::Op(node) => reference(*node, id_of),
    Value::External(external) => json!({ "external": external.key() }),
  }
}

fn canonical_number(n: f64) -> Json {
  // -0.0 and 0.0 are the same argument.
  let n = if n == 0.0 { 0.0 } else { n };
  match serde_json::Number::from_f64(n) {
    Some(number) => Json::Number(number),
    None => Json::String(n.to_string()),
  }
}
