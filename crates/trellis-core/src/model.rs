//! Core data structures for the JSON graph

use crate::path::{Key, Path};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// JSON graph `$type` tags.
pub const TYPE_KEY: &str = "$type";
pub const VALUE_KEY: &str = "value";
pub const REF_TYPE: &str = "ref";
pub const ATOM_TYPE: &str = "atom";
pub const ERROR_TYPE: &str = "error";

/// A node in the graph cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Interior node keyed by path segment.
    Branch(BTreeMap<String, Node>),
    /// Plain JSON leaf (primitives and arrays).
    Value(Value),
    /// Boxed terminal value; never traversed. `None` is a present `undefined`.
    Atom(Option<Value>),
    /// Indirection to another location in the same graph.
    Ref(Path),
    /// Boxed error returned by the data source for this location.
    Error(Value),
}

impl Node {
    pub fn branch() -> Self {
        Node::Branch(BTreeMap::new())
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Node::Branch(_))
    }

    /// Child of a branch node. Leaves have no children.
    pub fn child(&self, key: &Key) -> Option<&Node> {
        match self {
            Node::Branch(children) => children.get(key.as_map_key().as_ref()),
            _ => None,
        }
    }

    /// Decode JSON graph notation. The input is copied, never aliased.
    pub fn from_json(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Node::Value(value.clone());
        };
        match map.get(TYPE_KEY).and_then(Value::as_str) {
            Some(REF_TYPE) => match map.get(VALUE_KEY).and_then(decode_ref_target) {
                Some(target) => Node::Ref(target),
                None => {
                    tracing::warn!("Malformed reference node kept as a plain value: {}", value);
                    Node::Value(value.clone())
                }
            },
            Some(ATOM_TYPE) => Node::Atom(map.get(VALUE_KEY).cloned()),
            Some(ERROR_TYPE) => Node::Error(map.get(VALUE_KEY).cloned().unwrap_or(Value::Null)),
            Some(_) => Node::Value(value.clone()),
            None => Node::Branch(
                map.iter()
                    .map(|(key, child)| (key.clone(), Node::from_json(child)))
                    .collect(),
            ),
        }
    }

    /// Encode back to JSON graph notation, boxing refs, atoms and errors.
    pub fn to_json(&self) -> Value {
        match self {
            Node::Branch(children) => Value::Object(
                children
                    .iter()
                    .map(|(key, child)| (key.clone(), child.to_json()))
                    .collect(),
            ),
            Node::Value(value) => value.clone(),
            Node::Atom(value) => boxed(ATOM_TYPE, value.clone()),
            Node::Ref(target) => boxed(REF_TYPE, Some(target.to_json())),
            Node::Error(value) => boxed(ERROR_TYPE, Some(value.clone())),
        }
    }
}

fn boxed(kind: &str, value: Option<Value>) -> Value {
    let mut map = Map::new();
    map.insert(TYPE_KEY.to_string(), Value::from(kind));
    if let Some(value) = value {
        map.insert(VALUE_KEY.to_string(), value);
    }
    Value::Object(map)
}

fn decode_ref_target(value: &Value) -> Option<Path> {
    value
        .as_array()?
        .iter()
        .map(Key::from_json)
        .collect::<Option<Vec<_>>>()
        .map(Path::new)
}

/// Outcome of a synchronous read.
///
/// `Unavailable` is the normal "not in the local cache" answer and is never an
/// error. `Undefined` means the location exists and holds no value.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Present(Value),
    Undefined,
    Unavailable,
}

impl Resolution {
    pub fn is_available(&self) -> bool {
        !matches!(self, Resolution::Unavailable)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Resolution::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Resolution::Present(value) => Some(value),
            _ => None,
        }
    }

    /// Resolution of a non-reference node at the end of a path.
    pub(crate) fn of_terminal(node: &Node) -> Self {
        match node {
            Node::Atom(Some(value)) => Resolution::Present(value.clone()),
            Node::Atom(None) => Resolution::Undefined,
            Node::Value(value) => Resolution::Present(value.clone()),
            Node::Branch(_) | Node::Error(_) | Node::Ref(_) => Resolution::Present(node.to_json()),
        }
    }
}

