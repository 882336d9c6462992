//! Conversion of the query engine's raw element tree into stable, selector-usable
//! descriptors.
//!
//! The engine tags every element it resolves with a private `tf623_id`
//! attribute. A node carrying that field is an element; any other object is a
//! container whose values are converted recursively.

use serde::Serialize;
use serde_json::{Map, Value};

/// Field that marks an engine-resolved element.
pub const ELEMENT_ID_FIELD: &str = "tf623_id";

/// Attribute keys dropped from descriptors.
pub const DENYLISTED_ATTRIBUTES: [&str; 3] = ["class", "background-image", "style"];

/// Raw tree as returned by the query engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementNode {
    Leaf(RawElement),
    Container(Vec<(String, ElementNode)>),
    List(Vec<ElementNode>),
    Scalar(Value),
}

/// Element as reported by the engine, before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct RawElement {
    pub id: String,
    pub html_tag: Option<Value>,
    pub role: Option<Value>,
    pub name: Option<Value>,
    pub attributes: Map<String, Value>,
}

/// Public element shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementDescriptor {
    pub selector: String,
    pub tag: Option<Value>,
    pub role: Option<Value>,
    pub name: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
}

impl ElementNode {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::List(items.into_iter().map(Self::from_value).collect()),
            Value::Object(map) if map.contains_key(ELEMENT_ID_FIELD) => {
                Self::Leaf(RawElement::from_map(map))
            }
            Value::Object(map) => Self::Container(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_value(v)))
                    .collect(),
            ),
            other => Self::Scalar(other),
        }
    }

    /// Convert to the public shape, preserving nesting and key order.
    pub fn enrich(&self) -> Value {
        match self {
            Self::Leaf(raw) => serde_json::to_value(raw.describe()).unwrap_or(Value::Null),
            Self::Container(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, node)| (k.clone(), node.enrich()))
                    .collect(),
            ),
            Self::List(items) => Value::Array(items.iter().map(Self::enrich).collect()),
            Self::Scalar(v) => v.clone(),
        }
    }
}

impl RawElement {
    fn from_map(mut map: Map<String, Value>) -> Self {
        let id = match map.remove(ELEMENT_ID_FIELD) {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let attributes = match map.remove("attributes") {
            Some(Value::Object(attrs)) => attrs,
            _ => Map::new(),
        };
        Self {
            id,
            html_tag: truthy(map.remove("html_tag")),
            role: truthy(map.remove("role")),
            name: truthy(map.remove("name")),
            attributes,
        }
    }

    pub fn selector(&self) -> String {
        format!("[{}=\"{}\"]", ELEMENT_ID_FIELD, self.id)
    }

    pub fn describe(&self) -> ElementDescriptor {
        let attrs: Map<String, Value> = self
            .attributes
            .iter()
            .filter(|(k, _)| !DENYLISTED_ATTRIBUTES.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        ElementDescriptor {
            selector: self.selector(),
            tag: self.html_tag.clone(),
            role: self.role.clone(),
            name: self.name.clone(),
            attributes: (!attrs.is_empty()).then_some(attrs),
        }
    }
}

// Falsy values ("", 0, false, null) count as absent; anything else is kept as-is
fn truthy(value: Option<Value>) -> Option<Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// Enrich a raw engine response.
pub fn enrich_elements(raw: Value) -> Value {
    ElementNode::from_value(raw).enrich()
}
