//! Interchange format: the JSON-shaped tree used for storage and export.
//!
//! `to_interchange` and `from_interchange` are exact inverses aside from
//! default-attribute omission and reinstatement. Loading validates every
//! node's content against the schema and aborts on the first violation; no
//! partial document is produced.

use serde_json::{Map, Value, json};
use smol_str::SmolStr;

use crate::error::ValidationError;
use crate::node::{Elem, Mark, Node, Text, add_mark_to_set};
use crate::schema::{Attrs, DOC, Schema, TEXT};

/// Project a node to the interchange tree. Attributes equal to the declared
/// default are omitted; marks appear in canonical order.
pub fn to_interchange(schema: &Schema, node: &Node) -> Value {
    match node {
        Node::Text(t) => text_to_value(schema, t),
        Node::Elem(e) => elem_to_value(schema, e),
    }
}

fn text_to_value(schema: &Schema, t: &Text) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), json!(TEXT));
    obj.insert("text".into(), json!(t.text));
    if !t.marks.is_empty() {
        let marks: Vec<Value> = t.marks.iter().map(|m| mark_to_value(schema, m)).collect();
        obj.insert("marks".into(), Value::Array(marks));
    }
    Value::Object(obj)
}

fn mark_to_value(schema: &Schema, m: &Mark) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), json!(m.name));
    let attrs = strip_defaults(&m.attrs, &schema.default_mark_attrs(&m.name));
    if !attrs.is_empty() {
        obj.insert("attrs".into(), Value::Object(attrs));
    }
    Value::Object(obj)
}

fn elem_to_value(schema: &Schema, e: &Elem) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), json!(e.name));
    let attrs = strip_defaults(&e.attrs, &schema.default_attrs(&e.name));
    if !attrs.is_empty() {
        obj.insert("attrs".into(), Value::Object(attrs));
    }
    if !e.content.is_empty() {
        let content: Vec<Value> = e
            .content
            .children()
            .iter()
            .map(|c| to_interchange(schema, c))
            .collect();
        obj.insert("content".into(), Value::Array(content));
    }
    Value::Object(obj)
}

fn strip_defaults(attrs: &Attrs, defaults: &Attrs) -> Map<String, Value> {
    attrs
        .iter()
        .filter(|(k, v)| defaults.get(*k) != Some(v))
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Parse an interchange tree into a node, reinstating default attributes and
/// validating content expressions.
///
/// Unknown node types are preserved structurally so that HTML export can
/// fall back to their children.
pub fn from_interchange(schema: &Schema, value: &Value) -> Result<Node, ValidationError> {
    parse_node(schema, value, &mut vec![DOC.into()])
}

/// Parse an interchange tree and require the root to be the document type.
pub fn doc_from_interchange(schema: &Schema, value: &Value) -> Result<Node, ValidationError> {
    let node = from_interchange(schema, value)?;
    if node.name() != DOC {
        return Err(ValidationError::BadRoot {
            expected: DOC.into(),
            got: node.name().into(),
        });
    }
    Ok(node)
}

fn path_string(path: &[SmolStr]) -> String {
    path.join("/")
}

fn parse_node(
    schema: &Schema,
    value: &Value,
    path: &mut Vec<SmolStr>,
) -> Result<Node, ValidationError> {
    let obj = value.as_object().ok_or_else(|| ValidationError::BadShape {
        path: path_string(path),
    })?;
    let type_name: SmolStr = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::BadShape {
            path: path_string(path),
        })?
        .into();

    if type_name == TEXT {
        return parse_text(schema, obj, path);
    }

    let mut attrs = schema.default_attrs(&type_name);
    if let Some(given) = obj.get("attrs").and_then(Value::as_object) {
        for (k, v) in given {
            attrs.insert(SmolStr::new(k), v.clone());
        }
    }

    let mut children = Vec::new();
    if let Some(content) = obj.get("content").and_then(Value::as_array) {
        for (i, child) in content.iter().enumerate() {
            path.push(SmolStr::new(i.to_string()));
            children.push(parse_node(schema, child, path)?);
            path.pop();
        }
    }

    if schema.is_leaf(&type_name) && !children.is_empty() {
        return Err(ValidationError::LeafWithContent {
            path: path_string(path),
            node: type_name,
        });
    }
    if !schema.valid_content(&type_name, children.iter().map(Node::name)) {
        return Err(ValidationError::InvalidContent {
            path: path_string(path),
            node: type_name.clone(),
            expr: schema.content_expr_source(&type_name),
        });
    }

    Ok(Node::elem(schema, type_name, attrs, children))
}

fn parse_text(
    schema: &Schema,
    obj: &Map<String, Value>,
    path: &mut Vec<SmolStr>,
) -> Result<Node, ValidationError> {
    let text = obj
        .get("text")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ValidationError::EmptyText {
            path: path_string(path),
        })?;

    let mut marks: Vec<Mark> = Vec::new();
    if let Some(raw) = obj.get("marks").and_then(Value::as_array) {
        for mark in raw {
            let obj = mark.as_object().ok_or_else(|| ValidationError::BadShape {
                path: path_string(path),
            })?;
            let name: SmolStr = obj
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| ValidationError::BadShape {
                    path: path_string(path),
                })?
                .into();
            if schema.mark_type(&name).is_none() {
                return Err(ValidationError::UnknownMark {
                    path: path_string(path),
                    mark: name,
                });
            }
            let mut attrs = schema.default_mark_attrs(&name);
            if let Some(given) = obj.get("attrs").and_then(Value::as_object) {
                for (k, v) in given {
                    attrs.insert(SmolStr::new(k), v.clone());
                }
            }
            marks = add_mark_to_set(&marks, Mark { name, attrs }, schema);
        }
    }

    Ok(Node::text_marked(text, marks))
}
