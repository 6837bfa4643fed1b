//! Schema registry: node types, mark types, and content expressions.
//!
//! A `Schema` is defined once at startup and shared (behind an `Arc`) by the
//! document tree, the step engine, and the serializers. Mark registration
//! order is significant: it fixes the canonical mark order used for mark
//! sets and for HTML nesting.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;
use smol_str::SmolStr;

use crate::error::SchemaError;

/// Attribute map for nodes and marks. Ordered so that equality and
/// serialization are deterministic.
pub type Attrs = BTreeMap<SmolStr, Value>;

/// Declaration of a node type.
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    /// Content expression over child types/groups, e.g. `"block+"` or
    /// `"inline*"`. `None` for leaf nodes and text.
    pub content: Option<SmolStr>,
    /// Group this type belongs to, e.g. `"block"` or `"inline"`.
    pub group: Option<SmolStr>,
    /// Whether the node lives in inline content.
    pub inline: bool,
    /// Leaf nodes have no content and no text (icon, hard break).
    pub leaf: bool,
    /// Attribute names with their default values.
    pub attrs: Vec<(SmolStr, Value)>,
    /// Whether the node can be selected as a whole (node selection).
    pub selectable: bool,
}

/// Declaration of a mark type.
#[derive(Debug, Clone, Default)]
pub struct MarkSpec {
    /// Attribute names with their default values.
    pub attrs: Vec<(SmolStr, Value)>,
}

/// One element of a parsed content expression: a set of admissible child
/// types with a repetition count.
#[derive(Debug, Clone)]
struct ContentElem {
    allowed: BTreeSet<SmolStr>,
    min: u32,
    max: Option<u32>,
}

/// A compiled content expression.
///
/// Supports the grammar used by the standard schema: a whitespace-separated
/// sequence of `name`, `name+`, `name*`, `name?` where `name` is a node type
/// or a group.
#[derive(Debug, Clone)]
pub struct ContentExpr {
    source: SmolStr,
    elems: Vec<ContentElem>,
}

impl ContentExpr {
    fn parse(
        node: &SmolStr,
        source: &SmolStr,
        resolve: impl Fn(&str) -> Option<Vec<SmolStr>>,
    ) -> Result<Self, SchemaError> {
        let mut elems = Vec::new();
        for token in source.split_whitespace() {
            let (name, min, max) = match token.as_bytes().last() {
                Some(b'+') => (&token[..token.len() - 1], 1, None),
                Some(b'*') => (&token[..token.len() - 1], 0, None),
                Some(b'?') => (&token[..token.len() - 1], 0, Some(1)),
                Some(_) => (token, 1, Some(1)),
                None => {
                    return Err(SchemaError::BadContentExpr {
                        node: node.clone(),
                        expr: source.clone(),
                    });
                }
            };
            if name.is_empty() {
                return Err(SchemaError::BadContentExpr {
                    node: node.clone(),
                    expr: source.clone(),
                });
            }
            let allowed = resolve(name).ok_or_else(|| SchemaError::UnknownContentRef {
                node: node.clone(),
                expr: source.clone(),
                name: name.into(),
            })?;
            elems.push(ContentElem {
                allowed: allowed.into_iter().collect(),
                min,
                max,
            });
        }
        Ok(Self {
            source: source.clone(),
            elems,
        })
    }

    /// The source text of this expression, for error reporting.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Check a sequence of child type names against this expression.
    ///
    /// Types the schema does not know act as wildcards: they satisfy any
    /// element. This is what lets a document carrying an unknown node type
    /// load and serialize (the serializer falls back to its children).
    pub fn matches<'a>(
        &self,
        children: impl IntoIterator<Item = &'a str>,
        known: impl Fn(&str) -> bool,
    ) -> bool {
        let names: Vec<&str> = children.into_iter().collect();
        let mut idx = 0;
        for elem in &self.elems {
            let mut count = 0u32;
            while idx < names.len() {
                let name = names[idx];
                let fits = !known(name) || elem.allowed.contains(name);
                if fits && elem.max.map_or(true, |m| count < m) {
                    count += 1;
                    idx += 1;
                } else {
                    break;
                }
            }
            if count < elem.min {
                return false;
            }
        }
        idx == names.len()
    }
}

/// A registered node type.
#[derive(Debug, Clone)]
pub struct NodeType {
    pub name: SmolStr,
    pub spec: NodeSpec,
    pub content: Option<ContentExpr>,
    /// True when every admissible child is inline (paragraph, heading).
    pub inline_content: bool,
}

/// A registered mark type. `rank` is the registration index and defines the
/// canonical mark order.
#[derive(Debug, Clone)]
pub struct MarkType {
    pub name: SmolStr,
    pub spec: MarkSpec,
    pub rank: usize,
}

/// The set of node and mark types a document is validated against.
#[derive(Debug)]
pub struct Schema {
    nodes: Vec<NodeType>,
    marks: Vec<MarkType>,
    node_index: HashMap<SmolStr, usize>,
    mark_index: HashMap<SmolStr, usize>,
}

pub const DOC: &str = "doc";
pub const TEXT: &str = "text";

impl Schema {
    /// Compile a schema from node and mark declarations.
    ///
    /// Fails if two types share a name, if a content expression references an
    /// undefined type or group, or if the required root type `"doc"` is absent.
    pub fn define(
        nodes: Vec<(SmolStr, NodeSpec)>,
        marks: Vec<(SmolStr, MarkSpec)>,
    ) -> Result<Schema, SchemaError> {
        let mut node_index = HashMap::new();
        for (i, (name, _)) in nodes.iter().enumerate() {
            if node_index.insert(name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateNode(name.clone()));
            }
        }
        if !node_index.contains_key(DOC) {
            return Err(SchemaError::MissingRoot(DOC.into()));
        }

        let mut mark_index = HashMap::new();
        let mut mark_types = Vec::new();
        for (rank, (name, spec)) in marks.into_iter().enumerate() {
            if mark_index.insert(name.clone(), rank).is_some() {
                return Err(SchemaError::DuplicateMark(name));
            }
            mark_types.push(MarkType { name, spec, rank });
        }

        // A content-expression name resolves to a single type or to every
        // type declaring that group.
        let resolve = |name: &str| -> Option<Vec<SmolStr>> {
            if node_index.contains_key(name) {
                return Some(vec![name.into()]);
            }
            let members: Vec<SmolStr> = nodes
                .iter()
                .filter(|(_, spec)| spec.group.as_deref() == Some(name))
                .map(|(n, _)| n.clone())
                .collect();
            if members.is_empty() { None } else { Some(members) }
        };

        let mut node_types = Vec::new();
        for (name, spec) in &nodes {
            let content = match &spec.content {
                Some(src) => Some(ContentExpr::parse(name, src, resolve)?),
                None => None,
            };
            let inline_content = content.as_ref().is_some_and(|expr| {
                !expr.elems.is_empty()
                    && expr.elems.iter().all(|e| {
                        e.allowed.iter().all(|n| {
                            n.as_str() == TEXT
                                || nodes
                                    .iter()
                                    .any(|(other, s)| other == n && s.inline)
                        })
                    })
            });
            node_types.push(NodeType {
                name: name.clone(),
                spec: spec.clone(),
                content,
                inline_content,
            });
        }

        Ok(Schema {
            nodes: node_types,
            marks: mark_types,
            node_index,
            mark_index,
        })
    }

    /// The standard document schema: doc, paragraph, heading, blockquote,
    /// lists, hard break, text, plus the inline icon leaf, with strong, em
    /// and code marks.
    ///
    /// `default_icon` becomes the `iconName` attribute default of the icon
    /// node.
    pub fn basic(default_icon: &str) -> Result<Schema, SchemaError> {
        let block = || Some(SmolStr::new("block"));
        let inline = || Some(SmolStr::new("inline"));
        let nodes: Vec<(SmolStr, NodeSpec)> = vec![
            (
                DOC.into(),
                NodeSpec {
                    content: Some("block+".into()),
                    ..Default::default()
                },
            ),
            (
                "paragraph".into(),
                NodeSpec {
                    content: Some("inline*".into()),
                    group: block(),
                    ..Default::default()
                },
            ),
            (
                "heading".into(),
                NodeSpec {
                    content: Some("inline*".into()),
                    group: block(),
                    attrs: vec![("level".into(), Value::from(1))],
                    ..Default::default()
                },
            ),
            (
                "blockquote".into(),
                NodeSpec {
                    content: Some("block+".into()),
                    group: block(),
                    ..Default::default()
                },
            ),
            (
                "bullet_list".into(),
                NodeSpec {
                    content: Some("list_item+".into()),
                    group: block(),
                    ..Default::default()
                },
            ),
            (
                "ordered_list".into(),
                NodeSpec {
                    content: Some("list_item+".into()),
                    group: block(),
                    attrs: vec![("order".into(), Value::from(1))],
                    ..Default::default()
                },
            ),
            (
                "list_item".into(),
                NodeSpec {
                    content: Some("paragraph block*".into()),
                    ..Default::default()
                },
            ),
            (
                TEXT.into(),
                NodeSpec {
                    group: inline(),
                    inline: true,
                    ..Default::default()
                },
            ),
            (
                "hard_break".into(),
                NodeSpec {
                    group: inline(),
                    inline: true,
                    leaf: true,
                    ..Default::default()
                },
            ),
            (
                "icon".into(),
                NodeSpec {
                    group: inline(),
                    inline: true,
                    leaf: true,
                    selectable: true,
                    attrs: vec![("iconName".into(), Value::from(default_icon))],
                    ..Default::default()
                },
            ),
        ];
        let marks: Vec<(SmolStr, MarkSpec)> = vec![
            ("strong".into(), MarkSpec::default()),
            ("em".into(), MarkSpec::default()),
            ("code".into(), MarkSpec::default()),
        ];
        Schema::define(nodes, marks)
    }

    pub fn node_type(&self, name: &str) -> Option<&NodeType> {
        self.node_index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn mark_type(&self, name: &str) -> Option<&MarkType> {
        self.mark_index.get(name).map(|&i| &self.marks[i])
    }

    pub fn mark_types(&self) -> &[MarkType] {
        &self.marks
    }

    /// Canonical ordering rank of a mark type. Unknown marks sort last.
    pub fn mark_rank(&self, name: &str) -> usize {
        self.mark_index.get(name).copied().unwrap_or(usize::MAX)
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.node_index.contains_key(name)
    }

    pub fn is_inline(&self, name: &str) -> bool {
        self.node_type(name).is_some_and(|t| t.spec.inline)
    }

    pub fn is_leaf(&self, name: &str) -> bool {
        self.node_type(name).is_some_and(|t| t.spec.leaf)
    }

    /// Whether a node of this type holds inline content (paragraph, heading).
    pub fn is_textblock(&self, name: &str) -> bool {
        self.node_type(name).is_some_and(|t| t.inline_content)
    }

    pub fn is_selectable(&self, name: &str) -> bool {
        self.node_type(name).is_some_and(|t| t.spec.selectable)
    }

    /// Default attributes of a node type. Empty for unknown types.
    pub fn default_attrs(&self, name: &str) -> Attrs {
        self.node_type(name)
            .map(|t| t.spec.attrs.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Default attributes of a mark type.
    pub fn default_mark_attrs(&self, name: &str) -> Attrs {
        self.mark_type(name)
            .map(|t| t.spec.attrs.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Check a child type sequence against the content expression of `parent`.
    ///
    /// Unknown parent types accept anything; known leaf types accept only an
    /// empty sequence.
    pub fn valid_content<'a>(
        &self,
        parent: &str,
        children: impl IntoIterator<Item = &'a str>,
    ) -> bool {
        let mut children = children.into_iter().peekable();
        match self.node_type(parent) {
            Some(t) => match &t.content {
                Some(expr) => expr.matches(children, |n| self.is_known(n)),
                None => children.peek().is_none(),
            },
            None => true,
        }
    }

    /// The content expression source of a node type, for error messages.
    pub fn content_expr_source(&self, name: &str) -> SmolStr {
        self.node_type(name)
            .and_then(|t| t.content.as_ref())
            .map(|e| SmolStr::new(e.source()))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_schema_defines() {
        let schema = Schema::basic("heart").unwrap();
        assert!(schema.node_type("doc").is_some());
        assert!(schema.node_type("icon").is_some());
        assert!(schema.is_leaf("icon"));
        assert!(schema.is_inline("icon"));
        assert!(schema.is_textblock("paragraph"));
        assert!(!schema.is_textblock("blockquote"));
        assert_eq!(schema.mark_rank("strong"), 0);
        assert_eq!(schema.mark_rank("em"), 1);
        assert_eq!(schema.mark_rank("code"), 2);
        assert_eq!(
            schema.default_attrs("icon").get("iconName"),
            Some(&Value::from("heart"))
        );
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let nodes = vec![
            ("doc".into(), NodeSpec::default()),
            ("doc".into(), NodeSpec::default()),
        ];
        assert_eq!(
            Schema::define(nodes, vec![]).unwrap_err(),
            SchemaError::DuplicateNode("doc".into())
        );
    }

    #[test]
    fn test_missing_root_rejected() {
        let nodes = vec![("paragraph".into(), NodeSpec::default())];
        assert_eq!(
            Schema::define(nodes, vec![]).unwrap_err(),
            SchemaError::MissingRoot("doc".into())
        );
    }

    #[test]
    fn test_unknown_content_ref_rejected() {
        let nodes = vec![(
            "doc".into(),
            NodeSpec {
                content: Some("widget+".into()),
                ..Default::default()
            },
        )];
        let err = Schema::define(nodes, vec![]).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownContentRef { name, .. } if name == "widget"));
    }

    #[test]
    fn test_content_matching() {
        let schema = Schema::basic("heart").unwrap();
        assert!(schema.valid_content("doc", ["paragraph"]));
        assert!(schema.valid_content("doc", ["heading", "paragraph", "bullet_list"]));
        assert!(!schema.valid_content("doc", Vec::<&str>::new()));
        assert!(!schema.valid_content("doc", ["text"]));
        assert!(schema.valid_content("paragraph", ["text", "icon", "hard_break"]));
        assert!(schema.valid_content("paragraph", Vec::<&str>::new()));
        assert!(!schema.valid_content("paragraph", ["paragraph"]));
        assert!(schema.valid_content("bullet_list", ["list_item", "list_item"]));
        assert!(!schema.valid_content("bullet_list", ["paragraph"]));
        assert!(schema.valid_content("list_item", ["paragraph", "bullet_list"]));
        assert!(!schema.valid_content("list_item", ["bullet_list"]));
        // Leaf types take no content.
        assert!(schema.valid_content("icon", Vec::<&str>::new()));
        assert!(!schema.valid_content("icon", ["text"]));
    }

    #[test]
    fn test_unknown_types_are_wildcards() {
        let schema = Schema::basic("heart").unwrap();
        assert!(schema.valid_content("doc", ["foo"]));
        assert!(schema.valid_content("doc", ["paragraph", "foo", "heading"]));
        // Unknown parents accept anything.
        assert!(schema.valid_content("foo", ["paragraph", "bar"]));
    }

    #[test]
    fn test_inline_leaf_extension() {
        // A new inline leaf registers with spec alone; nothing else changes.
        let mut nodes: Vec<(SmolStr, NodeSpec)> = vec![
            (
                "doc".into(),
                NodeSpec {
                    content: Some("block+".into()),
                    ..Default::default()
                },
            ),
            (
                "paragraph".into(),
                NodeSpec {
                    content: Some("inline*".into()),
                    group: Some("block".into()),
                    ..Default::default()
                },
            ),
            (
                "text".into(),
                NodeSpec {
                    group: Some("inline".into()),
                    inline: true,
                    ..Default::default()
                },
            ),
        ];
        nodes.push((
            "emoji".into(),
            NodeSpec {
                group: Some("inline".into()),
                inline: true,
                leaf: true,
                attrs: vec![("code".into(), Value::from("smile"))],
                selectable: true,
                ..Default::default()
            },
        ));
        let schema = Schema::define(nodes, vec![]).unwrap();
        assert!(schema.is_leaf("emoji"));
        assert!(schema.valid_content("paragraph", ["text", "emoji"]));
    }
}
