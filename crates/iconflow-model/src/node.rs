//! The document tree: nodes, text runs, marks, and fragments.
//!
//! Nodes are immutable values; every edit builds a new tree. Sizes follow the
//! token-slot model: a text run counts one slot per character, a non-text
//! leaf counts one slot, and any other node counts its content plus an open
//! and a close slot.

use smol_str::SmolStr;

use crate::schema::{Attrs, Schema, TEXT};

/// A typed, attribute-bearing annotation on a run of text.
///
/// Two marks are equal iff they have the same type and the same attrs.
#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    pub name: SmolStr,
    pub attrs: Attrs,
}

impl Mark {
    /// A mark of the given type with its default attributes.
    pub fn new(schema: &Schema, name: impl Into<SmolStr>) -> Mark {
        let name = name.into();
        let attrs = schema.default_mark_attrs(&name);
        Mark { name, attrs }
    }

    pub fn with_attrs(name: impl Into<SmolStr>, attrs: Attrs) -> Mark {
        Mark {
            name: name.into(),
            attrs,
        }
    }
}

/// Insert a mark into a set, keeping canonical (registration rank) order.
///
/// A set holds at most one mark per type: a same-type mark with different
/// attrs is replaced, not stacked.
pub fn add_mark_to_set(set: &[Mark], mark: Mark, schema: &Schema) -> Vec<Mark> {
    let mut out: Vec<Mark> = set.iter().filter(|m| m.name != mark.name).cloned().collect();
    out.push(mark);
    out.sort_by_key(|m| (schema.mark_rank(&m.name), m.name.clone()));
    out
}

/// Remove marks of the given type from a set. When `attrs` is given only an
/// exact match is removed.
pub fn remove_mark_from_set(set: &[Mark], name: &str, attrs: Option<&Attrs>) -> Vec<Mark> {
    set.iter()
        .filter(|m| m.name != name || attrs.is_some_and(|a| &m.attrs != a))
        .cloned()
        .collect()
}

/// Whether a set contains a mark of the given type.
pub fn mark_in_set(set: &[Mark], name: &str) -> bool {
    set.iter().any(|m| m.name == name)
}

/// A non-text node: a block, or an inline leaf such as an icon.
#[derive(Debug, Clone, PartialEq)]
pub struct Elem {
    pub name: SmolStr,
    pub attrs: Attrs,
    pub content: Fragment,
    /// Leaf nodes never have content and occupy a single token slot.
    pub leaf: bool,
}

impl Elem {
    pub fn size(&self) -> usize {
        if self.leaf { 1 } else { self.content.size() + 2 }
    }
}

/// A text run with its mark set (kept in canonical order).
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub text: String,
    pub marks: Vec<Mark>,
}

impl Text {
    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    /// Slice by char offsets.
    pub fn slice(&self, from: usize, to: usize) -> Text {
        let text: String = self.text.chars().skip(from).take(to - from).collect();
        Text {
            text,
            marks: self.marks.clone(),
        }
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Elem(Elem),
    Text(Text),
}

impl Node {
    /// Build a non-text node, overlaying the type's default attributes.
    ///
    /// Types the schema does not know are kept structurally; they count as
    /// leaves only when they carry no children.
    pub fn elem(
        schema: &Schema,
        name: impl Into<SmolStr>,
        attrs: Attrs,
        children: Vec<Node>,
    ) -> Node {
        let name = name.into();
        let mut merged = schema.default_attrs(&name);
        merged.extend(attrs);
        let content = Fragment::from(children);
        let leaf = if schema.is_known(&name) {
            schema.is_leaf(&name)
        } else {
            content.is_empty()
        };
        Node::Elem(Elem {
            name,
            attrs: merged,
            content,
            leaf,
        })
    }

    pub fn text(text: impl Into<String>) -> Node {
        Node::Text(Text {
            text: text.into(),
            marks: Vec::new(),
        })
    }

    pub fn text_marked(text: impl Into<String>, marks: Vec<Mark>) -> Node {
        Node::Text(Text {
            text: text.into(),
            marks,
        })
    }

    /// The type name; `"text"` for text runs.
    pub fn name(&self) -> &str {
        match self {
            Node::Elem(e) => &e.name,
            Node::Text(_) => TEXT,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn as_elem(&self) -> Option<&Elem> {
        match self {
            Node::Elem(e) => Some(e),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(t) => Some(t),
            Node::Elem(_) => None,
        }
    }

    /// Token-slot size of this node.
    pub fn size(&self) -> usize {
        match self {
            Node::Elem(e) => e.size(),
            Node::Text(t) => t.len_chars(),
        }
    }

    /// Size of the content sequence; zero for text and leaves.
    pub fn content_size(&self) -> usize {
        match self {
            Node::Elem(e) => e.content.size(),
            Node::Text(_) => 0,
        }
    }

    pub fn child_count(&self) -> usize {
        match self {
            Node::Elem(e) => e.content.len(),
            Node::Text(_) => 0,
        }
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.as_elem().and_then(|e| e.content.child(index))
    }

    /// Concatenated text of the content overlapping `[from, to)`, in
    /// document positions relative to this node's content.
    pub fn text_between(&self, from: usize, to: usize) -> String {
        let mut out = String::new();
        if let Node::Elem(e) = self {
            walk_text(&e.content, from, to, 0, &mut |text, _, start, end| {
                out.extend(text.text.chars().skip(start).take(end - start));
            });
        }
        out
    }

    /// Whether every text position in `[from, to)` carries a mark of the
    /// given type. Empty ranges and ranges without text have no mark.
    pub fn range_has_mark(&self, from: usize, to: usize, mark_name: &str) -> bool {
        let mut any = false;
        let mut all = true;
        if let Node::Elem(e) = self {
            walk_text(&e.content, from, to, 0, &mut |text, _, start, end| {
                if end > start {
                    any = true;
                    if !mark_in_set(&text.marks, mark_name) {
                        all = false;
                    }
                }
            });
        }
        any && all
    }
}

/// Visit the text runs of `frag` overlapping `[from, to)`.
///
/// `base` is the absolute position of the fragment's start; the callback
/// receives the run, its absolute start, and the overlapped char range
/// within the run.
pub fn walk_text<'a>(
    frag: &'a Fragment,
    from: usize,
    to: usize,
    base: usize,
    f: &mut impl FnMut(&'a Text, usize, usize, usize),
) {
    let mut offset = base;
    for child in frag.children() {
        let end = offset + child.size();
        if end > from && offset < to {
            match child {
                Node::Text(t) => {
                    let start_in = from.saturating_sub(offset);
                    let end_in = (to - offset).min(t.len_chars());
                    f(t, offset, start_in, end_in);
                }
                Node::Elem(e) if !e.leaf => {
                    walk_text(&e.content, from, to, offset + 1, f);
                }
                Node::Elem(_) => {}
            }
        }
        offset = end;
    }
}

/// An ordered child sequence with a cached total size.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    children: Vec<Node>,
    size: usize,
}

impl From<Vec<Node>> for Fragment {
    fn from(children: Vec<Node>) -> Self {
        let size = children.iter().map(Node::size).sum();
        Fragment { children, size }
    }
}

impl Fragment {
    pub fn empty() -> Fragment {
        Fragment::default()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn into_children(self) -> Vec<Node> {
        self.children
    }

    /// Child type names, for content validation.
    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(Node::name)
    }

    /// Local offset at which child `index` starts.
    pub fn child_offset(&self, index: usize) -> usize {
        self.children[..index].iter().map(Node::size).sum()
    }

    /// Locate the child at a local offset.
    ///
    /// Returns `(index, child_start)`. An offset at a boundary yields the
    /// index of the child starting there; the end of the fragment yields
    /// `(len, size)`.
    pub fn find_index(&self, offset: usize) -> (usize, usize) {
        let mut cum = 0;
        for (i, child) in self.children.iter().enumerate() {
            if offset == cum {
                return (i, cum);
            }
            let end = cum + child.size();
            if offset < end {
                return (i, cum);
            }
            cum = end;
        }
        (self.children.len(), cum)
    }

    /// The sub-sequence covering `[from, to)` in local offsets, splitting
    /// text runs at the boundaries. `None` when a boundary falls inside a
    /// non-text node.
    pub fn cut(&self, from: usize, to: usize) -> Option<Fragment> {
        let mut out = Vec::new();
        let mut offset = 0;
        for child in &self.children {
            let end = offset + child.size();
            if end > from && offset < to {
                match child {
                    Node::Text(t) => {
                        let start_in = from.saturating_sub(offset);
                        let end_in = (to - offset).min(t.len_chars());
                        if end_in > start_in {
                            out.push(Node::Text(t.slice(start_in, end_in)));
                        }
                    }
                    Node::Elem(_) => {
                        // Whole nodes only.
                        if offset < from || end > to {
                            return None;
                        }
                        out.push(child.clone());
                    }
                }
            }
            offset = end;
        }
        Some(Fragment::from(out))
    }

    /// Concatenate fragments.
    pub fn concat(parts: Vec<Fragment>) -> Fragment {
        let children: Vec<Node> = parts.into_iter().flat_map(|p| p.children).collect();
        Fragment::from(children)
    }

    /// Merge adjacent text runs with identical mark sets and drop empty
    /// runs. Sizes and positions are unaffected.
    pub fn normalized(self) -> Fragment {
        let mut out: Vec<Node> = Vec::with_capacity(self.children.len());
        for child in self.children {
            match child {
                Node::Text(t) if t.text.is_empty() => {}
                Node::Text(t) => match out.last_mut() {
                    Some(Node::Text(prev)) if prev.marks == t.marks => {
                        prev.text.push_str(&t.text);
                    }
                    _ => out.push(Node::Text(t)),
                },
                other => out.push(other),
            }
        }
        Fragment::from(out)
    }
}
