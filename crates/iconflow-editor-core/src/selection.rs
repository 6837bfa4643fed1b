//! Selections over flat document positions.
//!
//! A range selection has an `anchor` (fixed end) and a `head` (moving end);
//! a caret is a collapsed range. A node selection covers exactly one
//! selectable node, addressed by the position before it.

use iconflow_model::{Mark, Node, Schema, resolve};

use crate::step::{Assoc, StepMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Range { anchor: usize, head: usize },
    NodeAt { pos: usize },
}

impl Selection {
    pub fn caret(pos: usize) -> Selection {
        Selection::Range {
            anchor: pos,
            head: pos,
        }
    }

    /// Build a selection from raw endpoints: clamp them into the document
    /// and, for a caret, bias it into the nearest textblock so typing always
    /// has a place to go.
    pub fn at(schema: &Schema, doc: &Node, anchor: usize, head: usize) -> Selection {
        let size = doc.content_size();
        let anchor = anchor.min(size);
        let head = head.min(size);
        if anchor == head {
            Selection::caret(nearest_text_pos(schema, doc, anchor))
        } else {
            Selection::Range { anchor, head }
        }
    }

    /// Select the node starting at `pos`, if it is selectable.
    pub fn node_at(schema: &Schema, doc: &Node, pos: usize) -> Option<Selection> {
        let r = resolve(doc, pos).ok()?;
        let node = r.node_after()?;
        schema
            .is_selectable(node.name())
            .then_some(Selection::NodeAt { pos })
    }

    pub fn anchor(&self) -> usize {
        match self {
            Selection::Range { anchor, .. } => *anchor,
            Selection::NodeAt { pos } => *pos,
        }
    }

    pub fn head(&self) -> usize {
        match self {
            Selection::Range { head, .. } => *head,
            Selection::NodeAt { pos } => *pos,
        }
    }

    pub fn is_caret(&self) -> bool {
        matches!(self, Selection::Range { anchor, head } if anchor == head)
    }

    /// The covered range in document order. A node selection covers the
    /// node's own span.
    pub fn range(&self, doc: &Node) -> (usize, usize) {
        match self {
            Selection::Range { anchor, head } => (*anchor.min(head), *anchor.max(head)),
            Selection::NodeAt { pos } => {
                let size = resolve(doc, *pos)
                    .ok()
                    .and_then(|r| r.node_after().map(Node::size))
                    .unwrap_or(0);
                (*pos, *pos + size)
            }
        }
    }

    /// Translate through step maps and re-validate against the new tree.
    /// Node selections whose node is gone degrade to a caret nearby.
    pub fn mapped(&self, schema: &Schema, doc: &Node, maps: &[StepMap]) -> Selection {
        let map = |pos: usize, assoc: Assoc| maps.iter().fold(pos, |p, m| m.map_pos(p, assoc));
        match self {
            Selection::Range { anchor, head } => Selection::at(
                schema,
                doc,
                map(*anchor, Assoc::After),
                map(*head, Assoc::After),
            ),
            Selection::NodeAt { pos } => {
                let pos = map(*pos, Assoc::Before);
                Selection::node_at(schema, doc, pos)
                    .unwrap_or_else(|| Selection::at(schema, doc, pos, pos))
            }
        }
    }

    /// Re-validate against a tree this selection was not computed for, e.g.
    /// after undo restores an older document.
    pub fn normalize(&self, schema: &Schema, doc: &Node) -> Selection {
        match self {
            Selection::Range { anchor, head } => Selection::at(schema, doc, *anchor, *head),
            Selection::NodeAt { pos } => {
                let pos = (*pos).min(doc.content_size());
                Selection::node_at(schema, doc, pos)
                    .unwrap_or_else(|| Selection::at(schema, doc, pos, pos))
            }
        }
    }
}

/// The nearest position inside a textblock: scan forward from `pos`, then
/// backward. Falls back to `pos` when the document has no textblock.
pub fn nearest_text_pos(schema: &Schema, doc: &Node, pos: usize) -> usize {
    let size = doc.content_size();
    let pos = pos.min(size);
    let in_textblock = |p: usize| {
        resolve(doc, p).is_ok_and(|r| schema.is_textblock(&r.parent().name))
    };
    for p in pos..=size {
        if in_textblock(p) {
            return p;
        }
    }
    for p in (0..pos).rev() {
        if in_textblock(p) {
            return p;
        }
    }
    pos
}

/// The marks a caret at `pos` would apply to typed text: the marks of the
/// text before the position, or of the text after when nothing precedes it.
pub fn marks_at(doc: &Node, pos: usize) -> Vec<Mark> {
    let Ok(r) = resolve(doc, pos) else {
        return Vec::new();
    };
    let parent = r.parent();
    let (index, child_start) = parent.content.find_index(r.parent_offset);
    let child = if r.parent_offset > child_start {
        parent.content.child(index)
    } else if index > 0 {
        parent.content.child(index - 1)
    } else {
        parent.content.child(index)
    };
    child
        .and_then(Node::as_text)
        .map(|t| t.marks.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use iconflow_model::{Attrs, Fragment, mark_in_set};

    use crate::step::Step;

    fn schema() -> Schema {
        Schema::basic("heart").unwrap()
    }

    fn doc(s: &Schema, children: Vec<Node>) -> Node {
        Node::elem(s, "doc", Attrs::new(), children)
    }

    fn para(s: &Schema, children: Vec<Node>) -> Node {
        Node::elem(s, "paragraph", Attrs::new(), children)
    }

    #[test]
    fn test_caret_biases_into_textblock() {
        let s = schema();
        let d = doc(&s, vec![para(&s, vec![])]);
        // Position 0 is before the paragraph; the caret lands inside it.
        let sel = Selection::at(&s, &d, 0, 0);
        assert_eq!(sel, Selection::caret(1));

        // End of document biases backward into the last textblock.
        let d = doc(&s, vec![para(&s, vec![Node::text("hi")])]);
        let sel = Selection::at(&s, &d, 4, 4);
        assert_eq!(sel, Selection::caret(3));
    }

    #[test]
    fn test_out_of_range_clamps() {
        let s = schema();
        let d = doc(&s, vec![para(&s, vec![Node::text("hi")])]);
        let sel = Selection::at(&s, &d, 99, 99);
        assert_eq!(sel, Selection::caret(3));
    }

    #[test]
    fn test_node_selection() {
        let s = schema();
        let icon = Node::elem(&s, "icon", Attrs::new(), vec![]);
        let d = doc(&s, vec![para(&s, vec![Node::text("a"), icon])]);
        let sel = Selection::node_at(&s, &d, 2).unwrap();
        assert_eq!(sel.range(&d), (2, 3));
        // Text is not selectable as a node.
        assert!(Selection::node_at(&s, &d, 1).is_none());
    }

    #[test]
    fn test_mapped_through_insert() {
        let s = schema();
        let d = doc(&s, vec![para(&s, vec![Node::text("ab")])]);
        let step = Step::replace(2, 2, Fragment::from(vec![Node::text("xy")]));
        let d2 = step.apply(&s, &d).unwrap();
        let sel = Selection::caret(2).mapped(&s, &d2, &[step.map()]);
        assert_eq!(sel, Selection::caret(4));
        let before = Selection::caret(1).mapped(&s, &d2, &[step.map()]);
        assert_eq!(before, Selection::caret(1));
    }

    #[test]
    fn test_node_selection_degrades_when_node_deleted() {
        let s = schema();
        let icon = Node::elem(&s, "icon", Attrs::new(), vec![]);
        let d = doc(&s, vec![para(&s, vec![Node::text("a"), icon])]);
        let step = Step::replace(2, 3, Fragment::empty());
        let d2 = step.apply(&s, &d).unwrap();
        let sel = Selection::NodeAt { pos: 2 }.mapped(&s, &d2, &[step.map()]);
        assert!(matches!(sel, Selection::Range { .. }));
    }

    #[test]
    fn test_marks_at_prefers_text_before() {
        let s = schema();
        let strong = Mark::new(&s, "strong");
        let d = doc(
            &s,
            vec![para(
                &s,
                vec![
                    Node::text_marked("ab", vec![strong.clone()]),
                    Node::text("cd"),
                ],
            )],
        );
        // After the bold run: bold continues.
        assert!(mark_in_set(&marks_at(&d, 3), "strong"));
        // Inside the plain run: no marks.
        assert!(marks_at(&d, 4).is_empty());
        // Start of the paragraph: marks of the following text.
        assert!(mark_in_set(&marks_at(&d, 1), "strong"));
    }
}
