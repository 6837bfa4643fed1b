//! Atomic, invertible document mutations.
//!
//! A `Step` either replaces a range with new content or adds/removes a mark
//! over a range. Steps apply as a whole or not at all: a failing step leaves
//! the tree untouched. Every step can compute its inverse against the tree
//! it is about to be applied to, which is the sole basis for undo.

use iconflow_model::{
    Elem, Fragment, Mark, Node, PositionError, Schema, SmolStr, Text, add_mark_to_set,
    remove_mark_from_set, resolve,
};
use thiserror::Error;

/// A step would break a structural invariant. The command that assembled the
/// step reports "not applicable" instead of surfacing this to the user.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StepError {
    #[error(transparent)]
    Position(#[from] PositionError),

    #[error("replacement does not satisfy content expression {expr:?} of {parent:?}")]
    InvalidContent { parent: SmolStr, expr: SmolStr },

    #[error("range {from}..{to} cuts through node boundaries")]
    CutsNode { from: usize, to: usize },

    #[error("transaction computed against document version {base}, current is {current}")]
    Stale { base: u64, current: u64 },
}

/// Which side a position sticks to when it falls inside a replaced range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assoc {
    /// Collapse toward the start of the insertion.
    Before,
    /// Collapse toward the end of the insertion (default; a cursor at an
    /// insertion point ends up after the inserted content).
    #[default]
    After,
}

/// The positional effect of a step: one replaced span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepMap {
    pub start: usize,
    pub old_size: usize,
    pub new_size: usize,
}

impl StepMap {
    pub fn identity() -> StepMap {
        StepMap::default()
    }

    /// Translate a position across the change. Positions before the span are
    /// unchanged, positions after shift by the size delta, positions inside
    /// collapse to the boundary chosen by `assoc`.
    pub fn map_pos(&self, pos: usize, assoc: Assoc) -> usize {
        if pos < self.start {
            pos
        } else if pos > self.start + self.old_size {
            pos + self.new_size - self.old_size
        } else {
            match assoc {
                Assoc::Before => self.start,
                Assoc::After => self.start + self.new_size,
            }
        }
    }
}

/// Replace `[from, to)` with a node sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceStep {
    pub from: usize,
    pub to: usize,
    pub slice: Fragment,
}

/// Add or remove a mark over `[from, to)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkStep {
    pub from: usize,
    pub to: usize,
    pub mark: Mark,
}

/// One atomic tree mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Replace(ReplaceStep),
    AddMark(MarkStep),
    RemoveMark(MarkStep),
}

impl Step {
    pub fn replace(from: usize, to: usize, slice: Fragment) -> Step {
        Step::Replace(ReplaceStep { from, to, slice })
    }

    pub fn add_mark(from: usize, to: usize, mark: Mark) -> Step {
        Step::AddMark(MarkStep { from, to, mark })
    }

    pub fn remove_mark(from: usize, to: usize, mark: Mark) -> Step {
        Step::RemoveMark(MarkStep { from, to, mark })
    }

    /// Apply to a document, producing the new tree.
    pub fn apply(&self, schema: &Schema, doc: &Node) -> Result<Node, StepError> {
        match self {
            Step::Replace(r) => apply_replace(schema, doc, r),
            Step::AddMark(m) => apply_mark(schema, doc, m, true),
            Step::RemoveMark(m) => apply_mark(schema, doc, m, false),
        }
    }

    /// The step that undoes this one, computed against the tree state
    /// immediately before application.
    pub fn invert(&self, doc_before: &Node) -> Result<Step, StepError> {
        match self {
            Step::Replace(r) => {
                let removed = slice_between(doc_before, r.from, r.to)?;
                Ok(Step::replace(r.from, r.from + r.slice.size(), removed))
            }
            Step::AddMark(m) => Ok(Step::RemoveMark(m.clone())),
            Step::RemoveMark(m) => Ok(Step::AddMark(m.clone())),
        }
    }

    /// The position map describing this step's effect.
    pub fn map(&self) -> StepMap {
        match self {
            Step::Replace(r) => StepMap {
                start: r.from,
                old_size: r.to - r.from,
                new_size: r.slice.size(),
            },
            Step::AddMark(_) | Step::RemoveMark(_) => StepMap::identity(),
        }
    }
}

/// The content of `[from, to)`, cut at the deepest shared ancestor. Both
/// boundaries must sit directly in that ancestor's content.
pub fn slice_between(doc: &Node, from: usize, to: usize) -> Result<Fragment, StepError> {
    let rf = resolve(doc, from)?;
    let rt = resolve(doc, to)?;
    let d = rf.shared_depth(&rt);
    if rf.depth() != d || rt.depth() != d {
        return Err(StepError::CutsNode { from, to });
    }
    let ancestor = rf.node(d);
    let start = rf.start(d);
    ancestor
        .content
        .cut(from - start, to - start)
        .ok_or(StepError::CutsNode { from, to })
}

fn apply_replace(schema: &Schema, doc: &Node, step: &ReplaceStep) -> Result<Node, StepError> {
    if step.to < step.from {
        return Err(StepError::CutsNode {
            from: step.from,
            to: step.to,
        });
    }
    let rf = resolve(doc, step.from)?;
    let rt = resolve(doc, step.to)?;
    let d = rf.shared_depth(&rt);
    if rf.depth() != d || rt.depth() != d {
        return Err(StepError::CutsNode {
            from: step.from,
            to: step.to,
        });
    }
    let ancestor = rf.node(d);
    let start = rf.start(d);
    let size = ancestor.content.size();
    let (lf, lt) = (step.from - start, step.to - start);

    let left = ancestor.content.cut(0, lf).ok_or(StepError::CutsNode {
        from: step.from,
        to: step.to,
    })?;
    let right = ancestor.content.cut(lt, size).ok_or(StepError::CutsNode {
        from: step.from,
        to: step.to,
    })?;
    let content =
        Fragment::concat(vec![left, step.slice.clone(), right]).normalized();

    if !schema.valid_content(&ancestor.name, content.child_names()) {
        tracing::debug!(
            parent = %ancestor.name,
            from = step.from,
            to = step.to,
            "replace step rejected by content expression"
        );
        return Err(StepError::InvalidContent {
            parent: ancestor.name.clone(),
            expr: schema.content_expr_source(&ancestor.name),
        });
    }

    let mut rebuilt = Elem {
        content,
        ..ancestor.clone()
    };
    for depth in (0..d).rev() {
        rebuilt = replace_child(rf.node(depth), rf.index(depth), Node::Elem(rebuilt));
    }
    Ok(Node::Elem(rebuilt))
}

fn replace_child(parent: &Elem, index: usize, node: Node) -> Elem {
    let mut children = parent.content.children().to_vec();
    children[index] = node;
    Elem {
        content: Fragment::from(children),
        ..parent.clone()
    }
}

fn apply_mark(schema: &Schema, doc: &Node, step: &MarkStep, add: bool) -> Result<Node, StepError> {
    // Range check up front so a bad step fails instead of silently clamping.
    resolve(doc, step.from)?;
    resolve(doc, step.to)?;
    let Node::Elem(root) = doc else {
        return Err(PositionError::OutOfRange {
            pos: step.from,
            size: 0,
        }
        .into());
    };
    // A RemoveMark with default attrs strips any instance of the type;
    // non-default attrs remove only the exact mark.
    let exact = !add && step.mark.attrs != schema.default_mark_attrs(&step.mark.name);
    let content = map_text_marks(&root.content, 0, step.from, step.to, &|marks: &[Mark]| {
        if add {
            add_mark_to_set(marks, step.mark.clone(), schema)
        } else {
            remove_mark_from_set(
                marks,
                &step.mark.name,
                exact.then_some(&step.mark.attrs),
            )
        }
    });
    Ok(Node::Elem(Elem {
        content,
        ..root.clone()
    }))
}

/// Rebuild a fragment with `f` applied to the mark sets of text runs inside
/// `[from, to)`, splitting runs at the boundaries. Sizes are unchanged.
fn map_text_marks(
    frag: &Fragment,
    base: usize,
    from: usize,
    to: usize,
    f: &impl Fn(&[Mark]) -> Vec<Mark>,
) -> Fragment {
    let mut out: Vec<Node> = Vec::with_capacity(frag.len());
    let mut offset = base;
    for child in frag.children() {
        let end = offset + child.size();
        if end <= from || offset >= to {
            out.push(child.clone());
        } else {
            match child {
                Node::Text(t) => {
                    let len = t.len_chars();
                    let start_in = from.saturating_sub(offset);
                    let end_in = (to - offset).min(len);
                    if start_in > 0 {
                        out.push(Node::Text(t.slice(0, start_in)));
                    }
                    let mid = t.slice(start_in, end_in);
                    out.push(Node::Text(Text {
                        marks: f(&mid.marks),
                        ..mid
                    }));
                    if end_in < len {
                        out.push(Node::Text(t.slice(end_in, len)));
                    }
                }
                Node::Elem(e) if e.leaf => out.push(child.clone()),
                Node::Elem(e) => {
                    let content = map_text_marks(&e.content, offset + 1, from, to, f);
                    out.push(Node::Elem(Elem {
                        content,
                        ..e.clone()
                    }));
                }
            }
        }
        offset = end;
    }
    Fragment::from(out).normalized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use iconflow_model::Attrs;

    fn schema() -> Schema {
        Schema::basic("heart").unwrap()
    }

    fn para(s: &Schema, children: Vec<Node>) -> Node {
        Node::elem(s, "paragraph", Attrs::new(), children)
    }

    fn doc(s: &Schema, children: Vec<Node>) -> Node {
        Node::elem(s, "doc", Attrs::new(), children)
    }

    #[test]
    fn test_inline_replace() {
        let s = schema();
        let d = doc(&s, vec![para(&s, vec![Node::text("hello")])]);
        // Replace "ell" with an icon.
        let icon = Node::elem(&s, "icon", Attrs::new(), vec![]);
        let step = Step::replace(2, 5, Fragment::from(vec![icon]));
        let d2 = step.apply(&s, &d).unwrap();
        assert_eq!(d2.content_size(), 5);
        assert_eq!(d2.text_between(0, 5), "ho");
        assert_eq!(d2.child(0).unwrap().child(1).unwrap().name(), "icon");
    }

    #[test]
    fn test_block_replace() {
        let s = schema();
        let d = doc(
            &s,
            vec![
                para(&s, vec![Node::text("one")]),
                para(&s, vec![Node::text("two")]),
            ],
        );
        // Replace the second paragraph with a heading.
        let heading = Node::elem(&s, "heading", Attrs::new(), vec![Node::text("two")]);
        let step = Step::replace(5, 10, Fragment::from(vec![heading]));
        let d2 = step.apply(&s, &d).unwrap();
        assert_eq!(d2.child(1).unwrap().name(), "heading");
        assert_eq!(d2.content_size(), 10);
    }

    #[test]
    fn test_replace_rejected_leaves_tree_unchanged() {
        let s = schema();
        let d = doc(&s, vec![para(&s, vec![Node::text("hi")])]);
        // A paragraph cannot go inside a paragraph.
        let inner = para(&s, vec![Node::text("x")]);
        let step = Step::replace(1, 1, Fragment::from(vec![inner]));
        let err = step.apply(&s, &d).unwrap_err();
        assert!(matches!(err, StepError::InvalidContent { parent, .. } if parent == "paragraph"));
    }

    #[test]
    fn test_replace_cutting_block_rejected() {
        let s = schema();
        let d = doc(
            &s,
            vec![
                para(&s, vec![Node::text("one")]),
                para(&s, vec![Node::text("two")]),
            ],
        );
        // From inside the first paragraph to inside the second.
        let step = Step::replace(2, 7, Fragment::empty());
        assert!(matches!(
            step.apply(&s, &d),
            Err(StepError::CutsNode { .. })
        ));
    }

    #[test]
    fn test_replace_invert_round_trip() {
        let s = schema();
        let d = doc(&s, vec![para(&s, vec![Node::text("hello world")])]);
        let step = Step::replace(1, 6, Fragment::from(vec![Node::text("bye")]));
        let inv = step.invert(&d).unwrap();
        let d2 = step.apply(&s, &d).unwrap();
        assert_eq!(d2.text_between(0, d2.content_size()), "bye world");
        let d3 = inv.apply(&s, &d2).unwrap();
        assert_eq!(d3, d);
    }

    #[test]
    fn test_add_mark_splits_runs() {
        let s = schema();
        let d = doc(&s, vec![para(&s, vec![Node::text("make it bold now")])]);
        let strong = Mark::new(&s, "strong");
        let step = Step::add_mark(9, 13, strong.clone());
        let d2 = step.apply(&s, &d).unwrap();
        assert!(d2.range_has_mark(9, 13, "strong"));
        assert!(!d2.range_has_mark(8, 13, "strong"));
        assert_eq!(d2.child(0).unwrap().child_count(), 3);

        // Removing merges the runs back together.
        let d3 = Step::remove_mark(9, 13, strong).apply(&s, &d2).unwrap();
        assert_eq!(d3, d);
    }

    #[test]
    fn test_mark_steps_preserve_positions() {
        let s = schema();
        let d = doc(
            &s,
            vec![
                para(&s, vec![Node::text("first")]),
                para(&s, vec![Node::text("second")]),
            ],
        );
        let size = d.content_size();
        let d2 = Step::add_mark(1, 6, Mark::new(&s, "em")).apply(&s, &d).unwrap();
        assert_eq!(d2.content_size(), size);
        // Content outside the range is untouched.
        assert_eq!(d2.child(1).unwrap(), d.child(1).unwrap());
    }

    #[test]
    fn test_add_mark_replaces_same_type() {
        let s = schema();
        let em = Mark::new(&s, "em");
        let d = doc(
            &s,
            vec![para(&s, vec![Node::text_marked("x", vec![em.clone()])])],
        );
        let d2 = Step::add_mark(1, 2, em).apply(&s, &d).unwrap();
        let marks = &d2.child(0).unwrap().child(0).unwrap().as_text().unwrap().marks;
        assert_eq!(marks.len(), 1);
    }

    #[test]
    fn test_mark_invert() {
        let s = schema();
        let d = doc(&s, vec![para(&s, vec![Node::text("hello")])]);
        let strong = Mark::new(&s, "strong");
        let step = Step::add_mark(1, 6, strong);
        let d2 = step.apply(&s, &d).unwrap();
        let inv = step.invert(&d).unwrap();
        assert_eq!(inv.apply(&s, &d2).unwrap(), d);
    }

    #[test]
    fn test_step_map() {
        let map = StepMap {
            start: 4,
            old_size: 3,
            new_size: 1,
        };
        assert_eq!(map.map_pos(2, Assoc::After), 2);
        assert_eq!(map.map_pos(10, Assoc::After), 8);
        assert_eq!(map.map_pos(5, Assoc::After), 5);
        assert_eq!(map.map_pos(5, Assoc::Before), 4);
        // Insertion point: cursor lands after inserted content.
        let ins = StepMap {
            start: 4,
            old_size: 0,
            new_size: 1,
        };
        assert_eq!(ins.map_pos(4, Assoc::After), 5);
        assert_eq!(ins.map_pos(4, Assoc::Before), 4);
    }

    #[test]
    fn test_out_of_range_step() {
        let s = schema();
        let d = doc(&s, vec![para(&s, vec![Node::text("hi")])]);
        let step = Step::add_mark(0, 99, Mark::new(&s, "strong"));
        assert!(matches!(step.apply(&s, &d), Err(StepError::Position(_))));
    }
}
