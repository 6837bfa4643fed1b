//! Editing commands: pure functions from a state to a transaction.
//!
//! A command returns `None` when it does not apply in the given state, so a
//! toolbar can probe availability without dispatching. Structural commands
//! (wrap, lift, list operations) materialize as a single replace step over
//! the smallest enclosing ancestor whose rebuilt content revalidates.

use iconflow_model::{
    Attrs, Elem, Fragment, Mark, Node, ResolvedPos, SmolStr, add_mark_to_set, mark_in_set,
    remove_mark_from_set, resolve,
};
use serde_json::Value;

use crate::selection::{Selection, marks_at};
use crate::state::EditorState;
use crate::step::Step;
use crate::transaction::Transaction;

/// The run of sibling blocks covered by the selection: children
/// `[start_index, end_index)` of the ancestor at `depth`.
struct BlockRange<'a> {
    rf: ResolvedPos<'a>,
    depth: usize,
    start_index: usize,
    end_index: usize,
}

fn block_range(state: &EditorState) -> Option<BlockRange<'_>> {
    let (from, to) = state.selection.range(&state.doc);
    let rf = resolve(&state.doc, from).ok()?;
    let rt = resolve(&state.doc, to).ok()?;
    let mut depth = rf.shared_depth(&rt);
    if state.schema.is_textblock(&rf.node(depth).name) {
        depth = depth.checked_sub(1)?;
    }
    let start_index = rf.index(depth);
    // A caret at the very end of the ancestor's content has no block after it.
    if start_index >= rf.node(depth).content.len() {
        return None;
    }
    let end_index = rt.index_after(depth).max(start_index + 1);
    Some(BlockRange {
        rf,
        depth,
        start_index,
        end_index,
    })
}

impl<'a> BlockRange<'a> {
    fn parent(&self) -> &'a Elem {
        self.rf.node(self.depth)
    }

    fn content_start(&self) -> usize {
        self.rf.start(self.depth)
    }

    fn start_pos(&self) -> usize {
        self.content_start() + self.parent().content.child_offset(self.start_index)
    }

    fn end_pos(&self) -> usize {
        self.content_start() + self.parent().content.child_offset(self.end_index)
    }

    fn covered(&self) -> &'a [Node] {
        &self.parent().content.children()[self.start_index..self.end_index]
    }
}

/// Whether `parent`'s content stays valid when children `[start, end)` are
/// replaced by nodes of the given type names.
fn parent_accepts(
    state: &EditorState,
    parent: &Elem,
    start: usize,
    end: usize,
    replacement: &[SmolStr],
) -> bool {
    let children = parent.content.children();
    let names: Vec<SmolStr> = children[..start]
        .iter()
        .map(|n| SmolStr::new(n.name()))
        .chain(replacement.iter().cloned())
        .chain(children[end..].iter().map(|n| SmolStr::new(n.name())))
        .collect();
    state
        .schema
        .valid_content(&parent.name, names.iter().map(SmolStr::as_str))
}

/// The minimal document: a single empty paragraph.
fn is_empty_document(doc: &Node) -> bool {
    doc.child_count() == 1
        && doc
            .child(0)
            .is_some_and(|c| c.name() == "paragraph" && c.content_size() == 0)
}

fn shift_selection(sel: &Selection, f: impl Fn(usize) -> usize) -> Selection {
    match sel {
        Selection::Range { anchor, head } => Selection::Range {
            anchor: f(*anchor),
            head: f(*head),
        },
        Selection::NodeAt { pos } => Selection::NodeAt { pos: f(*pos) },
    }
}

/// Toggle a mark: over a range, add it unless every character already
/// carries it; at a caret, flip it in the stored marks for the next input.
pub fn toggle_mark(state: &EditorState, mark: Mark) -> Option<Transaction> {
    let (from, to) = state.selection.range(&state.doc);
    if is_empty_document(&state.doc) {
        return None;
    }
    if from == to {
        let current = state
            .stored_marks
            .clone()
            .unwrap_or_else(|| marks_at(&state.doc, from));
        let next = if mark_in_set(&current, &mark.name) {
            remove_mark_from_set(&current, &mark.name, None)
        } else {
            add_mark_to_set(&current, mark, &state.schema)
        };
        return Some(Transaction::new(state.version).set_stored_marks(Some(next)));
    }
    if state.doc.text_between(from, to).is_empty() {
        return None;
    }
    let step = if state.doc.range_has_mark(from, to, &mark.name) {
        Step::remove_mark(from, to, mark)
    } else {
        Step::add_mark(from, to, mark)
    };
    Some(Transaction::new(state.version).step(step))
}

/// Convert the textblocks covered by the selection to the given type.
/// Positions are unaffected since only the node wrappers change.
pub fn set_block_type(state: &EditorState, name: &str, attrs: Attrs) -> Option<Transaction> {
    let range = block_range(state)?;
    let schema = &state.schema;
    let mut changed = false;
    let mut new_children = Vec::with_capacity(range.end_index - range.start_index);
    for child in range.covered() {
        match child.as_elem() {
            Some(e) if schema.is_textblock(&e.name) => {
                if !schema.valid_content(name, e.content.child_names()) {
                    return None;
                }
                let node = Node::elem(schema, name, attrs.clone(), e.content.children().to_vec());
                if node != *child {
                    changed = true;
                }
                new_children.push(node);
            }
            _ => new_children.push(child.clone()),
        }
    }
    if !changed {
        return None;
    }
    let names: Vec<SmolStr> = new_children
        .iter()
        .map(|n| SmolStr::new(n.name()))
        .collect();
    if !parent_accepts(state, range.parent(), range.start_index, range.end_index, &names) {
        return None;
    }
    Some(
        Transaction::new(state.version)
            .step(Step::replace(
                range.start_pos(),
                range.end_pos(),
                Fragment::from(new_children),
            ))
            .set_selection(state.selection.clone()),
    )
}

/// Switch the selected textblocks to a heading of the given level, or back
/// to paragraphs when they already are that heading.
pub fn toggle_heading(state: &EditorState, level: u8) -> Option<Transaction> {
    let mut attrs = Attrs::new();
    attrs.insert("level".into(), Value::from(level));
    if state.is_block_active("heading", &attrs) {
        set_block_type(state, "paragraph", Attrs::new())
    } else {
        set_block_type(state, "heading", attrs)
    }
}

/// Wrap the covered blocks in a node of the given type.
pub fn wrap_in(state: &EditorState, name: &str) -> Option<Transaction> {
    let range = block_range(state)?;
    let covered = range.covered();
    if !state
        .schema
        .valid_content(name, covered.iter().map(Node::name))
    {
        return None;
    }
    if !parent_accepts(
        state,
        range.parent(),
        range.start_index,
        range.end_index,
        &[SmolStr::new(name)],
    ) {
        return None;
    }
    let wrapper = Node::elem(&state.schema, name, Attrs::new(), covered.to_vec());
    let (start, end) = (range.start_pos(), range.end_pos());
    // Covered positions move one slot right, past the wrapper's opening.
    let shift = |p: usize| if p >= start && p <= end { p + 1 } else { p };
    let selection = shift_selection(&state.selection, shift);
    Some(
        Transaction::new(state.version)
            .step(Step::replace(start, end, Fragment::from(vec![wrapper])))
            .set_selection(selection),
    )
}

/// Move the covered blocks out of their parent, splitting it when siblings
/// remain on either side.
pub fn lift(state: &EditorState) -> Option<Transaction> {
    let range = block_range(state)?;
    if range.depth == 0 {
        return None;
    }
    let parent = range.parent();
    let children = parent.content.children();
    let before = &children[..range.start_index];
    let mid = &children[range.start_index..range.end_index];
    let after = &children[range.end_index..];

    let mut pieces: Vec<Node> = Vec::new();
    if !before.is_empty() {
        pieces.push(Node::Elem(Elem {
            content: Fragment::from(before.to_vec()),
            ..parent.clone()
        }));
    }
    pieces.extend(mid.iter().cloned());
    if !after.is_empty() {
        pieces.push(Node::Elem(Elem {
            content: Fragment::from(after.to_vec()),
            ..parent.clone()
        }));
    }

    let gp_depth = range.depth - 1;
    let gp_index = range.rf.index(gp_depth);
    let piece_names: Vec<SmolStr> = pieces.iter().map(|n| SmolStr::new(n.name())).collect();
    if !parent_accepts(state, range.rf.node(gp_depth), gp_index, gp_index + 1, &piece_names) {
        return None;
    }

    let from = range.rf.before(range.depth);
    let to = range.rf.after(range.depth);
    let before_size = parent.content.child_offset(range.start_index);
    let mid_size: usize = mid.iter().map(Node::size).sum();
    let old_mid_start = from + 1 + before_size;
    // Lifted positions lose the parent's opening when nothing precedes them,
    // or gain the split-off left part's closing when something does.
    let lose_open = before.is_empty();
    let shift = |p: usize| {
        if p < old_mid_start || p > old_mid_start + mid_size {
            p
        } else if lose_open {
            p - 1
        } else {
            p + 1
        }
    };
    let selection = shift_selection(&state.selection, shift);
    Some(
        Transaction::new(state.version)
            .step(Step::replace(from, to, Fragment::from(pieces)))
            .set_selection(selection),
    )
}

/// Wrap in a blockquote, or lift back out when already quoted.
pub fn toggle_blockquote(state: &EditorState) -> Option<Transaction> {
    let quoted = block_range(state)?.parent().name == "blockquote";
    if quoted { lift(state) } else { wrap_in(state, "blockquote") }
}

/// Wrap each covered block in a list item and the items in a list.
pub fn wrap_in_list(state: &EditorState, list_name: &str) -> Option<Transaction> {
    let range = block_range(state)?;
    let schema = &state.schema;
    if (0..=range.depth).any(|d| range.rf.node(d).name == list_name) {
        return None;
    }
    let covered = range.covered();
    let mut items = Vec::with_capacity(covered.len());
    for child in covered {
        if !schema.valid_content("list_item", [child.name()]) {
            return None;
        }
        items.push(Node::elem(schema, "list_item", Attrs::new(), vec![child.clone()]));
    }
    if !parent_accepts(
        state,
        range.parent(),
        range.start_index,
        range.end_index,
        &[SmolStr::new(list_name)],
    ) {
        return None;
    }
    let list = Node::elem(schema, list_name, Attrs::new(), items);
    let (start, end) = (range.start_pos(), range.end_pos());
    let sizes: Vec<usize> = covered.iter().map(Node::size).collect();
    // A position in the j-th covered block moves past the list opening plus
    // one item opening and closing per preceding block, plus its own item's
    // opening.
    let shift = |p: usize| {
        if p < start || p > end {
            return p;
        }
        let rel = p - start;
        let mut acc = 0;
        for (j, size) in sizes.iter().enumerate() {
            if rel <= acc + size {
                return p + 2 + 2 * j;
            }
            acc += size;
        }
        p + 2 * sizes.len()
    };
    let selection = shift_selection(&state.selection, shift);
    Some(
        Transaction::new(state.version)
            .step(Step::replace(start, end, Fragment::from(vec![list])))
            .set_selection(selection),
    )
}

fn is_list(name: &str) -> bool {
    matches!(name, "bullet_list" | "ordered_list")
}

/// Find the deepest list item above the caret; returns its depth.
fn item_depth_at(rf: &ResolvedPos<'_>) -> Option<usize> {
    (1..=rf.depth()).rev().find(|&d| rf.node(d).name == "list_item")
}

/// Split the list item at the caret in two, with the caret at the start of
/// the second item. An item holding only an empty paragraph is lifted out of
/// the list instead, so Enter on an empty item leaves the list.
pub fn split_list_item(state: &EditorState) -> Option<Transaction> {
    if !state.selection.is_caret() {
        return None;
    }
    let pos = state.selection.head();
    let rf = resolve(&state.doc, pos).ok()?;
    let schema = &state.schema;
    let item_depth = item_depth_at(&rf)?;
    if rf.depth() != item_depth + 1 || !schema.is_textblock(&rf.parent().name) {
        return None;
    }
    let item = rf.node(item_depth);
    let textblock = rf.parent();
    if textblock.content.size() == 0 && item.content.len() == 1 {
        return lift_list_item(state);
    }
    let list_depth = item_depth - 1;
    if list_depth == 0 || !is_list(&rf.node(list_depth).name) {
        return None;
    }
    let list = rf.node(list_depth);
    let item_index = rf.index(list_depth);
    let tb_index = rf.index(item_depth);
    let po = rf.parent_offset;

    let left_tb = Node::Elem(Elem {
        content: textblock.content.cut(0, po)?,
        ..textblock.clone()
    });
    let right_tb = Node::Elem(Elem {
        content: textblock.content.cut(po, textblock.content.size())?,
        ..textblock.clone()
    });

    let kids = item.content.children();
    let mut first: Vec<Node> = kids[..tb_index].to_vec();
    first.push(left_tb);
    let mut second: Vec<Node> = vec![right_tb];
    second.extend(kids[tb_index + 1..].iter().cloned());
    if !schema.valid_content("list_item", first.iter().map(Node::name))
        || !schema.valid_content("list_item", second.iter().map(Node::name))
    {
        return None;
    }
    let item1 = Node::Elem(Elem {
        content: Fragment::from(first),
        ..item.clone()
    });
    let item1_size = item1.size();
    let item2 = Node::Elem(Elem {
        content: Fragment::from(second),
        ..item.clone()
    });

    let mut items: Vec<Node> = list.content.children()[..item_index].to_vec();
    items.push(item1);
    items.push(item2);
    items.extend(list.content.children()[item_index + 1..].iter().cloned());
    let new_list = Node::Elem(Elem {
        content: Fragment::from(items),
        ..list.clone()
    });

    // Start of the second item's first textblock.
    let caret =
        rf.start(list_depth) + list.content.child_offset(item_index) + item1_size + 2;
    Some(
        Transaction::new(state.version)
            .step(Step::replace(
                rf.before(list_depth),
                rf.after(list_depth),
                Fragment::from(vec![new_list]),
            ))
            .set_selection(Selection::caret(caret)),
    )
}

/// Move the item at the caret out of its list, splitting the list around it.
pub fn lift_list_item(state: &EditorState) -> Option<Transaction> {
    let pos = state.selection.head();
    let rf = resolve(&state.doc, pos).ok()?;
    let item_depth = item_depth_at(&rf)?;
    let list_depth = item_depth - 1;
    if list_depth == 0 || !is_list(&rf.node(list_depth).name) {
        return None;
    }
    let list = rf.node(list_depth);
    let item = rf.node(item_depth);
    let item_index = rf.index(list_depth);
    let items = list.content.children();
    let before = &items[..item_index];
    let after = &items[item_index + 1..];

    let mut pieces: Vec<Node> = Vec::new();
    if !before.is_empty() {
        pieces.push(Node::Elem(Elem {
            content: Fragment::from(before.to_vec()),
            ..list.clone()
        }));
    }
    pieces.extend(item.content.children().iter().cloned());
    if !after.is_empty() {
        pieces.push(Node::Elem(Elem {
            content: Fragment::from(after.to_vec()),
            ..list.clone()
        }));
    }

    let gp_index = rf.index(list_depth - 1);
    let piece_names: Vec<SmolStr> = pieces.iter().map(|n| SmolStr::new(n.name())).collect();
    if !parent_accepts(
        state,
        rf.node(list_depth - 1),
        gp_index,
        gp_index + 1,
        &piece_names,
    ) {
        return None;
    }

    let from = rf.before(list_depth);
    let before_piece = if before.is_empty() {
        0
    } else {
        before.iter().map(Node::size).sum::<usize>() + 2
    };
    // The caret keeps its offset within the lifted item content.
    let within = pos.saturating_sub(rf.start(item_depth));
    let caret = from + before_piece + within;
    Some(
        Transaction::new(state.version)
            .step(Step::replace(
                from,
                rf.after(list_depth),
                Fragment::from(pieces),
            ))
            .set_selection(Selection::caret(caret)),
    )
}

/// Nest the item at the caret into a sublist of its preceding sibling.
pub fn sink_list_item(state: &EditorState) -> Option<Transaction> {
    let pos = state.selection.head();
    let rf = resolve(&state.doc, pos).ok()?;
    let item_depth = item_depth_at(&rf)?;
    let list_depth = item_depth - 1;
    if list_depth == 0 || !is_list(&rf.node(list_depth).name) {
        return None;
    }
    let list = rf.node(list_depth);
    let item_index = rf.index(list_depth);
    if item_index == 0 {
        return None;
    }
    let items = list.content.children();
    let prev = items[item_index - 1].as_elem()?;
    let item = items[item_index].clone();

    let nested = Node::elem(
        &state.schema,
        list.name.clone(),
        list.attrs.clone(),
        vec![item],
    );
    let mut prev_kids = prev.content.children().to_vec();
    prev_kids.push(nested);
    if !state
        .schema
        .valid_content("list_item", prev_kids.iter().map(Node::name))
    {
        return None;
    }
    let new_prev = Node::Elem(Elem {
        content: Fragment::from(prev_kids),
        ..prev.clone()
    });

    let mut new_items: Vec<Node> = items[..item_index - 1].to_vec();
    new_items.push(new_prev);
    new_items.extend(items[item_index + 1..].iter().cloned());
    let new_list = Node::Elem(Elem {
        content: Fragment::from(new_items),
        ..list.clone()
    });

    // The item's opening moves behind the previous item's content and the
    // nested list's opening; the caret keeps its offset from it.
    let list_start = rf.start(list_depth);
    let within = pos - (list_start + list.content.child_offset(item_index));
    let caret = list_start
        + list.content.child_offset(item_index - 1)
        + 1
        + prev.content.size()
        + 1
        + within;
    Some(
        Transaction::new(state.version)
            .step(Step::replace(
                rf.before(list_depth),
                rf.after(list_depth),
                Fragment::from(vec![new_list]),
            ))
            .set_selection(Selection::caret(caret)),
    )
}

/// Both selection endpoints sit in the same textblock.
fn same_textblock(state: &EditorState, from: usize, to: usize) -> bool {
    let (Ok(rf), Ok(rt)) = (resolve(&state.doc, from), resolve(&state.doc, to)) else {
        return false;
    };
    rf.depth() == rt.depth()
        && rf.start(rf.depth()) == rt.start(rt.depth())
        && state.schema.is_textblock(&rf.parent().name)
}

/// Replace the selection with text, marked with the stored marks or the
/// marks at the caret.
pub fn insert_text(state: &EditorState, text: &str) -> Option<Transaction> {
    if text.is_empty() {
        return None;
    }
    let (from, to) = state.selection.range(&state.doc);
    if !same_textblock(state, from, to) {
        return None;
    }
    let marks = state
        .stored_marks
        .clone()
        .unwrap_or_else(|| marks_at(&state.doc, from));
    let run = Node::text_marked(text, marks);
    let caret = from + run.size();
    Some(
        Transaction::new(state.version)
            .step(Step::replace(from, to, Fragment::from(vec![run])))
            .set_selection(Selection::caret(caret)),
    )
}

fn insert_inline_leaf(state: &EditorState, name: &str, attrs: Attrs) -> Option<Transaction> {
    let (from, to) = state.selection.range(&state.doc);
    if !same_textblock(state, from, to) {
        return None;
    }
    let leaf = Node::elem(&state.schema, name, attrs, vec![]);
    Some(
        Transaction::new(state.version)
            .step(Step::replace(from, to, Fragment::from(vec![leaf])))
            .set_selection(Selection::caret(from + 1)),
    )
}

/// Insert an icon leaf at the selection, caret landing after it.
pub fn insert_icon(state: &EditorState, icon_name: &str) -> Option<Transaction> {
    let mut attrs = Attrs::new();
    attrs.insert("iconName".into(), Value::from(icon_name));
    insert_inline_leaf(state, "icon", attrs)
}

pub fn insert_hard_break(state: &EditorState) -> Option<Transaction> {
    insert_inline_leaf(state, "hard_break", Attrs::new())
}

/// Delete the selected range.
pub fn delete_selection(state: &EditorState) -> Option<Transaction> {
    let (from, to) = state.selection.range(&state.doc);
    if from == to {
        return None;
    }
    crate::step::slice_between(&state.doc, from, to).ok()?;
    Some(
        Transaction::new(state.version)
            .step(Step::replace(from, to, Fragment::empty()))
            .set_selection(Selection::caret(from)),
    )
}

/// Reset to the minimal document: one empty paragraph.
pub fn clear_document(state: &EditorState) -> Option<Transaction> {
    let doc = &state.doc;
    if is_empty_document(doc) {
        return None;
    }
    let para = Node::elem(&state.schema, "paragraph", Attrs::new(), vec![]);
    Some(
        Transaction::new(state.version)
            .step(Step::replace(0, doc.content_size(), Fragment::from(vec![para])))
            .set_selection(Selection::caret(1)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use iconflow_model::Schema;
    use serde_json::json;

    use crate::state::CommandId;

    fn from_json(value: serde_json::Value) -> EditorState {
        let schema = Arc::new(Schema::basic("heart").unwrap());
        EditorState::from_interchange(schema, &value).unwrap()
    }

    fn with_selection(state: EditorState, anchor: usize, head: usize) -> EditorState {
        let tr = Transaction::new(state.version)
            .set_selection(Selection::Range { anchor, head });
        state.apply(tr).unwrap()
    }

    fn text_doc(text: &str) -> EditorState {
        from_json(json!({
            "type": "doc",
            "content": [
                { "type": "paragraph", "content": [{ "type": "text", "text": text }] },
            ],
        }))
    }

    #[test]
    fn test_toggle_mark_range_and_back() {
        let st = with_selection(text_doc("make it bold now"), 9, 13);
        let bold = st.execute(&CommandId::ToggleBold).unwrap();
        assert!(bold.doc.range_has_mark(9, 13, "strong"));
        assert!(bold.is_active(&CommandId::ToggleBold));
        assert_eq!(bold.selection, Selection::Range { anchor: 9, head: 13 });

        let back = bold.execute(&CommandId::ToggleBold).unwrap();
        assert_eq!(back.doc, st.doc);
    }

    #[test]
    fn test_caret_toggle_stores_marks_for_typing() {
        let st = text_doc("ab");
        let st = with_selection(st, 2, 2);
        let st = st.execute(&CommandId::ToggleBold).unwrap();
        assert!(st.is_active(&CommandId::ToggleBold));
        assert!(st.doc.text_between(1, 3).eq("ab"));

        let st = st.apply(insert_text(&st, "X").unwrap()).unwrap();
        assert_eq!(st.doc.text_between(1, 4), "aXb");
        assert!(st.doc.range_has_mark(2, 3, "strong"));
        assert!(!st.doc.range_has_mark(1, 2, "strong"));
        // Typing consumed the stored marks.
        assert!(st.stored_marks.is_none());
    }

    #[test]
    fn test_toggle_mark_noop_on_empty_document() {
        let schema = Arc::new(Schema::basic("heart").unwrap());
        let st = EditorState::new(schema);
        assert!(toggle_mark(&st, Mark::new(&st.schema, "strong")).is_none());
    }

    #[test]
    fn test_caret_toggle_works_in_icon_only_paragraph() {
        let st = from_json(json!({
            "type": "doc",
            "content": [
                { "type": "paragraph", "content": [{ "type": "icon" }] },
            ],
        }));
        // Caret after the icon: no text anywhere, but the document is not empty.
        let st = with_selection(st, 2, 2);
        let st = st.execute(&CommandId::ToggleBold).unwrap();
        assert!(st.is_active(&CommandId::ToggleBold));
    }

    #[test]
    fn test_structural_command_after_trailing_unknown_leaf() {
        // A loaded document whose only child is an unrecognized leaf type.
        let st = from_json(json!({
            "type": "doc",
            "content": [{ "type": "foo" }],
        }));
        // Caret at the end of the document, past the last child.
        let st = with_selection(st, 1, 1);
        assert!(st.execute(&CommandId::Blockquote).is_none());
        assert!(st.execute(&CommandId::BulletList).is_none());
    }

    #[test]
    fn test_toggle_blockquote_wraps_and_lifts() {
        let st = with_selection(text_doc("hello"), 2, 2);
        let quoted = st.execute(&CommandId::Blockquote).unwrap();
        assert_eq!(quoted.doc.child(0).unwrap().name(), "blockquote");
        assert!(quoted.is_active(&CommandId::Blockquote));
        assert_eq!(quoted.selection, Selection::caret(3));

        let back = quoted.execute(&CommandId::Blockquote).unwrap();
        assert_eq!(back.doc, st.doc);
        assert_eq!(back.selection, Selection::caret(2));
    }

    #[test]
    fn test_toggle_heading_and_back() {
        let st = with_selection(text_doc("Title"), 2, 2);
        let heading = st.execute(&CommandId::Heading(2)).unwrap();
        assert_eq!(heading.doc.child(0).unwrap().name(), "heading");
        assert!(heading.is_active(&CommandId::Heading(2)));
        assert!(!heading.is_active(&CommandId::Heading(1)));
        assert_eq!(heading.selection, Selection::caret(2));

        let back = heading.execute(&CommandId::Heading(2)).unwrap();
        assert_eq!(back.doc, st.doc);
    }

    #[test]
    fn test_wrap_in_list_and_split() {
        let st = with_selection(text_doc("ab"), 2, 2);
        let listed = st.execute(&CommandId::BulletList).unwrap();
        let list = listed.doc.child(0).unwrap();
        assert_eq!(list.name(), "bullet_list");
        assert_eq!(list.child(0).unwrap().name(), "list_item");
        assert_eq!(listed.selection, Selection::caret(4));
        // Already in a bullet list: not applicable again.
        assert!(listed.execute(&CommandId::BulletList).is_none());

        let split = listed.apply(split_list_item(&listed).unwrap()).unwrap();
        let list = split.doc.child(0).unwrap();
        assert_eq!(list.child_count(), 2);
        assert_eq!(split.doc.text_between(3, 4), "a");
        assert_eq!(split.doc.text_between(8, 9), "b");
        assert_eq!(split.selection, Selection::caret(8));
    }

    #[test]
    fn test_split_on_empty_item_leaves_list() {
        let st = from_json(json!({
            "type": "doc",
            "content": [
                { "type": "bullet_list", "content": [
                    { "type": "list_item", "content": [
                        { "type": "paragraph", "content": [{ "type": "text", "text": "a" }] },
                    ]},
                    { "type": "list_item", "content": [{ "type": "paragraph" }] },
                ]},
            ],
        }));
        // Caret inside the empty trailing item.
        let st = with_selection(st, 8, 8);
        let tr = split_list_item(&st).unwrap();
        let out = st.apply(tr).unwrap();
        assert_eq!(out.doc.child(0).unwrap().name(), "bullet_list");
        assert_eq!(out.doc.child(0).unwrap().child_count(), 1);
        assert_eq!(out.doc.child(1).unwrap().name(), "paragraph");
        assert_eq!(out.selection, Selection::caret(8));
    }

    #[test]
    fn test_sink_list_item() {
        let st = from_json(json!({
            "type": "doc",
            "content": [
                { "type": "bullet_list", "content": [
                    { "type": "list_item", "content": [
                        { "type": "paragraph", "content": [{ "type": "text", "text": "a" }] },
                    ]},
                    { "type": "list_item", "content": [
                        { "type": "paragraph", "content": [{ "type": "text", "text": "b" }] },
                    ]},
                ]},
            ],
        }));
        let st = with_selection(st, 8, 8);
        let sunk = st.apply(sink_list_item(&st).unwrap()).unwrap();
        let first_item = sunk.doc.child(0).unwrap().child(0).unwrap();
        assert_eq!(first_item.child_count(), 2);
        assert_eq!(first_item.child(1).unwrap().name(), "bullet_list");
        assert_eq!(sunk.selection, Selection::caret(8));
        assert_eq!(sunk.doc.text_between(8, 9), "b");
        // First item cannot sink.
        let st2 = with_selection(st.clone(), 3, 3);
        assert!(sink_list_item(&st2).is_none());
    }

    #[test]
    fn test_insert_icon_in_empty_doc() {
        let schema = Arc::new(Schema::basic("heart").unwrap());
        let st = EditorState::new(schema);
        let st = st.execute(&CommandId::InsertIcon("star".into())).unwrap();
        let icon = st.doc.child(0).unwrap().child(0).unwrap();
        assert_eq!(icon.name(), "icon");
        assert_eq!(
            icon.as_elem().unwrap().attrs.get("iconName"),
            Some(&json!("star"))
        );
        // Caret sits after the inserted leaf.
        assert_eq!(st.selection, Selection::caret(2));
    }

    #[test]
    fn test_insert_text_replaces_selection() {
        let st = with_selection(text_doc("hello"), 2, 5);
        let st = st.apply(insert_text(&st, "up").unwrap()).unwrap();
        assert_eq!(st.doc.text_between(1, st.doc_size() - 1), "hupo");
        assert_eq!(st.selection, Selection::caret(4));
    }

    #[test]
    fn test_delete_selection() {
        let st = with_selection(text_doc("hello"), 2, 4);
        let st = st.apply(delete_selection(&st).unwrap()).unwrap();
        assert_eq!(st.doc.text_between(1, 4), "hlo");
        assert_eq!(st.selection, Selection::caret(2));
    }

    #[test]
    fn test_clear_document() {
        let st = text_doc("hello");
        let st = st.execute(&CommandId::ClearDocument).unwrap();
        assert_eq!(st.doc_size(), 2);
        assert_eq!(st.selection, Selection::caret(1));
        // Idempotent: already empty.
        assert!(st.execute(&CommandId::ClearDocument).is_none());
    }

    #[test]
    fn test_wrap_in_list_spanning_blocks() {
        let st = from_json(json!({
            "type": "doc",
            "content": [
                { "type": "paragraph", "content": [{ "type": "text", "text": "one" }] },
                { "type": "paragraph", "content": [{ "type": "text", "text": "two" }] },
            ],
        }));
        let st = with_selection(st, 2, 7);
        let tr = wrap_in_list(&st, "ordered_list").unwrap();
        let out = st.apply(tr).unwrap();
        let list = out.doc.child(0).unwrap();
        assert_eq!(list.name(), "ordered_list");
        assert_eq!(list.child_count(), 2);
        assert_eq!(out.doc.text_between(0, out.doc_size()), "onetwo");
    }
}
