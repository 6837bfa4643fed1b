//! The editor state: document, selection, stored marks, history.
//!
//! States are immutable; applying a transaction yields a new state with a
//! bumped version. A transaction built against a stale version is rejected,
//! so out-of-order dispatch cannot corrupt the tree.

use std::sync::Arc;

use serde_json::Value;

use iconflow_model::{
    Attrs, Mark, Node, Schema, ValidationError, doc_from_interchange, mark_in_set, to_interchange,
};

use crate::commands;
use crate::history::History;
use crate::selection::{Selection, marks_at};
use crate::step::StepError;
use crate::transaction::Transaction;

/// Named commands a host UI can dispatch and query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandId {
    Undo,
    Redo,
    ToggleBold,
    ToggleItalic,
    ToggleCode,
    Heading(u8),
    BulletList,
    OrderedList,
    Blockquote,
    InsertIcon(iconflow_model::SmolStr),
    InsertHardBreak,
    ClearDocument,
}

#[derive(Debug, Clone)]
pub struct EditorState {
    pub schema: Arc<Schema>,
    pub doc: Node,
    pub selection: Selection,
    /// Marks to apply to the next inserted text instead of the marks at the
    /// caret. Cleared by any document change.
    pub stored_marks: Option<Vec<Mark>>,
    pub history: History,
    pub version: u64,
}

impl EditorState {
    /// A state holding the minimal valid document: one empty paragraph, with
    /// the caret inside it.
    pub fn new(schema: Arc<Schema>) -> EditorState {
        let doc = Node::elem(
            &schema,
            "doc",
            Attrs::new(),
            vec![Node::elem(&schema, "paragraph", Attrs::new(), vec![])],
        );
        let selection = Selection::at(&schema, &doc, 0, 0);
        EditorState {
            schema,
            doc,
            selection,
            stored_marks: None,
            history: History::default(),
            version: 0,
        }
    }

    /// Load a state from an interchange document, with the caret at the
    /// first text position.
    pub fn from_interchange(schema: Arc<Schema>, value: &Value) -> Result<EditorState, ValidationError> {
        let doc = doc_from_interchange(&schema, value)?;
        let selection = Selection::at(&schema, &doc, 0, 0);
        Ok(EditorState {
            schema,
            doc,
            selection,
            stored_marks: None,
            history: History::default(),
            version: 0,
        })
    }

    /// Project the current document to the interchange tree.
    pub fn to_interchange(&self) -> Value {
        to_interchange(&self.schema, &self.doc)
    }

    pub fn doc_size(&self) -> usize {
        self.doc.content_size()
    }

    /// Apply a transaction, producing the next state. The input state is
    /// untouched on failure.
    pub fn apply(&self, tr: Transaction) -> Result<EditorState, StepError> {
        if tr.base_version != self.version {
            return Err(StepError::Stale {
                base: tr.base_version,
                current: self.version,
            });
        }

        let mut doc = self.doc.clone();
        let mut inverses = Vec::with_capacity(tr.steps.len());
        for step in &tr.steps {
            let inv = step.invert(&doc)?;
            doc = step.apply(&self.schema, &doc)?;
            inverses.push(inv);
        }

        let selection = match &tr.selection {
            Some(sel) => sel.normalize(&self.schema, &doc),
            None => self.selection.mapped(&self.schema, &doc, &tr.maps()),
        };

        let stored_marks = match &tr.stored_marks {
            Some(marks) => marks.clone(),
            None if tr.docs_changed() => None,
            None => self.stored_marks.clone(),
        };

        let mut history = self.history.clone();
        if tr.history_op {
            // Stacks were already adjusted by undo()/redo().
        } else if tr.docs_changed() {
            history.record(inverses, self.selection.clone(), tr.timestamp);
        } else if selection != self.selection {
            history.close_group();
        }

        tracing::debug!(
            steps = tr.steps.len(),
            version = self.version + 1,
            "transaction applied"
        );
        Ok(EditorState {
            schema: self.schema.clone(),
            doc,
            selection,
            stored_marks,
            history,
            version: self.version + 1,
        })
    }

    /// Revert the newest history group. `None` when the undo stack is empty
    /// or the group no longer applies.
    pub fn undo(&self) -> Option<EditorState> {
        let mut history = self.history.clone();
        let group = history.pop_undo()?;
        let (doc, redo) = self.replay(&group.steps)?;
        history.push_redo(crate::history::HistoryGroup {
            steps: redo,
            selection: self.selection.clone(),
        });
        Some(self.restored(doc, group.selection, history))
    }

    /// Re-apply the newest undone group.
    pub fn redo(&self) -> Option<EditorState> {
        let mut history = self.history.clone();
        let group = history.pop_redo()?;
        let (doc, undo) = self.replay(&group.steps)?;
        history.push_undo(crate::history::HistoryGroup {
            steps: undo,
            selection: self.selection.clone(),
        });
        Some(self.restored(doc, group.selection, history))
    }

    /// Apply a step sequence to the current document, collecting the reverse
    /// sequence in ready-to-apply order.
    fn replay(&self, steps: &[crate::step::Step]) -> Option<(Node, Vec<crate::step::Step>)> {
        let mut doc = self.doc.clone();
        let mut reverse = Vec::with_capacity(steps.len());
        for step in steps {
            let inv = step.invert(&doc).ok()?;
            match step.apply(&self.schema, &doc) {
                Ok(next) => doc = next,
                Err(err) => {
                    tracing::warn!(%err, "history group no longer applies");
                    return None;
                }
            }
            reverse.push(inv);
        }
        reverse.reverse();
        Some((doc, reverse))
    }

    fn restored(&self, doc: Node, selection: Selection, history: History) -> EditorState {
        let selection = selection.normalize(&self.schema, &doc);
        EditorState {
            schema: self.schema.clone(),
            doc,
            selection,
            stored_marks: None,
            history,
            version: self.version + 1,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Whether a mark type is active at the selection: every character of a
    /// range carries it, or (at a caret) it is among the marks typing would
    /// use.
    pub fn is_mark_active(&self, mark_name: &str) -> bool {
        let (from, to) = self.selection.range(&self.doc);
        if from == to {
            match &self.stored_marks {
                Some(marks) => mark_in_set(marks, mark_name),
                None => mark_in_set(&marks_at(&self.doc, from), mark_name),
            }
        } else {
            self.doc.range_has_mark(from, to, mark_name)
        }
    }

    /// Whether the selection sits entirely inside a block of the given type
    /// whose attributes match `attrs` overlaid on the type's defaults.
    pub fn is_block_active(&self, name: &str, attrs: &Attrs) -> bool {
        let mut expected = self.schema.default_attrs(name);
        expected.extend(attrs.clone());
        match &self.selection {
            Selection::NodeAt { pos } => iconflow_model::resolve(&self.doc, *pos)
                .ok()
                .and_then(|r| r.node_after().and_then(Node::as_elem).cloned())
                .is_some_and(|e| e.name == name && e.attrs == expected),
            Selection::Range { .. } => {
                let (from, to) = self.selection.range(&self.doc);
                let Ok(r) = iconflow_model::resolve(&self.doc, from) else {
                    return false;
                };
                to <= r.end(r.depth()) && r.parent().name == name && r.parent().attrs == expected
            }
        }
    }

    /// Dispatch a named command. `None` when it is not applicable in the
    /// current state.
    pub fn execute(&self, id: &CommandId) -> Option<EditorState> {
        let tr = match id {
            CommandId::Undo => return self.undo(),
            CommandId::Redo => return self.redo(),
            CommandId::ToggleBold => commands::toggle_mark(self, Mark::new(&self.schema, "strong")),
            CommandId::ToggleItalic => commands::toggle_mark(self, Mark::new(&self.schema, "em")),
            CommandId::ToggleCode => commands::toggle_mark(self, Mark::new(&self.schema, "code")),
            CommandId::Heading(level) => commands::toggle_heading(self, *level),
            CommandId::BulletList => commands::wrap_in_list(self, "bullet_list"),
            CommandId::OrderedList => commands::wrap_in_list(self, "ordered_list"),
            CommandId::Blockquote => commands::toggle_blockquote(self),
            CommandId::InsertIcon(name) => commands::insert_icon(self, name),
            CommandId::InsertHardBreak => commands::insert_hard_break(self),
            CommandId::ClearDocument => commands::clear_document(self),
        }?;
        match self.apply(tr) {
            Ok(next) => Some(next),
            Err(err) => {
                tracing::warn!(%err, command = ?id, "command produced an inapplicable transaction");
                None
            }
        }
    }

    /// Whether the UI should highlight a command as active.
    pub fn is_active(&self, id: &CommandId) -> bool {
        match id {
            CommandId::ToggleBold => self.is_mark_active("strong"),
            CommandId::ToggleItalic => self.is_mark_active("em"),
            CommandId::ToggleCode => self.is_mark_active("code"),
            CommandId::Heading(level) => {
                let mut attrs = Attrs::new();
                attrs.insert("level".into(), Value::from(*level));
                self.is_block_active("heading", &attrs)
            }
            CommandId::BulletList => self.in_ancestor("bullet_list"),
            CommandId::OrderedList => self.in_ancestor("ordered_list"),
            CommandId::Blockquote => self.in_ancestor("blockquote"),
            CommandId::Undo
            | CommandId::Redo
            | CommandId::InsertIcon(_)
            | CommandId::InsertHardBreak
            | CommandId::ClearDocument => false,
        }
    }

    /// Whether an ancestor of the selection head has the given type.
    fn in_ancestor(&self, name: &str) -> bool {
        let Ok(r) = iconflow_model::resolve(&self.doc, self.selection.head()) else {
            return false;
        };
        (0..=r.depth()).any(|d| r.node(d).name == name)
    }
}
