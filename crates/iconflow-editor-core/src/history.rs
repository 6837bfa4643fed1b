//! Undo history: groups of inverse steps with the selection to restore.
//!
//! Edits arriving within the merge window join the newest group, so a typing
//! burst undoes as one unit. A selection-only transaction closes the open
//! group; any recorded edit clears the redo stack.

use std::time::Duration;

use web_time::Instant;

use crate::selection::Selection;
use crate::step::Step;

pub const DEFAULT_MERGE_WINDOW: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// One undoable unit: inverse steps in ready-to-apply order plus the
/// selection from before the oldest merged edit.
#[derive(Debug, Clone)]
pub struct HistoryGroup {
    pub steps: Vec<Step>,
    pub selection: Selection,
}

#[derive(Debug, Clone)]
pub struct History {
    undo: Vec<HistoryGroup>,
    redo: Vec<HistoryGroup>,
    merge_window: Duration,
    max_depth: usize,
    last_recorded: Option<Instant>,
    closed: bool,
}

impl Default for History {
    fn default() -> Self {
        History::new(DEFAULT_MERGE_WINDOW, DEFAULT_MAX_DEPTH)
    }
}

impl History {
    pub fn new(merge_window: Duration, max_depth: usize) -> History {
        History {
            undo: Vec::new(),
            redo: Vec::new(),
            merge_window,
            max_depth,
            last_recorded: None,
            closed: true,
        }
    }

    /// Record an applied edit. `inverses` are the per-step inverse steps in
    /// the order the original steps were applied; they are stored reversed so
    /// a group can be replayed front to back.
    pub fn record(&mut self, mut inverses: Vec<Step>, selection_before: Selection, at: Instant) {
        if inverses.is_empty() {
            return;
        }
        self.redo.clear();
        inverses.reverse();

        let merge = !self.closed
            && self
                .last_recorded
                .is_some_and(|last| at.saturating_duration_since(last) < self.merge_window);
        match self.undo.last_mut() {
            Some(group) if merge => {
                // Newer inverses must run before the ones already recorded.
                inverses.extend(group.steps.drain(..));
                group.steps = inverses;
            }
            _ => {
                self.undo.push(HistoryGroup {
                    steps: inverses,
                    selection: selection_before,
                });
                if self.undo.len() > self.max_depth {
                    self.undo.remove(0);
                }
            }
        }
        self.last_recorded = Some(at);
        self.closed = false;
        tracing::trace!(depth = self.undo.len(), "history group recorded");
    }

    /// End the open group; the next edit starts a fresh one. Called when the
    /// selection moves without an edit.
    pub fn close_group(&mut self) {
        self.closed = true;
    }

    pub fn pop_undo(&mut self) -> Option<HistoryGroup> {
        self.closed = true;
        self.undo.pop()
    }

    pub fn pop_redo(&mut self) -> Option<HistoryGroup> {
        self.redo.pop()
    }

    /// Push the redo counterpart of an undone group.
    pub fn push_redo(&mut self, group: HistoryGroup) {
        self.redo.push(group);
    }

    /// Push a group back onto the undo stack without touching redo. Used
    /// when a redo is applied.
    pub fn push_undo(&mut self, group: HistoryGroup) {
        self.closed = true;
        self.undo.push(group);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}
