//! Transactions: ordered step batches applied atomically.

use web_time::Instant;

use crate::selection::Selection;
use crate::step::{Assoc, Step, StepMap};
use iconflow_model::Mark;

/// A batch of steps plus selection and stored-mark updates, built against a
/// specific document version. Applying it to any other version fails.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub steps: Vec<Step>,
    /// Explicit selection after the steps; when absent the previous
    /// selection is mapped through the step maps.
    pub selection: Option<Selection>,
    /// Outer `Some` sets the stored-mark override; `Some(None)` clears it.
    pub stored_marks: Option<Option<Vec<Mark>>>,
    pub timestamp: Instant,
    pub base_version: u64,
    /// Set for transactions produced by undo/redo so they bypass history
    /// recording.
    pub history_op: bool,
}

impl Transaction {
    pub fn new(base_version: u64) -> Transaction {
        Transaction {
            steps: Vec::new(),
            selection: None,
            stored_marks: None,
            timestamp: Instant::now(),
            base_version,
            history_op: false,
        }
    }

    pub fn step(mut self, step: Step) -> Transaction {
        self.steps.push(step);
        self
    }

    pub fn set_selection(mut self, selection: Selection) -> Transaction {
        self.selection = Some(selection);
        self
    }

    pub fn set_stored_marks(mut self, marks: Option<Vec<Mark>>) -> Transaction {
        self.stored_marks = Some(marks);
        self
    }

    pub fn as_history_op(mut self) -> Transaction {
        self.history_op = true;
        self
    }

    pub fn maps(&self) -> Vec<StepMap> {
        self.steps.iter().map(Step::map).collect()
    }

    /// Map a pre-transaction position through every step.
    pub fn map_pos(&self, pos: usize, assoc: Assoc) -> usize {
        self.steps
            .iter()
            .fold(pos, |p, step| step.map().map_pos(p, assoc))
    }

    pub fn docs_changed(&self) -> bool {
        !self.steps.is_empty()
    }
}
