//! iconflow-editor-core: the editing engine on top of `iconflow-model`.
//!
//! - `Step` / `Transaction` - atomic, invertible document mutations
//! - `Selection` - caret, range and node selections over flat positions
//! - `commands` - toolbar-level editing commands as pure functions
//! - `History` - grouped undo/redo built from step inverses
//! - `EditorState` - the immutable state a host dispatches transactions at
//! - `IconSet` / `writer` - the icon catalog and HTML export
//!
//! The core is single-threaded and synchronous: a host serializes dispatch,
//! applies one transaction at a time, and renders from the resulting state.

pub mod commands;
pub mod demo;
pub mod history;
pub mod icons;
pub mod selection;
pub mod state;
pub mod step;
pub mod transaction;
pub mod writer;

pub use history::History;
pub use icons::{IconData, IconError, IconSet};
pub use selection::Selection;
pub use state::{CommandId, EditorState};
pub use step::{Assoc, Step, StepError, StepMap};
pub use transaction::Transaction;
pub use writer::to_html;
