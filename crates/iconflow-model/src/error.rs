//! Error types for schema definition, document loading, and position lookup.

use smol_str::SmolStr;
use thiserror::Error;

/// A schema definition is malformed. Fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("duplicate node type {0:?}")]
    DuplicateNode(SmolStr),

    #[error("duplicate mark type {0:?}")]
    DuplicateMark(SmolStr),

    #[error("content expression {expr:?} of node {node:?} references unknown type or group {name:?}")]
    UnknownContentRef {
        node: SmolStr,
        expr: SmolStr,
        name: SmolStr,
    },

    #[error("content expression {expr:?} of node {node:?} is malformed")]
    BadContentExpr { node: SmolStr, expr: SmolStr },

    #[error("schema has no {0:?} root type")]
    MissingRoot(SmolStr),
}

/// An interchange tree violates the schema. Load is aborted, no partial document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("node at {path} is not an object with a \"type\" field")]
    BadShape { path: String },

    #[error("text node at {path} has no text")]
    EmptyText { path: String },

    #[error("unknown mark type {mark:?} at {path}")]
    UnknownMark { path: String, mark: SmolStr },

    #[error("leaf node {node:?} at {path} must not have content")]
    LeafWithContent { path: String, node: SmolStr },

    #[error("content of {node:?} at {path} does not match {expr:?}")]
    InvalidContent {
        path: String,
        node: SmolStr,
        expr: SmolStr,
    },

    #[error("document root must be {expected:?}, got {got:?}")]
    BadRoot { expected: SmolStr, got: SmolStr },
}

/// A position fell outside the document or inside an indivisible node.
///
/// Selection resolution clamps before resolving, so these reaching the
/// command layer indicates a programming error rather than bad user input.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PositionError {
    #[error("position {pos} outside of document (size {size})")]
    OutOfRange { pos: usize, size: usize },
}
