//! iconflow-model: schema-validated document trees for the iconflow editor.
//!
//! This crate provides:
//! - `Schema` - node/mark type registry with content expressions
//! - `Node` / `Fragment` / `Mark` - the immutable document tree
//! - `resolve` / `ResolvedPos` - flat positions into the tree
//! - interchange (de)serialization with validation

pub mod error;
pub mod interchange;
pub mod node;
pub mod position;
pub mod schema;

pub use error::{PositionError, SchemaError, ValidationError};
pub use interchange::{doc_from_interchange, from_interchange, to_interchange};
pub use node::{
    Elem, Fragment, Mark, Node, Text, add_mark_to_set, mark_in_set, remove_mark_from_set,
    walk_text,
};
pub use position::{ResolvedPos, resolve};
pub use schema::{Attrs, ContentExpr, MarkSpec, MarkType, NodeSpec, NodeType, Schema};
pub use smol_str::SmolStr;
