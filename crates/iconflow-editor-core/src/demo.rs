//! The starter document shown in a fresh editor session.

use iconflow_model::{Node, Schema, ValidationError, doc_from_interchange};

/// Interchange form of the starter document.
pub const STARTER_DOCUMENT: &str = include_str!("starter_document.json");

/// Parse the starter document against a schema.
pub fn starter_document(schema: &Schema) -> Result<Node, ValidationError> {
    let value = serde_json::from_str(STARTER_DOCUMENT)
        .map_err(|_| ValidationError::BadShape { path: "doc".into() })?;
    doc_from_interchange(schema, &value)
}
