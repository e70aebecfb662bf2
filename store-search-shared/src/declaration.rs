//! Document mutation declarations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Document type used when the caller leaves it empty. Typeless engines
/// accept this as the only type; typed engines treat it as a regular name.
pub const DEFAULT_DOC_TYPE: &str = "_doc";

/// A pending mutation (upsert or delete) targeting one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDeclaration {
    /// Index the document lives in.
    pub index: String,
    /// Per-document type. Never empty once constructed.
    pub doc_type: String,
    /// Engine document id, usually a composite id.
    pub id: String,
    /// Fields to merge into the document. Ignored for deletes.
    pub payload: Option<Map<String, Value>>,
    /// Whether this declaration removes the document.
    pub is_delete: bool,
}

impl DocumentDeclaration {
    /// Create a declaration, substituting the default type for an empty one.
    pub fn new(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        id: impl Into<String>,
        payload: Option<Map<String, Value>>,
        is_delete: bool,
    ) -> Self {
        Self {
            index: index.into(),
            doc_type: normalize_doc_type(doc_type.into()),
            id: id.into(),
            payload,
            is_delete,
        }
    }

    /// Declare an upsert: the payload is merged into the document, which is
    /// created if absent.
    pub fn upsert(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        id: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self::new(index, doc_type, id, Some(payload), false)
    }

    /// Declare a delete.
    pub fn delete(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self::new(index, doc_type, id, None, true)
    }

    /// Name of the first required field that is missing, if any.
    ///
    /// Upserts need a non-empty payload; every declaration needs an index
    /// and an id.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.index.is_empty() {
            return Some("index");
        }
        if self.id.is_empty() {
            return Some("id");
        }
        if !self.is_delete && self.payload.as_ref().map_or(true, Map::is_empty) {
            return Some("payload");
        }
        None
    }
}

/// Substitute [`DEFAULT_DOC_TYPE`] for an empty type.
pub fn normalize_doc_type(doc_type: String) -> String {
    if doc_type.is_empty() {
        DEFAULT_DOC_TYPE.to_string()
    } else {
        doc_type
    }
}
