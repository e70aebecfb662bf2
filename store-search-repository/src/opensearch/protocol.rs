//! Request paths and bulk lines per engine protocol generation.

use serde_json::{json, Map, Value};

use store_search_shared::DocumentDeclaration;

use crate::config::EngineProtocol;
use crate::routing::IndexRoute;

impl EngineProtocol {
    pub fn search_path(&self, route: &IndexRoute) -> String {
        match self {
            EngineProtocol::Typed => format!("/{}/{}/_search", route.index, route.doc_type),
            EngineProtocol::Typeless => format!("/{}/_search", route.index),
        }
    }

    pub fn get_path(&self, route: &IndexRoute, id: &str) -> String {
        match self {
            EngineProtocol::Typed => format!("/{}/{}/{}", route.index, route.doc_type, id),
            EngineProtocol::Typeless => format!("/{}/_doc/{}", route.index, id),
        }
    }

    pub fn mget_path(&self, route: &IndexRoute) -> String {
        match self {
            EngineProtocol::Typed => format!("/{}/{}/_mget", route.index, route.doc_type),
            EngineProtocol::Typeless => format!("/{}/_mget", route.index),
        }
    }

    pub fn update_path(&self, index: &str, doc_type: &str, id: &str) -> String {
        match self {
            EngineProtocol::Typed => format!("/{}/{}/{}/_update", index, doc_type, id),
            EngineProtocol::Typeless => format!("/{}/_update/{}", index, id),
        }
    }

    pub fn delete_path(&self, index: &str, doc_type: &str, id: &str) -> String {
        match self {
            EngineProtocol::Typed => format!("/{}/{}/{}", index, doc_type, id),
            EngineProtocol::Typeless => format!("/{}/_doc/{}", index, id),
        }
    }

    /// Action and source lines for a bulk request, in declaration order.
    ///
    /// Upserts produce an `update` action followed by a `doc_as_upsert`
    /// body; deletes produce a single `delete` action. `_type` is only sent
    /// to typed engines.
    pub fn bulk_lines(&self, declarations: &[DocumentDeclaration]) -> Vec<Value> {
        let mut lines = Vec::with_capacity(declarations.len() * 2);
        for declaration in declarations {
            let mut meta = Map::new();
            meta.insert("_index".into(), json!(declaration.index));
            meta.insert("_id".into(), json!(declaration.id));
            if *self == EngineProtocol::Typed {
                meta.insert("_type".into(), json!(declaration.doc_type));
            }

            if declaration.is_delete {
                lines.push(json!({ "delete": meta }));
            } else {
                lines.push(json!({ "update": meta }));
                lines.push(upsert_body(declaration));
            }
        }
        lines
    }
}

/// Partial-update body that creates the document when it is missing.
pub fn upsert_body(declaration: &DocumentDeclaration) -> Value {
    json!({
        "doc": declaration.payload.clone().unwrap_or_default(),
        "doc_as_upsert": true
    })
}
