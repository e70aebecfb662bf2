//! In-memory engine for batcher tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use store_search_repository::{BulkSummary, IndexRoute, SearchEngineClient, SearchError};
use store_search_shared::DocumentDeclaration;
use tokio::sync::Mutex;

pub(crate) const TEST_INDEX: &str = "joox_tracks";

pub(crate) fn upsert(id: &str) -> DocumentDeclaration {
    let mut payload = Map::new();
    payload.insert("id".to_string(), json!(id));
    DocumentDeclaration::upsert(TEST_INDEX, "", id, payload)
}

pub(crate) fn delete(id: &str) -> DocumentDeclaration {
    DocumentDeclaration::delete(TEST_INDEX, "", id)
}

/// Engine that keeps documents in a map and records every write.
///
/// `fail_next(n)` makes the next `n` write calls fail with a connection
/// error before touching any document.
#[derive(Default)]
pub(crate) struct MemoryEngine {
    documents: Mutex<HashMap<(String, String), Map<String, Value>>>,
    bulk_calls: Mutex<Vec<usize>>,
    direct_calls: AtomicUsize,
    failures_left: AtomicUsize,
}

impl MemoryEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Size of every bulk request received, in order.
    pub(crate) async fn bulk_calls(&self) -> Vec<usize> {
        self.bulk_calls.lock().await.clone()
    }

    pub(crate) fn direct_calls(&self) -> usize {
        self.direct_calls.load(Ordering::SeqCst)
    }

    pub(crate) async fn document_count(&self) -> usize {
        self.documents.lock().await.len()
    }

    fn take_failure(&self) -> Result<(), SearchError> {
        let consumed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1));
        match consumed {
            Ok(_) => Err(SearchError::connection("connection refused")),
            Err(_) => Ok(()),
        }
    }

    async fn apply(&self, declaration: &DocumentDeclaration) {
        let key = (declaration.index.clone(), declaration.id.clone());
        let mut documents = self.documents.lock().await;
        if declaration.is_delete {
            documents.remove(&key);
        } else {
            let payload = declaration.payload.clone().unwrap_or_default();
            documents.entry(key).or_default().extend(payload);
        }
    }

    async fn lookup(&self, index: &str, id: &str) -> Value {
        let documents = self.documents.lock().await;
        match documents.get(&(index.to_string(), id.to_string())) {
            Some(source) => json!({ "_id": id, "found": true, "_source": source }),
            None => json!({ "_id": id, "found": false }),
        }
    }
}

#[async_trait]
impl SearchEngineClient for MemoryEngine {
    async fn search(&self, route: &IndexRoute, _body: &Value) -> Result<Value, SearchError> {
        let documents = self.documents.lock().await;
        let hits: Vec<Value> = documents
            .iter()
            .filter(|((index, _), _)| *index == route.index)
            .map(|((_, id), source)| json!({ "_id": id, "_source": source }))
            .collect();
        Ok(json!({ "hits": { "total": { "value": hits.len(), "relation": "eq" }, "hits": hits } }))
    }

    async fn get_document(&self, route: &IndexRoute, id: &str) -> Result<Value, SearchError> {
        Ok(self.lookup(&route.index, id).await)
    }

    async fn multi_get(&self, route: &IndexRoute, ids: &[String]) -> Result<Value, SearchError> {
        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
            docs.push(self.lookup(&route.index, id).await);
        }
        Ok(json!({ "docs": docs }))
    }

    async fn open_scroll(
        &self,
        _route: Option<&IndexRoute>,
        _body: &Value,
        _keep_alive: &str,
    ) -> Result<Value, SearchError> {
        Err(SearchError::query("scroll is not supported by the memory engine"))
    }

    async fn next_scroll(&self, _scroll_id: &str, _keep_alive: &str) -> Result<Value, SearchError> {
        Err(SearchError::query("scroll is not supported by the memory engine"))
    }

    async fn clear_scroll(&self, _scroll_ids: &[String]) -> Result<(), SearchError> {
        Ok(())
    }

    async fn bulk(
        &self,
        declarations: &[DocumentDeclaration],
        _timeout: Duration,
    ) -> Result<BulkSummary, SearchError> {
        self.bulk_calls.lock().await.push(declarations.len());
        self.take_failure()?;
        for declaration in declarations {
            self.apply(declaration).await;
        }
        Ok(BulkSummary::all_succeeded(declarations.len()))
    }

    async fn upsert_document(&self, declaration: &DocumentDeclaration) -> Result<(), SearchError> {
        self.direct_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        self.apply(declaration).await;
        Ok(())
    }

    async fn delete_document(&self, declaration: &DocumentDeclaration) -> Result<(), SearchError> {
        self.direct_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        self.apply(declaration).await;
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        Ok(true)
    }
}
