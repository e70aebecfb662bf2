//! Search executor.
//!
//! Runs composed searches, id lookups and scroll cursors against an engine
//! client and turns raw responses into documents.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use store_search_shared::{resolve_lookup, DocumentLookup, EntityKind};

use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;
use crate::query::QueryVariant;
use crate::routing::{IndexRoute, IndexRoutes};
use crate::source::SearchSource;

/// Keep-alive for scroll cursors.
pub const SCROLL_KEEP_ALIVE: &str = "5m";

/// Documents returned by a search or lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    /// Total number of matches reported by the engine. For id lookups this
    /// is the number of documents found.
    pub total: u64,
    /// Document sources, in engine order.
    pub documents: Vec<Value>,
}

impl SearchHits {
    /// Deserialize every document into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<Vec<T>, SearchError> {
        self.documents
            .iter()
            .map(|doc| serde_json::from_value(doc.clone()).map_err(SearchError::from))
            .collect()
    }
}

/// One page of a scroll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollPage {
    pub total: u64,
    pub documents: Vec<Value>,
    /// Cursor for the next page; `None` once the results are exhausted.
    pub scroll_id: Option<String>,
}

/// Executes searches and lookups through a [`SearchEngineClient`].
pub struct SearchExecutor {
    client: Arc<dyn SearchEngineClient>,
    routes: IndexRoutes,
    valid_regions: Vec<i32>,
}

impl SearchExecutor {
    /// Create a new executor.
    ///
    /// # Arguments
    ///
    /// * `client` - The engine client shared with the bulk batcher
    /// * `routes` - Index routing per entity kind
    /// * `valid_regions` - Regions a region-less lookup fans out over
    pub fn new(
        client: Arc<dyn SearchEngineClient>,
        routes: IndexRoutes,
        valid_regions: Vec<i32>,
    ) -> Self {
        Self {
            client,
            routes,
            valid_regions,
        }
    }

    pub fn routes(&self) -> &IndexRoutes {
        &self.routes
    }

    pub fn valid_regions(&self) -> &[i32] {
        &self.valid_regions
    }

    /// Run a composed search against an index.
    #[instrument(skip(self, source), fields(index = %route.index))]
    pub async fn search(
        &self,
        source: &SearchSource,
        route: &IndexRoute,
    ) -> Result<SearchHits, SearchError> {
        let response = self.client.search(route, &source.to_body()).await?;
        let (total, documents) = parse_hits(&response)?;
        debug!(total, returned = documents.len(), "Search completed");
        Ok(SearchHits { total, documents })
    }

    /// Search the index routed for `kind`, or its regional index when
    /// `regional` is set. Errors are returned as-is; reads are not retried.
    pub async fn search_entities(
        &self,
        kind: EntityKind,
        source: &SearchSource,
        regional: bool,
    ) -> Result<SearchHits, SearchError> {
        let route = self.routes.select(kind, regional)?;
        self.search(source, &route).await
    }

    /// Fetch one document by id.
    #[instrument(skip(self), fields(index = %route.index))]
    pub async fn search_by_id(&self, route: &IndexRoute, id: &str) -> Result<Value, SearchError> {
        if id.trim().is_empty() {
            return Err(SearchError::invalid_input("document id is empty"));
        }

        let response = self.client.get_document(route, id).await?;
        if !is_found(&response) {
            return Err(SearchError::not_found(format!("{}/{}", route.index, id)));
        }
        Ok(source_of(&response))
    }

    /// Fetch several documents in one multi-get.
    ///
    /// Missing ids are skipped; the call fails with `NotFound` only when
    /// none of them exist.
    #[instrument(skip(self, ids), fields(index = %route.index, ids = ids.len()))]
    pub async fn search_by_ids(
        &self,
        route: &IndexRoute,
        ids: &[String],
    ) -> Result<SearchHits, SearchError> {
        if ids.is_empty() {
            return Err(SearchError::invalid_input("no document ids given"));
        }
        if ids.iter().any(|id| id.trim().is_empty()) {
            return Err(SearchError::invalid_input("document id is empty"));
        }

        let response = self.client.multi_get(route, ids).await?;
        let docs = response
            .get("docs")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::parse("multi-get response has no docs"))?;

        let documents: Vec<Value> = docs
            .iter()
            .filter(|doc| is_found(doc))
            .map(source_of)
            .collect();
        if documents.is_empty() {
            return Err(SearchError::not_found(format!(
                "none of {} ids found in {}",
                ids.len(),
                route.index
            )));
        }

        debug!(requested = ids.len(), found = documents.len(), "Multi-get completed");
        Ok(SearchHits {
            total: documents.len() as u64,
            documents,
        })
    }

    /// Look up one entity by numeric id.
    ///
    /// Without a region a region-partitioned kind is looked up in every
    /// valid region at once.
    pub async fn find_entity(
        &self,
        kind: EntityKind,
        region: Option<i32>,
        numeric_id: i64,
    ) -> Result<SearchHits, SearchError> {
        let route = self.routes.route(kind)?;
        match resolve_lookup(kind, region, numeric_id, &self.valid_regions) {
            DocumentLookup::Single(id) => {
                let document = self.search_by_id(route, &id).await?;
                Ok(SearchHits {
                    total: 1,
                    documents: vec![document],
                })
            }
            DocumentLookup::Multi(ids) => {
                if ids.is_empty() {
                    return Err(SearchError::invalid_input(format!(
                        "{} lookup needs a region and no valid regions are configured",
                        kind
                    )));
                }
                self.search_by_ids(route, &ids).await
            }
        }
    }

    /// Look up several entities by numeric id in one multi-get.
    pub async fn find_entities(
        &self,
        kind: EntityKind,
        region: Option<i32>,
        numeric_ids: &[i64],
    ) -> Result<SearchHits, SearchError> {
        let route = self.routes.route(kind)?;
        let ids: Vec<String> = numeric_ids
            .iter()
            .flat_map(|id| match resolve_lookup(kind, region, *id, &self.valid_regions) {
                DocumentLookup::Single(id) => vec![id],
                DocumentLookup::Multi(ids) => ids,
            })
            .collect();
        self.search_by_ids(route, &ids).await
    }

    /// Page through a result set with a scroll cursor.
    ///
    /// Without `scroll_id` a cursor is opened for `query`; with one the
    /// cursor is continued and `query`, `size` and `sort_field` are ignored.
    /// When a page comes back empty the cursor is cleared and the returned
    /// page carries no `scroll_id`.
    #[instrument(skip(self, query))]
    pub async fn search_by_scroll(
        &self,
        route: Option<&IndexRoute>,
        query: &QueryVariant,
        size: Option<i64>,
        sort_field: Option<&str>,
        scroll_id: Option<&str>,
    ) -> Result<ScrollPage, SearchError> {
        let response = match scroll_id.filter(|id| !id.is_empty()) {
            Some(id) => self.client.next_scroll(id, SCROLL_KEEP_ALIVE).await?,
            None => {
                let mut body =
                    SearchSource::compose(query.clone(), None, size, sort_field, None).to_body();
                if let Some(body) = body.as_object_mut() {
                    body.remove("from");
                }
                self.client.open_scroll(route, &body, SCROLL_KEEP_ALIVE).await?
            }
        };

        let (total, documents) = parse_hits(&response)?;
        let next_id = response
            .get("_scroll_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| scroll_id.map(str::to_string));

        if documents.is_empty() {
            if let Some(id) = next_id {
                self.clear_scroll(&[id]).await;
            }
            return Ok(ScrollPage {
                total,
                documents,
                scroll_id: None,
            });
        }

        Ok(ScrollPage {
            total,
            documents,
            scroll_id: next_id,
        })
    }

    /// Release scroll cursors. Failures are logged and swallowed.
    pub async fn clear_scroll(&self, scroll_ids: &[String]) {
        if scroll_ids.is_empty() {
            return;
        }
        if let Err(e) = self.client.clear_scroll(scroll_ids).await {
            warn!(error = %e, cursors = scroll_ids.len(), "Failed to clear scroll");
        }
    }
}

fn is_found(doc: &Value) -> bool {
    doc.get("found").and_then(Value::as_bool).unwrap_or(false)
}

fn source_of(doc: &Value) -> Value {
    doc.get("_source").cloned().unwrap_or(Value::Null)
}

/// Extract the total and the document sources from a search response.
///
/// Accepts both a bare integer total and the `{value, relation}` object.
fn parse_hits(response: &Value) -> Result<(u64, Vec<Value>), SearchError> {
    let hits = response
        .get("hits")
        .ok_or_else(|| SearchError::parse("search response has no hits"))?;

    let total = match hits.get("total") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64),
        _ => None,
    }
    .ok_or_else(|| SearchError::parse("search response has no hit total"))?;

    let documents = hits
        .get("hits")
        .and_then(Value::as_array)
        .map(|hits| hits.iter().map(source_of).collect())
        .unwrap_or_default();

    Ok((total, documents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BulkSummary;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::time::Duration;
    use store_search_shared::DocumentDeclaration;
    use tokio::sync::Mutex;

    /// Engine that replays scripted responses and records every call.
    #[derive(Default)]
    struct ScriptedEngine {
        responses: Mutex<VecDeque<Result<Value, SearchError>>>,
        calls: Mutex<Vec<String>>,
        fail_clear: bool,
    }

    impl ScriptedEngine {
        fn with_responses(responses: Vec<Result<Value, SearchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        async fn next(&self, call: String) -> Result<Value, SearchError> {
            self.calls.lock().await.push(call);
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(SearchError::query("no scripted response")))
        }

        async fn calls(&self) -> Vec<String> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl SearchEngineClient for ScriptedEngine {
        async fn search(&self, route: &IndexRoute, _body: &Value) -> Result<Value, SearchError> {
            self.next(format!("search {}", route.index)).await
        }

        async fn get_document(&self, route: &IndexRoute, id: &str) -> Result<Value, SearchError> {
            self.next(format!("get {} {}", route.index, id)).await
        }

        async fn multi_get(
            &self,
            route: &IndexRoute,
            ids: &[String],
        ) -> Result<Value, SearchError> {
            self.next(format!("mget {} {}", route.index, ids.join(","))).await
        }

        async fn open_scroll(
            &self,
            _route: Option<&IndexRoute>,
            body: &Value,
            keep_alive: &str,
        ) -> Result<Value, SearchError> {
            assert!(body.get("from").is_none());
            self.next(format!("open_scroll {}", keep_alive)).await
        }

        async fn next_scroll(
            &self,
            scroll_id: &str,
            keep_alive: &str,
        ) -> Result<Value, SearchError> {
            self.next(format!("next_scroll {} {}", scroll_id, keep_alive)).await
        }

        async fn clear_scroll(&self, scroll_ids: &[String]) -> Result<(), SearchError> {
            self.calls
                .lock()
                .await
                .push(format!("clear_scroll {}", scroll_ids.join(",")));
            if self.fail_clear {
                Err(SearchError::connection("engine down"))
            } else {
                Ok(())
            }
        }

        async fn bulk(
            &self,
            declarations: &[DocumentDeclaration],
            _timeout: Duration,
        ) -> Result<BulkSummary, SearchError> {
            Ok(BulkSummary::all_succeeded(declarations.len()))
        }

        async fn upsert_document(
            &self,
            _declaration: &DocumentDeclaration,
        ) -> Result<(), SearchError> {
            Ok(())
        }

        async fn delete_document(
            &self,
            _declaration: &DocumentDeclaration,
        ) -> Result<(), SearchError> {
            Ok(())
        }

        async fn health_check(&self) -> Result<bool, SearchError> {
            Ok(true)
        }
    }

    fn executor(engine: Arc<ScriptedEngine>) -> SearchExecutor {
        SearchExecutor::new(engine, IndexRoutes::typeless(), vec![1, 2, 3])
    }

    fn match_all() -> QueryVariant {
        QueryVariant::string_query("*", Vec::<String>::new())
    }

    fn hits_page(total: Value, sources: &[Value], scroll_id: Option<&str>) -> Value {
        let hits: Vec<Value> = sources.iter().map(|s| json!({ "_source": s })).collect();
        let mut response = json!({ "hits": { "total": total, "hits": hits } });
        if let Some(id) = scroll_id {
            response["_scroll_id"] = json!(id);
        }
        response
    }

    #[tokio::test]
    async fn test_search_accepts_both_total_shapes() {
        let engine = Arc::new(ScriptedEngine::with_responses(vec![
            Ok(hits_page(json!(2), &[json!({ "id": 1 }), json!({ "id": 2 })], None)),
            Ok(hits_page(json!({ "value": 7, "relation": "eq" }), &[json!({ "id": 3 })], None)),
        ]));
        let executor = executor(engine);
        let route = IndexRoute::new("joox_tracks", "");
        let source = SearchSource::for_query(match_all());

        let first = executor.search(&source, &route).await.unwrap();
        assert_eq!(first.total, 2);
        assert_eq!(first.documents, vec![json!({ "id": 1 }), json!({ "id": 2 })]);

        let second = executor.search(&source, &route).await.unwrap();
        assert_eq!(second.total, 7);
        assert_eq!(second.documents.len(), 1);
    }

    #[tokio::test]
    async fn test_search_without_hits_is_parse_error() {
        let engine = Arc::new(ScriptedEngine::with_responses(vec![
            Ok(json!({ "took": 1 })),
            Ok(json!({ "hits": { "hits": [] } })),
        ]));
        let executor = executor(engine);
        let route = IndexRoute::new("joox_tracks", "");
        let source = SearchSource::for_query(match_all());

        assert!(matches!(executor.search(&source, &route).await, Err(SearchError::ParseError(_))));
        assert!(matches!(executor.search(&source, &route).await, Err(SearchError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_search_entities_engine_error_is_not_retried() {
        let engine = Arc::new(ScriptedEngine::with_responses(vec![
            Err(SearchError::connection("refused")),
            Ok(hits_page(json!(1), &[json!({ "id": "regional" })], None)),
        ]));
        let executor = executor(engine.clone());

        let result = executor
            .search_entities(EntityKind::Track, &SearchSource::for_query(match_all()), false)
            .await;

        assert!(matches!(result, Err(SearchError::ConnectionError(_))));
        assert_eq!(engine.calls().await, vec!["search joox_tracks".to_string()]);
    }

    #[tokio::test]
    async fn test_search_entities_regional_targets_suffixed_index() {
        let engine = Arc::new(ScriptedEngine::with_responses(vec![Ok(hits_page(
            json!(1),
            &[json!({ "id": 9 })],
            None,
        ))]));
        let executor = executor(engine.clone());

        let hits = executor
            .search_entities(EntityKind::Track, &SearchSource::for_query(match_all()), true)
            .await
            .unwrap();

        assert_eq!(hits.total, 1);
        assert_eq!(engine.calls().await, vec!["search joox_tracks_th".to_string()]);
    }

    #[tokio::test]
    async fn test_search_entities_regional_without_suffix_is_invalid() {
        let engine = Arc::new(ScriptedEngine::default());
        let executor = SearchExecutor::new(
            engine.clone(),
            IndexRoutes::typeless().with_regional_suffix(None),
            vec![1],
        );

        let result = executor
            .search_entities(EntityKind::Album, &SearchSource::for_query(match_all()), true)
            .await;
        assert!(matches!(result, Err(SearchError::InvalidInput(_))));
        assert!(engine.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_search_by_id() {
        let engine = Arc::new(ScriptedEngine::with_responses(vec![
            Ok(json!({ "_id": "track-1-5", "found": true, "_source": { "name": "song" } })),
            Ok(json!({ "_id": "track-1-6", "found": false })),
        ]));
        let executor = executor(engine.clone());
        let route = IndexRoute::new("joox_tracks", "");

        let doc = executor.search_by_id(&route, "track-1-5").await.unwrap();
        assert_eq!(doc, json!({ "name": "song" }));

        let missing = executor.search_by_id(&route, "track-1-6").await;
        assert!(matches!(missing, Err(SearchError::NotFound(_))));

        let empty = executor.search_by_id(&route, "").await;
        assert!(matches!(empty, Err(SearchError::InvalidInput(_))));
        assert_eq!(engine.calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_search_by_ids_partial_and_none() {
        let engine = Arc::new(ScriptedEngine::with_responses(vec![
            Ok(json!({ "docs": [
                { "_id": "a", "found": true, "_source": { "id": "a" } },
                { "_id": "b", "found": false }
            ] })),
            Ok(json!({ "docs": [{ "_id": "c", "found": false }] })),
        ]));
        let executor = executor(engine);
        let route = IndexRoute::new("music_mv", "");

        let hits = executor
            .search_by_ids(&route, &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.documents, vec![json!({ "id": "a" })]);

        let none = executor.search_by_ids(&route, &["c".to_string()]).await;
        assert!(matches!(none, Err(SearchError::NotFound(_))));

        let empty = executor.search_by_ids(&route, &[]).await;
        assert!(matches!(empty, Err(SearchError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_find_entity_fans_out_without_region() {
        let engine = Arc::new(ScriptedEngine::with_responses(vec![
            Ok(json!({ "docs": [
                { "_id": "track-1-42", "found": false },
                { "_id": "track-2-42", "found": true, "_source": { "id": 42 } },
                { "_id": "track-3-42", "found": false }
            ] })),
            Ok(json!({ "_id": "track-2-42", "found": true, "_source": { "id": 42 } })),
            Ok(json!({ "_id": "42", "found": true, "_source": { "id": 42 } })),
        ]));
        let executor = executor(engine.clone());

        let fanned = executor.find_entity(EntityKind::Track, None, 42).await.unwrap();
        assert_eq!(fanned.total, 1);
        let direct = executor.find_entity(EntityKind::Track, Some(2), 42).await.unwrap();
        assert_eq!(direct.documents, vec![json!({ "id": 42 })]);
        executor.find_entity(EntityKind::Video, None, 42).await.unwrap();

        assert_eq!(
            engine.calls().await,
            vec![
                "mget joox_tracks track-1-42,track-2-42,track-3-42".to_string(),
                "get joox_tracks track-2-42".to_string(),
                "get music_mv 42".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_find_entity_without_regions_is_invalid() {
        let engine = Arc::new(ScriptedEngine::default());
        let executor = SearchExecutor::new(engine.clone(), IndexRoutes::typeless(), vec![]);

        let result = executor.find_entity(EntityKind::Singer, None, 1).await;
        assert!(matches!(result, Err(SearchError::InvalidInput(_))));
        assert!(engine.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_find_entities_fans_out_every_id() {
        let engine = Arc::new(ScriptedEngine::with_responses(vec![Ok(json!({ "docs": [
            { "_id": "album-1-1", "found": true, "_source": { "id": 1 } }
        ] }))]));
        let executor = SearchExecutor::new(engine.clone(), IndexRoutes::typeless(), vec![1, 2]);

        executor.find_entities(EntityKind::Album, None, &[1, 2]).await.unwrap();
        assert_eq!(
            engine.calls().await,
            vec!["mget joox_albums album-1-1,album-2-1,album-1-2,album-2-2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_scroll_until_exhausted_clears_cursor() {
        let engine = Arc::new(ScriptedEngine::with_responses(vec![
            Ok(hits_page(json!(2), &[json!({ "id": 1 }), json!({ "id": 2 })], Some("c1"))),
            Ok(hits_page(json!(2), &[], Some("c2"))),
        ]));
        let executor = executor(engine.clone());
        let route = IndexRoute::new("joox_tracks", "");

        let first = executor
            .search_by_scroll(Some(&route), &match_all(), Some(2), None, None)
            .await
            .unwrap();
        assert_eq!(first.documents.len(), 2);
        assert_eq!(first.scroll_id.as_deref(), Some("c1"));

        let last = executor
            .search_by_scroll(Some(&route), &match_all(), Some(2), None, first.scroll_id.as_deref())
            .await
            .unwrap();
        assert!(last.documents.is_empty());
        assert!(last.scroll_id.is_none());

        assert_eq!(
            engine.calls().await,
            vec![
                "open_scroll 5m".to_string(),
                "next_scroll c1 5m".to_string(),
                "clear_scroll c2".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_clear_scroll_failure_is_swallowed() {
        let engine = Arc::new(ScriptedEngine {
            fail_clear: true,
            ..ScriptedEngine::default()
        });
        let executor = executor(engine.clone());

        executor.clear_scroll(&["c1".to_string()]).await;
        executor.clear_scroll(&[]).await;
        assert_eq!(engine.calls().await, vec!["clear_scroll c1".to_string()]);
    }

    #[test]
    fn test_deserialize_hits() {
        #[derive(serde::Deserialize)]
        struct Track {
            id: i64,
        }

        let hits = SearchHits {
            total: 1,
            documents: vec![json!({ "id": 5, "name": "x" })],
        };
        let tracks: Vec<Track> = hits.deserialize().unwrap();
        assert_eq!(tracks[0].id, 5);
    }
}
