//! Search engine client trait definition.
//!
//! This module defines the transport-level interface to the search engine.
//! Implementations speak the wire protocol; request construction and
//! response interpretation live in the executor and the batcher, so both can
//! be exercised against mock engines.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchError;
use crate::routing::IndexRoute;
use crate::types::BulkSummary;
use store_search_shared::DocumentDeclaration;

/// Abstract interface for search engine operations.
///
/// Implementations are shared behind an `Arc` by the executor and the bulk
/// batcher, so they must be `Send + Sync`.
///
/// Read methods return the raw engine response body. A non-success status
/// is reported as an engine error, except for document gets where a missing
/// document is a normal `{"found": false}` body.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Run a search request body against an index.
    ///
    /// # Arguments
    ///
    /// * `route` - The index (and type, for typed engines) to search
    /// * `body` - The search request body, including `track_total_hits`
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The raw search response
    /// * `Err(SearchError)` - If the request fails
    async fn search(&self, route: &IndexRoute, body: &Value) -> Result<Value, SearchError>;

    /// Fetch one document by id.
    ///
    /// Returns the raw get response; `found` tells whether the document
    /// exists.
    async fn get_document(&self, route: &IndexRoute, id: &str) -> Result<Value, SearchError>;

    /// Fetch several documents by id in one request.
    ///
    /// Returns the raw multi-get response with one entry per id in `docs`.
    async fn multi_get(&self, route: &IndexRoute, ids: &[String]) -> Result<Value, SearchError>;

    /// Open a scroll cursor with the first page of results.
    ///
    /// # Arguments
    ///
    /// * `route` - The index to scroll, or `None` for every index
    /// * `body` - The search request body
    /// * `keep_alive` - How long the engine keeps the cursor, e.g. `5m`
    async fn open_scroll(
        &self,
        route: Option<&IndexRoute>,
        body: &Value,
        keep_alive: &str,
    ) -> Result<Value, SearchError>;

    /// Fetch the next page of an open scroll cursor, refreshing its keep-alive.
    async fn next_scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<Value, SearchError>;

    /// Release scroll cursors on the engine.
    async fn clear_scroll(&self, scroll_ids: &[String]) -> Result<(), SearchError>;

    /// Apply declarations as one bulk request.
    ///
    /// Declarations are applied in order. Upserts merge their payload and
    /// create missing documents; deletes remove the document.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkSummary)` - The engine accepted the request; item-level
    ///   rejections are reported in the summary
    /// * `Err(SearchError)` - The request itself failed
    async fn bulk(
        &self,
        declarations: &[DocumentDeclaration],
        timeout: Duration,
    ) -> Result<BulkSummary, SearchError>;

    /// Merge the declaration's payload into its document, creating it if
    /// absent.
    async fn upsert_document(&self, declaration: &DocumentDeclaration) -> Result<(), SearchError>;

    /// Delete the declaration's document. A missing document is not an error.
    async fn delete_document(&self, declaration: &DocumentDeclaration) -> Result<(), SearchError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the cluster status is green or yellow
    /// * `Ok(false)` - If the cluster is red or the status is unknown
    /// * `Err(SearchError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchError>;
}
