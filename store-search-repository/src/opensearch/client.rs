//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client. Document-addressed requests go through
//! the raw `send` API so that paths follow the configured protocol
//! generation; bulk, scroll and cluster calls use the typed builders.

use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    cluster::ClusterHealthParts,
    http::{
        headers::HeaderMap,
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
        Method,
    },
    BulkParts, ClearScrollParts, OpenSearch, ScrollParts,
};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use store_search_shared::DocumentDeclaration;

use crate::config::{EngineConfig, EngineProtocol};
use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;
use crate::opensearch::pool::{spawn_sniffer, RoundRobinPool, SNIFF_INTERVAL};
use crate::opensearch::protocol::upsert_body;
use crate::routing::IndexRoute;
use crate::types::BulkSummary;

type QueryString<'a> = [(&'a str, &'a str)];

/// OpenSearch client implementation.
///
/// Speaks to OpenSearch and to Elasticsearch 6.x/7.x clusters. The engine
/// protocol in [`EngineConfig`] decides whether document types appear in
/// request paths and bulk lines. Several addresses, or sniffing, use a
/// round-robin pool; sniffing re-seeds it every [`SNIFF_INTERVAL`].
///
/// # Example
///
/// ```ignore
/// use store_search_repository::{EngineConfig, OpenSearchClient};
/// let config = EngineConfig::with_addresses(vec!["http://localhost:9200".into()]);
/// let client = OpenSearchClient::new(&config).await?;
/// assert!(client.health_check().await?);
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
    protocol: EngineProtocol,
    request_timeout: Duration,
    sniffer: Option<JoinHandle<()>>,
}

impl OpenSearchClient {
    /// Create a new client from the engine configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Node addresses, credentials, proxy and protocol
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError)` - If an address is invalid or the transport
    ///   cannot be built
    pub async fn new(config: &EngineConfig) -> Result<Self, SearchError> {
        let urls = config
            .addresses
            .iter()
            .map(|address| Url::parse(address.trim()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let (mut builder, pool) = match urls.as_slice() {
            [] => return Err(SearchError::connection("no engine address configured")),
            [url] if !config.sniff => {
                let pool = SingleNodeConnectionPool::new(url.clone());
                (TransportBuilder::new(pool), None)
            }
            _ => {
                let pool = RoundRobinPool::new(urls.clone())?;
                (TransportBuilder::new(pool.clone()), Some(pool))
            }
        };

        if let Some(auth) = &config.credentials {
            builder = builder.auth(Credentials::Basic(
                auth.username.clone(),
                auth.password.clone(),
            ));
        }

        builder = match config.proxy.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(proxy) => {
                let proxy_url = if proxy.contains("://") {
                    Url::parse(proxy)
                } else {
                    Url::parse(&format!("http://{}", proxy))
                }
                .map_err(|e| SearchError::connection(format!("invalid proxy: {}", e)))?;
                builder.proxy(proxy_url, None, None)
            }
            None => builder.disable_proxy(),
        };

        let transport = builder
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        info!(
            nodes = urls.len(),
            sniff = config.sniff,
            protocol = %config.protocol,
            "Created OpenSearch client"
        );

        let client = OpenSearch::new(transport);
        let sniffer = pool.filter(|_| config.sniff).map(|pool| {
            let scheme = urls.first().map_or("http", Url::scheme).to_string();
            spawn_sniffer(client.clone(), pool, scheme, SNIFF_INTERVAL)
        });

        Ok(Self {
            client,
            protocol: config.protocol,
            request_timeout: config.request_timeout,
            sniffer,
        })
    }

    /// Send a request on a protocol-dependent path.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&QueryString<'_>>,
        body: Option<Value>,
    ) -> Result<Response, SearchError> {
        self.client
            .send(
                method,
                path,
                HeaderMap::new(),
                query,
                body.map(JsonBody::new),
                Some(self.request_timeout),
            )
            .await
            .map_err(|e| SearchError::connection(e.to_string()))
    }

    /// Read a response body, failing on any status not in `accepted`.
    async fn read_json(
        response: Response,
        accepted: &[u16],
        op: &str,
    ) -> Result<Value, SearchError> {
        let status = response.status_code();
        if !status.is_success() && !accepted.contains(&status.as_u16()) {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, op, "Request failed");
            return Err(SearchError::query(format!(
                "{} failed with status {}: {}",
                op, status, error_body
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))
    }
}

impl Drop for OpenSearchClient {
    fn drop(&mut self) {
        if let Some(sniffer) = self.sniffer.take() {
            sniffer.abort();
        }
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    #[instrument(skip(self, body), fields(index = %route.index))]
    async fn search(&self, route: &IndexRoute, body: &Value) -> Result<Value, SearchError> {
        let path = self.protocol.search_path(route);
        let response = self.send(Method::Post, &path, None, Some(body.clone())).await?;
        Self::read_json(response, &[], "search").await
    }

    async fn get_document(&self, route: &IndexRoute, id: &str) -> Result<Value, SearchError> {
        let path = self.protocol.get_path(route, id);
        let response = self.send(Method::Get, &path, None, None).await?;
        // 404 carries `found: false`
        Self::read_json(response, &[404], "get").await
    }

    async fn multi_get(&self, route: &IndexRoute, ids: &[String]) -> Result<Value, SearchError> {
        let path = self.protocol.mget_path(route);
        let response = self
            .send(Method::Post, &path, None, Some(json!({ "ids": ids })))
            .await?;
        Self::read_json(response, &[], "mget").await
    }

    async fn open_scroll(
        &self,
        route: Option<&IndexRoute>,
        body: &Value,
        keep_alive: &str,
    ) -> Result<Value, SearchError> {
        let path = route
            .map(|route| self.protocol.search_path(route))
            .unwrap_or_else(|| "/_search".to_string());
        let query: &QueryString = &[("scroll", keep_alive)];
        let response = self
            .send(Method::Post, &path, Some(query), Some(body.clone()))
            .await?;
        Self::read_json(response, &[], "scroll").await
    }

    async fn next_scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<Value, SearchError> {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(json!({ "scroll": keep_alive, "scroll_id": scroll_id }))
            .request_timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;
        Self::read_json(response, &[], "scroll").await
    }

    async fn clear_scroll(&self, scroll_ids: &[String]) -> Result<(), SearchError> {
        let response = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .body(json!({ "scroll_id": scroll_ids }))
            .request_timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;
        // an expired cursor reports 404
        Self::read_json(response, &[404], "clear scroll").await?;
        Ok(())
    }

    #[instrument(skip(self, declarations), fields(count = declarations.len()))]
    async fn bulk(
        &self,
        declarations: &[DocumentDeclaration],
        timeout: Duration,
    ) -> Result<BulkSummary, SearchError> {
        if declarations.is_empty() {
            return Ok(BulkSummary::default());
        }

        let body: Vec<JsonBody<Value>> = self
            .protocol
            .bulk_lines(declarations)
            .into_iter()
            .map(JsonBody::new)
            .collect();
        let server_timeout = format!("{}s", timeout.as_secs().max(1));

        let response = self
            .client
            .bulk(BulkParts::None)
            .timeout(&server_timeout)
            .request_timeout(timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::bulk(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchError::bulk(format!(
                "Bulk failed with status {}: {}",
                status, error_body
            )));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;
        let summary = BulkSummary::from_response(&body, declarations.len());
        for failure in &summary.failures {
            warn!(
                id = %failure.id,
                status = failure.status,
                reason = %failure.reason,
                "Bulk item rejected"
            );
        }

        debug!(succeeded = summary.succeeded, failed = summary.failed, "Bulk applied");
        Ok(summary)
    }

    async fn upsert_document(&self, declaration: &DocumentDeclaration) -> Result<(), SearchError> {
        let path = self
            .protocol
            .update_path(&declaration.index, &declaration.doc_type, &declaration.id);
        let response = self
            .send(Method::Post, &path, None, Some(upsert_body(declaration)))
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Update request failed");
            return Err(SearchError::bulk(format!(
                "Update failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(doc_id = %declaration.id, "Document updated/created");
        Ok(())
    }

    async fn delete_document(&self, declaration: &DocumentDeclaration) -> Result<(), SearchError> {
        let path = self
            .protocol
            .delete_path(&declaration.index, &declaration.doc_type, &declaration.id);
        let response = self.send(Method::Delete, &path, None, None).await?;

        let status = response.status_code();

        // 404 is acceptable - document may not exist
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Delete request failed");
            return Err(SearchError::bulk(format!(
                "Delete failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(doc_id = %declaration.id, "Document deleted");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .request_timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            return Ok(false);
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;
        let status = body.get("status").and_then(Value::as_str).unwrap_or("red");
        debug!(status, "Cluster health");
        Ok(matches!(status, "green" | "yellow"))
    }
}
