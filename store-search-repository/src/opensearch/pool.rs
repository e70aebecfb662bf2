//! Round-robin connection pool over several engine nodes.
//!
//! The node list is shared between clones, so the transport and the sniffer
//! task see the same pool. Sniffing replaces the list with the HTTP publish
//! addresses reported by `_nodes/http`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use opensearch::{
    http::transport::{Connection, ConnectionPool},
    nodes::NodesInfoParts,
    OpenSearch,
};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::SearchError;

/// How often the node pool is re-seeded when sniffing is on.
pub const SNIFF_INTERVAL: Duration = Duration::from_secs(300);

/// Connection pool that hands out its nodes in turn.
#[derive(Debug, Clone)]
pub struct RoundRobinPool {
    nodes: Arc<RwLock<Vec<Url>>>,
    cursor: Arc<AtomicUsize>,
}

impl RoundRobinPool {
    /// Create a pool over `urls`. The list must not be empty.
    pub fn new(urls: Vec<Url>) -> Result<Self, SearchError> {
        if urls.is_empty() {
            return Err(SearchError::connection("no engine address configured"));
        }
        Ok(Self {
            nodes: Arc::new(RwLock::new(urls)),
            cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Current node list.
    pub fn urls(&self) -> Vec<Url> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the node list. An empty list is ignored so the pool never
    /// runs out of nodes.
    pub fn reseed(&self, urls: Vec<Url>) -> bool {
        if urls.is_empty() {
            return false;
        }
        *self.nodes.write().unwrap_or_else(PoisonError::into_inner) = urls;
        true
    }

    fn next_url(&self) -> Url {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % nodes.len();
        nodes[index].clone()
    }
}

impl ConnectionPool for RoundRobinPool {
    fn next(&self) -> Connection {
        Connection::new(self.next_url())
    }
}

/// Re-seed `pool` from the cluster every `every` until the task is aborted.
///
/// Discovered nodes are addressed with `scheme`. A failed or empty sniff
/// keeps the current list.
pub(crate) fn spawn_sniffer(
    client: OpenSearch,
    pool: RoundRobinPool,
    scheme: String,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match sniff(&client, &scheme).await {
                Ok(urls) if pool.reseed(urls.clone()) => {
                    info!(nodes = urls.len(), "Re-seeded engine node pool");
                }
                Ok(_) => warn!("Sniff found no HTTP nodes, keeping current pool"),
                Err(e) => warn!(error = %e, "Sniff failed, keeping current pool"),
            }
        }
    })
}

async fn sniff(client: &OpenSearch, scheme: &str) -> Result<Vec<Url>, SearchError> {
    let response = client
        .nodes()
        .info(NodesInfoParts::Metric(&["http"]))
        .send()
        .await
        .map_err(|e| SearchError::connection(e.to_string()))?;

    let status = response.status_code();
    if !status.is_success() {
        return Err(SearchError::query(format!("nodes info failed with status {}", status)));
    }

    let body = response
        .json::<Value>()
        .await
        .map_err(|e| SearchError::parse(e.to_string()))?;
    let urls = node_urls(&body, scheme);
    debug!(nodes = urls.len(), "Sniffed engine nodes");
    Ok(urls)
}

/// HTTP publish addresses of a `_nodes/http` response.
///
/// Addresses come as `ip:port` or `hostname/ip:port`; the ip form is used.
fn node_urls(body: &Value, scheme: &str) -> Vec<Url> {
    let Some(nodes) = body.get("nodes").and_then(Value::as_object) else {
        return Vec::new();
    };

    nodes
        .values()
        .filter_map(|node| node.pointer("/http/publish_address")?.as_str())
        .filter_map(|address| {
            let address = address.rsplit('/').next()?;
            Url::parse(&format!("{}://{}", scheme, address)).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    fn two_nodes() -> RoundRobinPool {
        RoundRobinPool::new(vec![url("http://es-1:9200"), url("http://es-2:9200")]).unwrap()
    }

    #[test]
    fn test_round_robin_cycles_nodes() {
        let pool = two_nodes();

        let picked: Vec<String> = (0..4)
            .map(|_| pool.next_url().host_str().unwrap().to_string())
            .collect();
        assert_eq!(picked, vec!["es-1", "es-2", "es-1", "es-2"]);
    }

    #[test]
    fn test_clones_share_nodes_and_cursor() {
        let pool = two_nodes();
        let transport_side = pool.clone();

        assert_eq!(transport_side.next_url().host_str(), Some("es-1"));
        assert_eq!(pool.next_url().host_str(), Some("es-2"));

        assert!(pool.reseed(vec![url("http://10.0.0.7:9200")]));
        assert_eq!(transport_side.urls(), vec![url("http://10.0.0.7:9200")]);
        assert_eq!(transport_side.next_url().host_str(), Some("10.0.0.7"));
    }

    #[test]
    fn test_reseed_ignores_empty_list() {
        let pool = RoundRobinPool::new(vec![url("http://es-1:9200")]).unwrap();
        assert!(!pool.reseed(Vec::new()));
        assert_eq!(pool.urls(), vec![url("http://es-1:9200")]);
    }

    #[test]
    fn test_new_rejects_empty_list() {
        assert!(matches!(
            RoundRobinPool::new(Vec::new()),
            Err(SearchError::ConnectionError(_))
        ));
    }

    #[test]
    fn test_node_urls_from_nodes_info() {
        let body = json!({
            "nodes": {
                "a": { "http": { "publish_address": "10.0.0.1:9200" } },
                "b": { "http": { "publish_address": "es-2.local/10.0.0.2:9200" } },
                "c": { "name": "no-http" }
            }
        });

        assert_eq!(
            node_urls(&body, "https"),
            vec![url("https://10.0.0.1:9200"), url("https://10.0.0.2:9200")]
        );
        assert!(node_urls(&json!({}), "http").is_empty());
    }
}
