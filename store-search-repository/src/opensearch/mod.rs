//! OpenSearch implementation of the search engine client.
//!
//! This module provides a concrete implementation of `SearchEngineClient`
//! for OpenSearch and Elasticsearch clusters, with request paths chosen by
//! the engine protocol generation.

mod client;
mod pool;
mod protocol;

pub use client::OpenSearchClient;
pub use pool::{RoundRobinPool, SNIFF_INTERVAL};
pub use protocol::upsert_body;
