//! # Store Search Repository
//!
//! This crate provides the engine-facing half of the store search client:
//! the query builder, the search source composer, index routing, the search
//! executor, and a concrete client for the OpenSearch/Elasticsearch wire
//! protocol that covers both typed (6.x) and typeless engines.

pub mod config;
pub mod errors;
pub mod executor;
pub mod interfaces;
pub mod opensearch;
pub mod query;
pub mod routing;
pub mod source;
pub mod types;

pub use config::{BasicAuth, EngineConfig, EngineProtocol};
pub use errors::SearchError;
pub use executor::{ScrollPage, SearchExecutor, SearchHits};
pub use interfaces::SearchEngineClient;
pub use opensearch::OpenSearchClient;
pub use query::{Fuzziness, Operator, QueryIntent, QueryVariant};
pub use routing::{IndexRoute, IndexRoutes};
pub use source::SearchSource;
pub use types::{BulkItemFailure, BulkSummary};
