//! # Store Search
//!
//! Entry point for the store search client.
//!
//! This crate loads configuration from the environment, builds the engine
//! client, and wires the search executor and the bulk batcher around it.

pub mod config;
pub mod telemetry;

pub use config::{Dependencies, Settings};
pub use store_search_pipeline::{BatcherConfig, BatcherError, BatcherState, BulkBatcher};
pub use store_search_repository::{
    EngineConfig, EngineProtocol, IndexRoute, IndexRoutes, QueryIntent, QueryVariant, SearchError,
    SearchExecutor, SearchSource,
};
pub use store_search_shared::{DocumentDeclaration, EntityKind};

use thiserror::Error;

/// Errors that can occur while configuring or running the store search client.
#[derive(Error, Debug)]
pub enum StoreSearchError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),

    /// Batcher error.
    #[error("Batcher error: {0}")]
    BatcherError(#[from] BatcherError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StoreSearchError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
