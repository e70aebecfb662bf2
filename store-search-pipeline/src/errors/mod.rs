//! Error types for the store search pipeline.

use store_search_repository::SearchError;
use thiserror::Error;

/// Errors that can occur while batching or applying mutations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatcherError {
    /// The batcher has shut down and accepts no more work.
    #[error("Batcher is closed")]
    Closed,

    /// The background worker was already started.
    #[error("Batcher is already running")]
    AlreadyRunning,

    /// Error from the search engine or a rejected declaration.
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// The background worker ended abnormally.
    #[error("Worker error: {0}")]
    WorkerError(String),
}

impl BatcherError {
    /// Create a worker error.
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::WorkerError(msg.into())
    }
}
