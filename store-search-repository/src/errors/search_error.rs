//! Search error types.
//!
//! This module defines the error types that can occur while building,
//! executing or applying requests against the search engine.

use thiserror::Error;

/// Errors that can occur during search engine operations.
///
/// `InvalidInput` and `NotFound` describe the request; every other variant
/// is an engine error (transport failure or unexpected response shape).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// The caller supplied malformed or missing required arguments.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The request was well formed but nothing matched.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Failed to reach the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The engine rejected a search, get or scroll request.
    #[error("Query error: {0}")]
    QueryError(String),

    /// The engine rejected a bulk or single-document write.
    #[error("Bulk error: {0}")]
    BulkError(String),

    /// The engine response did not have the expected shape.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the search engine.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SearchError {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a bulk error.
    pub fn bulk(msg: impl Into<String>) -> Self {
        Self::BulkError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Whether the failure came from the engine rather than the request.
    ///
    /// Only engine errors are eligible for the single retry on write paths.
    pub fn is_engine_error(&self) -> bool {
        !matches!(self, Self::InvalidInput(_) | Self::NotFound(_))
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_classification() {
        assert!(!SearchError::invalid_input("id is required").is_engine_error());
        assert!(!SearchError::not_found("track-1-1").is_engine_error());
        assert!(SearchError::connection("refused").is_engine_error());
        assert!(SearchError::query("400").is_engine_error());
        assert!(SearchError::bulk("503").is_engine_error());
        assert!(SearchError::parse("missing hits").is_engine_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            SearchError::not_found("track-1-1").to_string(),
            "Document not found: track-1-1"
        );
    }
}
