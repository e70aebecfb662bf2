//! Error types for the store search repository.

mod search_error;

pub use search_error::SearchError;
