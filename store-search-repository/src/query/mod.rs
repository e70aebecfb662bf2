//! Query builder.
//!
//! Queries are plain values built from primitive inputs. They are rendered
//! to the engine DSL only when a request body is composed.

pub mod classify;
mod intent;
mod variant;

pub use intent::QueryIntent;
pub use variant::{Fuzziness, Operator, QueryVariant, MINIMUM_SHOULD_MATCH, TIE_BREAKER};
