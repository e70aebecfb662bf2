//! # Store Search Pipeline
//!
//! This crate provides the write side of the store search client: a
//! [`BulkBatcher`] that collects document mutations and applies them to the
//! engine in bulk.
//!
//! ## Architecture
//!
//! Mutations reach the engine on one of two paths:
//!
//! 1. **Queue**: `enqueue` hands a declaration to a background worker that
//!    flushes on a timer or when the batch is full
//! 2. **Direct**: `apply_now` and `apply_batch_now` write immediately, with a
//!    single retry on engine errors

pub mod batcher;
pub mod errors;

#[cfg(test)]
pub(crate) mod test_support;

pub use batcher::{BatcherConfig, BatcherState, BulkBatcher};
pub use errors::BatcherError;
