use std::mem;

use store_search_repository::SearchEngineClient;
use store_search_shared::DocumentDeclaration;
use tracing::{error, info, instrument};

use super::config::BatcherConfig;
use super::retry::retry_once;

/// Declarations waiting for the next flush. Owned by the worker.
#[derive(Debug)]
pub(crate) struct PendingBuffer {
    items: Vec<DocumentDeclaration>,
    batch_size: usize,
}

impl PendingBuffer {
    pub(crate) fn new(batch_size: usize) -> Self {
        Self {
            items: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    /// Add a declaration. Returns true once the batch is full.
    pub(crate) fn push(&mut self, declaration: DocumentDeclaration) -> bool {
        self.items.push(declaration);
        self.items.len() >= self.batch_size
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Send everything pending as one bulk request.
    ///
    /// The buffer is emptied whether or not the request succeeds. A failed
    /// request is retried once; if that fails too the batch is dropped.
    #[instrument(skip_all, fields(count = self.items.len()))]
    pub(crate) async fn flush(&mut self, client: &dyn SearchEngineClient, config: &BatcherConfig) {
        if self.items.is_empty() {
            return;
        }

        let batch = mem::replace(&mut self.items, Vec::with_capacity(self.batch_size));
        let count = batch.len();
        info!(count, "Flushing declarations");

        let flushed = retry_once(config.retry_delay, "bulk", || {
            client.bulk(&batch, config.flush_timeout)
        })
        .await;
        match flushed {
            Ok(summary) => {
                info!(
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    "Flush completed"
                );
            }
            Err(e) => {
                error!(count, error = %e, "Dropping batch after failed retry");
            }
        }
    }
}
