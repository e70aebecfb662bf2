//! Bulk mutation batcher.
//!
//! Collects upserts and deletes and applies them to the engine in bulk,
//! flushing on a timer or when a batch fills up. Also offers a direct path
//! that writes straight through.

mod buffer;
mod config;
mod retry;

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

use store_search_repository::{BulkSummary, SearchEngineClient, SearchError};
use store_search_shared::DocumentDeclaration;

use crate::errors::BatcherError;
use buffer::PendingBuffer;
use retry::retry_once;

pub use config::BatcherConfig;

/// Lifecycle of a batcher. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatcherState {
    /// Accepting declarations.
    Running,
    /// Shutdown requested; queued declarations are being flushed.
    Draining,
    /// Terminal. All work has been flushed or dropped.
    Closed,
}

impl fmt::Display for BatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatcherState::Running => f.write_str("running"),
            BatcherState::Draining => f.write_str("draining"),
            BatcherState::Closed => f.write_str("closed"),
        }
    }
}

struct Lifecycle {
    state: BatcherState,
    sender: Option<mpsc::Sender<DocumentDeclaration>>,
    receiver: Option<mpsc::Receiver<DocumentDeclaration>>,
    worker: Option<JoinHandle<()>>,
}

/// Batches document mutations for the search engine.
///
/// Declarations handed to [`enqueue`](Self::enqueue) wait in a bounded
/// channel for the background worker started by [`run`](Self::run). The
/// worker flushes when `batch_size` declarations are pending and on every
/// `flush_interval` tick. [`close`](Self::close) drains everything queued
/// with one final flush.
pub struct BulkBatcher {
    client: Arc<dyn SearchEngineClient>,
    config: BatcherConfig,
    lifecycle: Arc<Mutex<Lifecycle>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl BulkBatcher {
    /// Create a new batcher with default configuration.
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self::with_config(client, BatcherConfig::default())
    }

    /// Create a new batcher with custom configuration.
    pub fn with_config(client: Arc<dyn SearchEngineClient>, config: BatcherConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.batch_size.max(1));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            client,
            config,
            lifecycle: Arc::new(Mutex::new(Lifecycle {
                state: BatcherState::Running,
                sender: Some(sender),
                receiver: Some(receiver),
                worker: None,
            })),
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> BatcherState {
        self.lifecycle.lock().await.state
    }

    /// Start the background worker.
    ///
    /// Returns once the worker is spawned. Fails with `Closed` after
    /// shutdown and with `AlreadyRunning` on a second call.
    pub async fn run(&self) -> Result<(), BatcherError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != BatcherState::Running {
            return Err(BatcherError::Closed);
        }
        let receiver = lifecycle.receiver.take().ok_or(BatcherError::AlreadyRunning)?;

        let worker = Worker {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
            lifecycle: Arc::clone(&self.lifecycle),
            buffer: PendingBuffer::new(self.config.batch_size),
        };
        let shutdown_rx = self.shutdown_tx.subscribe();
        lifecycle.worker = Some(tokio::spawn(worker.run(receiver, shutdown_rx)));

        info!(
            batch_size = self.config.batch_size,
            flush_interval_ms = self.config.flush_interval.as_millis() as u64,
            "Bulk batcher started"
        );
        Ok(())
    }

    /// Queue a declaration for the next flush.
    ///
    /// Waits while the channel is full. Declarations missing an index, an
    /// id or (for upserts) a payload are rejected with `InvalidInput`.
    pub async fn enqueue(&self, declaration: DocumentDeclaration) -> Result<(), BatcherError> {
        validate(&declaration)?;

        let sender = {
            let lifecycle = self.lifecycle.lock().await;
            match (lifecycle.state, &lifecycle.sender) {
                (BatcherState::Running, Some(sender)) => sender.clone(),
                _ => return Err(BatcherError::Closed),
            }
        };

        sender.send(declaration).await.map_err(|_| BatcherError::Closed)
    }

    /// Apply one declaration immediately, bypassing the queue.
    #[instrument(
        skip(self, declaration),
        fields(id = %declaration.id, delete = declaration.is_delete)
    )]
    pub async fn apply_now(&self, declaration: &DocumentDeclaration) -> Result<(), BatcherError> {
        self.ensure_open().await?;
        validate(declaration)?;

        let client = &self.client;
        let delay = self.config.retry_delay;
        if declaration.is_delete {
            retry_once(delay, "delete", || client.delete_document(declaration)).await?;
        } else {
            retry_once(delay, "upsert", || client.upsert_document(declaration)).await?;
        }

        debug!("Declaration applied");
        Ok(())
    }

    /// Upsert one document immediately.
    pub async fn upsert_one(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        payload: Map<String, Value>,
    ) -> Result<(), BatcherError> {
        self.apply_now(&DocumentDeclaration::upsert(index, doc_type, id, payload))
            .await
    }

    /// Delete one document immediately. A missing document is not an error.
    pub async fn delete_one(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<(), BatcherError> {
        self.apply_now(&DocumentDeclaration::delete(index, doc_type, id))
            .await
    }

    /// Apply a caller-supplied batch as one bulk request, right away.
    ///
    /// Every declaration is validated before anything is sent. Item-level
    /// rejections are reported in the summary.
    #[instrument(skip(self, declarations), fields(count = declarations.len()))]
    pub async fn apply_batch_now(
        &self,
        declarations: &[DocumentDeclaration],
    ) -> Result<BulkSummary, BatcherError> {
        self.ensure_open().await?;
        if declarations.is_empty() {
            return Ok(BulkSummary::default());
        }
        declarations.iter().try_for_each(validate)?;

        let client = &self.client;
        let timeout = self.config.flush_timeout;
        let summary = retry_once(self.config.retry_delay, "bulk", || {
            client.bulk(declarations, timeout)
        })
        .await?;

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Batch applied"
        );
        Ok(summary)
    }

    /// Shut down: stop accepting declarations, flush everything queued and
    /// move to `Closed`.
    ///
    /// If the worker never started the drain runs on the caller's task.
    /// Calling this again after shutdown is a no-op.
    pub async fn close(&self) -> Result<(), BatcherError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != BatcherState::Running {
            return Ok(());
        }
        lifecycle.state = BatcherState::Draining;
        info!("Bulk batcher draining");

        let worker = lifecycle.worker.take();
        let receiver = lifecycle.receiver.take();
        drop(lifecycle);

        match (worker, receiver) {
            (Some(worker), _) => {
                let _ = self.shutdown_tx.send(());
                if let Err(e) = worker.await {
                    error!(error = %e, "Bulk batcher worker failed");
                    mark_closed(&self.lifecycle).await;
                    return Err(BatcherError::worker(e.to_string()));
                }
            }
            (None, Some(receiver)) => {
                let mut buffer = PendingBuffer::new(self.config.batch_size);
                drain(&mut buffer, receiver, self.client.as_ref(), &self.config).await;
                mark_closed(&self.lifecycle).await;
            }
            (None, None) => mark_closed(&self.lifecycle).await,
        }
        Ok(())
    }

    async fn ensure_open(&self) -> Result<(), BatcherError> {
        match self.state().await {
            BatcherState::Closed => Err(BatcherError::Closed),
            _ => Ok(()),
        }
    }
}

fn validate(declaration: &DocumentDeclaration) -> Result<(), BatcherError> {
    match declaration.missing_field() {
        Some(field) => {
            Err(SearchError::invalid_input(format!("declaration is missing {}", field)).into())
        }
        None => Ok(()),
    }
}

/// Receive everything still queued, then force a final flush.
async fn drain(
    buffer: &mut PendingBuffer,
    mut receiver: mpsc::Receiver<DocumentDeclaration>,
    client: &dyn SearchEngineClient,
    config: &BatcherConfig,
) {
    receiver.close();
    while let Some(declaration) = receiver.recv().await {
        if buffer.push(declaration) {
            buffer.flush(client, config).await;
        }
    }
    buffer.flush(client, config).await;
}

async fn mark_closed(lifecycle: &Mutex<Lifecycle>) {
    let mut lifecycle = lifecycle.lock().await;
    lifecycle.state = BatcherState::Closed;
    lifecycle.sender = None;
    info!("Bulk batcher closed");
}

/// Background task that owns the pending buffer.
struct Worker {
    client: Arc<dyn SearchEngineClient>,
    config: BatcherConfig,
    lifecycle: Arc<Mutex<Lifecycle>>,
    buffer: PendingBuffer,
}

impl Worker {
    async fn run(
        mut self,
        mut receiver: mpsc::Receiver<DocumentDeclaration>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let period = self.config.flush_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(pending = self.buffer.len(), "Received shutdown signal");
                    break;
                }
                received = receiver.recv() => {
                    match received {
                        Some(declaration) => {
                            if self.buffer.push(declaration) {
                                self.buffer.flush(self.client.as_ref(), &self.config).await;
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    self.buffer.flush(self.client.as_ref(), &self.config).await;
                }
            }
        }

        drain(&mut self.buffer, receiver, self.client.as_ref(), &self.config).await;
        mark_closed(&self.lifecycle).await;
    }
}
