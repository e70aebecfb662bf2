//! Dependency initialization and wiring for the store search client.

use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::StoreSearchError;
use store_search_pipeline::BulkBatcher;
use store_search_repository::{OpenSearchClient, SearchEngineClient, SearchExecutor};

/// Container for all initialized dependencies.
///
/// The executor and the batcher share one engine client.
pub struct Dependencies {
    /// Read side: searches, id lookups and scrolls.
    pub executor: SearchExecutor,
    /// Write side, with its background worker already running.
    pub batcher: BulkBatcher,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`Settings::from_env`] for the variables read.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(StoreSearchError)` - If configuration is invalid or the engine
    ///   is unreachable or unhealthy
    pub async fn new() -> Result<Self, StoreSearchError> {
        let settings = Settings::from_env()?;

        info!(
            addresses = ?settings.engine.addresses,
            protocol = %settings.engine.protocol,
            valid_regions = ?settings.valid_regions,
            "Initializing dependencies"
        );

        let search_client = OpenSearchClient::new(&settings.engine)
            .await
            .map_err(|e| {
                StoreSearchError::config(format!("Failed to create OpenSearch client: {}", e))
            })?;

        // Verify the engine is reachable
        let healthy = search_client
            .health_check()
            .await
            .map_err(|e| {
                StoreSearchError::config(format!("OpenSearch health check failed: {}", e))
            })?;

        if !healthy {
            return Err(StoreSearchError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        Self::with_client(settings, Arc::new(search_client)).await
    }

    /// Wire the executor and batcher around an existing client and start
    /// the batcher.
    pub async fn with_client(
        settings: Settings,
        client: Arc<dyn SearchEngineClient>,
    ) -> Result<Self, StoreSearchError> {
        let executor =
            SearchExecutor::new(Arc::clone(&client), settings.routes, settings.valid_regions);
        let batcher = BulkBatcher::with_config(client, settings.batcher);
        batcher.run().await?;

        Ok(Self { executor, batcher })
    }

    /// Flush pending writes and stop the batcher.
    pub async fn shutdown(&self) -> Result<(), StoreSearchError> {
        self.batcher.close().await?;
        info!("Store search shut down");
        Ok(())
    }

    /// Wait for Ctrl-C, then shut down.
    pub async fn shutdown_on_signal(&self) -> Result<(), StoreSearchError> {
        tokio::signal::ctrl_c().await?;
        info!("Received shutdown signal");
        self.shutdown().await
    }
}
