//! Settings loaded from the process environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;
use store_search_pipeline::BatcherConfig;
use store_search_repository::config::DEFAULT_ENGINE_URL;
use store_search_repository::{EngineConfig, EngineProtocol, IndexRoute, IndexRoutes};
use store_search_shared::EntityKind;

use crate::StoreSearchError;

/// Everything needed to build the store search dependencies.
#[derive(Debug, Clone)]
pub struct Settings {
    pub engine: EngineConfig,
    pub batcher: BatcherConfig,
    pub routes: IndexRoutes,
    /// Regions a region-less lookup fans out over.
    pub valid_regions: Vec<i32>,
}

impl Settings {
    /// Load settings from the environment, reading `.env` first if present.
    ///
    /// # Environment Variables
    ///
    /// - `SEARCH_ENGINE_URLS`: Comma-separated node URLs (default: http://localhost:9200)
    /// - `SEARCH_ENGINE_SNIFF`: Re-seed the node pool periodically (default: false)
    /// - `SEARCH_ENGINE_TIMEOUT_MS`: Per-request timeout (default: 15000)
    /// - `SEARCH_ENGINE_USERNAME` / `SEARCH_ENGINE_PASSWORD`: Basic auth
    /// - `SEARCH_ENGINE_PROXY`: Outbound proxy
    /// - `SEARCH_ENGINE_PROTOCOL`: `typed` or `typeless` (default: typeless)
    /// - `BULK_BATCH_SIZE`: Declarations per flush (default: 500)
    /// - `BULK_FLUSH_INTERVAL_SECS`: Timer flush period (default: 10)
    /// - `VALID_REGIONS`: Comma-separated region ids (default: none)
    /// - `SEARCH_INDEX_<KIND>`: Route override as `index[/type]`, e.g.
    ///   `SEARCH_INDEX_TRACK` or `SEARCH_INDEX_INTERVIEW_VIDEO`
    /// - `SEARCH_REGIONAL_SUFFIX`: Suffix of the regional indices (default:
    ///   `_th`; empty disables regional searches)
    pub fn from_env() -> Result<Self, StoreSearchError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StoreSearchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let addresses = value("SEARCH_ENGINE_URLS")
            .map(|urls| split_list(&urls))
            .unwrap_or_else(|| vec![DEFAULT_ENGINE_URL.to_string()]);
        if addresses.is_empty() {
            return Err(StoreSearchError::config("SEARCH_ENGINE_URLS has no addresses"));
        }

        let protocol: EngineProtocol = parse_or(
            value("SEARCH_ENGINE_PROTOCOL"),
            "SEARCH_ENGINE_PROTOCOL",
            EngineProtocol::default(),
        )?;
        let timeout_ms: u64 =
            parse_or(value("SEARCH_ENGINE_TIMEOUT_MS"), "SEARCH_ENGINE_TIMEOUT_MS", 0)?;

        let mut engine = EngineConfig::with_addresses(addresses)
            .with_protocol(protocol)
            .with_request_timeout(Duration::from_millis(timeout_ms));
        engine.sniff = parse_or(value("SEARCH_ENGINE_SNIFF"), "SEARCH_ENGINE_SNIFF", false)?;
        engine.proxy = value("SEARCH_ENGINE_PROXY");
        if let Some(username) = value("SEARCH_ENGINE_USERNAME") {
            let password = value("SEARCH_ENGINE_PASSWORD").unwrap_or_default();
            engine = engine.with_credentials(username, password);
        }

        let batch_size: usize = parse_or(value("BULK_BATCH_SIZE"), "BULK_BATCH_SIZE", 0)?;
        let flush_secs: u64 =
            parse_or(value("BULK_FLUSH_INTERVAL_SECS"), "BULK_FLUSH_INTERVAL_SECS", 0)?;
        let batcher = BatcherConfig::default()
            .with_batch_size(batch_size)
            .with_flush_interval(Duration::from_secs(flush_secs));

        let valid_regions = value("VALID_REGIONS")
            .map(|regions| {
                split_list(&regions)
                    .iter()
                    .map(|region| {
                        region.parse::<i32>().map_err(|e| {
                            StoreSearchError::config(format!(
                                "VALID_REGIONS entry '{}': {}",
                                region, e
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let mut routes = IndexRoutes::for_protocol(protocol);
        for kind in EntityKind::ALL {
            let key = format!("SEARCH_INDEX_{}", kind.as_str().to_ascii_uppercase());
            if let Some(raw) = value(&key) {
                let route = IndexRoute::parse(&raw)
                    .map_err(|e| StoreSearchError::config(format!("{}: {}", key, e)))?;
                routes = routes.with_route(kind, route);
            }
        }
        if let Some(suffix) = lookup("SEARCH_REGIONAL_SUFFIX") {
            routes = routes.with_regional_suffix(Some(suffix.trim().to_string()));
        }

        Ok(Self {
            engine,
            batcher,
            routes,
            valid_regions,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, StoreSearchError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|e| StoreSearchError::config(format!("{} '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}
