//! Configuration types for the engine client.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default engine address.
pub const DEFAULT_ENGINE_URL: &str = "http://localhost:9200";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Wire protocol generation spoken by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineProtocol {
    /// Engines that still address documents by `/{index}/{type}/{id}` (6.x).
    Typed,
    /// Engines without per-document types (7.x and OpenSearch).
    #[default]
    Typeless,
}

impl fmt::Display for EngineProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineProtocol::Typed => f.write_str("typed"),
            EngineProtocol::Typeless => f.write_str("typeless"),
        }
    }
}

impl FromStr for EngineProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "typed" | "legacy" | "6" => Ok(EngineProtocol::Typed),
            "typeless" | "7" | "opensearch" => Ok(EngineProtocol::Typeless),
            other => Err(format!("unknown engine protocol: {}", other)),
        }
    }
}

/// Basic-auth credentials for the engine.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration for connecting to the search engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine node URLs. More than one enables the round-robin pool.
    pub addresses: Vec<String>,
    /// Periodically re-seed the node pool from the cluster.
    pub sniff: bool,
    /// Timeout applied to every request unless the call sets its own.
    pub request_timeout: Duration,
    /// Optional basic-auth credentials.
    pub credentials: Option<BasicAuth>,
    /// Optional outbound proxy (`host:port` or a full URL).
    pub proxy: Option<String>,
    /// Protocol generation used to build request paths.
    pub protocol: EngineProtocol,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            addresses: vec![DEFAULT_ENGINE_URL.to_string()],
            sniff: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            credentials: None,
            proxy: None,
            protocol: EngineProtocol::default(),
        }
    }
}

impl EngineConfig {
    /// Create a config for the given node URLs with default settings.
    pub fn with_addresses(addresses: Vec<String>) -> Self {
        Self {
            addresses,
            ..Self::default()
        }
    }

    /// Set basic-auth credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(BasicAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Set the protocol generation.
    pub fn with_protocol(mut self, protocol: EngineProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the per-request timeout. A zero duration keeps the default.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.request_timeout = timeout;
        }
        self
    }
}
