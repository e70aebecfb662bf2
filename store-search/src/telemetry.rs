//! Tracing subscriber setup.

use std::env;

use tracing_subscriber::EnvFilter;

use crate::StoreSearchError;

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` (default `info`). `LOG_FORMAT=json`
/// switches to the JSON formatter.
pub fn init_tracing() -> Result<(), StoreSearchError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if is_json_format(env::var("LOG_FORMAT").ok().as_deref()) {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| StoreSearchError::config(format!("Failed to initialize tracing: {}", e)))
}

fn is_json_format(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.trim().eq_ignore_ascii_case("json"))
}
