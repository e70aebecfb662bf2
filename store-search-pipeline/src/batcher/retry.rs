use std::future::Future;
use std::time::Duration;

use store_search_repository::SearchError;
use tracing::{info, warn};

/// Run `op`, and if it fails with an engine error run it exactly once more
/// after `delay`.
///
/// Invalid input and not-found results are returned without a retry.
pub(crate) async fn retry_once<T, F, Fut>(
    delay: Duration,
    op_name: &str,
    mut op: F,
) -> Result<T, SearchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SearchError>>,
{
    match op().await {
        Err(e) if e.is_engine_error() => {
            warn!(
                op = op_name,
                delay_ms = delay.as_millis() as u64,
                error = %e,
                "Write failed, retrying once"
            );
            tokio::time::sleep(delay).await;
            let result = op().await;
            if result.is_ok() {
                info!(op = op_name, "Write succeeded after retry");
            }
            result
        }
        result => result,
    }
}
