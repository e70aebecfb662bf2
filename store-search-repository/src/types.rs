//! Result types for bulk write operations.

use serde_json::Value;

/// A single document that the engine refused inside an accepted bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemFailure {
    /// Document id of the failed item.
    pub id: String,
    /// HTTP status reported for the item.
    pub status: u16,
    /// Engine-provided reason.
    pub reason: String,
}

/// Summary of a bulk request.
///
/// A bulk request that the engine accepts can still reject individual items;
/// those are counted here rather than failing the whole request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkSummary {
    /// Number of actions submitted.
    pub total: usize,
    /// Number of actions the engine applied.
    pub succeeded: usize,
    /// Number of actions the engine rejected.
    pub failed: usize,
    /// Details of rejected actions.
    pub failures: Vec<BulkItemFailure>,
}

impl BulkSummary {
    /// Summary for a batch that was applied in full.
    pub fn all_succeeded(total: usize) -> Self {
        Self {
            total,
            succeeded: total,
            failed: 0,
            failures: Vec::new(),
        }
    }

    /// Build a summary from a bulk response body.
    ///
    /// Each entry of `items` is keyed by its action (`update`, `delete`,
    /// ...). An item counts as failed when it carries an `error`; a delete of
    /// a missing document reports 404 without an error and counts as applied.
    pub fn from_response(body: &Value, total: usize) -> Self {
        let failures: Vec<BulkItemFailure> = body
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_object()?.values().next())
                    .filter_map(|result| {
                        let error = result.get("error")?;
                        Some(BulkItemFailure {
                            id: result
                                .get("_id")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                            status: result
                                .get("status")
                                .and_then(Value::as_u64)
                                .and_then(|s| u16::try_from(s).ok())
                                .unwrap_or_default(),
                            reason: error
                                .get("reason")
                                .and_then(Value::as_str)
                                .map(str::to_string)
                                .unwrap_or_else(|| error.to_string()),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let failed = failures.len().min(total);
        Self {
            total,
            succeeded: total - failed,
            failed,
            failures,
        }
    }

    /// Whether every submitted action was applied.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}
