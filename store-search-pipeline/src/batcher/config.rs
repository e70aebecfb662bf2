use std::time::Duration;

/// Configuration for the bulk batcher.
#[derive(Debug, Clone, PartialEq)]
pub struct BatcherConfig {
    /// Pending declarations that trigger an immediate flush. Also the
    /// capacity of the inbound channel.
    pub batch_size: usize,
    /// Time between timer flushes.
    pub flush_interval: Duration,
    /// Deadline for a single bulk request.
    pub flush_timeout: Duration,
    /// Wait before the single retry of a failed write.
    pub retry_delay: Duration,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            flush_interval: Duration::from_secs(10),
            flush_timeout: Duration::from_secs(300),
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl BatcherConfig {
    /// Set the batch size. Zero keeps the current value.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        if batch_size > 0 {
            self.batch_size = batch_size;
        }
        self
    }

    /// Set the flush interval. A zero duration keeps the current value.
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.flush_interval = interval;
        }
        self
    }

    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.flush_timeout = timeout;
        }
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}
