use std::future::Future;
use std::time::Duration;

/// Default pause after a failed reconnect.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Pause taken by the delivery worker after the store refused both a write
/// and the reconnect that followed it.
pub trait Backoff: Send + Sync {
    fn pause(&self) -> impl Future<Output = ()> + Send;
}

/// Fixed interval, no jitter, no growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBackoff {
    interval: Duration,
}

impl ConstantBackoff {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for ConstantBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_INTERVAL)
    }
}

impl Backoff for ConstantBackoff {
    async fn pause(&self) {
        tokio::time::sleep(self.interval).await;
    }
}
