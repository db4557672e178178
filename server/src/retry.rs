use std::{future::Future, time::Duration};

use rocket::tokio::time::{sleep, timeout};
use tracing::warn;

/// Bounded retries with exponential backoff and a timeout per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(timeout: Duration, retries: u32) -> Self {
        Self {
            timeout,
            retries,
            ..Default::default()
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Runs `operation` until it succeeds or the retries are spent. An attempt
    /// that outlives the timeout is dropped and counts as a failure.
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let result = match timeout(self.timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("timed out after {:?}", self.timeout)),
            };
            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retries => {
                    let delay = self.delay(attempt);
                    warn!(
                        "{what} failed on attempt {}: {e:#}, retrying in {delay:?}",
                        attempt + 1
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e.context(format!("{what} failed after {} attempts", attempt + 1)))
                }
            }
        }
    }
}
