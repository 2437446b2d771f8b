use std::future::Future;
use std::time::Duration;

use crate::providers::ProviderError;
use crate::reservations::OperationKind;

/// Bounded retry with exponential backoff and jitter for provider calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry_attempt` (0-based)
    pub fn backoff_for(&self, retry_attempt: u32) -> Duration {
        let base_ms = (self.initial_backoff.as_millis() as f64
            * self.multiplier.powf(retry_attempt as f64))
        .min(self.max_backoff.as_millis() as f64);

        let jitter = rand::random::<f64>() * self.jitter_factor * base_ms;
        let backoff_ms = base_ms * (1.0 - self.jitter_factor / 2.0) + jitter;

        Duration::from_millis(backoff_ms as u64)
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    /// Whether a failure is retried depends on `operation`.
    pub async fn run<F, Fut, T>(
        &self,
        provider: &str,
        operation: OperationKind,
        mut call: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable(operation) && attempt < max_attempts => {
                    let delay = self.backoff_for(attempt - 1);
                    tracing::warn!(
                        provider,
                        %operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Provider call failed, retrying: {}",
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
