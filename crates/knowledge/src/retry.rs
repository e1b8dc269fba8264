//! Timeout and retry budget for external calls.

use bookrag_core::config::RetrySettings;
use bookrag_core::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Per-attempt timeout plus capped exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    timeout: Duration,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff,
            timeout,
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_millis(settings.initial_backoff_ms),
            Duration::from_millis(settings.max_backoff_ms),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep before retrying after the `failed_attempts`-th failure.
    pub fn backoff_for(&self, failed_attempts: u32) -> Duration {
        let factor = 2u32.saturating_pow(failed_attempts.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Run `call` until it succeeds or the attempt budget is spent.
    ///
    /// On exhaustion the last failure is returned, prefixed with the
    /// operation name and attempt count.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match tokio::time::timeout(self.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = format!("timed out after {:?}", self.timeout),
            }

            if attempt < self.max_attempts {
                let backoff = self.backoff_for(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts = self.max_attempts,
                    error = %last_error,
                    "Attempt failed, retrying in {:?}",
                    backoff
                );
                tokio::time::sleep(backoff).await;
            }
        }

        Err(AppError::Other(format!(
            "{} failed after {} attempts: {}",
            operation, self.max_attempts, last_error
        )))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}
