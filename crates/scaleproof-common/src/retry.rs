//! Backoff for reaching the cluster.
//!
//! Only the initial connection retries. Inside the scenario engine transient
//! errors surface to the caller, and the poller owns its fixed-interval budget.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

use crate::Error;

/// How many times to try, and how long to back off in between.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first; never less than 1
    pub max_attempts: u32,
    /// Pause after the first failure
    pub base_delay: Duration,
    /// Ceiling for any single pause
    pub max_delay: Duration,
    /// Pause growth per failure
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Default backoff bounded to `attempts` tries
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..Default::default()
        }
    }

    /// Nominal pause before attempt `attempt + 1`, before jitter
    fn nominal_delay(&self, attempt: u32) -> Duration {
        let exp = self.factor.powi(attempt.saturating_sub(1) as i32);
        let secs = (self.base_delay.as_secs_f64() * exp).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Retry `operation` while it fails with a retryable [`Error`].
///
/// Stops early on errors such as validation failures or 4xx responses, which
/// another attempt cannot fix. Returns the last error otherwise.
pub async fn retry_with_backoff<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let budget = config.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let e = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !e.is_retryable() || attempt >= budget {
            error!(operation = %operation_name, attempt, error = %e, "giving up");
            return Err(e);
        }

        let pause = config
            .nominal_delay(attempt)
            .mul_f64(rand::thread_rng().gen_range(0.5..1.5));
        warn!(
            operation = %operation_name,
            attempt,
            error = %e,
            pause_ms = pause.as_millis() as u64,
            "attempt failed, backing off"
        );
        tokio::time::sleep(pause).await;
    }
}
