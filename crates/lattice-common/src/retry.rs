//! Retry with exponential backoff and jitter.
//!
//! The reconciliation core never retries on its own. Actuators wrap a whole
//! pass (read observed state, decide, apply) in [`retry_transient`] so each
//! attempt recomputes its plan from current provider state.
//!
//! # Example
//!
//! ```ignore
//! use lattice_common::retry::{retry_transient, RetryConfig};
//!
//! let summary = retry_transient(
//!     &RetryConfig::with_max_attempts(5),
//!     "reconcile bastion ingress",
//!     || reconcile_target(client.as_ref(), &target, &desired),
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

use crate::Error;

/// Backoff settings for provider calls that may fail transiently.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Attempts before giving up (0 = keep trying)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Default delays with a bounded number of attempts
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..Default::default()
        }
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts > 0 && attempt >= self.max_attempts
    }

    /// Un-jittered delay after the given (1-based) failed attempt
    fn base_delay(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exp);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64())).min(self.max_delay)
    }
}

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    /// Whether asking again may give a different answer
    fn is_retryable(&self) -> bool;
}

impl Retryable for Error {
    fn is_retryable(&self) -> bool {
        Error::is_retryable(self)
    }
}

/// Run an async operation, retrying transient failures with backoff.
///
/// Errors whose [`Retryable::is_retryable`] is false are returned after the
/// attempt that produced them. Each delay is the exponential backoff for
/// that attempt, capped at `max_delay` and scaled by a random factor in
/// `0.5..1.5`.
pub async fn retry_transient<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display + Retryable,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let e = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if !e.is_retryable() {
            warn!(
                operation = %operation_name,
                attempt = attempt,
                error = %e,
                "Operation failed with non-retryable error"
            );
            return Err(e);
        }
        if config.exhausted(attempt) {
            error!(
                operation = %operation_name,
                attempt = attempt,
                error = %e,
                "Operation failed after max attempts"
            );
            return Err(e);
        }

        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let delay = config.base_delay(attempt).mul_f64(jitter);
        warn!(
            operation = %operation_name,
            attempt = attempt,
            error = %e,
            delay_ms = delay.as_millis(),
            "Operation failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
