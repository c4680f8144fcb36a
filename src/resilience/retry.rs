// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Backoff policy for engine requests.
//!
//! ```text
//! attempt 1 ──fail──► sleep(initial) ──► attempt 2 ──fail──► sleep(initial × factor)
//!     ... until an attempt succeeds, the error is permanent, or attempts run out
//! ```
//!
//! The HTTP transport retries only what [`TransportError::is_retryable_for`]
//! accepts for the request; engine answers such as 409 or 404 come back on
//! the first try, and writes that may have been applied are not resent.
//!
//! [`TransportError::is_retryable_for`]: crate::transport::TransportError::is_retryable_for
//!
//! ```
//! use search_odm::RetryConfig;
//!
//! let boot = RetryConfig::startup();
//! assert_eq!(boot.max_retries, Some(10));
//!
//! let delays: Vec<_> = RetryConfig::query().delays().collect();
//! assert_eq!(delays.len(), 2);
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    /// Attempts including the first one; `None` keeps going until success
    pub max_retries: Option<usize>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::query()
    }
}

impl RetryConfig {
    /// Waiting for a node that is still booting: ten attempts, about half a minute.
    #[must_use]
    pub fn startup() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            factor: 2.0,
            max_retries: Some(10),
        }
    }

    /// Per-request policy: three attempts, then the caller sees the error.
    #[must_use]
    pub fn query() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
            max_retries: Some(3),
        }
    }

    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            factor: 2.0,
            max_retries: Some(3),
        }
    }

    /// The sleeps between attempts, in order.
    ///
    /// Unbounded when `max_retries` is `None`.
    pub fn delays(&self) -> Backoff {
        Backoff {
            next: self.initial_delay,
            max_delay: self.max_delay,
            factor: self.factor,
            remaining: self.max_retries.map(|n| n.saturating_sub(1)),
        }
    }
}

/// Iterator over backoff delays
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max_delay: Duration,
    factor: f64,
    remaining: Option<usize>,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        let current = self.next.min(self.max_delay);
        self.next = current.mul_f64(self.factor).min(self.max_delay);
        Some(current)
    }
}

/// Run `request` until it succeeds or the policy is exhausted.
pub async fn retry<F, Fut, T, E>(label: &str, config: &RetryConfig, request: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_when(label, config, request, |_| true).await
}

/// Like [`retry`], but errors rejected by `retryable` are returned at once.
pub async fn retry_when<F, Fut, T, E, P>(
    label: &str,
    config: &RetryConfig,
    mut request: F,
    retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut delays = config.delays();
    let mut attempt = 1usize;

    loop {
        let err = match request().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(request = %label, attempt, "Engine request recovered");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !retryable(&err) {
            return Err(err);
        }
        let Some(delay) = delays.next() else {
            warn!(request = %label, attempts = attempt, error = %err, "Giving up on engine request");
            return Err(err);
        };

        warn!(
            request = %label,
            attempt,
            max_attempts = ?config.max_retries,
            backoff_ms = delay.as_millis() as u64,
            error = %err,
            "Engine request failed, backing off"
        );
        sleep(delay).await;
        attempt += 1;
    }
}
