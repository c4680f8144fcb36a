// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-endpoint circuit breakers on top of `recloser`.
//!
//! A node that keeps refusing connections trips its breaker; while the
//! breaker is open, requests routed to it are rejected without touching
//! the network, and the transport moves on to the next node.
//!
//! ```text
//!   Closed ──(failures ≥ threshold)──► Open ──(recovery_timeout)──► HalfOpen
//!     ▲                                                                │
//!     └──────────────(success_threshold trials succeed)────────────────┘
//! ```
//!
//! Only the transport result counts: an HTTP 409 or 404 is a healthy node
//! answering, so it never counts toward the threshold.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use recloser::{AsyncRecloser, Error as RecloserError, Recloser};
use tracing::{debug, warn};

use crate::metrics;

#[derive(Debug, thiserror::Error)]
pub enum CircuitError<E> {
    /// The breaker is open; the request was never sent
    #[error("circuit '{circuit}' open, request rejected")]
    Rejected { circuit: String },

    #[error("{0}")]
    Inner(E),
}

#[derive(Debug, Clone)]
pub struct CircuitConfig {
    /// Failed requests in the closed window that trip the breaker
    pub failure_threshold: u32,
    /// Successful trial requests needed while half-open to close again
    pub success_threshold: u32,
    /// Time spent open before trying the node again
    pub recovery_timeout: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitConfig {
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            failure_threshold: 2,
            success_threshold: 1,
            recovery_timeout: Duration::from_millis(50),
        }
    }
}

/// Point-in-time counters of one breaker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CircuitStats {
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub rejections: u64,
}

impl CircuitStats {
    /// Share of calls that reached the node and failed (0.0 - 1.0)
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.failures as f64 / self.calls as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    calls: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    rejections: AtomicU64,
}

pub struct CircuitBreaker {
    name: String,
    recloser: AsyncRecloser,
    counters: Counters,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitConfig) -> Self {
        let recloser = Recloser::custom()
            .error_rate(config.failure_threshold as f32 / 100.0)
            .closed_len(config.failure_threshold as usize)
            .half_open_len(config.success_threshold as usize)
            .open_wait(config.recovery_timeout)
            .build();

        Self {
            name: name.into(),
            recloser: recloser.into(),
            counters: Counters::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `request` unless the breaker is open.
    pub async fn call<F, Fut, T, E>(&self, request: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.counters.calls.fetch_add(1, Ordering::Relaxed);

        let (outcome, result) = match self.recloser.call(request()).await {
            Ok(value) => {
                self.counters.successes.fetch_add(1, Ordering::Relaxed);
                ("success", Ok(value))
            }
            Err(RecloserError::Rejected) => {
                self.counters.rejections.fetch_add(1, Ordering::Relaxed);
                warn!(circuit = %self.name, "Node circuit open, skipping request");
                (
                    "rejected",
                    Err(CircuitError::Rejected {
                        circuit: self.name.clone(),
                    }),
                )
            }
            Err(RecloserError::Inner(e)) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                debug!(circuit = %self.name, "Request to node failed");
                ("failure", Err(CircuitError::Inner(e)))
            }
        };

        metrics::record_circuit_breaker_call(&self.name, outcome);
        result
    }

    #[must_use]
    pub fn stats(&self) -> CircuitStats {
        CircuitStats {
            calls: self.counters.calls.load(Ordering::Relaxed),
            successes: self.counters.successes.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            rejections: self.counters.rejections.load(Ordering::Relaxed),
        }
    }
}

/// Breakers for every configured endpoint, in configuration order
pub struct EndpointCircuits {
    circuits: Vec<(String, CircuitBreaker)>,
}

impl EndpointCircuits {
    pub fn new(endpoints: &[String], config: &CircuitConfig) -> Self {
        let circuits = endpoints
            .iter()
            .map(|endpoint| {
                let breaker = CircuitBreaker::new(format!("endpoint:{}", endpoint), config.clone());
                (endpoint.clone(), breaker)
            })
            .collect();
        Self { circuits }
    }

    pub fn get(&self, endpoint: &str) -> Option<&CircuitBreaker> {
        self.circuits
            .iter()
            .find_map(|(e, breaker)| (e == endpoint).then_some(breaker))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }

    pub fn stats(&self) -> Vec<(String, CircuitStats)> {
        self.circuits
            .iter()
            .map(|(endpoint, breaker)| (endpoint.clone(), breaker.stats()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    type Sent = Result<u16, CircuitError<TransportError>>;

    fn refused() -> Result<u16, TransportError> {
        Err(TransportError::Connection("connection refused".into()))
    }

    #[tokio::test]
    async fn test_healthy_node_passes_through() {
        let breaker = CircuitBreaker::new("endpoint:http://a:9200", CircuitConfig::test());

        let sent: Sent = breaker.call(|| async { Ok(200) }).await;

        assert_eq!(sent.unwrap(), 200);
        assert_eq!(
            breaker.stats(),
            CircuitStats {
                calls: 1,
                successes: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_transport_error_is_passed_back() {
        let breaker = CircuitBreaker::new("endpoint:http://a:9200", CircuitConfig::test());

        let sent: Sent = breaker.call(|| async { refused() }).await;

        assert!(matches!(sent, Err(CircuitError::Inner(TransportError::Connection(_)))));
        assert_eq!(breaker.stats().failures, 1);
    }

    #[tokio::test]
    async fn test_dead_node_trips_breaker() {
        let config = CircuitConfig {
            failure_threshold: 2,
            success_threshold: 1,
            recovery_timeout: Duration::from_secs(60),
        };
        let breaker = CircuitBreaker::new("endpoint:http://dead:9200", config);

        for _ in 0..3 {
            let _: Sent = breaker.call(|| async { refused() }).await;
        }
        let _: Sent = breaker.call(|| async { Ok(200) }).await;

        // recloser's ring buffer decides the exact trip point
        let stats = breaker.stats();
        assert!(stats.failures >= 2 || stats.rejections >= 1);
    }

    #[tokio::test]
    async fn test_failure_rate() {
        let config = CircuitConfig {
            failure_threshold: 100,
            ..CircuitConfig::test()
        };
        let breaker = CircuitBreaker::new("endpoint:http://flaky:9200", config);

        let _: Sent = breaker.call(|| async { Ok(200) }).await;
        let _: Sent = breaker.call(|| async { refused() }).await;
        let _: Sent = breaker.call(|| async { Ok(201) }).await;
        let _: Sent = breaker.call(|| async { refused() }).await;

        assert!((breaker.stats().failure_rate() - 0.5).abs() < 0.01);
        assert_eq!(CircuitStats::default().failure_rate(), 0.0);
    }

    #[test]
    fn test_rejection_names_the_circuit() {
        let err: CircuitError<TransportError> = CircuitError::Rejected {
            circuit: "endpoint:http://a:9200".into(),
        };
        assert_eq!(err.to_string(), "circuit 'endpoint:http://a:9200' open, request rejected");
    }

    #[tokio::test]
    async fn test_one_breaker_per_endpoint() {
        let endpoints = vec!["http://a:9200".to_string(), "http://b:9200".to_string()];
        let circuits = EndpointCircuits::new(&endpoints, &CircuitConfig::test());

        assert_eq!(circuits.len(), 2);
        assert!(circuits.get("http://c:9200").is_none());

        let a = circuits.get("http://a:9200").unwrap();
        assert_eq!(a.name(), "endpoint:http://a:9200");
        let _: Sent = a.call(|| async { Ok(200) }).await;

        let stats = circuits.stats();
        assert_eq!(stats[0].0, "http://a:9200");
        assert_eq!(stats[0].1.calls, 1);
        assert_eq!(stats[1].1, CircuitStats::default());
    }
}
