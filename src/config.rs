// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the search operations layer.
//!
//! # Example
//!
//! ```
//! use search_odm::SearchOdmConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SearchOdmConfig::default();
//! assert_eq!(config.endpoints, vec!["http://localhost:9200".to_string()]);
//!
//! // Full config
//! let config = SearchOdmConfig {
//!     endpoints: vec!["https://search-1:9200".into(), "https://search-2:9200".into()],
//!     username: Some("elastic".into()),
//!     password: Some("changeme".into()),
//!     index_prefix: Some("staging-".into()),
//!     request_timeout_ms: 5_000,
//!     ..Default::default()
//! };
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::OdmError;
use crate::mapping::FieldNamingStrategy;
use crate::operations::RefreshPolicy;
use crate::resilience::circuit_breaker::CircuitConfig;
use crate::resilience::retry::RetryConfig;

/// Configuration for [`SearchOperations`](crate::SearchOperations) and the
/// HTTP transport.
///
/// All fields have defaults suitable for a local single-node engine.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchOdmConfig {
    /// Engine base URLs, tried round-robin with failover.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Basic auth credentials
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,

    /// Pre-encoded API key, sent as `Authorization: ApiKey <key>`.
    /// Takes precedence over basic auth.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Path prefix when the engine sits behind a reverse proxy (e.g. "/es")
    #[serde(default)]
    pub path_prefix: Option<String>,

    /// Prefix prepended to every entity index name (e.g. "staging-")
    #[serde(default)]
    pub index_prefix: Option<String>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Headers added to every request
    #[serde(default)]
    pub default_headers: HashMap<String, String>,

    /// Naming strategy for properties without an explicit field name
    #[serde(default)]
    pub field_naming: FieldNamingStrategy,

    /// Refresh policy for writes when the call doesn't specify one
    #[serde(default)]
    pub refresh_policy: RefreshPolicy,

    /// Scroll context keep-alive used by streaming searches
    #[serde(default = "default_scroll_keep_alive_ms")]
    pub scroll_keep_alive_ms: u64,

    /// Page size used when a query has no explicit pageable
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Upper bound for `from + size` before the engine rejects a search
    #[serde(default = "default_max_result_window")]
    pub max_result_window: usize,

    /// Transport retry settings
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: usize,
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,

    /// Circuit breaker settings
    #[serde(default = "default_circuit_failure_threshold")]
    pub circuit_failure_threshold: u32,
    #[serde(default = "default_circuit_recovery_timeout_ms")]
    pub circuit_recovery_timeout_ms: u64,
}

fn default_endpoints() -> Vec<String> { vec!["http://localhost:9200".to_string()] }
fn default_connect_timeout_ms() -> u64 { 10_000 }
fn default_request_timeout_ms() -> u64 { 30_000 }
fn default_scroll_keep_alive_ms() -> u64 { 60_000 } // 1 minute
fn default_page_size() -> usize { 10 }
fn default_max_result_window() -> usize { 10_000 }
fn default_retry_max_attempts() -> usize { 3 }
fn default_retry_initial_delay_ms() -> u64 { 100 }
fn default_circuit_failure_threshold() -> u32 { 5 }
fn default_circuit_recovery_timeout_ms() -> u64 { 30_000 }

impl Default for SearchOdmConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            username: None,
            password: None,
            api_key: None,
            path_prefix: None,
            index_prefix: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            default_headers: HashMap::new(),
            field_naming: FieldNamingStrategy::default(),
            refresh_policy: RefreshPolicy::default(),
            scroll_keep_alive_ms: default_scroll_keep_alive_ms(),
            default_page_size: default_page_size(),
            max_result_window: default_max_result_window(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            circuit_failure_threshold: default_circuit_failure_threshold(),
            circuit_recovery_timeout_ms: default_circuit_recovery_timeout_ms(),
        }
    }
}

impl SearchOdmConfig {
    /// Parse a JSON configuration document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, OdmError> {
        let config: Self = serde_json::from_str(json)?;
        if config.endpoints.is_empty() {
            return Err(OdmError::InvalidConfig("at least one endpoint is required".into()));
        }
        Ok(config)
    }

    /// Scroll keep-alive as a [`Duration`]
    pub fn scroll_keep_alive(&self) -> Duration {
        Duration::from_millis(self.scroll_keep_alive_ms)
    }

    /// Retry policy for individual requests
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: Some(self.retry_max_attempts.max(1)),
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            ..RetryConfig::query()
        }
    }

    /// Circuit breaker settings for the HTTP transport
    pub fn circuit_config(&self) -> CircuitConfig {
        CircuitConfig {
            failure_threshold: self.circuit_failure_threshold,
            recovery_timeout: Duration::from_millis(self.circuit_recovery_timeout_ms),
            ..CircuitConfig::default()
        }
    }

    /// Apply the configured prefix to an index name.
    ///
    /// Names that already carry the prefix are left alone.
    pub fn prefixed_index(&self, name: &str) -> String {
        match self.index_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() && !name.starts_with(prefix) => {
                format!("{}{}", prefix, name)
            }
            _ => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchOdmConfig::default();
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.refresh_policy, RefreshPolicy::None);
        assert_eq!(config.scroll_keep_alive(), Duration::from_secs(60));
    }

    #[test]
    fn test_from_json_partial() {
        let config = SearchOdmConfig::from_json_str(
            r#"{"endpoints": ["http://a:9200"], "index_prefix": "test-", "refresh_policy": "wait_until", "field_naming": "snake_case"}"#,
        )
        .unwrap();

        assert_eq!(config.endpoints, vec!["http://a:9200".to_string()]);
        assert_eq!(config.index_prefix.as_deref(), Some("test-"));
        assert_eq!(config.refresh_policy, RefreshPolicy::WaitUntil);
        assert_eq!(config.field_naming, FieldNamingStrategy::SnakeCase);
        // Untouched fields keep defaults
        assert_eq!(config.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_from_json_rejects_empty_endpoints() {
        let result = SearchOdmConfig::from_json_str(r#"{"endpoints": []}"#);
        assert!(matches!(result, Err(OdmError::InvalidConfig(_))));
    }

    #[test]
    fn test_prefixed_index() {
        let config = SearchOdmConfig {
            index_prefix: Some("dev-".into()),
            ..Default::default()
        };
        assert_eq!(config.prefixed_index("books"), "dev-books");
        assert_eq!(config.prefixed_index("dev-books"), "dev-books");

        let bare = SearchOdmConfig::default();
        assert_eq!(bare.prefixed_index("books"), "books");
    }

    #[test]
    fn test_retry_config_from_settings() {
        let config = SearchOdmConfig {
            retry_max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(config.retry_config().max_retries, Some(1));
    }
}
