// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! HTTP transport over `reqwest`.
//!
//! Requests are spread round-robin across the configured endpoints. A
//! connection failure or timeout moves the next attempt to the next node;
//! HTTP error statuses are returned to the caller untouched, since they
//! carry engine errors the operations layer translates.
//!
//! ```text
//! send(request)
//!   └─ retry_when(retryable)
//!        └─ pick endpoint (round-robin)
//!             └─ circuit breaker for that endpoint
//!                  └─ reqwest
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::traits::{EngineRequest, EngineResponse, Method, RequestBody, Transport, TransportError};
use crate::config::SearchOdmConfig;
use crate::metrics;
use crate::resilience::circuit_breaker::{CircuitError, EndpointCircuits};
use crate::resilience::retry::{retry, retry_when, RetryConfig};

enum Auth {
    None,
    Basic { username: String, password: Option<String> },
    ApiKey(String),
}

pub struct HttpTransport {
    client: Client,
    endpoints: Vec<String>,
    next_endpoint: AtomicUsize,
    path_prefix: String,
    auth: Auth,
    retry: RetryConfig,
    circuits: EndpointCircuits,
}

impl HttpTransport {
    /// Build a transport from configuration. Does not contact the engine.
    pub fn new(config: &SearchOdmConfig) -> Result<Self, TransportError> {
        if config.endpoints.is_empty() {
            return Err(TransportError::Configuration("no endpoints configured".into()));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Configuration(format!("header '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Configuration(format!("header value: {}", e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::Configuration(e.to_string()))?;

        let auth = match (&config.api_key, &config.username) {
            (Some(key), _) => Auth::ApiKey(key.clone()),
            (None, Some(user)) => Auth::Basic {
                username: user.clone(),
                password: config.password.clone(),
            },
            (None, None) => Auth::None,
        };

        let endpoints: Vec<String> = config
            .endpoints
            .iter()
            .map(|e| e.trim_end_matches('/').to_string())
            .collect();

        let path_prefix = config
            .path_prefix
            .as_deref()
            .map(|p| format!("/{}", p.trim_matches('/')))
            .filter(|p| p != "/")
            .unwrap_or_default();

        Ok(Self {
            client,
            circuits: EndpointCircuits::new(&endpoints, &config.circuit_config()),
            endpoints,
            next_endpoint: AtomicUsize::new(0),
            path_prefix,
            auth,
            retry: config.retry_config(),
        })
    }

    /// Build the transport and wait until the engine answers `GET /`.
    pub async fn connect(config: &SearchOdmConfig) -> Result<Self, TransportError> {
        let transport = Self::new(config)?;
        let first = &transport;

        retry("engine_connect", &RetryConfig::startup(), || async move {
            let response = first.send(EngineRequest::get("/")).await?;
            if response.is_success() {
                Ok(())
            } else {
                Err(TransportError::Connection(format!("engine answered HTTP {}", response.status)))
            }
        })
        .await?;

        Ok(transport)
    }

    /// Per-endpoint circuit statistics
    pub fn circuits(&self) -> &EndpointCircuits {
        &self.circuits
    }

    fn pick_endpoint(&self) -> &str {
        let idx = self.next_endpoint.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[idx]
    }

    fn url_for(&self, endpoint: &str, path: &str) -> String {
        format!("{}{}{}", endpoint, self.path_prefix, path)
    }

    async fn send_to(&self, endpoint: &str, request: &EngineRequest) -> Result<EngineResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, self.url_for(endpoint, &request.path))
            .query(&request.params);

        builder = match &request.body {
            Some(RequestBody::Json(body)) => builder.json(body),
            Some(RequestBody::NdJson(lines)) => builder
                .header(CONTENT_TYPE, "application/x-ndjson")
                .body(RequestBody::to_ndjson(lines)),
            None => builder,
        };

        builder = match &self.auth {
            Auth::None => builder,
            Auth::Basic { username, password } => builder.basic_auth(username, password.as_ref()),
            Auth::ApiKey(key) => builder.header(AUTHORIZATION, format!("ApiKey {}", key)),
        };

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();

        if request.method == Method::Head {
            return Ok(EngineResponse::status_only(status));
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        if bytes.is_empty() {
            return Ok(EngineResponse::status_only(status));
        }

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(body) => Ok(EngineResponse::new(status, Some(body))),
            // Proxies in front of the engine answer errors in plain text
            Err(_) if !(200..300).contains(&status) => Ok(EngineResponse::new(
                status,
                Some(serde_json::json!({ "error": String::from_utf8_lossy(&bytes) })),
            )),
            Err(e) => Err(TransportError::InvalidResponse(e.to_string())),
        }
    }

    async fn send_once(&self, request: &EngineRequest) -> Result<EngineResponse, TransportError> {
        let endpoint = self.pick_endpoint();

        match self.circuits.get(endpoint) {
            Some(circuit) => circuit
                .call(|| self.send_to(endpoint, request))
                .await
                .map_err(|e| match e {
                    CircuitError::Rejected { .. } if self.endpoints.len() == 1 => TransportError::CircuitOpen,
                    // Another node may still answer, so let the retry loop fail over
                    CircuitError::Rejected { circuit } => TransportError::Connection(format!("{} open", circuit)),
                    CircuitError::Inner(inner) => inner,
                }),
            None => self.send_to(endpoint, request).await,
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_decode() {
        TransportError::InvalidResponse(e.to_string())
    } else if e.is_connect() {
        TransportError::Connection(e.to_string())
    } else {
        TransportError::Interrupted(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: EngineRequest) -> Result<EngineResponse, TransportError> {
        let label = request.describe();
        let start = Instant::now();
        debug!(request = %label, params = ?request.params, "Sending engine request");

        // Every node is given a chance before giving up
        let mut retry_config = self.retry.clone();
        if let Some(max) = retry_config.max_retries {
            retry_config.max_retries = Some(max.max(self.endpoints.len()));
        }

        let result = retry_when(
            &label,
            &retry_config,
            || self.send_once(&request),
            |e: &TransportError| e.is_retryable_for(&request),
        )
        .await;

        metrics::record_request_latency(&request.method.to_string(), start.elapsed());
        match &result {
            Ok(response) => metrics::record_request(&request.method.to_string(), response.status),
            Err(_) => metrics::record_transport_error(&request.method.to_string()),
        }

        result
    }
}
