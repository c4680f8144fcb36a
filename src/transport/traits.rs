// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The request never reached a node
    #[error("connection failed: {0}")]
    Connection(String),
    /// The connection dropped after the request was sent
    #[error("connection lost: {0}")]
    Interrupted(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("circuit breaker open, request rejected")]
    CircuitOpen,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid transport configuration: {0}")]
    Configuration(String),
    #[error("no response scripted for {method} {path}")]
    Unscripted { method: Method, path: String },
}

impl TransportError {
    /// Errors worth retrying against the same or another node
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Connection(_) | TransportError::Interrupted(_) | TransportError::Timeout(_)
        )
    }

    /// Whether `request` may be sent again after this error.
    ///
    /// A write the node may already have applied is only resent when it
    /// provably never left the client.
    pub fn is_retryable_for(&self, request: &EngineRequest) -> bool {
        if request.is_idempotent() {
            self.is_retryable()
        } else {
            matches!(self, TransportError::Connection(_))
        }
    }
}

/// Path segments of writes that apply twice when sent twice
const NON_IDEMPOTENT_SEGMENTS: &[&str] = &[
    "_doc",
    "_create",
    "_bulk",
    "_update",
    "_update_by_query",
    "_delete_by_query",
    "_reindex",
];

/// HTTP verbs the operations layer uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Put,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Head => write!(f, "HEAD"),
            Method::Put => write!(f, "PUT"),
            Method::Post => write!(f, "POST"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// Request body variants
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Single JSON document (`application/json`)
    Json(Value),
    /// Newline-delimited JSON (`application/x-ndjson`), used by `_bulk` and `_msearch`
    NdJson(Vec<Value>),
}

impl RequestBody {
    /// Render the NDJSON payload; every line, including the last, ends with `\n`.
    pub fn to_ndjson(lines: &[Value]) -> String {
        let mut out = String::new();
        for line in lines {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }
}

/// A request against the engine's REST API
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRequest {
    pub method: Method,
    /// Path starting with `/`, segments already percent-encoded
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl EngineRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn head(path: impl Into<String>) -> Self {
        Self::new(Method::Head, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn ndjson(mut self, lines: Vec<Value>) -> Self {
        self.body = Some(RequestBody::NdJson(lines));
        self
    }

    /// Value of a query parameter, if set
    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// JSON body, if any
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            Some(RequestBody::Json(v)) => Some(v),
            _ => None,
        }
    }

    /// False for POST writes, e.g. `POST /books/_doc` assigns a new id on every
    /// send and `_bulk` replays every action
    #[must_use]
    pub fn is_idempotent(&self) -> bool {
        self.method != Method::Post
            || !self
                .path
                .split('/')
                .any(|segment| NON_IDEMPOTENT_SEGMENTS.contains(&segment))
    }

    /// Short label for logs and metrics, e.g. `POST /books/_search`
    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Engine response: status plus parsed JSON body (absent for HEAD / empty bodies)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl EngineResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, Some(body))
    }

    pub fn status_only(status: u16) -> Self {
        Self::new(status, None)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Body or `null`
    pub fn body_or_null(&self) -> &Value {
        static NULL: Value = Value::Null;
        self.body.as_ref().unwrap_or(&NULL)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: EngineRequest) -> Result<EngineResponse, TransportError>;

    /// Send several independent requests. Default implementation is sequential.
    async fn send_all(
        &self,
        requests: Vec<EngineRequest>,
    ) -> Vec<Result<EngineResponse, TransportError>> {
        let mut out = Vec::with_capacity(requests.len());
        for request in requests {
            out.push(self.send(request).await);
        }
        out
    }
}
