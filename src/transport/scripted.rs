// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Scripted transport for tests.
//!
//! Records every request and answers from a queue of canned responses.
//! Routes registered with [`ScriptedTransport::route`] answer matching
//! requests repeatedly; queued responses are consumed in order and take
//! precedence.
//!
//! ```
//! use search_odm::transport::{EngineRequest, EngineResponse, Method, ScriptedTransport, Transport};
//! use serde_json::json;
//!
//! # tokio_test_block(async {
//! let transport = ScriptedTransport::new();
//! transport.push(EngineResponse::ok(json!({"acknowledged": true})));
//!
//! let response = transport.send(EngineRequest::put("/books")).await.unwrap();
//! assert!(response.is_success());
//! assert_eq!(transport.requests()[0].method, Method::Put);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::traits::{EngineRequest, EngineResponse, Method, Transport, TransportError};

struct Route {
    method: Method,
    path_prefix: String,
    response: EngineResponse,
}

pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Result<EngineResponse, TransportError>>>,
    routes: Mutex<Vec<Route>>,
    recorded: Mutex<Vec<EngineRequest>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            routes: Mutex::new(Vec::new()),
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response for the next request
    pub fn push(&self, response: EngineResponse) -> &Self {
        self.queue.lock().push_back(Ok(response));
        self
    }

    /// Queue a transport failure for the next request
    pub fn push_error(&self, error: TransportError) -> &Self {
        self.queue.lock().push_back(Err(error));
        self
    }

    /// Answer every `method` request whose path starts with `path_prefix`
    pub fn route(&self, method: Method, path_prefix: impl Into<String>, response: EngineResponse) -> &Self {
        self.routes.lock().push(Route {
            method,
            path_prefix: path_prefix.into(),
            response,
        });
        self
    }

    /// All requests seen so far
    #[must_use]
    pub fn requests(&self) -> Vec<EngineRequest> {
        self.recorded.lock().clone()
    }

    #[must_use]
    pub fn last_request(&self) -> Option<EngineRequest> {
        self.recorded.lock().last().cloned()
    }

    /// Number of queued responses not yet consumed
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn clear(&self) {
        self.queue.lock().clear();
        self.routes.lock().clear();
        self.recorded.lock().clear();
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: EngineRequest) -> Result<EngineResponse, TransportError> {
        self.recorded.lock().push(request.clone());

        if let Some(next) = self.queue.lock().pop_front() {
            return next;
        }

        // Longest matching prefix wins
        let routes = self.routes.lock();
        routes
            .iter()
            .filter(|r| r.method == request.method && request.path.starts_with(&r.path_prefix))
            .max_by_key(|r| r.path_prefix.len())
            .map(|r| r.response.clone())
            .ok_or(TransportError::Unscripted {
                method: request.method,
                path: request.path,
            })
    }
}
