// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Crate-wide error type.
//!
//! Engine error bodies look like:
//!
//! ```json
//! {"error": {"type": "index_not_found_exception", "reason": "no such index [books]"}, "status": 404}
//! ```
//!
//! [`OdmError::from_engine_response`] maps the well-known `type`s onto
//! dedicated variants so callers can match on them.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum OdmError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("no such index: {0}")]
    NoSuchIndex(String),

    #[error("index already exists: {0}")]
    IndexAlreadyExists(String),

    #[error("version conflict for document '{id}': {reason}")]
    VersionConflict { id: String, reason: String },

    #[error("bulk request failed for {} document(s): {message}", failed.len())]
    BulkFailure {
        message: String,
        /// Document id → failure reason
        failed: HashMap<String, String>,
    },

    #[error("engine returned {status} ({error_type}): {reason}")]
    Engine {
        status: u16,
        error_type: String,
        reason: String,
    },

    #[error("mapping error: {0}")]
    Mapping(String),

    #[error("conversion error: {0}")]
    Conversion(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OdmError {
    /// Translate a non-2xx engine response into an error.
    ///
    /// `id` is used for version conflicts, `index` for missing-index errors
    /// when the body doesn't name the index.
    pub fn from_engine_response(status: u16, body: Option<&Value>, index: &str, id: Option<&str>) -> Self {
        let error = body.and_then(|b| b.get("error"));

        let (error_type, reason) = match error {
            Some(Value::Object(obj)) => (
                obj.get("type").and_then(Value::as_str).unwrap_or("unknown").to_string(),
                obj.get("reason").and_then(Value::as_str).unwrap_or_default().to_string(),
            ),
            // Older engines and some proxies return a bare string
            Some(Value::String(s)) => ("unknown".to_string(), s.clone()),
            _ => ("unknown".to_string(), format!("HTTP {}", status)),
        };

        match error_type.as_str() {
            "index_not_found_exception" => {
                let name = error
                    .and_then(|e| e.get("index"))
                    .and_then(Value::as_str)
                    .unwrap_or(index);
                OdmError::NoSuchIndex(name.to_string())
            }
            "resource_already_exists_exception" => {
                let name = error
                    .and_then(|e| e.get("index"))
                    .and_then(Value::as_str)
                    .unwrap_or(index);
                OdmError::IndexAlreadyExists(name.to_string())
            }
            "version_conflict_engine_exception" => OdmError::VersionConflict {
                id: id.unwrap_or_default().to_string(),
                reason,
            },
            _ => OdmError::Engine { status, error_type, reason },
        }
    }

    /// True for optimistic locking failures
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, OdmError::VersionConflict { .. })
    }
}
