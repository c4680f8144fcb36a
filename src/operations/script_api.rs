// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Stored scripts. Stored search templates are scripts in `mustache`.

use serde_json::{json, Value};
use tracing::info;

use super::index_api::acknowledged;
use super::SearchOperations;
use crate::error::OdmError;
use crate::transport::{path, EngineRequest};

/// A stored script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub id: String,
    /// `painless`, `mustache`, ...
    pub language: String,
    pub source: String,
}

impl Script {
    pub fn new(id: impl Into<String>, language: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            language: language.into(),
            source: source.into(),
        }
    }

    /// Stored search template
    pub fn search_template(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(id, "mustache", source)
    }
}

impl SearchOperations {
    pub async fn put_script(&self, script: &Script) -> Result<bool, OdmError> {
        let body = json!({
            "script": {
                "lang": script.language,
                "source": script.source,
            }
        });
        let request = EngineRequest::put(path(&["_scripts", &script.id])).json(body);
        let body = self.execute_ok(request, "", Some(&script.id)).await?;

        let acknowledged = acknowledged(&body);
        info!(script = %script.id, lang = %script.language, acknowledged, "Script stored");
        Ok(acknowledged)
    }

    /// Stored script by id, `None` when absent
    pub async fn get_script(&self, id: &str) -> Result<Option<Script>, OdmError> {
        let response = self.execute(EngineRequest::get(path(&["_scripts", id]))).await?;
        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(OdmError::from_engine_response(response.status, response.body.as_ref(), "", Some(id)));
        }

        let body = response.body_or_null();
        if !body.get("found").and_then(Value::as_bool).unwrap_or(true) {
            return Ok(None);
        }
        let Some(script) = body.get("script") else {
            return Ok(None);
        };
        let text = |key: &str| script.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        Ok(Some(Script {
            id: id.to_string(),
            language: text("lang"),
            source: text("source"),
        }))
    }

    /// Delete a stored script; false when absent
    pub async fn delete_script(&self, id: &str) -> Result<bool, OdmError> {
        let response = self.execute(EngineRequest::delete(path(&["_scripts", id]))).await?;
        if response.is_not_found() {
            return Ok(false);
        }
        if !response.is_success() {
            return Err(OdmError::from_engine_response(response.status, response.body.as_ref(), "", Some(id)));
        }
        Ok(acknowledged(response.body_or_null()))
    }
}
