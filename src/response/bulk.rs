// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::OdmError;

/// Outcome of one bulk action
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemResponse {
    /// `index`, `create`, `update` or `delete`
    pub operation: String,
    pub index: Option<String>,
    pub id: Option<String>,
    pub status: u16,
    pub result: Option<String>,
    pub version: Option<i64>,
    pub seq_no: Option<i64>,
    pub primary_term: Option<i64>,
    /// `(type, reason)` of a failed item
    pub error: Option<(String, String)>,
}

impl BulkItemResponse {
    fn from_json(item: &Value) -> Option<Self> {
        let (operation, body) = item.as_object()?.iter().next()?;
        let body = body.as_object()?;

        let error = body.get("error").map(|e| match e {
            Value::Object(err) => (
                err.get("type").and_then(Value::as_str).unwrap_or("unknown").to_string(),
                err.get("reason").and_then(Value::as_str).unwrap_or_default().to_string(),
            ),
            other => ("unknown".to_string(), other.to_string()),
        });

        Some(Self {
            operation: operation.clone(),
            index: body.get("_index").and_then(Value::as_str).map(str::to_string),
            id: body.get("_id").and_then(Value::as_str).map(str::to_string),
            status: body
                .get("status")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok())
                .unwrap_or_default(),
            result: body.get("result").and_then(Value::as_str).map(str::to_string),
            version: body.get("_version").and_then(Value::as_i64),
            seq_no: body.get("_seq_no").and_then(Value::as_i64),
            primary_term: body.get("_primary_term").and_then(Value::as_i64),
            error,
        })
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Parsed `_bulk` response, items in request order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkResult {
    pub took: u64,
    pub items: Vec<BulkItemResponse>,
}

impl BulkResult {
    pub fn from_json(body: &Value) -> Self {
        Self {
            took: body.get("took").and_then(Value::as_u64).unwrap_or_default(),
            items: body
                .get("items")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(BulkItemResponse::from_json).collect())
                .unwrap_or_default(),
        }
    }

    pub fn successes(&self) -> impl Iterator<Item = &BulkItemResponse> {
        self.items.iter().filter(|i| !i.is_failed())
    }

    /// Document id → failure reason
    pub fn failures(&self) -> HashMap<String, String> {
        self.items
            .iter()
            .filter_map(|item| {
                let (error_type, reason) = item.error.as_ref()?;
                Some((
                    item.id.clone().unwrap_or_default(),
                    format!("{}: {}", error_type, reason),
                ))
            })
            .collect()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.items.iter().any(BulkItemResponse::is_failed)
    }

    /// `Err(BulkFailure)` when any item failed
    pub fn into_result(self) -> Result<Self, OdmError> {
        if !self.has_failures() {
            return Ok(self);
        }
        let failed = self.failures();
        Err(OdmError::BulkFailure {
            message: format!("{} of {} bulk items failed", failed.len(), self.items.len()),
            failed,
        })
    }
}

/// Failure entry of a by-query response
#[derive(Debug, Clone, PartialEq)]
pub struct ByQueryFailure {
    pub index: Option<String>,
    pub id: Option<String>,
    pub status: Option<u16>,
    pub cause: Option<Value>,
}

/// Response of `_update_by_query` / `_delete_by_query`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ByQueryResponse {
    pub took: u64,
    pub timed_out: bool,
    pub total: u64,
    pub updated: u64,
    pub deleted: u64,
    pub batches: u64,
    pub version_conflicts: u64,
    pub noops: u64,
    pub failures: Vec<ByQueryFailure>,
}

impl ByQueryResponse {
    pub fn from_json(body: &Value) -> Self {
        let count = |key: &str| body.get(key).and_then(Value::as_u64).unwrap_or_default();
        Self {
            took: count("took"),
            timed_out: body.get("timed_out").and_then(Value::as_bool).unwrap_or_default(),
            total: count("total"),
            updated: count("updated"),
            deleted: count("deleted"),
            batches: count("batches"),
            version_conflicts: count("version_conflicts"),
            noops: count("noops"),
            failures: body
                .get("failures")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .map(|f| ByQueryFailure {
                            index: f.get("index").and_then(Value::as_str).map(str::to_string),
                            id: f.get("id").and_then(Value::as_str).map(str::to_string),
                            status: f
                                .get("status")
                                .and_then(Value::as_u64)
                                .and_then(|s| u16::try_from(s).ok()),
                            cause: f.get("cause").cloned(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// `result` of a single-document update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    Created,
    Updated,
    Deleted,
    NotFound,
    Noop,
}

impl UpdateResult {
    fn from_wire(result: &str) -> Option<Self> {
        match result {
            "created" => Some(UpdateResult::Created),
            "updated" => Some(UpdateResult::Updated),
            "deleted" => Some(UpdateResult::Deleted),
            "not_found" => Some(UpdateResult::NotFound),
            "noop" => Some(UpdateResult::Noop),
            _ => None,
        }
    }
}

/// Response of `_update/{id}`
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResponse {
    pub index: Option<String>,
    pub id: Option<String>,
    pub result: UpdateResult,
    pub version: Option<i64>,
    pub seq_no: Option<i64>,
    pub primary_term: Option<i64>,
    /// Updated source, when requested
    pub source: Option<Map<String, Value>>,
}

impl UpdateResponse {
    pub fn from_json(body: &Value) -> Result<Self, OdmError> {
        let result = body
            .get("result")
            .and_then(Value::as_str)
            .and_then(UpdateResult::from_wire)
            .ok_or_else(|| OdmError::Conversion(format!("update response without a known result: {}", body)))?;

        Ok(Self {
            index: body.get("_index").and_then(Value::as_str).map(str::to_string),
            id: body.get("_id").and_then(Value::as_str).map(str::to_string),
            result,
            version: body.get("_version").and_then(Value::as_i64),
            seq_no: body.get("_seq_no").and_then(Value::as_i64),
            primary_term: body.get("_primary_term").and_then(Value::as_i64),
            source: body
                .get("get")
                .and_then(|g| g.get("_source"))
                .and_then(Value::as_object)
                .cloned(),
        })
    }
}
