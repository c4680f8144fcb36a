// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::options::QueryOptions;
use crate::error::OdmError;

/// Search template, stored (`id`) or inline (`source`)
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTemplateQuery {
    pub id: Option<String>,
    pub source: Option<String>,
    pub params: BTreeMap<String, Value>,
    pub options: QueryOptions,
}

impl SearchTemplateQuery {
    /// Template stored as a script with this id
    pub fn stored(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            source: None,
            params: BTreeMap::new(),
            options: QueryOptions::default(),
        }
    }

    /// Inline mustache source
    pub fn inline(source: impl Into<String>) -> Self {
        Self {
            id: None,
            source: Some(source.into()),
            params: BTreeMap::new(),
            options: QueryOptions::default(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Body for `_search/template` and `_render/template`
    pub fn to_body(&self) -> Result<Value, OdmError> {
        let mut body = Map::new();
        match (&self.id, &self.source) {
            (Some(id), None) => {
                body.insert("id".into(), Value::String(id.clone()));
            }
            (None, Some(source)) => {
                body.insert("source".into(), Value::String(source.clone()));
            }
            _ => {
                return Err(OdmError::InvalidQuery(
                    "search template needs exactly one of id or source".into(),
                ))
            }
        }
        body.insert(
            "params".into(),
            Value::Object(self.params.clone().into_iter().collect()),
        );
        if self.options.explain {
            body.insert("explain".into(), Value::Bool(true));
        }
        Ok(Value::Object(body))
    }
}
