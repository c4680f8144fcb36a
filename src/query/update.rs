// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Write-side queries: index, update, delete-by-query and bulk.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{Map, Value};

use super::Query;
use crate::convert::SeqNoPrimaryTerm;
use crate::mapping::WriteType;
use crate::operations::RefreshPolicy;

/// Raw index request for one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexQuery {
    /// `None` lets the engine generate an id
    pub id: Option<String>,
    pub source: Map<String, Value>,
    /// External version
    pub version: Option<i64>,
    pub seq_no_primary_term: Option<SeqNoPrimaryTerm>,
    pub op_type: Option<WriteType>,
    pub routing: Option<String>,
    /// Overrides the configured refresh policy
    pub refresh: Option<RefreshPolicy>,
}

impl IndexQuery {
    pub fn new(source: Map<String, Value>) -> Self {
        Self {
            source,
            ..Default::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn if_seq_no_primary_term(mut self, seq: SeqNoPrimaryTerm) -> Self {
        self.seq_no_primary_term = Some(seq);
        self
    }

    pub fn op_type(mut self, op_type: WriteType) -> Self {
        self.op_type = Some(op_type);
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = Some(refresh);
        self
    }
}

/// Painless (or other) script for updates
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateScript {
    /// Inline source; ignored when `id` is set
    pub source: Option<String>,
    /// Stored script id
    pub id: Option<String>,
    pub lang: Option<String>,
    pub params: BTreeMap<String, Value>,
}

impl UpdateScript {
    pub fn inline(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            id: None,
            lang: None,
            params: BTreeMap::new(),
        }
    }

    pub fn stored(id: impl Into<String>) -> Self {
        Self {
            source: None,
            id: Some(id.into()),
            lang: None,
            params: BTreeMap::new(),
        }
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn to_json(&self) -> Value {
        let mut script = Map::new();
        match (&self.id, &self.source) {
            (Some(id), _) => {
                script.insert("id".into(), Value::String(id.clone()));
            }
            (None, Some(source)) => {
                script.insert("source".into(), Value::String(source.clone()));
            }
            (None, None) => {}
        }
        if let Some(lang) = &self.lang {
            script.insert("lang".into(), Value::String(lang.clone()));
        }
        if !self.params.is_empty() {
            script.insert(
                "params".into(),
                Value::Object(self.params.clone().into_iter().collect()),
            );
        }
        Value::Object(script)
    }
}

/// What a by-query request does on version conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conflicts {
    #[default]
    Abort,
    Proceed,
}

impl Conflicts {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conflicts::Abort => "abort",
            Conflicts::Proceed => "proceed",
        }
    }
}

/// Partial-document or scripted update; by-query when `query` is set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateQuery {
    pub id: Option<String>,
    pub document: Option<Map<String, Value>>,
    pub script: Option<UpdateScript>,
    pub upsert: Option<Map<String, Value>>,
    pub doc_as_upsert: Option<bool>,
    pub scripted_upsert: Option<bool>,
    pub retry_on_conflict: Option<u32>,
    pub refresh: Option<RefreshPolicy>,
    pub routing: Option<String>,
    pub seq_no_primary_term: Option<SeqNoPrimaryTerm>,
    /// Return the updated `_source`
    pub fetch_source: bool,
    pub timeout: Option<Duration>,
    pub wait_for_active_shards: Option<String>,
    /// Update-by-query selection
    pub query: Option<Query>,
    pub conflicts: Option<Conflicts>,
    pub max_docs: Option<u64>,
}

impl UpdateQuery {
    /// Update of a single document
    pub fn for_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Update of every document matching `query`
    pub fn for_query(query: impl Into<Query>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn document(mut self, document: Map<String, Value>) -> Self {
        self.document = Some(document);
        self
    }

    pub fn script(mut self, script: UpdateScript) -> Self {
        self.script = Some(script);
        self
    }

    pub fn upsert(mut self, upsert: Map<String, Value>) -> Self {
        self.upsert = Some(upsert);
        self
    }

    pub fn doc_as_upsert(mut self, enabled: bool) -> Self {
        self.doc_as_upsert = Some(enabled);
        self
    }

    pub fn scripted_upsert(mut self, enabled: bool) -> Self {
        self.scripted_upsert = Some(enabled);
        self
    }

    pub fn retry_on_conflict(mut self, retries: u32) -> Self {
        self.retry_on_conflict = Some(retries);
        self
    }

    pub fn refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = Some(refresh);
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn if_seq_no_primary_term(mut self, seq: SeqNoPrimaryTerm) -> Self {
        self.seq_no_primary_term = Some(seq);
        self
    }

    pub fn fetch_source(mut self, fetch: bool) -> Self {
        self.fetch_source = fetch;
        self
    }

    pub fn conflicts(mut self, conflicts: Conflicts) -> Self {
        self.conflicts = Some(conflicts);
        self
    }

    pub fn max_docs(mut self, max: u64) -> Self {
        self.max_docs = Some(max);
        self
    }
}

/// Delete-by-query request
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    pub query: Query,
    pub conflicts: Option<Conflicts>,
    pub max_docs: Option<u64>,
    /// Overrides the configured refresh policy; by-query endpoints only
    /// distinguish `None` from the rest
    pub refresh: Option<RefreshPolicy>,
    pub timeout: Option<Duration>,
}

impl DeleteQuery {
    pub fn new(query: impl Into<Query>) -> Self {
        Self {
            query: query.into(),
            conflicts: None,
            max_docs: None,
            refresh: None,
            timeout: None,
        }
    }

    pub fn conflicts(mut self, conflicts: Conflicts) -> Self {
        self.conflicts = Some(conflicts);
        self
    }

    pub fn max_docs(mut self, max: u64) -> Self {
        self.max_docs = Some(max);
        self
    }

    pub fn refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = Some(refresh);
        self
    }
}

/// Request-level options for `_bulk`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOptions {
    pub refresh: Option<RefreshPolicy>,
    pub timeout: Option<Duration>,
    pub pipeline: Option<String>,
    pub routing: Option<String>,
    pub wait_for_active_shards: Option<String>,
}

impl BulkOptions {
    pub fn refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = Some(refresh);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.pipeline = Some(pipeline.into());
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn wait_for_active_shards(mut self, shards: impl Into<String>) -> Self {
        self.wait_for_active_shards = Some(shards.into());
        self
    }
}

/// One action in a bulk request
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    Index(IndexQuery),
    Update(UpdateQuery),
    Delete { id: String, routing: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_json() {
        let script = UpdateScript::inline("ctx._source.count += params.n")
            .lang("painless")
            .param("n", 2);
        assert_eq!(
            script.to_json(),
            json!({"source": "ctx._source.count += params.n", "lang": "painless", "params": {"n": 2}})
        );
        assert_eq!(UpdateScript::stored("incr").to_json(), json!({"id": "incr"}));
    }

    #[test]
    fn test_update_query_builders() {
        let update = UpdateQuery::for_id("1").doc_as_upsert(true).retry_on_conflict(3);
        assert_eq!(update.id.as_deref(), Some("1"));
        assert_eq!(update.doc_as_upsert, Some(true));
        assert!(update.query.is_none());
        assert_eq!(Conflicts::Proceed.as_str(), "proceed");
    }
}
