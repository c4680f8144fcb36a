// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::OdmError;

/// Optimistic concurrency counters assigned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqNoPrimaryTerm {
    pub seq_no: i64,
    pub primary_term: i64,
}

/// One stored document with its metadata fields
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub id: Option<String>,
    pub index: Option<String>,
    pub version: Option<i64>,
    pub seq_no: Option<i64>,
    pub primary_term: Option<i64>,
    pub routing: Option<String>,
    pub source: Map<String, Value>,
}

impl Document {
    pub fn new(source: Map<String, Value>) -> Self {
        Self {
            source,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn seq_no_primary_term(&self) -> Option<SeqNoPrimaryTerm> {
        match (self.seq_no, self.primary_term) {
            (Some(seq_no), Some(primary_term)) => Some(SeqNoPrimaryTerm { seq_no, primary_term }),
            _ => None,
        }
    }

    /// Build from a search hit or a get response (`_id`, `_index`,
    /// `_source`, ...).
    ///
    /// Hits without `_source` (stored fields or `fields` retrieval) get a
    /// source assembled from `fields`. Values stay arrays; the converter
    /// unwraps them for properties that are not collections.
    pub fn from_hit(hit: &Value) -> Result<Self, OdmError> {
        let obj = hit
            .as_object()
            .ok_or_else(|| OdmError::Conversion("hit is not a JSON object".into()))?;

        let source = match obj.get("_source") {
            Some(Value::Object(source)) => source.clone(),
            _ => match obj.get("fields") {
                Some(Value::Object(fields)) => fields.clone(),
                _ => Map::new(),
            },
        };

        Ok(Self {
            id: obj.get("_id").and_then(Value::as_str).map(str::to_string),
            index: obj.get("_index").and_then(Value::as_str).map(str::to_string),
            version: obj.get("_version").and_then(Value::as_i64),
            seq_no: obj.get("_seq_no").and_then(Value::as_i64),
            primary_term: obj.get("_primary_term").and_then(Value::as_i64),
            routing: obj.get("_routing").and_then(Value::as_str).map(str::to_string),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_hit_with_source() {
        let hit = json!({
            "_index": "books", "_id": "1", "_version": 3,
            "_seq_no": 7, "_primary_term": 1, "_routing": "r1",
            "_source": {"title": "Dune"}
        });
        let doc = Document::from_hit(&hit).unwrap();
        assert_eq!(doc.id.as_deref(), Some("1"));
        assert_eq!(doc.index.as_deref(), Some("books"));
        assert_eq!(doc.version, Some(3));
        assert_eq!(doc.routing.as_deref(), Some("r1"));
        assert_eq!(doc.seq_no_primary_term(), Some(SeqNoPrimaryTerm { seq_no: 7, primary_term: 1 }));
        assert_eq!(doc.source["title"], "Dune");
    }

    #[test]
    fn test_from_hit_with_fields_only() {
        let hit = json!({"_id": "2", "fields": {"title": ["Emma"], "tags": ["a"]}});
        let doc = Document::from_hit(&hit).unwrap();
        assert_eq!(doc.source["title"], json!(["Emma"]));
        assert_eq!(doc.source["tags"], json!(["a"]));
        assert_eq!(doc.seq_no_primary_term(), None);
    }

    #[test]
    fn test_from_hit_rejects_non_object() {
        assert!(matches!(Document::from_hit(&json!([1])), Err(OdmError::Conversion(_))));
    }
}
