// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Response Converter
//!
//! Parses raw engine responses. Hit contents go through a caller-supplied
//! reader, normally [`DocumentConverter::read_value`](crate::convert::DocumentConverter::read_value).

use std::collections::HashMap;

use serde_json::Value;

use super::aggregations::Aggregations;
use super::bulk::{BulkResult, ByQueryResponse};
use super::hits::{SearchHit, SearchHits, TotalHitsRelation};
use crate::convert::Document;
use crate::error::OdmError;

pub struct ResponseConverter;

impl ResponseConverter {
    /// Parse a `_search` (or scroll) response, converting each hit with `read`
    pub fn search_hits<T, F>(body: &Value, mut read: F) -> Result<SearchHits<T>, OdmError>
    where
        F: FnMut(&Document) -> Result<T, OdmError>,
    {
        let hits_section = body.get("hits");
        let (total_hits, total_hits_relation) = parse_total(hits_section.and_then(|h| h.get("total")));

        let raw_hits = hits_section
            .and_then(|h| h.get("hits"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut hits = Vec::with_capacity(raw_hits.len());
        for raw in raw_hits {
            let document = Document::from_hit(raw)?;
            let content = read(&document)?;
            hits.push(search_hit(raw, document, content));
        }

        Ok(SearchHits {
            total_hits,
            total_hits_relation,
            max_score: hits_section.and_then(|h| h.get("max_score")).and_then(Value::as_f64),
            scroll_id: body.get("_scroll_id").and_then(Value::as_str).map(str::to_string),
            hits,
            aggregations: body.get("aggregations").map(Aggregations::from_json),
            suggest: body.get("suggest").cloned(),
        })
    }

    /// Hits as raw documents
    pub fn documents(body: &Value) -> Result<SearchHits<Document>, OdmError> {
        Self::search_hits(body, |doc| Ok(doc.clone()))
    }

    /// Parse a `_msearch` response; the first failed response becomes the error
    pub fn multi_search<T, F>(body: &Value, index: &str, mut read: F) -> Result<Vec<SearchHits<T>>, OdmError>
    where
        F: FnMut(&Document) -> Result<T, OdmError>,
    {
        let responses = body
            .get("responses")
            .and_then(Value::as_array)
            .ok_or_else(|| OdmError::Conversion("multi search response without 'responses'".into()))?;

        responses
            .iter()
            .map(|response| {
                if response.get("error").is_some() {
                    let status = response
                        .get("status")
                        .and_then(Value::as_u64)
                        .and_then(|s| u16::try_from(s).ok())
                        .unwrap_or(500);
                    return Err(OdmError::from_engine_response(status, Some(response), index, None));
                }
                Self::search_hits(response, &mut read)
            })
            .collect()
    }

    /// Document of a `GET _doc/{id}` response, `None` when not found
    pub fn get_document(body: &Value) -> Result<Option<Document>, OdmError> {
        if !body.get("found").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(None);
        }
        Document::from_hit(body).map(Some)
    }

    /// Found documents of an `_mget` response, in request order
    pub fn multi_get_documents(body: &Value) -> Result<Vec<Document>, OdmError> {
        let docs = body
            .get("docs")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            if let Some(document) = Self::get_document(doc)? {
                out.push(document);
            }
        }
        Ok(out)
    }

    pub fn aggregations(body: &Value) -> Aggregations {
        body.get("aggregations").map(Aggregations::from_json).unwrap_or_default()
    }

    pub fn bulk(body: &Value) -> BulkResult {
        BulkResult::from_json(body)
    }

    pub fn by_query(body: &Value) -> ByQueryResponse {
        ByQueryResponse::from_json(body)
    }

    /// `count` of a `_count` response
    pub fn count(body: &Value) -> Result<u64, OdmError> {
        body.get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| OdmError::Conversion("count response without 'count'".into()))
    }
}

fn parse_total(total: Option<&Value>) -> (u64, TotalHitsRelation) {
    match total {
        Some(Value::Number(n)) => (n.as_u64().unwrap_or_default(), TotalHitsRelation::EqualTo),
        Some(Value::Object(obj)) => {
            let value = obj.get("value").and_then(Value::as_u64).unwrap_or_default();
            let relation = match obj.get("relation").and_then(Value::as_str) {
                Some("gte") => TotalHitsRelation::GreaterThanOrEqualTo,
                _ => TotalHitsRelation::EqualTo,
            };
            (value, relation)
        }
        _ => (0, TotalHitsRelation::Off),
    }
}

fn search_hit<T>(raw: &Value, document: Document, content: T) -> SearchHit<T> {
    let highlight_fields = raw
        .get("highlight")
        .and_then(Value::as_object)
        .map(|fields| {
            fields
                .iter()
                .map(|(field, fragments)| {
                    let fragments = fragments
                        .as_array()
                        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
                        .unwrap_or_default();
                    (field.clone(), fragments)
                })
                .collect()
        })
        .unwrap_or_default();

    let inner_hits: HashMap<String, Value> = raw
        .get("inner_hits")
        .and_then(Value::as_object)
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    SearchHit {
        index: document.index,
        id: document.id,
        score: raw.get("_score").and_then(Value::as_f64),
        sort_values: raw.get("sort").and_then(Value::as_array).cloned().unwrap_or_default(),
        highlight_fields,
        inner_hits,
        explanation: raw.get("_explanation").cloned(),
        matched_queries: raw
            .get("matched_queries")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default(),
        routing: document.routing,
        seq_no: document.seq_no,
        primary_term: document.primary_term,
        version: document.version,
        content,
    }
}
