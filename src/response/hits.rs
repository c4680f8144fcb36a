// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::HashMap;

use serde_json::Value;

use super::aggregations::Aggregations;

/// How `total_hits` relates to the real number of matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TotalHitsRelation {
    #[default]
    EqualTo,
    /// Lower bound, tracking stopped early
    GreaterThanOrEqualTo,
    /// Total hits were not tracked
    Off,
}

/// One hit with its converted content
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<T> {
    pub index: Option<String>,
    pub id: Option<String>,
    pub score: Option<f64>,
    pub sort_values: Vec<Value>,
    /// Property path → highlighted fragments
    pub highlight_fields: HashMap<String, Vec<String>>,
    /// Raw inner hits by name
    pub inner_hits: HashMap<String, Value>,
    pub explanation: Option<Value>,
    pub matched_queries: Vec<String>,
    pub routing: Option<String>,
    pub seq_no: Option<i64>,
    pub primary_term: Option<i64>,
    pub version: Option<i64>,
    pub content: T,
}

impl<T> SearchHit<T> {
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> SearchHit<U> {
        SearchHit {
            index: self.index,
            id: self.id,
            score: self.score,
            sort_values: self.sort_values,
            highlight_fields: self.highlight_fields,
            inner_hits: self.inner_hits,
            explanation: self.explanation,
            matched_queries: self.matched_queries,
            routing: self.routing,
            seq_no: self.seq_no,
            primary_term: self.primary_term,
            version: self.version,
            content: f(self.content),
        }
    }

    /// Highlighted fragments of one field
    pub fn highlight_field(&self, field: &str) -> &[String] {
        self.highlight_fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Hits of one search response
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHits<T> {
    pub total_hits: u64,
    pub total_hits_relation: TotalHitsRelation,
    pub max_score: Option<f64>,
    /// Present on scroll responses
    pub scroll_id: Option<String>,
    pub hits: Vec<SearchHit<T>>,
    pub aggregations: Option<Aggregations>,
    /// Raw `suggest` section
    pub suggest: Option<Value>,
}

impl<T> SearchHits<T> {
    pub fn empty() -> Self {
        Self {
            total_hits: 0,
            total_hits_relation: TotalHitsRelation::EqualTo,
            max_score: None,
            scroll_id: None,
            hits: Vec::new(),
            aggregations: None,
            suggest: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn has_aggregations(&self) -> bool {
        self.aggregations.as_ref().is_some_and(|a| !a.is_empty())
    }

    /// Contents of all hits, in order
    pub fn contents(&self) -> Vec<&T> {
        self.hits.iter().map(|h| &h.content).collect()
    }

    pub fn into_contents(self) -> Vec<T> {
        self.hits.into_iter().map(|h| h.content).collect()
    }

    pub fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> SearchHits<U> {
        SearchHits {
            total_hits: self.total_hits,
            total_hits_relation: self.total_hits_relation,
            max_score: self.max_score,
            scroll_id: self.scroll_id,
            hits: self.hits.into_iter().map(|h| h.map(&mut f)).collect(),
            aggregations: self.aggregations,
            suggest: self.suggest,
        }
    }
}

impl<T> IntoIterator for SearchHits<T> {
    type Item = SearchHit<T>;
    type IntoIter = std::vec::IntoIter<SearchHit<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}
