// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Options shared by every query kind: paging, sorting, source filtering,
//! highlighting and request-level switches.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::mapping::EntityMetadata;

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
    pub page: usize,
    pub size: usize,
}

impl Pageable {
    pub fn of(page: usize, size: usize) -> Self {
        Self { page, size }
    }

    /// Offset of the first hit (`from`)
    #[must_use]
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }

    #[must_use]
    pub fn next(&self) -> Self {
        Self::of(self.page.saturating_add(1), self.size)
    }

    /// Previous page, or the first page when already there
    #[must_use]
    pub fn previous(&self) -> Self {
        Self::of(self.page.saturating_sub(1), self.size)
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.page == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// Sort mode for multi-valued fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortMode {
    Min,
    Max,
    Sum,
    Avg,
    Median,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Min => "min",
            SortMode::Max => "max",
            SortMode::Sum => "sum",
            SortMode::Avg => "avg",
            SortMode::Median => "median",
        }
    }
}

/// One sort criterion on a property path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    pub direction: Direction,
    /// `_first`, `_last` or a literal replacement value
    pub missing: Option<Value>,
    pub mode: Option<SortMode>,
    pub unmapped_type: Option<String>,
}

impl Order {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
            missing: None,
            mode: None,
            unmapped_type: None,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            direction: Direction::Desc,
            ..Self::asc(property)
        }
    }

    pub fn missing(mut self, missing: impl Into<Value>) -> Self {
        self.missing = Some(missing.into());
        self
    }

    pub fn mode(mut self, mode: SortMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn unmapped_type(mut self, field_type: impl Into<String>) -> Self {
        self.unmapped_type = Some(field_type.into());
        self
    }

    /// Sort clause with the property translated to its field name.
    ///
    /// `_score` and `_doc` pass through untouched; a path below a nested
    /// property gets a `nested.path`.
    pub fn to_json(&self, metadata: Option<&EntityMetadata>) -> Value {
        let (field, nested) = match metadata {
            Some(m) if !self.property.starts_with('_') => (
                m.field_name_for_path(&self.property),
                m.nested_path_for(&self.property),
            ),
            _ => (self.property.clone(), None),
        };

        let mut options = Map::new();
        options.insert("order".into(), json!(self.direction.as_str()));
        if let Some(missing) = &self.missing {
            options.insert("missing".into(), missing.clone());
        }
        if let Some(mode) = self.mode {
            options.insert("mode".into(), json!(mode.as_str()));
        }
        if let Some(unmapped) = &self.unmapped_type {
            options.insert("unmapped_type".into(), json!(unmapped));
        }
        if let Some(path) = nested {
            options.insert("nested".into(), json!({ "path": path }));
        }

        let mut clause = Map::new();
        clause.insert(field, Value::Object(options));
        Value::Object(clause)
    }
}

/// `_source` includes / excludes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceFilter {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

impl SourceFilter {
    pub fn includes<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            includes: fields.into_iter().map(Into::into).collect(),
            excludes: Vec::new(),
        }
    }

    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.excludes.push(field.into());
        self
    }

    pub fn to_json(&self, metadata: Option<&EntityMetadata>) -> Value {
        let translate = |paths: &[String]| -> Vec<String> {
            paths
                .iter()
                .map(|p| metadata.map_or_else(|| p.clone(), |m| m.field_name_for_path(p)))
                .collect()
        };
        json!({ "includes": translate(&self.includes), "excludes": translate(&self.excludes) })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HighlightField {
    pub property: String,
    pub fragment_size: Option<u32>,
    pub number_of_fragments: Option<u32>,
}

impl HighlightField {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub fields: Vec<HighlightField>,
    pub pre_tags: Vec<String>,
    pub post_tags: Vec<String>,
    pub fragment_size: Option<u32>,
    pub number_of_fragments: Option<u32>,
}

impl Highlight {
    pub fn fields<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: properties.into_iter().map(HighlightField::new).collect(),
            ..Default::default()
        }
    }

    pub fn tags(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.pre_tags = vec![pre.into()];
        self.post_tags = vec![post.into()];
        self
    }

    pub fn to_json(&self, metadata: Option<&EntityMetadata>) -> Value {
        let mut body = Map::new();
        if !self.pre_tags.is_empty() {
            body.insert("pre_tags".into(), json!(self.pre_tags));
        }
        if !self.post_tags.is_empty() {
            body.insert("post_tags".into(), json!(self.post_tags));
        }
        if let Some(size) = self.fragment_size {
            body.insert("fragment_size".into(), json!(size));
        }
        if let Some(n) = self.number_of_fragments {
            body.insert("number_of_fragments".into(), json!(n));
        }

        let mut fields = Map::new();
        for field in &self.fields {
            let name = metadata.map_or_else(|| field.property.clone(), |m| m.field_name_for_path(&field.property));
            let mut options = Map::new();
            if let Some(size) = field.fragment_size {
                options.insert("fragment_size".into(), json!(size));
            }
            if let Some(n) = field.number_of_fragments {
                options.insert("number_of_fragments".into(), json!(n));
            }
            fields.insert(name, Value::Object(options));
        }
        body.insert("fields".into(), Value::Object(fields));
        Value::Object(body)
    }
}

/// `track_total_hits` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackTotalHits {
    Track,
    DontTrack,
    /// Count accurately up to this many hits
    UpTo(u64),
}

impl TrackTotalHits {
    pub fn to_json(&self) -> Value {
        match self {
            TrackTotalHits::Track => json!(true),
            TrackTotalHits::DontTrack => json!(false),
            TrackTotalHits::UpTo(n) => json!(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchType {
    QueryThenFetch,
    DfsQueryThenFetch,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::QueryThenFetch => "query_then_fetch",
            SearchType::DfsQueryThenFetch => "dfs_query_then_fetch",
        }
    }
}

/// Request options common to all query kinds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub pageable: Option<Pageable>,
    pub sort: Vec<Order>,
    pub source_filter: Option<SourceFilter>,
    pub stored_fields: Vec<String>,
    pub highlight: Option<Highlight>,
    /// Restrict to these document ids
    pub ids: Vec<String>,
    pub routing: Option<String>,
    pub preference: Option<String>,
    pub min_score: Option<f32>,
    pub track_scores: bool,
    pub track_total_hits: Option<TrackTotalHits>,
    pub timeout: Option<Duration>,
    pub search_after: Vec<Value>,
    pub explain: bool,
    /// Index name → boost
    pub indices_boost: Vec<(String, f32)>,
    pub collapse_field: Option<String>,
    /// Raw `rescore` clause
    pub rescorer: Option<Value>,
    pub scroll_time: Option<Duration>,
    /// Hard cap on hits returned; also stops streaming searches
    pub max_results: Option<usize>,
    pub request_cache: Option<bool>,
    pub search_type: Option<SearchType>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pageable(mut self, pageable: Pageable) -> Self {
        self.pageable = Some(pageable);
        self
    }

    pub fn sort(mut self, order: Order) -> Self {
        self.sort.push(order);
        self
    }

    pub fn source_filter(mut self, filter: SourceFilter) -> Self {
        self.source_filter = Some(filter);
        self
    }

    pub fn stored_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stored_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn highlight(mut self, highlight: Highlight) -> Self {
        self.highlight = Some(highlight);
        self
    }

    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn preference(mut self, preference: impl Into<String>) -> Self {
        self.preference = Some(preference.into());
        self
    }

    pub fn min_score(mut self, score: f32) -> Self {
        self.min_score = Some(score);
        self
    }

    pub fn track_scores(mut self, track: bool) -> Self {
        self.track_scores = track;
        self
    }

    pub fn track_total_hits(mut self, track: TrackTotalHits) -> Self {
        self.track_total_hits = Some(track);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn search_after(mut self, values: Vec<Value>) -> Self {
        self.search_after = values;
        self
    }

    pub fn explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    pub fn indices_boost(mut self, index: impl Into<String>, boost: f32) -> Self {
        self.indices_boost.push((index.into(), boost));
        self
    }

    pub fn collapse(mut self, property: impl Into<String>) -> Self {
        self.collapse_field = Some(property.into());
        self
    }

    pub fn rescorer(mut self, rescore: Value) -> Self {
        self.rescorer = Some(rescore);
        self
    }

    pub fn scroll_time(mut self, keep_alive: Duration) -> Self {
        self.scroll_time = Some(keep_alive);
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    pub fn request_cache(mut self, enabled: bool) -> Self {
        self.request_cache = Some(enabled);
        self
    }

    pub fn search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = Some(search_type);
        self
    }
}

/// Engine time value, e.g. `1500ms`, `30s`, `1m`
pub fn time_value(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 60_000 == 0 && millis > 0 {
        format!("{}m", millis / 60_000)
    } else if millis % 1_000 == 0 && millis > 0 {
        format!("{}s", millis / 1_000)
    } else {
        format!("{}ms", millis)
    }
}
