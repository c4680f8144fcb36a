// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Request Factory
//!
//! Renders queries into complete request bodies and query parameters.
//!
//! ```text
//! Query ──→ query clause ──┬─ + ids / native filter → bool.filter
//!                          └─ + options → from/size, sort, _source, highlight, ...
//! ```

use serde_json::{json, Map, Value};

use super::kinds::NativeQuery;
use super::options::time_value;
use super::update::{BulkOperation, BulkOptions, DeleteQuery, IndexQuery, UpdateQuery};
use super::{CriteriaTranslator, Query, QueryOptions, SearchTemplateQuery};
use crate::config::SearchOdmConfig;
use crate::error::OdmError;
use crate::mapping::{EntityMetadata, WriteType};
use crate::operations::RefreshPolicy;

type Params = Vec<(String, String)>;

#[derive(Debug, Clone)]
pub struct RequestFactory {
    default_page_size: usize,
    max_result_window: usize,
}

impl Default for RequestFactory {
    fn default() -> Self {
        Self::new(10, 10_000)
    }
}

impl RequestFactory {
    pub fn new(default_page_size: usize, max_result_window: usize) -> Self {
        Self {
            default_page_size,
            max_result_window,
        }
    }

    pub fn from_config(config: &SearchOdmConfig) -> Self {
        Self::new(config.default_page_size, config.max_result_window)
    }

    /// The `query` clause alone, with ids and native filters folded into
    /// `bool.filter`
    pub fn query_clause(&self, query: &Query, metadata: Option<&EntityMetadata>) -> Result<Value, OdmError> {
        let mut filters = Vec::new();

        let base = match query {
            Query::Criteria(q) => CriteriaTranslator::translate(&q.criteria, metadata)?,
            Query::Native(NativeQuery { query, filter, .. }) => {
                if let Some(filter) = filter {
                    filters.push(filter.clone());
                }
                query.clone().unwrap_or_else(|| json!({ "match_all": {} }))
            }
            Query::String(q) => q.render()?,
            Query::Template(_) => {
                return Err(OdmError::InvalidQuery(
                    "search templates are rendered by the engine; use search_template".into(),
                ))
            }
        };

        let ids = &query.options().ids;
        if !ids.is_empty() {
            filters.push(json!({ "ids": { "values": ids } }));
        }

        if filters.is_empty() {
            return Ok(base);
        }

        if base == json!({ "match_all": {} }) {
            Ok(json!({ "bool": { "filter": filters } }))
        } else {
            Ok(json!({ "bool": { "must": [base], "filter": filters } }))
        }
    }

    /// Complete `_search` body
    pub fn search_body(&self, query: &Query, metadata: Option<&EntityMetadata>) -> Result<Value, OdmError> {
        let options = query.options();
        let mut body = Map::new();
        body.insert("query".into(), self.query_clause(query, metadata)?);

        self.apply_paging(&mut body, options)?;

        if let Some(metadata) = metadata {
            if metadata.seq_no_primary_term_property.is_some() {
                body.insert("seq_no_primary_term".into(), json!(true));
            }
            if metadata.is_versioned() {
                body.insert("version".into(), json!(true));
            }
        }

        if !options.sort.is_empty() {
            let sort: Vec<Value> = options.sort.iter().map(|o| o.to_json(metadata)).collect();
            body.insert("sort".into(), Value::Array(sort));
        }
        if let Some(filter) = &options.source_filter {
            body.insert("_source".into(), filter.to_json(metadata));
        }
        if !options.stored_fields.is_empty() {
            let fields: Vec<String> = options
                .stored_fields
                .iter()
                .map(|f| translate_path(f, metadata))
                .collect();
            body.insert("stored_fields".into(), json!(fields));
        }
        if let Some(highlight) = &options.highlight {
            body.insert("highlight".into(), highlight.to_json(metadata));
        }
        if let Some(track) = options.track_total_hits {
            body.insert("track_total_hits".into(), track.to_json());
        }
        if let Some(min_score) = options.min_score {
            body.insert("min_score".into(), json!(min_score));
        }
        if options.track_scores {
            body.insert("track_scores".into(), json!(true));
        }
        if let Some(timeout) = options.timeout {
            body.insert("timeout".into(), json!(time_value(timeout)));
        }
        if !options.search_after.is_empty() {
            body.insert("search_after".into(), Value::Array(options.search_after.clone()));
        }
        if options.explain {
            body.insert("explain".into(), json!(true));
        }
        if !options.indices_boost.is_empty() {
            let boosts: Vec<Value> = options
                .indices_boost
                .iter()
                .map(|(index, boost)| {
                    let mut entry = Map::new();
                    entry.insert(index.clone(), json!(boost));
                    Value::Object(entry)
                })
                .collect();
            body.insert("indices_boost".into(), Value::Array(boosts));
        }
        if let Some(collapse) = &options.collapse_field {
            body.insert("collapse".into(), json!({ "field": translate_path(collapse, metadata) }));
        }
        if let Some(rescore) = &options.rescorer {
            body.insert("rescore".into(), rescore.clone());
        }

        if let Query::Native(native) = query {
            if !native.aggregations.is_empty() {
                body.insert("aggs".into(), json!(native.aggregations));
            }
            if let Some(post_filter) = &native.post_filter {
                body.insert("post_filter".into(), post_filter.clone());
            }
            if let Some(suggest) = &native.suggest {
                body.insert("suggest".into(), suggest.clone());
            }
            if !native.script_fields.is_empty() {
                body.insert("script_fields".into(), json!(native.script_fields));
            }
            if let Some(runtime) = &native.runtime_mappings {
                body.insert("runtime_mappings".into(), runtime.clone());
            }
        }

        Ok(Value::Object(body))
    }

    /// `from` / `size`; scroll and search_after requests never send `from`
    fn apply_paging(&self, body: &mut Map<String, Value>, options: &QueryOptions) -> Result<(), OdmError> {
        let (from, mut size) = match options.pageable {
            Some(pageable) => (pageable.offset(), pageable.size),
            None => (0, options.max_results.unwrap_or(self.default_page_size)),
        };
        if let Some(max) = options.max_results {
            size = size.min(max);
        }

        let paged = options.scroll_time.is_none() && options.search_after.is_empty();
        if paged {
            match from.checked_add(size) {
                Some(window) if window <= self.max_result_window => {}
                window => {
                    return Err(OdmError::InvalidQuery(format!(
                        "from + size ({}) exceeds max result window {}; use scroll or search_after",
                        window.map_or_else(|| format!("{} + {}", from, size), |w| w.to_string()),
                        self.max_result_window
                    )));
                }
            }
        }

        if paged && from > 0 {
            body.insert("from".into(), json!(from));
        }
        body.insert("size".into(), json!(size));
        Ok(())
    }

    /// Query parameters for `_search`
    pub fn search_params(&self, query: &Query) -> Params {
        let options = query.options();
        let mut params = Params::new();
        if let Some(routing) = &options.routing {
            params.push(("routing".into(), routing.clone()));
        }
        if let Some(preference) = &options.preference {
            params.push(("preference".into(), preference.clone()));
        }
        if let Some(scroll) = options.scroll_time {
            params.push(("scroll".into(), time_value(scroll)));
        }
        if let Some(cache) = options.request_cache {
            params.push(("request_cache".into(), cache.to_string()));
        }
        if let Some(search_type) = options.search_type {
            params.push(("search_type".into(), search_type.as_str().into()));
        }
        params
    }

    /// Body for `_search/template` and `_render/template`
    pub fn template_body(&self, query: &SearchTemplateQuery) -> Result<Value, OdmError> {
        query.to_body()
    }

    /// Body for `_count`
    pub fn count_body(&self, query: &Query, metadata: Option<&EntityMetadata>) -> Result<Value, OdmError> {
        Ok(json!({ "query": self.query_clause(query, metadata)? }))
    }

    /// Query parameters for a single-document index request
    pub fn index_params(&self, query: &IndexQuery, default_refresh: RefreshPolicy) -> Params {
        let mut params = Params::new();
        if let Some(version) = query.version {
            params.push(("version".into(), version.to_string()));
            params.push(("version_type".into(), "external".into()));
        }
        if let Some(seq) = query.seq_no_primary_term {
            params.push(("if_seq_no".into(), seq.seq_no.to_string()));
            params.push(("if_primary_term".into(), seq.primary_term.to_string()));
        }
        if query.op_type == Some(WriteType::Create) {
            params.push(("op_type".into(), "create".into()));
        }
        if let Some(routing) = &query.routing {
            params.push(("routing".into(), routing.clone()));
        }
        push_refresh(&mut params, query.refresh.unwrap_or(default_refresh));
        params
    }

    /// Body for `_update/{id}`
    pub fn update_body(&self, update: &UpdateQuery) -> Result<Value, OdmError> {
        let mut body = Map::new();

        match (&update.document, &update.script) {
            (None, None) => {
                return Err(OdmError::InvalidQuery("update needs a document or a script".into()));
            }
            (document, script) => {
                if let Some(document) = document {
                    body.insert("doc".into(), Value::Object(document.clone()));
                }
                if let Some(script) = script {
                    body.insert("script".into(), script.to_json());
                }
            }
        }

        if let Some(upsert) = &update.upsert {
            body.insert("upsert".into(), Value::Object(upsert.clone()));
        }
        if let Some(doc_as_upsert) = update.doc_as_upsert {
            body.insert("doc_as_upsert".into(), json!(doc_as_upsert));
        }
        if let Some(scripted_upsert) = update.scripted_upsert {
            body.insert("scripted_upsert".into(), json!(scripted_upsert));
        }
        if update.fetch_source {
            body.insert("_source".into(), json!(true));
        }
        Ok(Value::Object(body))
    }

    /// Query parameters for `_update/{id}`
    pub fn update_params(&self, update: &UpdateQuery, default_refresh: RefreshPolicy) -> Params {
        let mut params = Params::new();
        if let Some(retries) = update.retry_on_conflict {
            params.push(("retry_on_conflict".into(), retries.to_string()));
        }
        if let Some(routing) = &update.routing {
            params.push(("routing".into(), routing.clone()));
        }
        if let Some(seq) = update.seq_no_primary_term {
            params.push(("if_seq_no".into(), seq.seq_no.to_string()));
            params.push(("if_primary_term".into(), seq.primary_term.to_string()));
        }
        if let Some(timeout) = update.timeout {
            params.push(("timeout".into(), time_value(timeout)));
        }
        if let Some(shards) = &update.wait_for_active_shards {
            params.push(("wait_for_active_shards".into(), shards.clone()));
        }
        push_refresh(&mut params, update.refresh.unwrap_or(default_refresh));
        params
    }

    /// Body for `_update_by_query`
    pub fn update_by_query_body(
        &self,
        update: &UpdateQuery,
        metadata: Option<&EntityMetadata>,
    ) -> Result<Value, OdmError> {
        let query = update
            .query
            .as_ref()
            .ok_or_else(|| OdmError::InvalidQuery("update by query needs a query".into()))?;

        let mut body = Map::new();
        body.insert("query".into(), self.query_clause(query, metadata)?);
        if let Some(script) = &update.script {
            body.insert("script".into(), script.to_json());
        }
        if let Some(max_docs) = update.max_docs {
            body.insert("max_docs".into(), json!(max_docs));
        }
        Ok(Value::Object(body))
    }

    /// Query parameters for `_update_by_query`
    pub fn update_by_query_params(&self, update: &UpdateQuery, default_refresh: RefreshPolicy) -> Params {
        let mut params = Params::new();
        if let Some(conflicts) = update.conflicts {
            params.push(("conflicts".into(), conflicts.as_str().into()));
        }
        if let Some(routing) = update.routing.as_ref().or_else(|| {
            update.query.as_ref().and_then(|q| q.options().routing.as_ref())
        }) {
            params.push(("routing".into(), routing.clone()));
        }
        if let Some(timeout) = update.timeout {
            params.push(("timeout".into(), time_value(timeout)));
        }
        // By-query endpoints only take a boolean refresh
        if update.refresh.unwrap_or(default_refresh) != RefreshPolicy::None {
            params.push(("refresh".into(), "true".into()));
        }
        params
    }

    /// Body for `_delete_by_query`
    pub fn delete_by_query_body(
        &self,
        delete: &DeleteQuery,
        metadata: Option<&EntityMetadata>,
    ) -> Result<Value, OdmError> {
        let mut body = Map::new();
        body.insert("query".into(), self.query_clause(&delete.query, metadata)?);
        if let Some(max_docs) = delete.max_docs {
            body.insert("max_docs".into(), json!(max_docs));
        }
        Ok(Value::Object(body))
    }

    /// Query parameters for `_delete_by_query`
    pub fn delete_by_query_params(&self, delete: &DeleteQuery, default_refresh: RefreshPolicy) -> Params {
        let mut params = Params::new();
        if let Some(conflicts) = delete.conflicts {
            params.push(("conflicts".into(), conflicts.as_str().into()));
        }
        if let Some(routing) = &delete.query.options().routing {
            params.push(("routing".into(), routing.clone()));
        }
        if let Some(timeout) = delete.timeout {
            params.push(("timeout".into(), time_value(timeout)));
        }
        if delete.refresh.unwrap_or(default_refresh) != RefreshPolicy::None {
            params.push(("refresh".into(), "true".into()));
        }
        params
    }

    /// NDJSON lines for `_bulk`: action metadata, then the source or
    /// update body where the action has one
    pub fn bulk_lines(&self, operations: &[BulkOperation], index: &str) -> Result<Vec<Value>, OdmError> {
        let mut lines = Vec::with_capacity(operations.len() * 2);

        for operation in operations {
            match operation {
                BulkOperation::Index(query) => {
                    let mut action = Map::new();
                    action.insert("_index".into(), json!(index));
                    if let Some(id) = &query.id {
                        action.insert("_id".into(), json!(id));
                    }
                    if let Some(routing) = &query.routing {
                        action.insert("routing".into(), json!(routing));
                    }
                    if let Some(version) = query.version {
                        action.insert("version".into(), json!(version));
                        action.insert("version_type".into(), json!("external"));
                    }
                    if let Some(seq) = query.seq_no_primary_term {
                        action.insert("if_seq_no".into(), json!(seq.seq_no));
                        action.insert("if_primary_term".into(), json!(seq.primary_term));
                    }
                    let verb = match query.op_type {
                        Some(WriteType::Create) => "create",
                        _ => "index",
                    };
                    let mut line = Map::new();
                    line.insert(verb.into(), Value::Object(action));
                    lines.push(Value::Object(line));
                    lines.push(Value::Object(query.source.clone()));
                }
                BulkOperation::Update(update) => {
                    let id = update
                        .id
                        .as_ref()
                        .ok_or_else(|| OdmError::InvalidQuery("bulk update needs a document id".into()))?;
                    let mut action = Map::new();
                    action.insert("_index".into(), json!(index));
                    action.insert("_id".into(), json!(id));
                    if let Some(routing) = &update.routing {
                        action.insert("routing".into(), json!(routing));
                    }
                    if let Some(retries) = update.retry_on_conflict {
                        action.insert("retry_on_conflict".into(), json!(retries));
                    }
                    if let Some(seq) = update.seq_no_primary_term {
                        action.insert("if_seq_no".into(), json!(seq.seq_no));
                        action.insert("if_primary_term".into(), json!(seq.primary_term));
                    }
                    lines.push(json!({ "update": action }));
                    lines.push(self.update_body(update)?);
                }
                BulkOperation::Delete { id, routing } => {
                    let mut action = Map::new();
                    action.insert("_index".into(), json!(index));
                    action.insert("_id".into(), json!(id));
                    if let Some(routing) = routing {
                        action.insert("routing".into(), json!(routing));
                    }
                    lines.push(json!({ "delete": action }));
                }
            }
        }

        Ok(lines)
    }

    /// Query parameters for `_bulk`
    pub fn bulk_params(&self, options: &BulkOptions, default_refresh: RefreshPolicy) -> Params {
        let mut params = Params::new();
        if let Some(timeout) = options.timeout {
            params.push(("timeout".into(), time_value(timeout)));
        }
        if let Some(pipeline) = &options.pipeline {
            params.push(("pipeline".into(), pipeline.clone()));
        }
        if let Some(routing) = &options.routing {
            params.push(("routing".into(), routing.clone()));
        }
        if let Some(shards) = &options.wait_for_active_shards {
            params.push(("wait_for_active_shards".into(), shards.clone()));
        }
        push_refresh(&mut params, options.refresh.unwrap_or(default_refresh));
        params
    }

    /// NDJSON lines for `_msearch`: header, then body, per query
    pub fn multi_search_lines(
        &self,
        queries: &[Query],
        index: &str,
        metadata: Option<&EntityMetadata>,
    ) -> Result<Vec<Value>, OdmError> {
        let mut lines = Vec::with_capacity(queries.len() * 2);
        for query in queries {
            let mut header = Map::new();
            header.insert("index".into(), json!(index));
            for (key, value) in self.search_params(query) {
                // Scroll is not allowed inside _msearch
                if key != "scroll" {
                    header.insert(key, json!(value));
                }
            }
            lines.push(Value::Object(header));
            lines.push(self.search_body(query, metadata)?);
        }
        Ok(lines)
    }
}

fn push_refresh(params: &mut Params, refresh: RefreshPolicy) {
    if let Some(value) = refresh.as_param() {
        params.push(("refresh".into(), value.into()));
    }
}

fn translate_path(path: &str, metadata: Option<&EntityMetadata>) -> String {
    metadata.map_or_else(|| path.to_string(), |m| m.field_name_for_path(path))
}
