// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search API: search, paging, multi-search and search templates.

use serde_json::Value;
use tracing::debug;

use super::{IndexCoordinates, SearchOperations};
use crate::error::OdmError;
use crate::mapping::{Entity, EntityMetadata};
use crate::metrics::{self, LatencyTimer};
use crate::query::{Pageable, Query, SearchTemplateQuery};
use crate::response::{ResponseConverter, SearchHit, SearchHits, SearchPage};
use crate::transport::{path, EngineRequest};

impl SearchOperations {
    /// Search the index of `T`
    pub async fn search<T: Entity>(&self, query: &Query) -> Result<SearchHits<T>, OdmError> {
        let coordinates = self.coordinates_for::<T>()?;
        self.search_in(query, &coordinates).await
    }

    /// Search explicit coordinates, reading hits with the metadata of `T`.
    ///
    /// Template queries go to `_search/template`.
    pub async fn search_in<T: Entity>(
        &self,
        query: &Query,
        coordinates: &IndexCoordinates,
    ) -> Result<SearchHits<T>, OdmError> {
        if let Query::Template(template) = query {
            return self.search_template_in(template, coordinates).await;
        }

        let mut timer = LatencyTimer::new("search");
        let metadata = self.metadata_for::<T>()?;
        let index = self.index_path(coordinates);

        let request = EngineRequest::post(path(&[&index, "_search"]))
            .params(self.factory.search_params(query))
            .json(self.factory.search_body(query, Some(&metadata))?);

        debug!(index = %index, kind = query.kind(), "Searching");
        let body = self.execute_ok(request, &index, None).await?;
        let hits = self.read_hits(&body, &metadata)?;

        metrics::record_search_hits(hits.len());
        timer.success();
        Ok(hits)
    }

    /// First hit of a query, if any
    pub async fn search_one<T: Entity>(&self, query: &Query) -> Result<Option<SearchHit<T>>, OdmError> {
        let query = query.clone().with_pageable(Pageable::of(0, 1));
        let hits = self.search::<T>(&query).await?;
        Ok(hits.hits.into_iter().next())
    }

    /// One page of results; the query's pageable (or the default page) is kept
    /// alongside the hits for page arithmetic
    pub async fn search_for_page<T: Entity>(&self, query: &Query) -> Result<SearchPage<T>, OdmError> {
        let pageable = query
            .options()
            .pageable
            .unwrap_or_else(|| Pageable::of(0, self.config.default_page_size));
        let query = query.clone().with_pageable(pageable);
        let hits = self.search::<T>(&query).await?;
        Ok(SearchPage::new(hits, pageable))
    }

    /// Several searches in one `_msearch` round trip, results in query order
    pub async fn multi_search<T: Entity>(&self, queries: &[Query]) -> Result<Vec<SearchHits<T>>, OdmError> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        if queries.iter().any(|q| matches!(q, Query::Template(_))) {
            return Err(OdmError::InvalidQuery(
                "template queries cannot be part of a multi search".into(),
            ));
        }

        let mut timer = LatencyTimer::new("multi_search");
        let metadata = self.metadata_for::<T>()?;
        let index = self.index_path(&self.coordinates_for::<T>()?);

        let lines = self.factory.multi_search_lines(queries, &index, Some(&metadata))?;
        let request = EngineRequest::post("/_msearch").ndjson(lines);

        let body = self.execute_ok(request, &index, None).await?;
        let mut results = ResponseConverter::multi_search(&body, &index, |doc| self.read_document(&metadata, doc))?;
        for hits in &mut results {
            name_highlights(hits, &metadata);
        }

        metrics::record_search_hits(results.iter().map(SearchHits::len).sum());
        timer.success();
        Ok(results)
    }

    /// Run a search template against the index of `T`
    pub async fn search_template<T: Entity>(&self, query: &SearchTemplateQuery) -> Result<SearchHits<T>, OdmError> {
        let coordinates = self.coordinates_for::<T>()?;
        self.search_template_in(query, &coordinates).await
    }

    pub async fn search_template_in<T: Entity>(
        &self,
        query: &SearchTemplateQuery,
        coordinates: &IndexCoordinates,
    ) -> Result<SearchHits<T>, OdmError> {
        let mut timer = LatencyTimer::new("search_template");
        let metadata = self.metadata_for::<T>()?;
        let index = self.index_path(coordinates);

        let mut request = EngineRequest::post(path(&[&index, "_search", "template"]))
            .json(self.factory.template_body(query)?);
        if let Some(routing) = &query.options.routing {
            request = request.param("routing", routing.clone());
        }
        if let Some(preference) = &query.options.preference {
            request = request.param("preference", preference.clone());
        }

        debug!(index = %index, template = ?query.id, "Searching with template");
        let body = self.execute_ok(request, &index, None).await?;
        let hits = self.read_hits(&body, &metadata)?;

        metrics::record_search_hits(hits.len());
        timer.success();
        Ok(hits)
    }

    /// Render a template without running it, returning the produced query body
    pub async fn render_template(&self, query: &SearchTemplateQuery) -> Result<Value, OdmError> {
        let request = EngineRequest::post("/_render/template").json(self.factory.template_body(query)?);
        let body = self.execute_ok(request, "", None).await?;
        body.get("template_output")
            .cloned()
            .ok_or_else(|| OdmError::Conversion("render response without 'template_output'".into()))
    }

    /// Parse a search body and read each hit as `T`
    pub(super) fn read_hits<T: Entity>(&self, body: &Value, metadata: &EntityMetadata) -> Result<SearchHits<T>, OdmError> {
        let mut hits = ResponseConverter::search_hits(body, |doc| self.read_document(metadata, doc))?;
        name_highlights(&mut hits, metadata);
        Ok(hits)
    }
}

/// Key highlight fragments by property path instead of engine field name
fn name_highlights<T>(hits: &mut SearchHits<T>, metadata: &EntityMetadata) {
    for hit in &mut hits.hits {
        hit.highlight_fields = std::mem::take(&mut hit.highlight_fields)
            .into_iter()
            .map(|(field, fragments)| (metadata.property_path_for_field(&field), fragments))
            .collect();
    }
}
