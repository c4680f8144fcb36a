// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Document API: save, get, exists, delete, update, bulk and count.
//!
//! ```text
//! save(entity)
//!   ├─ DocumentConverter::write  → id, routing, version, seq_no/primary_term, source
//!   ├─ PUT /{index}/_doc/{id}    (POST /{index}/_doc without id)
//!   │     ?if_seq_no&if_primary_term | ?version&version_type=external
//!   │     ?op_type=create ?routing ?refresh
//!   └─ update_entity_ids         ← _id, _seq_no, _primary_term, _version
//! ```

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{IndexCoordinates, RefreshPolicy, SearchOperations};
use crate::convert::Document;
use crate::error::OdmError;
use crate::mapping::{Entity, EntityMetadata};
use crate::metrics::{self, LatencyTimer};
use crate::query::{BulkOperation, BulkOptions, DeleteQuery, IndexQuery, Query, UpdateQuery};
use crate::response::{BulkResult, ByQueryResponse, ResponseConverter, UpdateResponse};
use crate::transport::{path, EngineRequest};

impl SearchOperations {
    // ═══════════════════════════════════════════════════════════════════════════
    // Save / index
    // ═══════════════════════════════════════════════════════════════════════════

    /// Save an entity to its own index.
    ///
    /// Returns the entity with engine-assigned id, sequence number, primary
    /// term and version filled in.
    pub async fn save<T: Entity>(&self, entity: T) -> Result<T, OdmError> {
        let coordinates = self.coordinates_for::<T>()?;
        self.save_to(entity, &coordinates).await
    }

    /// Save an entity to explicit coordinates
    pub async fn save_to<T: Entity>(&self, entity: T, coordinates: &IndexCoordinates) -> Result<T, OdmError> {
        let mut timer = LatencyTimer::new("save");
        let metadata = self.metadata_for::<T>()?;
        let document = self.converter.write(&entity)?;
        let query = index_query(&metadata, document);

        let body = self.index_raw(&query, coordinates).await?;
        let id = body
            .get("_id")
            .and_then(Value::as_str)
            .ok_or_else(|| OdmError::Conversion("index response without '_id'".into()))?;

        let saved = self.converter.update_entity_ids(
            entity,
            id,
            body.get("_seq_no").and_then(Value::as_i64),
            body.get("_primary_term").and_then(Value::as_i64),
            body.get("_version").and_then(Value::as_i64),
        )?;
        timer.success();
        Ok(saved)
    }

    /// Index a raw document, returning its id
    pub async fn index(&self, query: IndexQuery, coordinates: &IndexCoordinates) -> Result<String, OdmError> {
        let mut timer = LatencyTimer::new("index");
        let body = self.index_raw(&query, coordinates).await?;
        let id = body
            .get("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| OdmError::Conversion("index response without '_id'".into()))?;
        timer.success();
        Ok(id)
    }

    async fn index_raw(&self, query: &IndexQuery, coordinates: &IndexCoordinates) -> Result<Value, OdmError> {
        let index = self.index_path(coordinates);
        let request = match &query.id {
            Some(id) => EngineRequest::put(path(&[&index, "_doc", id])),
            None => EngineRequest::post(path(&[&index, "_doc"])),
        }
        .params(self.factory.index_params(query, self.config.refresh_policy))
        .json(Value::Object(query.source.clone()));

        debug!(index = %index, id = ?query.id, "Indexing document");
        self.execute_ok(request, &index, query.id.as_deref()).await
    }

    /// Save several entities with one bulk request.
    ///
    /// Any failed item fails the call with [`OdmError::BulkFailure`].
    pub async fn save_all<T: Entity>(&self, entities: Vec<T>) -> Result<Vec<T>, OdmError> {
        if entities.is_empty() {
            return Ok(entities);
        }

        let mut timer = LatencyTimer::new("save_all");
        let metadata = self.metadata_for::<T>()?;
        let coordinates = self.coordinates_for::<T>()?;

        let operations = entities
            .iter()
            .map(|entity| Ok(BulkOperation::Index(index_query(&metadata, self.converter.write(entity)?))))
            .collect::<Result<Vec<_>, OdmError>>()?;

        let result = self.bulk(operations, BulkOptions::default(), &coordinates).await?;

        let saved = entities
            .into_iter()
            .zip(result.items.iter())
            .map(|(entity, item)| match item.id.as_deref() {
                Some(id) => self
                    .converter
                    .update_entity_ids(entity, id, item.seq_no, item.primary_term, item.version),
                None => Ok(entity),
            })
            .collect::<Result<Vec<_>, _>>()?;

        timer.success();
        Ok(saved)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Get / exists
    // ═══════════════════════════════════════════════════════════════════════════

    /// Get an entity by id; `None` when the document (or index) is missing
    pub async fn get<T: Entity>(&self, id: &str) -> Result<Option<T>, OdmError> {
        let coordinates = self.coordinates_for::<T>()?;
        self.get_from(id, &coordinates).await
    }

    pub async fn get_from<T: Entity>(&self, id: &str, coordinates: &IndexCoordinates) -> Result<Option<T>, OdmError> {
        let mut timer = LatencyTimer::new("get");
        let metadata = self.metadata_for::<T>()?;
        let index = self.index_path(coordinates);

        let response = self.execute(EngineRequest::get(path(&[&index, "_doc", id]))).await?;
        if response.is_not_found() {
            timer.success();
            return Ok(None);
        }
        if !response.is_success() {
            return Err(OdmError::from_engine_response(response.status, response.body.as_ref(), &index, Some(id)));
        }

        let entity = match ResponseConverter::get_document(response.body_or_null())? {
            Some(document) => Some(self.read_document(&metadata, &document)?),
            None => None,
        };
        timer.success();
        Ok(entity)
    }

    /// Get several entities; missing ids are skipped
    pub async fn multi_get<T: Entity>(&self, ids: &[&str]) -> Result<Vec<T>, OdmError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut timer = LatencyTimer::new("multi_get");
        let metadata = self.metadata_for::<T>()?;
        let index = self.index_path(&self.coordinates_for::<T>()?);

        let request = EngineRequest::post(path(&[&index, "_mget"])).json(json!({ "ids": ids }));
        let body = self.execute_ok(request, &index, None).await?;

        let entities = ResponseConverter::multi_get_documents(&body)?
            .iter()
            .map(|document| self.read_document(&metadata, document))
            .collect::<Result<Vec<T>, _>>()?;
        timer.success();
        Ok(entities)
    }

    pub async fn exists<T: Entity>(&self, id: &str) -> Result<bool, OdmError> {
        let index = self.index_path(&self.coordinates_for::<T>()?);
        let response = self.execute(EngineRequest::head(path(&[&index, "_doc", id]))).await?;
        match response.status {
            404 => Ok(false),
            _ if response.is_success() => Ok(true),
            status => Err(OdmError::from_engine_response(status, response.body.as_ref(), &index, Some(id))),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Delete
    // ═══════════════════════════════════════════════════════════════════════════

    /// Delete by id, returning the id when something was deleted
    pub async fn delete<T: Entity>(&self, id: &str) -> Result<Option<String>, OdmError> {
        let coordinates = self.coordinates_for::<T>()?;
        self.delete_from(id, None, &coordinates).await
    }

    /// Delete the document of an entity, using its id and routing
    pub async fn delete_entity<T: Entity>(&self, entity: &T) -> Result<Option<String>, OdmError> {
        let document = self.converter.write(entity)?;
        let id = document
            .id
            .ok_or_else(|| OdmError::InvalidQuery("cannot delete an entity without id".into()))?;
        let coordinates = self.coordinates_for::<T>()?;
        self.delete_from(&id, document.routing.as_deref(), &coordinates).await
    }

    pub async fn delete_from(
        &self,
        id: &str,
        routing: Option<&str>,
        coordinates: &IndexCoordinates,
    ) -> Result<Option<String>, OdmError> {
        let mut timer = LatencyTimer::new("delete");
        let index = self.index_path(coordinates);

        let mut request = EngineRequest::delete(path(&[&index, "_doc", id]));
        if let Some(routing) = routing {
            request = request.param("routing", routing);
        }
        if let Some(refresh) = self.config.refresh_policy.as_param() {
            request = request.param("refresh", refresh);
        }

        let response = self.execute(request).await?;
        if response.is_not_found() {
            timer.success();
            return Ok(None);
        }
        if !response.is_success() {
            return Err(OdmError::from_engine_response(response.status, response.body.as_ref(), &index, Some(id)));
        }

        timer.success();
        Ok(response
            .body_or_null()
            .get("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(id.to_string())))
    }

    /// Delete every document of `T` matching `query`
    pub async fn delete_by_query<T: Entity>(&self, query: &Query) -> Result<ByQueryResponse, OdmError> {
        let coordinates = self.coordinates_for::<T>()?;
        self.delete_by_query_in(DeleteQuery::new(query.clone()), &coordinates).await
    }

    pub async fn delete_by_query_in(
        &self,
        delete: DeleteQuery,
        coordinates: &IndexCoordinates,
    ) -> Result<ByQueryResponse, OdmError> {
        let mut timer = LatencyTimer::new("delete_by_query");
        let index = self.index_path(coordinates);
        let metadata = self.metadata_for_coordinates(coordinates);

        let request = EngineRequest::post(path(&[&index, "_delete_by_query"]))
            .params(self.factory.delete_by_query_params(&delete, self.config.refresh_policy))
            .json(self.factory.delete_by_query_body(&delete, metadata.as_deref())?);

        let response = ResponseConverter::by_query(&self.execute_ok(request, &index, None).await?);
        debug!(index = %index, deleted = response.deleted, "Deleted by query");
        timer.success();
        Ok(response)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Update
    // ═══════════════════════════════════════════════════════════════════════════

    /// Partial or scripted update of one document
    pub async fn update(&self, update: UpdateQuery, coordinates: &IndexCoordinates) -> Result<UpdateResponse, OdmError> {
        let mut timer = LatencyTimer::new("update");
        let id = update
            .id
            .clone()
            .ok_or_else(|| OdmError::InvalidQuery("update needs a document id".into()))?;
        let index = self.index_path(coordinates);

        let request = EngineRequest::post(path(&[&index, "_update", &id]))
            .params(self.factory.update_params(&update, self.config.refresh_policy))
            .json(self.factory.update_body(&update)?);

        let response = UpdateResponse::from_json(&self.execute_ok(request, &index, Some(&id)).await?)?;
        timer.success();
        Ok(response)
    }

    /// Write the entity's non-null properties as a partial document update
    pub async fn update_entity<T: Entity>(&self, entity: &T) -> Result<UpdateResponse, OdmError> {
        let document = self.converter.write(entity)?;
        let id = document
            .id
            .clone()
            .ok_or_else(|| OdmError::InvalidQuery("cannot update an entity without id".into()))?;

        let mut update = UpdateQuery::for_id(id).document(self.converter.partial_update(entity)?);
        if let Some(seq) = document.seq_no_primary_term() {
            update = update.if_seq_no_primary_term(seq);
        }
        if let Some(routing) = document.routing {
            update = update.routing(routing);
        }

        let coordinates = self.coordinates_for::<T>()?;
        self.update(update, &coordinates).await
    }

    pub async fn update_by_query(
        &self,
        update: UpdateQuery,
        coordinates: &IndexCoordinates,
    ) -> Result<ByQueryResponse, OdmError> {
        let mut timer = LatencyTimer::new("update_by_query");
        let index = self.index_path(coordinates);
        let metadata = self.metadata_for_coordinates(coordinates);

        let request = EngineRequest::post(path(&[&index, "_update_by_query"]))
            .params(self.factory.update_by_query_params(&update, self.config.refresh_policy))
            .json(self.factory.update_by_query_body(&update, metadata.as_deref())?);

        let response = ResponseConverter::by_query(&self.execute_ok(request, &index, None).await?);
        debug!(index = %index, updated = response.updated, conflicts = response.version_conflicts, "Updated by query");
        timer.success();
        Ok(response)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Bulk
    // ═══════════════════════════════════════════════════════════════════════════

    /// Run bulk actions; failed items fail the call with [`OdmError::BulkFailure`]
    pub async fn bulk(
        &self,
        operations: Vec<BulkOperation>,
        options: BulkOptions,
        coordinates: &IndexCoordinates,
    ) -> Result<BulkResult, OdmError> {
        if operations.is_empty() {
            return Ok(BulkResult::default());
        }

        let mut timer = LatencyTimer::new("bulk");
        let index = self.index_path(coordinates);
        let lines = self.factory.bulk_lines(&operations, &index)?;

        let request = EngineRequest::post("/_bulk")
            .params(self.factory.bulk_params(&options, self.config.refresh_policy))
            .ndjson(lines);

        let result = ResponseConverter::bulk(&self.execute_ok(request, &index, None).await?);
        let failed = result.items.iter().filter(|i| i.is_failed()).count();
        metrics::record_bulk_items(result.items.len() - failed, failed);

        if failed > 0 {
            warn!(index = %index, failed, total = result.items.len(), "Bulk request had failures");
        }
        let result = result.into_result()?;
        timer.success();
        Ok(result)
    }

    pub async fn bulk_index(
        &self,
        queries: Vec<IndexQuery>,
        options: BulkOptions,
        coordinates: &IndexCoordinates,
    ) -> Result<BulkResult, OdmError> {
        self.bulk(queries.into_iter().map(BulkOperation::Index).collect(), options, coordinates)
            .await
    }

    pub async fn bulk_update(
        &self,
        updates: Vec<UpdateQuery>,
        options: BulkOptions,
        coordinates: &IndexCoordinates,
    ) -> Result<BulkResult, OdmError> {
        self.bulk(updates.into_iter().map(BulkOperation::Update).collect(), options, coordinates)
            .await
    }

    pub async fn bulk_delete(
        &self,
        ids: &[&str],
        options: BulkOptions,
        coordinates: &IndexCoordinates,
    ) -> Result<BulkResult, OdmError> {
        let operations = ids
            .iter()
            .map(|id| BulkOperation::Delete {
                id: (*id).to_string(),
                routing: None,
            })
            .collect();
        self.bulk(operations, options, coordinates).await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Count
    // ═══════════════════════════════════════════════════════════════════════════

    pub async fn count<T: Entity>(&self, query: &Query) -> Result<u64, OdmError> {
        let coordinates = self.coordinates_for::<T>()?;
        self.count_in(query, &coordinates).await
    }

    pub async fn count_in(&self, query: &Query, coordinates: &IndexCoordinates) -> Result<u64, OdmError> {
        let mut timer = LatencyTimer::new("count");
        let index = self.index_path(coordinates);
        let metadata = self.metadata_for_coordinates(coordinates);

        let mut request = EngineRequest::post(path(&[&index, "_count"]))
            .json(self.factory.count_body(query, metadata.as_deref())?);
        if let Some(routing) = &query.options().routing {
            request = request.param("routing", routing.clone());
        }

        let count = ResponseConverter::count(&self.execute_ok(request, &index, None).await?)?;
        timer.success();
        Ok(count)
    }

    /// Document → entity of the given metadata
    pub(super) fn read_document<T: Entity>(&self, metadata: &EntityMetadata, document: &Document) -> Result<T, OdmError> {
        self.converter.read_value(metadata, document).map_err(|e| {
            metrics::record_conversion_error("read");
            e
        })
    }
}

/// Index request for a converted entity
fn index_query(metadata: &EntityMetadata, document: Document) -> IndexQuery {
    let seq_no_primary_term = document.seq_no_primary_term();
    IndexQuery {
        id: document.id,
        source: document.source,
        version: if metadata.is_versioned() { document.version } else { None },
        seq_no_primary_term,
        op_type: Some(metadata.write_type),
        routing: document.routing,
        refresh: None,
    }
}
