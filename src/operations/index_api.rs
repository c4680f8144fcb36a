// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index API: lifecycle, mapping, settings and aliases of one index (or
//! several, for reads).
//!
//! ```text
//! IndexOperations ─┬─ create / create_with / create_with_mapping / ensure
//!                  ├─ delete / exists / refresh
//!                  ├─ put_mapping / get_mapping / create_mapping
//!                  ├─ create_settings / get_settings
//!                  ├─ alter_aliases / get_aliases / get_aliases_for_index
//!                  └─ templates (see templates.rs)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::{IndexCoordinates, SearchOperations};
use crate::error::OdmError;
use crate::mapping::{Entity, EntityMetadata, IndexSettings, MappingBuilder, SettingsBuilder};
use crate::metrics::{self, LatencyTimer};
use crate::transport::{path, EngineRequest};

impl SearchOperations {
    /// Index operations bound to the index of `T`
    pub fn index_ops<T: Entity>(&self) -> Result<IndexOperations<'_>, OdmError> {
        let metadata = self.metadata_for::<T>()?;
        Ok(IndexOperations {
            ops: self,
            coordinates: IndexCoordinates::of(metadata.index_name.clone()),
            metadata: Some(metadata),
        })
    }

    /// Index operations bound to explicit coordinates. Metadata registered
    /// for the first index is used for mapping and settings, if any.
    pub fn index_ops_for(&self, coordinates: IndexCoordinates) -> IndexOperations<'_> {
        let metadata = self.metadata_for_coordinates(&coordinates);
        IndexOperations {
            ops: self,
            coordinates,
            metadata,
        }
    }
}

/// Index-level operations for one set of coordinates
pub struct IndexOperations<'a> {
    pub(super) ops: &'a SearchOperations,
    pub(super) coordinates: IndexCoordinates,
    pub(super) metadata: Option<Arc<EntityMetadata>>,
}

impl IndexOperations<'_> {
    pub fn coordinates(&self) -> &IndexCoordinates {
        &self.coordinates
    }

    fn index(&self) -> String {
        self.ops.index_path(&self.coordinates)
    }

    fn metadata(&self) -> Result<&EntityMetadata, OdmError> {
        self.metadata.as_deref().ok_or_else(|| {
            OdmError::Mapping(format!(
                "no entity registered for index '{}'",
                self.coordinates.index_name()
            ))
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════════

    /// Create the index with the entity's settings and aliases, no mapping
    pub async fn create(&self) -> Result<bool, OdmError> {
        self.create_with(self.create_settings(), None).await
    }

    /// Create the index with the entity's settings, mapping and aliases
    pub async fn create_with_mapping(&self) -> Result<bool, OdmError> {
        let mapping = self.create_mapping()?;
        self.create_with(self.create_settings(), Some(mapping)).await
    }

    /// Create the index with explicit settings and optional mapping
    pub async fn create_with(&self, settings: Value, mapping: Option<Value>) -> Result<bool, OdmError> {
        let mut timer = LatencyTimer::new("index_create");
        let index = self.index();

        let mut body = Map::new();
        if settings.as_object().is_some_and(|s| !s.is_empty()) {
            body.insert("settings".into(), settings);
        }
        if let Some(mapping) = mapping {
            body.insert("mappings".into(), mapping);
        }
        if let Some(metadata) = &self.metadata {
            if !metadata.aliases.is_empty() {
                let aliases: Map<String, Value> = metadata
                    .aliases
                    .iter()
                    .map(|alias| (alias.name.clone(), alias.to_json()))
                    .collect();
                body.insert("aliases".into(), Value::Object(aliases));
            }
        }

        let request = EngineRequest::put(path(&[&index])).json(Value::Object(body));
        let result = self.ops.execute_ok(request, &index, None).await;
        metrics::record_index_operation("create", result.is_ok());

        let acknowledged = acknowledged(&result?);
        info!(index = %index, acknowledged, "Index created");
        timer.success();
        Ok(acknowledged)
    }

    /// Create the index with mapping unless it exists or the entity opts out.
    ///
    /// Returns true when the index was created by this call.
    pub async fn ensure(&self) -> Result<bool, OdmError> {
        if self.metadata.as_ref().is_some_and(|m| !m.create_index) {
            debug!(index = %self.index(), "Index creation disabled for entity");
            return Ok(false);
        }
        if self.exists().await? {
            return Ok(false);
        }
        match self.create_with_mapping().await {
            Ok(created) => Ok(created),
            // Lost a creation race with another writer
            Err(OdmError::IndexAlreadyExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete the index; false when it did not exist
    pub async fn delete(&self) -> Result<bool, OdmError> {
        let index = self.index();
        let response = self.ops.execute(EngineRequest::delete(path(&[&index]))).await?;
        if response.is_not_found() {
            return Ok(false);
        }
        if !response.is_success() {
            metrics::record_index_operation("delete", false);
            return Err(OdmError::from_engine_response(response.status, response.body.as_ref(), &index, None));
        }
        metrics::record_index_operation("delete", true);
        info!(index = %index, "Index deleted");
        Ok(acknowledged(response.body_or_null()))
    }

    pub async fn exists(&self) -> Result<bool, OdmError> {
        let index = self.index();
        let response = self.ops.execute(EngineRequest::head(path(&[&index]))).await?;
        match response.status {
            404 => Ok(false),
            _ if response.is_success() => Ok(true),
            status => Err(OdmError::from_engine_response(status, response.body.as_ref(), &index, None)),
        }
    }

    /// Make recent writes visible to search
    pub async fn refresh(&self) -> Result<(), OdmError> {
        let index = self.index();
        self.ops
            .execute_ok(EngineRequest::post(path(&[&index, "_refresh"])), &index, None)
            .await?;
        metrics::record_index_operation("refresh", true);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Mapping / settings
    // ═══════════════════════════════════════════════════════════════════════════

    /// Mapping generated from the entity metadata, not sent anywhere
    pub fn create_mapping(&self) -> Result<Value, OdmError> {
        Ok(MappingBuilder::build(self.metadata()?))
    }

    /// Settings generated from the entity metadata; engine defaults when the
    /// coordinates have no entity
    pub fn create_settings(&self) -> Value {
        match &self.metadata {
            Some(metadata) => SettingsBuilder::build(&metadata.settings),
            None => SettingsBuilder::build(&IndexSettings::empty()),
        }
    }

    /// Put the generated mapping
    pub async fn put_mapping(&self) -> Result<bool, OdmError> {
        let mapping = self.create_mapping()?;
        self.put_mapping_value(mapping).await
    }

    pub async fn put_mapping_value(&self, mapping: Value) -> Result<bool, OdmError> {
        let index = self.index();
        let request = EngineRequest::put(path(&[&index, "_mapping"])).json(mapping);
        let result = self.ops.execute_ok(request, &index, None).await;
        metrics::record_index_operation("put_mapping", result.is_ok());
        Ok(acknowledged(&result?))
    }

    /// Mapping of the first index in the response
    pub async fn get_mapping(&self) -> Result<Value, OdmError> {
        let index = self.index();
        let body = self
            .ops
            .execute_ok(EngineRequest::get(path(&[&index, "_mapping"])), &index, None)
            .await?;
        Ok(first_index_section(&body, "mappings"))
    }

    /// Settings of the first index in the response, optionally merged with
    /// engine defaults
    pub async fn get_settings(&self, include_defaults: bool) -> Result<Value, OdmError> {
        let index = self.index();
        let mut request = EngineRequest::get(path(&[&index, "_settings"]));
        if include_defaults {
            request = request.param("include_defaults", "true");
        }

        let body = self.ops.execute_ok(request, &index, None).await?;
        let mut settings = first_index_section(&body, "settings");
        if include_defaults {
            let defaults = first_index_section(&body, "defaults");
            // Explicit settings win over defaults
            let mut merged = defaults;
            crate::mapping::deep_merge(&mut merged, settings);
            settings = merged;
        }
        Ok(settings)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Aliases
    // ═══════════════════════════════════════════════════════════════════════════

    /// Apply alias actions atomically
    pub async fn alter_aliases(&self, actions: AliasActions) -> Result<bool, OdmError> {
        if actions.actions.is_empty() {
            return Err(OdmError::InvalidQuery("no alias actions given".into()));
        }

        let body = json!({
            "actions": actions
                .actions
                .iter()
                .map(|action| action.to_json(|name| self.ops.context.prefixed(name)))
                .collect::<Vec<_>>(),
        });
        let request = EngineRequest::post("/_aliases").json(body);
        let result = self.ops.execute_ok(request, &self.index(), None).await;
        metrics::record_index_operation("alter_aliases", result.is_ok());

        let acknowledged = acknowledged(&result?);
        info!(actions = actions.actions.len(), acknowledged, "Aliases altered");
        Ok(acknowledged)
    }

    /// Index name → aliases, for the given alias names (patterns allowed)
    pub async fn get_aliases(&self, alias_names: &[&str]) -> Result<HashMap<String, Vec<AliasData>>, OdmError> {
        let request = EngineRequest::get(path(&["_alias", &alias_names.join(",")]));
        self.fetch_aliases(request).await
    }

    /// Index name → aliases, for the given indices (patterns allowed)
    pub async fn get_aliases_for_index(&self, indices: &[&str]) -> Result<HashMap<String, Vec<AliasData>>, OdmError> {
        let indices = indices
            .iter()
            .map(|name| self.ops.context.prefixed(name))
            .collect::<Vec<_>>()
            .join(",");
        let request = EngineRequest::get(path(&[&indices, "_alias"]));
        self.fetch_aliases(request).await
    }

    async fn fetch_aliases(&self, request: EngineRequest) -> Result<HashMap<String, Vec<AliasData>>, OdmError> {
        let response = self.ops.execute(request).await?;
        // A missing alias answers 404 next to any aliases that were found
        if !response.is_success() && !response.is_not_found() {
            return Err(OdmError::from_engine_response(
                response.status,
                response.body.as_ref(),
                &self.index(),
                None,
            ));
        }

        let Some(indices) = response.body_or_null().as_object() else {
            return Ok(HashMap::new());
        };
        Ok(indices
            .iter()
            .filter_map(|(index, entry)| {
                let aliases = entry.get("aliases")?;
                Some((index.clone(), aliases_from_json(Some(aliases))))
            })
            .collect())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Alias types
// ═══════════════════════════════════════════════════════════════════════════════

/// Parameters of an `add` / `remove` alias action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasActionParameters {
    pub indices: Vec<String>,
    pub aliases: Vec<String>,
    pub filter: Option<Value>,
    pub routing: Option<String>,
    pub index_routing: Option<String>,
    pub search_routing: Option<String>,
    pub is_write_index: Option<bool>,
    pub is_hidden: Option<bool>,
}

impl AliasActionParameters {
    pub fn new<I, A, S, T>(indices: I, aliases: A) -> Self
    where
        I: IntoIterator<Item = S>,
        A: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            indices: indices.into_iter().map(Into::into).collect(),
            aliases: aliases.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn index_routing(mut self, routing: impl Into<String>) -> Self {
        self.index_routing = Some(routing.into());
        self
    }

    pub fn search_routing(mut self, routing: impl Into<String>) -> Self {
        self.search_routing = Some(routing.into());
        self
    }

    pub fn write_index(mut self, is_write_index: bool) -> Self {
        self.is_write_index = Some(is_write_index);
        self
    }

    pub fn hidden(mut self, is_hidden: bool) -> Self {
        self.is_hidden = Some(is_hidden);
        self
    }

    fn to_json(&self, prefixed: &impl Fn(&str) -> String, with_options: bool) -> Value {
        let mut body = Map::new();
        let indices: Vec<String> = self.indices.iter().map(|i| prefixed(i)).collect();
        body.insert("indices".into(), json!(indices));
        body.insert("aliases".into(), json!(self.aliases));
        if !with_options {
            return Value::Object(body);
        }
        if let Some(filter) = &self.filter {
            body.insert("filter".into(), filter.clone());
        }
        if let Some(routing) = &self.routing {
            body.insert("routing".into(), json!(routing));
        }
        if let Some(routing) = &self.index_routing {
            body.insert("index_routing".into(), json!(routing));
        }
        if let Some(routing) = &self.search_routing {
            body.insert("search_routing".into(), json!(routing));
        }
        if let Some(write) = self.is_write_index {
            body.insert("is_write_index".into(), json!(write));
        }
        if let Some(hidden) = self.is_hidden {
            body.insert("is_hidden".into(), json!(hidden));
        }
        Value::Object(body)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AliasAction {
    Add(AliasActionParameters),
    Remove(AliasActionParameters),
    /// Delete the indices themselves
    RemoveIndex { indices: Vec<String> },
}

impl AliasAction {
    fn to_json(&self, prefixed: impl Fn(&str) -> String) -> Value {
        match self {
            AliasAction::Add(params) => json!({ "add": params.to_json(&prefixed, true) }),
            AliasAction::Remove(params) => json!({ "remove": params.to_json(&prefixed, false) }),
            AliasAction::RemoveIndex { indices } => {
                let indices: Vec<String> = indices.iter().map(|i| prefixed(i)).collect();
                json!({ "remove_index": { "indices": indices } })
            }
        }
    }
}

/// Ordered alias actions applied in one `_aliases` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasActions {
    pub actions: Vec<AliasAction>,
}

impl AliasActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, action: AliasAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// Alias as reported by the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasData {
    pub alias: String,
    pub filter: Option<Value>,
    pub index_routing: Option<String>,
    pub search_routing: Option<String>,
    pub is_write_index: Option<bool>,
    pub is_hidden: Option<bool>,
}

impl AliasData {
    fn from_json(alias: &str, body: &Value) -> Self {
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            alias: alias.to_string(),
            filter: body.get("filter").cloned(),
            index_routing: text("index_routing"),
            search_routing: text("search_routing"),
            is_write_index: body.get("is_write_index").and_then(Value::as_bool),
            is_hidden: body.get("is_hidden").and_then(Value::as_bool),
        }
    }
}

/// Alias objects keyed by name, sorted by name
pub(super) fn aliases_from_json(aliases: Option<&Value>) -> Vec<AliasData> {
    let mut out: Vec<AliasData> = aliases
        .and_then(Value::as_object)
        .map(|obj| obj.iter().map(|(name, body)| AliasData::from_json(name, body)).collect())
        .unwrap_or_default();
    out.sort_by(|a, b| a.alias.cmp(&b.alias));
    out
}

pub(super) fn acknowledged(body: &Value) -> bool {
    body.get("acknowledged").and_then(Value::as_bool).unwrap_or(false)
}

/// `section` of the first index entry of a per-index response
fn first_index_section(body: &Value, section: &str) -> Value {
    body.as_object()
        .and_then(|indices| indices.values().next())
        .and_then(|entry| entry.get(section))
        .cloned()
        .unwrap_or_else(|| json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_actions_json() {
        let prefixed = |name: &str| format!("dev-{}", name);

        let add = AliasAction::Add(
            AliasActionParameters::new(["books"], ["library"])
                .filter(json!({"term": {"year": 1965}}))
                .index_routing("1")
                .write_index(true),
        );
        assert_eq!(
            add.to_json(prefixed),
            json!({"add": {
                "indices": ["dev-books"],
                "aliases": ["library"],
                "filter": {"term": {"year": 1965}},
                "index_routing": "1",
                "is_write_index": true
            }})
        );

        let remove = AliasAction::Remove(AliasActionParameters::new(["books"], ["library"]).write_index(true));
        assert_eq!(
            remove.to_json(prefixed),
            json!({"remove": {"indices": ["dev-books"], "aliases": ["library"]}})
        );

        let remove_index = AliasAction::RemoveIndex {
            indices: vec!["old".into()],
        };
        assert_eq!(
            remove_index.to_json(prefixed),
            json!({"remove_index": {"indices": ["dev-old"]}})
        );
    }

    #[test]
    fn test_aliases_from_json_sorted() {
        let aliases = aliases_from_json(Some(&json!({
            "zeta": {},
            "alpha": {"index_routing": "1", "search_routing": "2", "is_write_index": true}
        })));
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases[0].alias, "alpha");
        assert_eq!(aliases[0].index_routing.as_deref(), Some("1"));
        assert_eq!(aliases[0].is_write_index, Some(true));
        assert_eq!(aliases[1].alias, "zeta");
        assert!(aliases_from_json(None).is_empty());
    }

    #[test]
    fn test_first_index_section() {
        let body = json!({"books-v2": {"mappings": {"properties": {"title": {"type": "text"}}}}});
        assert_eq!(
            first_index_section(&body, "mappings"),
            json!({"properties": {"title": {"type": "text"}}})
        );
        assert_eq!(first_index_section(&body, "settings"), json!({}));
        assert!(!acknowledged(&json!({})));
        assert!(acknowledged(&json!({"acknowledged": true})));
    }
}
