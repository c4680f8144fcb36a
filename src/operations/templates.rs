// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index templates: legacy (`_template`), composable (`_index_template`)
//! and component (`_component_template`).
//!
//! Template names are used as given; the index prefix only applies to
//! index names.

use serde_json::{json, Map, Value};
use tracing::info;

use super::index_api::{acknowledged, aliases_from_json, AliasData, IndexOperations};
use crate::error::OdmError;
use crate::mapping::IndexAlias;
use crate::metrics;
use crate::transport::{path, EngineRequest};

/// Settings, mappings and aliases applied by a template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateSpec {
    pub settings: Option<Value>,
    pub mappings: Option<Value>,
    pub aliases: Vec<IndexAlias>,
}

impl TemplateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn mappings(mut self, mappings: Value) -> Self {
        self.mappings = Some(mappings);
        self
    }

    pub fn alias(mut self, alias: IndexAlias) -> Self {
        self.aliases.push(alias);
        self
    }

    fn write_into(&self, body: &mut Map<String, Value>) {
        if let Some(settings) = &self.settings {
            body.insert("settings".into(), settings.clone());
        }
        if let Some(mappings) = &self.mappings {
            body.insert("mappings".into(), mappings.clone());
        }
        if !self.aliases.is_empty() {
            let aliases: Map<String, Value> = self
                .aliases
                .iter()
                .map(|alias| (alias.name.clone(), alias.to_json()))
                .collect();
            body.insert("aliases".into(), Value::Object(aliases));
        }
    }

    fn to_json(&self) -> Value {
        let mut body = Map::new();
        self.write_into(&mut body);
        Value::Object(body)
    }
}

/// Legacy template
#[derive(Debug, Clone, PartialEq)]
pub struct PutTemplateRequest {
    pub name: String,
    pub index_patterns: Vec<String>,
    pub order: Option<i64>,
    pub version: Option<i64>,
    pub template: TemplateSpec,
}

impl PutTemplateRequest {
    pub fn new<I, S>(name: impl Into<String>, index_patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            index_patterns: index_patterns.into_iter().map(Into::into).collect(),
            order: None,
            version: None,
            template: TemplateSpec::default(),
        }
    }

    pub fn order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn template(mut self, template: TemplateSpec) -> Self {
        self.template = template;
        self
    }

    fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("index_patterns".into(), json!(self.index_patterns));
        if let Some(order) = self.order {
            body.insert("order".into(), json!(order));
        }
        if let Some(version) = self.version {
            body.insert("version".into(), json!(version));
        }
        self.template.write_into(&mut body);
        Value::Object(body)
    }
}

/// Legacy template as stored by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateData {
    pub index_patterns: Vec<String>,
    pub order: Option<i64>,
    pub version: Option<i64>,
    pub settings: Value,
    pub mappings: Value,
    pub aliases: Vec<AliasData>,
}

impl TemplateData {
    fn from_json(body: &Value) -> Self {
        Self {
            index_patterns: string_list(body.get("index_patterns")),
            order: body.get("order").and_then(Value::as_i64),
            version: body.get("version").and_then(Value::as_i64),
            settings: body.get("settings").cloned().unwrap_or_else(|| json!({})),
            mappings: body.get("mappings").cloned().unwrap_or_else(|| json!({})),
            aliases: aliases_from_json(body.get("aliases")),
        }
    }
}

/// Composable index template
#[derive(Debug, Clone, PartialEq)]
pub struct PutIndexTemplateRequest {
    pub name: String,
    pub index_patterns: Vec<String>,
    pub template: TemplateSpec,
    pub composed_of: Vec<String>,
    pub priority: Option<i64>,
    pub version: Option<i64>,
    pub meta: Option<Value>,
}

impl PutIndexTemplateRequest {
    pub fn new<I, S>(name: impl Into<String>, index_patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            index_patterns: index_patterns.into_iter().map(Into::into).collect(),
            template: TemplateSpec::default(),
            composed_of: Vec::new(),
            priority: None,
            version: None,
            meta: None,
        }
    }

    pub fn template(mut self, template: TemplateSpec) -> Self {
        self.template = template;
        self
    }

    pub fn composed_of(mut self, component: impl Into<String>) -> Self {
        self.composed_of.push(component.into());
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("index_patterns".into(), json!(self.index_patterns));
        body.insert("template".into(), self.template.to_json());
        if !self.composed_of.is_empty() {
            body.insert("composed_of".into(), json!(self.composed_of));
        }
        if let Some(priority) = self.priority {
            body.insert("priority".into(), json!(priority));
        }
        if let Some(version) = self.version {
            body.insert("version".into(), json!(version));
        }
        if let Some(meta) = &self.meta {
            body.insert("_meta".into(), meta.clone());
        }
        Value::Object(body)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexTemplateData {
    pub name: String,
    pub index_patterns: Vec<String>,
    pub settings: Value,
    pub mappings: Value,
    pub aliases: Vec<AliasData>,
    pub composed_of: Vec<String>,
    pub priority: Option<i64>,
    pub version: Option<i64>,
    pub meta: Option<Value>,
}

impl IndexTemplateData {
    fn from_json(name: &str, body: &Value) -> Self {
        let template = body.get("template");
        Self {
            name: name.to_string(),
            index_patterns: string_list(body.get("index_patterns")),
            settings: section(template, "settings"),
            mappings: section(template, "mappings"),
            aliases: aliases_from_json(template.and_then(|t| t.get("aliases"))),
            composed_of: string_list(body.get("composed_of")),
            priority: body.get("priority").and_then(Value::as_i64),
            version: body.get("version").and_then(Value::as_i64),
            meta: body.get("_meta").cloned(),
        }
    }
}

/// Component template, composed into index templates
#[derive(Debug, Clone, PartialEq)]
pub struct PutComponentTemplateRequest {
    pub name: String,
    pub template: TemplateSpec,
    pub version: Option<i64>,
    pub meta: Option<Value>,
}

impl PutComponentTemplateRequest {
    pub fn new(name: impl Into<String>, template: TemplateSpec) -> Self {
        Self {
            name: name.into(),
            template,
            version: None,
            meta: None,
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("template".into(), self.template.to_json());
        if let Some(version) = self.version {
            body.insert("version".into(), json!(version));
        }
        if let Some(meta) = &self.meta {
            body.insert("_meta".into(), meta.clone());
        }
        Value::Object(body)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentTemplateData {
    pub name: String,
    pub settings: Value,
    pub mappings: Value,
    pub aliases: Vec<AliasData>,
    pub version: Option<i64>,
    pub meta: Option<Value>,
}

impl ComponentTemplateData {
    fn from_json(name: &str, body: &Value) -> Self {
        let template = body.get("template");
        Self {
            name: name.to_string(),
            settings: section(template, "settings"),
            mappings: section(template, "mappings"),
            aliases: aliases_from_json(template.and_then(|t| t.get("aliases"))),
            version: body.get("version").and_then(Value::as_i64),
            meta: body.get("_meta").cloned(),
        }
    }
}

/// Template endpoint families
#[derive(Debug, Clone, Copy)]
enum TemplateKind {
    Legacy,
    Index,
    Component,
}

impl TemplateKind {
    fn endpoint(self) -> &'static str {
        match self {
            TemplateKind::Legacy => "_template",
            TemplateKind::Index => "_index_template",
            TemplateKind::Component => "_component_template",
        }
    }
}

impl IndexOperations<'_> {
    // ═══════════════════════════════════════════════════════════════════════════
    // Legacy templates
    // ═══════════════════════════════════════════════════════════════════════════

    pub async fn put_template(&self, request: &PutTemplateRequest) -> Result<bool, OdmError> {
        self.put_template_body(TemplateKind::Legacy, &request.name, request.to_json()).await
    }

    pub async fn get_template(&self, name: &str) -> Result<Option<TemplateData>, OdmError> {
        let Some(body) = self.get_template_body(TemplateKind::Legacy, name).await? else {
            return Ok(None);
        };
        Ok(body.get(name).map(TemplateData::from_json))
    }

    pub async fn exists_template(&self, name: &str) -> Result<bool, OdmError> {
        self.exists_template_kind(TemplateKind::Legacy, name).await
    }

    pub async fn delete_template(&self, name: &str) -> Result<bool, OdmError> {
        self.delete_template_kind(TemplateKind::Legacy, name).await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Composable index templates
    // ═══════════════════════════════════════════════════════════════════════════

    pub async fn put_index_template(&self, request: &PutIndexTemplateRequest) -> Result<bool, OdmError> {
        self.put_template_body(TemplateKind::Index, &request.name, request.to_json()).await
    }

    pub async fn get_index_template(&self, name: &str) -> Result<Option<IndexTemplateData>, OdmError> {
        let Some(body) = self.get_template_body(TemplateKind::Index, name).await? else {
            return Ok(None);
        };
        Ok(named_entry(&body, "index_templates", "index_template", name)
            .map(|entry| IndexTemplateData::from_json(name, entry)))
    }

    pub async fn exists_index_template(&self, name: &str) -> Result<bool, OdmError> {
        self.exists_template_kind(TemplateKind::Index, name).await
    }

    pub async fn delete_index_template(&self, name: &str) -> Result<bool, OdmError> {
        self.delete_template_kind(TemplateKind::Index, name).await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Component templates
    // ═══════════════════════════════════════════════════════════════════════════

    pub async fn put_component_template(&self, request: &PutComponentTemplateRequest) -> Result<bool, OdmError> {
        self.put_template_body(TemplateKind::Component, &request.name, request.to_json())
            .await
    }

    pub async fn get_component_template(&self, name: &str) -> Result<Option<ComponentTemplateData>, OdmError> {
        let Some(body) = self.get_template_body(TemplateKind::Component, name).await? else {
            return Ok(None);
        };
        Ok(named_entry(&body, "component_templates", "component_template", name)
            .map(|entry| ComponentTemplateData::from_json(name, entry)))
    }

    pub async fn exists_component_template(&self, name: &str) -> Result<bool, OdmError> {
        self.exists_template_kind(TemplateKind::Component, name).await
    }

    pub async fn delete_component_template(&self, name: &str) -> Result<bool, OdmError> {
        self.delete_template_kind(TemplateKind::Component, name).await
    }

    // ───────────────────────────────────────────────────────────────────────────

    async fn put_template_body(&self, kind: TemplateKind, name: &str, body: Value) -> Result<bool, OdmError> {
        let request = EngineRequest::put(path(&[kind.endpoint(), name])).json(body);
        let result = self.ops.execute_ok(request, name, None).await;
        metrics::record_index_operation("put_template", result.is_ok());

        let acknowledged = acknowledged(&result?);
        info!(template = %name, kind = kind.endpoint(), acknowledged, "Template stored");
        Ok(acknowledged)
    }

    async fn get_template_body(&self, kind: TemplateKind, name: &str) -> Result<Option<Value>, OdmError> {
        let response = self
            .ops
            .execute(EngineRequest::get(path(&[kind.endpoint(), name])))
            .await?;
        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(OdmError::from_engine_response(response.status, response.body.as_ref(), name, None));
        }
        Ok(response.body)
    }

    async fn exists_template_kind(&self, kind: TemplateKind, name: &str) -> Result<bool, OdmError> {
        let response = self
            .ops
            .execute(EngineRequest::head(path(&[kind.endpoint(), name])))
            .await?;
        match response.status {
            404 => Ok(false),
            _ if response.is_success() => Ok(true),
            status => Err(OdmError::from_engine_response(status, response.body.as_ref(), name, None)),
        }
    }

    async fn delete_template_kind(&self, kind: TemplateKind, name: &str) -> Result<bool, OdmError> {
        let response = self
            .ops
            .execute(EngineRequest::delete(path(&[kind.endpoint(), name])))
            .await?;
        if response.is_not_found() {
            return Ok(false);
        }
        if !response.is_success() {
            metrics::record_index_operation("delete_template", false);
            return Err(OdmError::from_engine_response(response.status, response.body.as_ref(), name, None));
        }
        metrics::record_index_operation("delete_template", true);
        Ok(acknowledged(response.body_or_null()))
    }
}

/// Entry of `list_key` whose `name` matches, unwrapped from `entry_key`
fn named_entry<'v>(body: &'v Value, list_key: &str, entry_key: &str, name: &str) -> Option<&'v Value> {
    body.get(list_key)?
        .as_array()?
        .iter()
        .find(|entry| entry.get("name").and_then(Value::as_str) == Some(name))
        .and_then(|entry| entry.get(entry_key))
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn section(template: Option<&Value>, key: &str) -> Value {
    template
        .and_then(|t| t.get(key))
        .cloned()
        .unwrap_or_else(|| json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_template_json() {
        let request = PutTemplateRequest::new("books-template", ["books-*"])
            .order(1)
            .template(
                TemplateSpec::new()
                    .settings(json!({"index": {"number_of_shards": 1}}))
                    .alias(IndexAlias::new("all-books")),
            );
        assert_eq!(
            request.to_json(),
            json!({
                "index_patterns": ["books-*"],
                "order": 1,
                "settings": {"index": {"number_of_shards": 1}},
                "aliases": {"all-books": {}}
            })
        );
    }

    #[test]
    fn test_index_template_json() {
        let request = PutIndexTemplateRequest::new("books", ["books-*"])
            .template(TemplateSpec::new().mappings(json!({"properties": {}})))
            .composed_of("base")
            .priority(10)
            .meta(json!({"owner": "search"}));
        assert_eq!(
            request.to_json(),
            json!({
                "index_patterns": ["books-*"],
                "template": {"mappings": {"properties": {}}},
                "composed_of": ["base"],
                "priority": 10,
                "_meta": {"owner": "search"}
            })
        );
    }

    #[test]
    fn test_parse_index_template() {
        let body = json!({"index_templates": [
            {"name": "other", "index_template": {"index_patterns": ["x"]}},
            {"name": "books", "index_template": {
                "index_patterns": ["books-*"],
                "template": {"settings": {"index": {"number_of_shards": "1"}}, "aliases": {"all": {}}},
                "composed_of": ["base"],
                "priority": 10,
                "version": 3
            }}
        ]});
        let entry = named_entry(&body, "index_templates", "index_template", "books").unwrap();
        let data = IndexTemplateData::from_json("books", entry);
        assert_eq!(data.index_patterns, vec!["books-*".to_string()]);
        assert_eq!(data.composed_of, vec!["base".to_string()]);
        assert_eq!(data.priority, Some(10));
        assert_eq!(data.version, Some(3));
        assert_eq!(data.aliases[0].alias, "all");
        assert_eq!(data.mappings, json!({}));
    }

    #[test]
    fn test_parse_legacy_and_component() {
        let legacy = TemplateData::from_json(&json!({
            "order": 2, "index_patterns": ["logs-*"], "settings": {}, "mappings": {}, "aliases": {}
        }));
        assert_eq!(legacy.order, Some(2));
        assert!(legacy.aliases.is_empty());

        let component = ComponentTemplateData::from_json(
            "base",
            &json!({"template": {"mappings": {"properties": {"ts": {"type": "date"}}}}, "version": 1}),
        );
        assert_eq!(component.version, Some(1));
        assert_eq!(component.mappings["properties"]["ts"]["type"], "date");
        assert_eq!(component.settings, json!({}));
    }
}
