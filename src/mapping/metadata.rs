// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Entity and property metadata.
//!
//! An entity type describes itself by returning an [`EntityMetadata`] from
//! [`Entity::metadata`]. Property names are the names serde uses for the
//! struct fields; field names are the names stored in the engine.
//!
//! ```
//! use search_odm::mapping::{DateFormat, EntityMetadata, PropertyMetadata, FieldType};
//!
//! let metadata = EntityMetadata::builder("Book", "books")
//!     .id("id")
//!     .seq_no_primary_term("seq")
//!     .text("title")
//!     .keyword("isbn")
//!     .date("published", DateFormat::Date)
//!     .nested("authors", vec![PropertyMetadata::new("name", FieldType::Text)])
//!     .shards(2)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(metadata.index_name, "books");
//! assert_eq!(metadata.nested_path_for("authors.name").as_deref(), Some("authors"));
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::field_type::{DateFormat, Dynamic, FieldType, TemporalKind, WriteType};
use super::naming::FieldNamingStrategy;
use super::settings::IndexSettings;
use crate::convert::PropertyValueConverter;
use crate::error::OdmError;

/// A domain type stored in the engine
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn metadata() -> EntityMetadata;
}

/// Multi-field (`fields`) entry of a property, e.g. `title.raw`
#[derive(Debug, Clone, PartialEq)]
pub struct InnerField {
    pub suffix: String,
    pub field_type: FieldType,
    pub analyzer: Option<String>,
    pub search_analyzer: Option<String>,
    pub normalizer: Option<String>,
    pub ignore_above: Option<u32>,
}

impl InnerField {
    pub fn new(suffix: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            suffix: suffix.into(),
            field_type,
            analyzer: None,
            search_analyzer: None,
            normalizer: None,
            ignore_above: None,
        }
    }

    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    pub fn normalizer(mut self, normalizer: impl Into<String>) -> Self {
        self.normalizer = Some(normalizer.into());
        self
    }

    pub fn ignore_above(mut self, length: u32) -> Self {
        self.ignore_above = Some(length);
        self
    }
}

/// Mapping and conversion metadata of one property
#[derive(Debug, Clone)]
pub struct PropertyMetadata {
    /// Property name as serialized by serde
    pub name: String,
    /// Field name in the engine
    pub field_name: String,
    explicit_field_name: bool,
    pub field_type: FieldType,
    pub index: bool,
    pub store: bool,
    pub doc_values: bool,
    pub analyzer: Option<String>,
    pub search_analyzer: Option<String>,
    pub normalizer: Option<String>,
    pub formats: Vec<DateFormat>,
    pub temporal: TemporalKind,
    pub copy_to: Vec<String>,
    pub ignore_above: Option<u32>,
    pub scaling_factor: Option<f64>,
    pub dims: Option<u32>,
    pub null_value: Option<Value>,
    pub store_null_value: bool,
    pub store_empty_value: bool,
    pub inner_fields: Vec<InnerField>,
    pub properties: Vec<PropertyMetadata>,
    pub dynamic: Option<Dynamic>,
    /// Not written to the document
    pub read_only: bool,
    /// Written, but not read back into the entity
    pub write_only: bool,
    /// Neither mapped nor written
    pub transient: bool,
    pub converter: Option<Arc<dyn PropertyValueConverter>>,
}

impl PropertyMetadata {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            field_name: name.clone(),
            name,
            explicit_field_name: false,
            field_type,
            index: true,
            store: false,
            doc_values: true,
            analyzer: None,
            search_analyzer: None,
            normalizer: None,
            formats: Vec::new(),
            temporal: TemporalKind::default(),
            copy_to: Vec::new(),
            ignore_above: None,
            scaling_factor: None,
            dims: None,
            null_value: None,
            store_null_value: false,
            store_empty_value: true,
            inner_fields: Vec::new(),
            properties: Vec::new(),
            dynamic: None,
            read_only: false,
            write_only: false,
            transient: false,
            converter: None,
        }
    }

    /// Engine field name, overriding the naming strategy
    pub fn field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self.explicit_field_name = true;
        self
    }

    pub fn not_indexed(mut self) -> Self {
        self.index = false;
        self
    }

    pub fn stored(mut self) -> Self {
        self.store = true;
        self
    }

    pub fn no_doc_values(mut self) -> Self {
        self.doc_values = false;
        self
    }

    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    pub fn search_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.search_analyzer = Some(analyzer.into());
        self
    }

    pub fn normalizer(mut self, normalizer: impl Into<String>) -> Self {
        self.normalizer = Some(normalizer.into());
        self
    }

    /// Add a date format; the first one is used when writing
    pub fn format(mut self, format: DateFormat) -> Self {
        self.formats.push(format);
        self
    }

    pub fn temporal(mut self, kind: TemporalKind) -> Self {
        self.temporal = kind;
        self
    }

    pub fn copy_to(mut self, field: impl Into<String>) -> Self {
        self.copy_to.push(field.into());
        self
    }

    pub fn ignore_above(mut self, length: u32) -> Self {
        self.ignore_above = Some(length);
        self
    }

    pub fn scaling_factor(mut self, factor: f64) -> Self {
        self.scaling_factor = Some(factor);
        self
    }

    pub fn dims(mut self, dims: u32) -> Self {
        self.dims = Some(dims);
        self
    }

    /// Value the engine indexes in place of `null`
    pub fn null_value(mut self, value: Value) -> Self {
        self.null_value = Some(value);
        self
    }

    /// Keep `null` in the written document
    pub fn store_null(mut self) -> Self {
        self.store_null_value = true;
        self
    }

    /// Drop empty strings, arrays and objects when writing
    pub fn skip_empty(mut self) -> Self {
        self.store_empty_value = false;
        self
    }

    pub fn inner_field(mut self, inner: InnerField) -> Self {
        self.inner_fields.push(inner);
        self
    }

    pub fn child(mut self, child: PropertyMetadata) -> Self {
        self.properties.push(child);
        self
    }

    pub fn dynamic(mut self, dynamic: Dynamic) -> Self {
        self.dynamic = Some(dynamic);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn converter(mut self, converter: Arc<dyn PropertyValueConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    #[must_use]
    pub fn has_explicit_field_name(&self) -> bool {
        self.explicit_field_name
    }

    /// Child property by property name
    pub fn child_property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Child property by engine field name
    pub fn child_by_field(&self, field_name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.field_name == field_name)
    }

    fn apply_naming(&mut self, naming: FieldNamingStrategy) {
        if !self.explicit_field_name {
            self.field_name = naming.translate(&self.name);
        }
        for child in &mut self.properties {
            child.apply_naming(naming);
        }
    }
}

/// Alias created together with the entity's index
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexAlias {
    pub name: String,
    pub filter: Option<Value>,
    pub routing: Option<String>,
    pub index_routing: Option<String>,
    pub search_routing: Option<String>,
    pub is_write_index: Option<bool>,
    pub is_hidden: Option<bool>,
}

impl IndexAlias {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Alias body as used in index creation and `_aliases` actions
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
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

/// Resolved mapping metadata of an entity type
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    pub type_name: String,
    pub index_name: String,
    pub id_property: Option<String>,
    /// Id is a number in the entity and a string in the engine
    pub numeric_id: bool,
    pub version_property: Option<String>,
    /// Property holding a `SeqNoPrimaryTerm`
    pub seq_no_primary_term_property: Option<String>,
    pub routing_property: Option<String>,
    pub routing_required: bool,
    pub create_index: bool,
    pub write_type: WriteType,
    pub dynamic: Option<Dynamic>,
    pub date_detection: Option<bool>,
    pub numeric_detection: Option<bool>,
    pub dynamic_templates: Option<Value>,
    pub source_enabled: bool,
    /// Replaces the generated mapping wholesale
    pub mapping_override: Option<Value>,
    pub settings: IndexSettings,
    pub properties: Vec<PropertyMetadata>,
    pub aliases: Vec<IndexAlias>,
    /// Applied to properties that are not declared
    pub naming: FieldNamingStrategy,
}

impl EntityMetadata {
    pub fn builder(type_name: impl Into<String>, index_name: impl Into<String>) -> EntityMetadataBuilder {
        EntityMetadataBuilder {
            metadata: EntityMetadata {
                type_name: type_name.into(),
                index_name: index_name.into(),
                id_property: None,
                numeric_id: false,
                version_property: None,
                seq_no_primary_term_property: None,
                routing_property: None,
                routing_required: false,
                create_index: true,
                write_type: WriteType::Index,
                dynamic: None,
                date_detection: None,
                numeric_detection: None,
                dynamic_templates: None,
                source_enabled: true,
                mapping_override: None,
                settings: IndexSettings::default(),
                properties: Vec::new(),
                aliases: Vec::new(),
                naming: FieldNamingStrategy::Identity,
            },
        }
    }

    /// Versioned entities write with `version_type=external`
    #[must_use]
    pub fn is_versioned(&self) -> bool {
        self.version_property.is_some()
    }

    pub fn property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_by_field(&self, field_name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.field_name == field_name)
    }

    /// Property at a dot path, descending through object and nested properties
    pub fn property_for_path(&self, path: &str) -> Option<&PropertyMetadata> {
        let mut segments = path.split('.');
        let mut current = self.property(segments.next()?)?;
        for segment in segments {
            current = current.child_property(segment)?;
        }
        Some(current)
    }

    /// Translate a property dot path into the engine field path.
    ///
    /// Unknown segments are translated with the naming strategy, so
    /// undeclared properties still resolve.
    pub fn field_name_for_path(&self, path: &str) -> String {
        let mut level: Option<&[PropertyMetadata]> = Some(&self.properties);
        let mut parts = Vec::new();

        for segment in path.split('.') {
            match level.and_then(|props| props.iter().find(|p| p.name == segment)) {
                Some(property) => {
                    parts.push(property.field_name.clone());
                    level = Some(&property.properties);
                }
                None => {
                    parts.push(self.naming.translate(segment));
                    level = None;
                }
            }
        }

        parts.join(".")
    }

    /// Property dot path of an engine field path, the inverse of
    /// [`field_name_for_path`](Self::field_name_for_path) for declared
    /// properties. Undeclared segments and inner fields (`title.keyword`)
    /// are kept as they are.
    pub fn property_path_for_field(&self, field_path: &str) -> String {
        let mut level: Option<&[PropertyMetadata]> = Some(&self.properties);
        let mut parts = Vec::new();

        for segment in field_path.split('.') {
            match level.and_then(|props| props.iter().find(|p| p.field_name == segment)) {
                Some(property) => {
                    parts.push(property.name.as_str());
                    level = Some(&property.properties);
                }
                None => {
                    parts.push(segment);
                    level = None;
                }
            }
        }

        parts.join(".")
    }

    /// Field path of the deepest nested property strictly above `path`
    pub fn nested_path_for(&self, path: &str) -> Option<String> {
        let segments: Vec<&str> = path.split('.').collect();
        let mut level: &[PropertyMetadata] = &self.properties;
        let mut field_parts = Vec::new();
        let mut nested = None;

        for (i, segment) in segments.iter().enumerate() {
            let property = level.iter().find(|p| p.name == *segment)?;
            field_parts.push(property.field_name.as_str());
            if property.field_type == FieldType::Nested && i + 1 < segments.len() {
                nested = Some(field_parts.join("."));
            }
            level = &property.properties;
        }

        nested
    }

    /// Engine field name of the id property, if declared
    pub fn id_field_name(&self) -> Option<&str> {
        let id = self.id_property.as_deref()?;
        Some(self.property(id).map(|p| p.field_name.as_str()).unwrap_or(id))
    }

    /// Apply a naming strategy to every property without an explicit field name
    pub fn with_naming(mut self, naming: FieldNamingStrategy) -> Result<Self, OdmError> {
        self.naming = naming;
        for property in &mut self.properties {
            property.apply_naming(naming);
        }
        self.validate()?;
        Ok(self)
    }

    /// Check field name uniqueness and per-type requirements
    pub fn validate(&self) -> Result<(), OdmError> {
        if self.index_name.trim().is_empty() {
            return Err(OdmError::Mapping(format!("{}: index name is empty", self.type_name)));
        }
        validate_level(&self.type_name, &self.properties)
    }
}

fn validate_level(owner: &str, properties: &[PropertyMetadata]) -> Result<(), OdmError> {
    let mut seen = HashSet::new();
    for property in properties {
        if !seen.insert(property.field_name.as_str()) {
            return Err(OdmError::Mapping(format!(
                "{}: duplicate field name '{}'",
                owner, property.field_name
            )));
        }
        if property.field_type == FieldType::ScaledFloat && property.scaling_factor.is_none() {
            return Err(OdmError::Mapping(format!(
                "{}.{}: scaled_float requires a scaling factor",
                owner, property.name
            )));
        }
        if property.read_only && property.write_only {
            return Err(OdmError::Mapping(format!(
                "{}.{}: property cannot be both read-only and write-only",
                owner, property.name
            )));
        }
        if !property.properties.is_empty() {
            validate_level(&format!("{}.{}", owner, property.name), &property.properties)?;
        }
    }
    Ok(())
}

/// Fluent builder for [`EntityMetadata`]
#[derive(Debug, Clone)]
pub struct EntityMetadataBuilder {
    metadata: EntityMetadata,
}

impl EntityMetadataBuilder {
    /// Id property, a string in the entity
    pub fn id(mut self, property: impl Into<String>) -> Self {
        self.metadata.id_property = Some(property.into());
        self.metadata.numeric_id = false;
        self
    }

    /// Id property holding a number
    pub fn numeric_id(mut self, property: impl Into<String>) -> Self {
        self.metadata.id_property = Some(property.into());
        self.metadata.numeric_id = true;
        self
    }

    pub fn version(mut self, property: impl Into<String>) -> Self {
        self.metadata.version_property = Some(property.into());
        self
    }

    pub fn seq_no_primary_term(mut self, property: impl Into<String>) -> Self {
        self.metadata.seq_no_primary_term_property = Some(property.into());
        self
    }

    pub fn routing(mut self, property: impl Into<String>) -> Self {
        self.metadata.routing_property = Some(property.into());
        self
    }

    pub fn routing_required(mut self, required: bool) -> Self {
        self.metadata.routing_required = required;
        self
    }

    /// Whether the index is created automatically when missing
    pub fn create_index(mut self, create: bool) -> Self {
        self.metadata.create_index = create;
        self
    }

    pub fn write_type(mut self, write_type: WriteType) -> Self {
        self.metadata.write_type = write_type;
        self
    }

    pub fn text(self, name: impl Into<String>) -> Self {
        self.property(PropertyMetadata::new(name, FieldType::Text))
    }

    pub fn keyword(self, name: impl Into<String>) -> Self {
        self.property(PropertyMetadata::new(name, FieldType::Keyword))
    }

    pub fn long(self, name: impl Into<String>) -> Self {
        self.property(PropertyMetadata::new(name, FieldType::Long))
    }

    pub fn integer(self, name: impl Into<String>) -> Self {
        self.property(PropertyMetadata::new(name, FieldType::Integer))
    }

    pub fn double(self, name: impl Into<String>) -> Self {
        self.property(PropertyMetadata::new(name, FieldType::Double))
    }

    pub fn boolean(self, name: impl Into<String>) -> Self {
        self.property(PropertyMetadata::new(name, FieldType::Boolean))
    }

    /// Date property with a single format, held as `DateTime<Utc>`
    pub fn date(self, name: impl Into<String>, format: DateFormat) -> Self {
        self.property(PropertyMetadata::new(name, FieldType::Date).format(format))
    }

    pub fn geo_point(self, name: impl Into<String>) -> Self {
        self.property(PropertyMetadata::new(name, FieldType::GeoPoint))
    }

    pub fn nested(self, name: impl Into<String>, children: Vec<PropertyMetadata>) -> Self {
        let mut property = PropertyMetadata::new(name, FieldType::Nested);
        property.properties = children;
        self.property(property)
    }

    pub fn object(self, name: impl Into<String>, children: Vec<PropertyMetadata>) -> Self {
        let mut property = PropertyMetadata::new(name, FieldType::Object);
        property.properties = children;
        self.property(property)
    }

    /// Fully specified property
    pub fn property(mut self, property: PropertyMetadata) -> Self {
        self.metadata.properties.push(property);
        self
    }

    pub fn shards(mut self, shards: u32) -> Self {
        self.metadata.settings.shards = Some(shards);
        self
    }

    pub fn replicas(mut self, replicas: u32) -> Self {
        self.metadata.settings.replicas = Some(replicas);
        self
    }

    pub fn refresh_interval(mut self, interval: impl Into<String>) -> Self {
        self.metadata.settings.refresh_interval = Some(interval.into());
        self
    }

    pub fn settings(mut self, settings: IndexSettings) -> Self {
        self.metadata.settings = settings;
        self
    }

    pub fn dynamic(mut self, dynamic: Dynamic) -> Self {
        self.metadata.dynamic = Some(dynamic);
        self
    }

    pub fn date_detection(mut self, enabled: bool) -> Self {
        self.metadata.date_detection = Some(enabled);
        self
    }

    pub fn numeric_detection(mut self, enabled: bool) -> Self {
        self.metadata.numeric_detection = Some(enabled);
        self
    }

    pub fn dynamic_templates(mut self, templates: Value) -> Self {
        self.metadata.dynamic_templates = Some(templates);
        self
    }

    pub fn source_enabled(mut self, enabled: bool) -> Self {
        self.metadata.source_enabled = enabled;
        self
    }

    pub fn alias(self, name: impl Into<String>) -> Self {
        self.alias_with(IndexAlias::new(name))
    }

    pub fn alias_with(mut self, alias: IndexAlias) -> Self {
        self.metadata.aliases.push(alias);
        self
    }

    pub fn mapping_override(mut self, mapping: Value) -> Self {
        self.metadata.mapping_override = Some(mapping);
        self
    }

    /// Validate and finish. Index names are lower-cased.
    pub fn build(self) -> Result<EntityMetadata, OdmError> {
        let mut metadata = self.metadata;
        metadata.index_name = metadata.index_name.to_lowercase();
        metadata.validate()?;
        Ok(metadata)
    }
}
