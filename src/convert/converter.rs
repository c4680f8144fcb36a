// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Entity ⇄ document conversion.
//!
//! ```text
//! write:  entity ─serde─▶ JSON ─┬─ extract id / version / seq_no / routing
//!                               ├─ property names → field names
//!                               ├─ custom converters, else date formats
//!                               └─ drop nulls, empties, read-only, transient
//!
//! read:   _source ─┬─ field names → property names (serde names of the target
//!                  │   type for undeclared fields)
//!                  ├─ custom converters, else date parsing
//!                  ├─ inject _id, _version, _seq_no/_primary_term
//!                  └─ serde ─▶ entity
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use super::date::DateFormatter;
use super::document::{Document, SeqNoPrimaryTerm};
use super::fields::{serde_field_names, serde_sequence_fields};
use crate::error::OdmError;
use crate::mapping::{Entity, EntityMetadata, FieldNamingStrategy, MappingContext, PropertyMetadata};
use crate::metrics;

pub struct DocumentConverter {
    context: Arc<MappingContext>,
}

impl DocumentConverter {
    pub fn new(context: Arc<MappingContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &MappingContext {
        &self.context
    }

    /// Entity → document
    pub fn write<T: Entity>(&self, entity: &T) -> Result<Document, OdmError> {
        let metadata = self.context.metadata_for::<T>()?;
        let value = serde_json::to_value(entity)?;
        self.write_value(&metadata, value).map_err(|e| {
            metrics::record_conversion_error("write");
            e
        })
    }

    /// Serialized entity → document, for callers holding a raw value
    pub fn write_value(&self, metadata: &EntityMetadata, value: Value) -> Result<Document, OdmError> {
        let Value::Object(mut source) = value else {
            return Err(OdmError::Conversion(format!(
                "{} does not serialize to a JSON object",
                metadata.type_name
            )));
        };

        // The id travels as `_id`, never inside `_source`
        let id = metadata
            .id_property
            .as_deref()
            .and_then(|name| source.remove(name))
            .as_ref()
            .and_then(scalar_to_string);

        let routing = metadata
            .routing_property
            .as_deref()
            .and_then(|name| source.get(name))
            .and_then(scalar_to_string);

        let version = metadata
            .version_property
            .as_deref()
            .and_then(|name| source.remove(name))
            .and_then(|v| v.as_i64());

        let seq_no_primary_term = match metadata.seq_no_primary_term_property.as_deref() {
            Some(name) => match source.remove(name) {
                Some(Value::Null) | None => None,
                Some(value) => Some(serde_json::from_value::<SeqNoPrimaryTerm>(value).map_err(|e| {
                    OdmError::Conversion(format!("{}.{}: {}", metadata.type_name, name, e))
                })?),
            },
            None => None,
        };

        let source = write_properties(&metadata.type_name, &metadata.properties, source, metadata.naming)?;

        Ok(Document {
            id,
            index: Some(metadata.index_name.clone()),
            version,
            seq_no: seq_no_primary_term.map(|s| s.seq_no),
            primary_term: seq_no_primary_term.map(|s| s.primary_term),
            routing,
            source,
        })
    }

    /// Document → entity
    pub fn read<T: Entity>(&self, document: &Document) -> Result<T, OdmError> {
        let metadata = self.context.metadata_for::<T>()?;
        self.read_value(&metadata, document).map_err(|e| {
            metrics::record_conversion_error("read");
            e
        })
    }

    /// Document → any deserializable type, using `metadata` for names and formats
    pub fn read_value<T: DeserializeOwned>(
        &self,
        metadata: &EntityMetadata,
        document: &Document,
    ) -> Result<T, OdmError> {
        let target = serde_field_names::<T>().map(|names| TargetFields {
            names,
            sequences: serde_sequence_fields::<T>(),
        });
        let mut source = read_properties(
            &metadata.type_name,
            &metadata.properties,
            document.source.clone(),
            metadata.naming,
            target.as_ref(),
        )?;

        if let (Some(property), Some(id)) = (metadata.id_property.as_deref(), document.id.as_deref()) {
            source.insert(property.to_string(), id_value(metadata, id)?);
        }
        if let (Some(property), Some(version)) = (metadata.version_property.as_deref(), document.version) {
            source.insert(property.to_string(), json!(version));
        }
        if let (Some(property), Some(counters)) = (
            metadata.seq_no_primary_term_property.as_deref(),
            document.seq_no_primary_term(),
        ) {
            source.insert(property.to_string(), serde_json::to_value(counters)?);
        }

        serde_json::from_value(Value::Object(source))
            .map_err(|e| OdmError::Conversion(format!("{}: {}", metadata.type_name, e)))
    }

    /// Populate engine-assigned id and counters after a write.
    ///
    /// The id is only set when the entity has none.
    pub fn update_entity_ids<T: Entity>(
        &self,
        entity: T,
        id: &str,
        seq_no: Option<i64>,
        primary_term: Option<i64>,
        version: Option<i64>,
    ) -> Result<T, OdmError> {
        let metadata = self.context.metadata_for::<T>()?;
        let Value::Object(mut value) = serde_json::to_value(&entity)? else {
            return Ok(entity);
        };

        if let Some(property) = metadata.id_property.as_deref() {
            let missing = match value.get(property) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            };
            if missing {
                value.insert(property.to_string(), id_value(&metadata, id)?);
            }
        }
        if let (Some(property), Some(seq_no), Some(primary_term)) =
            (metadata.seq_no_primary_term_property.as_deref(), seq_no, primary_term)
        {
            value.insert(
                property.to_string(),
                serde_json::to_value(SeqNoPrimaryTerm { seq_no, primary_term })?,
            );
        }
        if let (Some(property), Some(version)) = (metadata.version_property.as_deref(), version) {
            value.insert(property.to_string(), json!(version));
        }

        serde_json::from_value(Value::Object(value))
            .map_err(|e| OdmError::Conversion(format!("{}: {}", metadata.type_name, e)))
    }

    /// Renamed source without nulls, for partial `doc` updates
    pub fn partial_update<T: Entity>(&self, entity: &T) -> Result<Map<String, Value>, OdmError> {
        let mut document = self.write(entity)?;
        document.source.retain(|_, v| !v.is_null());
        Ok(document.source)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn id_value(metadata: &EntityMetadata, id: &str) -> Result<Value, OdmError> {
    if !metadata.numeric_id {
        return Ok(json!(id));
    }
    id.parse::<i64>()
        .map(|n| json!(n))
        .map_err(|_| OdmError::Conversion(format!("{}: id '{}' is not numeric", metadata.type_name, id)))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn write_properties(
    owner: &str,
    properties: &[PropertyMetadata],
    source: Map<String, Value>,
    naming: FieldNamingStrategy,
) -> Result<Map<String, Value>, OdmError> {
    let mut out = Map::new();

    for (name, value) in source {
        match properties.iter().find(|p| p.name == name) {
            Some(property) => {
                if property.read_only || property.transient {
                    continue;
                }
                let value = write_property(owner, property, value, naming)?;
                if value.is_null() && !property.store_null_value {
                    continue;
                }
                if !property.store_empty_value && is_empty(&value) {
                    continue;
                }
                out.insert(property.field_name.clone(), value);
            }
            None => {
                if !value.is_null() {
                    out.insert(naming.translate(&name), value);
                }
            }
        }
    }

    Ok(out)
}

fn write_property(
    owner: &str,
    property: &PropertyMetadata,
    value: Value,
    naming: FieldNamingStrategy,
) -> Result<Value, OdmError> {
    if value.is_null() {
        return Ok(value);
    }
    let path = format!("{}.{}", owner, property.name);

    if let Some(converter) = &property.converter {
        return converter
            .write(&value)
            .map_err(|e| OdmError::Conversion(format!("{}: {}", path, e)));
    }

    if property.field_type.is_date() && !property.formats.is_empty() {
        let formatter = DateFormatter::new(&property.formats);
        return map_scalars(value, &mut |v| {
            let at = property
                .temporal
                .decode(&v)
                .map_err(|e| OdmError::Conversion(format!("{}: {}", path, e)))?;
            formatter
                .format(&at)
                .map_err(|e| OdmError::Conversion(format!("{}: {}", path, e)))
        });
    }

    if !property.properties.is_empty() {
        return map_objects(value, &mut |obj| {
            write_properties(&path, &property.properties, obj, naming).map(Value::Object)
        });
    }

    Ok(value)
}

/// Serde shape of the type a document is read into
struct TargetFields {
    names: &'static [&'static str],
    sequences: Vec<&'static str>,
}

impl TargetFields {
    /// `fields` retrieval wraps every value in an array
    fn unwrap_scalar(&self, name: &str, value: &mut Value) {
        if self.sequences.iter().any(|s| *s == name) {
            return;
        }
        if let Value::Array(items) = value {
            if items.len() == 1 {
                *value = items.remove(0);
            }
        }
    }
}

/// Stored fields → property names.
///
/// Undeclared fields resolve against the target's serde names when known.
/// Otherwise they are kept as stored, plus under the reversed name when
/// that differs and is not itself stored.
fn read_properties(
    owner: &str,
    properties: &[PropertyMetadata],
    source: Map<String, Value>,
    naming: FieldNamingStrategy,
    target: Option<&TargetFields>,
) -> Result<Map<String, Value>, OdmError> {
    let mut out = Map::new();

    for (field, mut value) in source {
        match properties.iter().find(|p| p.field_name == field) {
            Some(property) => {
                if property.write_only || property.transient {
                    continue;
                }
                if let Some(target) = target {
                    target.unwrap_scalar(&property.name, &mut value);
                }
                let value = read_property(owner, property, value, naming)?;
                out.insert(property.name.clone(), value);
            }
            None => match target {
                Some(target) => {
                    let name = target
                        .names
                        .iter()
                        .find(|name| naming.translate(name) == field)
                        .map_or(field, |name| name.to_string());
                    target.unwrap_scalar(&name, &mut value);
                    out.insert(name, value);
                }
                None => {
                    let reversed = naming.reverse(&field);
                    if reversed != field {
                        out.entry(reversed).or_insert_with(|| value.clone());
                    }
                    out.insert(field, value);
                }
            },
        }
    }

    Ok(out)
}

fn read_property(
    owner: &str,
    property: &PropertyMetadata,
    value: Value,
    naming: FieldNamingStrategy,
) -> Result<Value, OdmError> {
    if value.is_null() {
        return Ok(value);
    }
    let path = format!("{}.{}", owner, property.name);

    if let Some(converter) = &property.converter {
        return converter
            .read(&value)
            .map_err(|e| OdmError::Conversion(format!("{}: {}", path, e)));
    }

    if property.field_type.is_date() && !property.formats.is_empty() {
        let formatter = DateFormatter::new(&property.formats);
        return map_scalars(value, &mut |v| {
            let at = formatter
                .parse(&v)
                .map_err(|e| OdmError::Conversion(format!("{}: {}", path, e)))?;
            Ok(property.temporal.encode(&at))
        });
    }

    if !property.properties.is_empty() {
        return map_objects(value, &mut |obj| {
            read_properties(&path, &property.properties, obj, naming, None).map(Value::Object)
        });
    }

    Ok(value)
}

/// Apply `f` to a scalar or to every non-null element of an array
fn map_scalars(
    value: Value,
    f: &mut dyn FnMut(Value) -> Result<Value, OdmError>,
) -> Result<Value, OdmError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| if item.is_null() { Ok(item) } else { f(item) })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => f(other),
    }
}

/// Apply `f` to an object or to every object element of an array
fn map_objects(
    value: Value,
    f: &mut dyn FnMut(Map<String, Value>) -> Result<Value, OdmError>,
) -> Result<Value, OdmError> {
    match value {
        Value::Object(obj) => f(obj),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(obj) => f(obj),
                other => Ok(other),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other),
    }
}
