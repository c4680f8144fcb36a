// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Entity metadata → index mapping JSON.
//!
//! ```text
//! {
//!   "dynamic": "strict",
//!   "_routing": { "required": true },
//!   "properties": {
//!     "title":     { "type": "text", "analyzer": "english",
//!                    "fields": { "raw": { "type": "keyword" } } },
//!     "published": { "type": "date", "format": "basic_date||epoch_millis" },
//!     "authors":   { "type": "nested", "properties": { ... } }
//!   }
//! }
//! ```

use serde_json::{json, Map, Value};

use super::field_type::FieldType;
use super::metadata::{EntityMetadata, InnerField, PropertyMetadata};

pub struct MappingBuilder;

impl MappingBuilder {
    pub fn build(metadata: &EntityMetadata) -> Value {
        if let Some(mapping) = &metadata.mapping_override {
            return mapping.clone();
        }

        let mut root = Map::new();

        if let Some(dynamic) = metadata.dynamic {
            root.insert("dynamic".into(), json!(dynamic.to_string()));
        }
        if let Some(detect) = metadata.date_detection {
            root.insert("date_detection".into(), json!(detect));
        }
        if let Some(detect) = metadata.numeric_detection {
            root.insert("numeric_detection".into(), json!(detect));
        }
        if let Some(templates) = &metadata.dynamic_templates {
            root.insert("dynamic_templates".into(), templates.clone());
        }
        if metadata.routing_required {
            root.insert("_routing".into(), json!({ "required": true }));
        }
        if !metadata.source_enabled {
            root.insert("_source".into(), json!({ "enabled": false }));
        }

        let skipped = [
            metadata.id_property.as_deref(),
            metadata.version_property.as_deref(),
            metadata.seq_no_primary_term_property.as_deref(),
        ];
        let top_level = metadata
            .properties
            .iter()
            .filter(|p| !skipped.contains(&Some(p.name.as_str())));

        root.insert("properties".into(), Value::Object(properties_json(top_level)));
        Value::Object(root)
    }
}

fn properties_json<'a>(properties: impl Iterator<Item = &'a PropertyMetadata>) -> Map<String, Value> {
    let mut out = Map::new();
    for property in properties {
        if property.transient {
            continue;
        }
        if let Some(field) = field_json(property) {
            out.insert(property.field_name.clone(), field);
        }
    }
    out
}

fn field_json(property: &PropertyMetadata) -> Option<Value> {
    // Auto leaves the field to dynamic mapping, unless it has children to describe
    if property.field_type == FieldType::Auto && property.properties.is_empty() {
        return None;
    }

    let mut field = Map::new();
    if property.field_type != FieldType::Auto {
        field.insert("type".into(), json!(property.field_type.to_string()));
    }

    if !property.index {
        field.insert("index".into(), json!(false));
    }
    if property.store {
        field.insert("store".into(), json!(true));
    }
    if !property.doc_values {
        field.insert("doc_values".into(), json!(false));
    }
    if let Some(analyzer) = &property.analyzer {
        field.insert("analyzer".into(), json!(analyzer));
    }
    if let Some(analyzer) = &property.search_analyzer {
        field.insert("search_analyzer".into(), json!(analyzer));
    }
    if let Some(normalizer) = &property.normalizer {
        field.insert("normalizer".into(), json!(normalizer));
    }
    if property.field_type.is_date() && !property.formats.is_empty() {
        let formats: Vec<&str> = property.formats.iter().map(|f| f.wire_name()).collect();
        field.insert("format".into(), json!(formats.join("||")));
    }
    if let Some(null_value) = &property.null_value {
        field.insert("null_value".into(), null_value.clone());
    }
    if !property.copy_to.is_empty() {
        field.insert("copy_to".into(), json!(property.copy_to));
    }
    if let Some(length) = property.ignore_above {
        field.insert("ignore_above".into(), json!(length));
    }
    if let Some(factor) = property.scaling_factor {
        field.insert("scaling_factor".into(), json!(factor));
    }
    if let Some(dims) = property.dims {
        field.insert("dims".into(), json!(dims));
    }
    if let Some(dynamic) = property.dynamic {
        field.insert("dynamic".into(), json!(dynamic.to_string()));
    }

    if !property.inner_fields.is_empty() {
        let fields: Map<String, Value> = property
            .inner_fields
            .iter()
            .map(|inner| (inner.suffix.clone(), inner_field_json(inner)))
            .collect();
        field.insert("fields".into(), Value::Object(fields));
    }

    if !property.properties.is_empty() {
        field.insert(
            "properties".into(),
            Value::Object(properties_json(property.properties.iter())),
        );
    }

    Some(Value::Object(field))
}

fn inner_field_json(inner: &InnerField) -> Value {
    let mut field = Map::new();
    field.insert("type".into(), json!(inner.field_type.to_string()));
    if let Some(analyzer) = &inner.analyzer {
        field.insert("analyzer".into(), json!(analyzer));
    }
    if let Some(analyzer) = &inner.search_analyzer {
        field.insert("search_analyzer".into(), json!(analyzer));
    }
    if let Some(normalizer) = &inner.normalizer {
        field.insert("normalizer".into(), json!(normalizer));
    }
    if let Some(length) = inner.ignore_above {
        field.insert("ignore_above".into(), json!(length));
    }
    Value::Object(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{DateFormat, Dynamic};

    #[test]
    fn test_basic_mapping() {
        let metadata = EntityMetadata::builder("Book", "books")
            .id("id")
            .version("version")
            .property(
                PropertyMetadata::new("title", FieldType::Text)
                    .analyzer("english")
                    .inner_field(InnerField::new("raw", FieldType::Keyword).ignore_above(256)),
            )
            .keyword("isbn")
            .build()
            .unwrap();

        let mapping = MappingBuilder::build(&metadata);
        assert_eq!(
            mapping,
            json!({
                "properties": {
                    "title": {
                        "type": "text",
                        "analyzer": "english",
                        "fields": {"raw": {"type": "keyword", "ignore_above": 256}}
                    },
                    "isbn": {"type": "keyword"}
                }
            })
        );
    }

    #[test]
    fn test_field_options() {
        let metadata = EntityMetadata::builder("Event", "events")
            .property(
                PropertyMetadata::new("at", FieldType::Date)
                    .format(DateFormat::BasicDate)
                    .format(DateFormat::EpochMillis)
                    .stored(),
            )
            .property(
                PropertyMetadata::new("code", FieldType::Keyword)
                    .not_indexed()
                    .no_doc_values()
                    .null_value(json!("NONE"))
                    .copy_to("all"),
            )
            .property(PropertyMetadata::new("price", FieldType::ScaledFloat).scaling_factor(100.0))
            .property(PropertyMetadata::new("scratch", FieldType::Keyword).transient())
            .property(PropertyMetadata::new("free", FieldType::Auto))
            .build()
            .unwrap();

        let mapping = MappingBuilder::build(&metadata);
        let props = &mapping["properties"];
        assert_eq!(props["at"], json!({"type": "date", "store": true, "format": "basic_date||epoch_millis"}));
        assert_eq!(
            props["code"],
            json!({"type": "keyword", "index": false, "doc_values": false, "null_value": "NONE", "copy_to": ["all"]})
        );
        assert_eq!(props["price"]["scaling_factor"], 100.0);
        assert!(props.get("scratch").is_none());
        assert!(props.get("free").is_none());
    }

    #[test]
    fn test_root_options_and_nested() {
        let metadata = EntityMetadata::builder("Order", "orders")
            .dynamic(Dynamic::Strict)
            .date_detection(false)
            .routing_required(true)
            .source_enabled(false)
            .nested("lines", vec![PropertyMetadata::new("sku", FieldType::Keyword)])
            .build()
            .unwrap();

        let mapping = MappingBuilder::build(&metadata);
        assert_eq!(mapping["dynamic"], "strict");
        assert_eq!(mapping["date_detection"], false);
        assert_eq!(mapping["_routing"]["required"], true);
        assert_eq!(mapping["_source"]["enabled"], false);
        assert_eq!(
            mapping["properties"]["lines"],
            json!({"type": "nested", "properties": {"sku": {"type": "keyword"}}})
        );
    }

    #[test]
    fn test_override_replaces_mapping() {
        let raw = json!({"properties": {"anything": {"type": "keyword"}}});
        let metadata = EntityMetadata::builder("Raw", "raw")
            .text("ignored")
            .mapping_override(raw.clone())
            .build()
            .unwrap();
        assert_eq!(MappingBuilder::build(&metadata), raw);
    }
}
