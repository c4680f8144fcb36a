// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index settings and their JSON form.
//!
//! ```text
//! {
//!   "index": {
//!     "number_of_shards": 1,
//!     "number_of_replicas": 1,
//!     "refresh_interval": "1s",
//!     "sort": { "field": ["published"], "order": ["desc"] }
//!   },
//!   "analysis": { ... }
//! }
//! ```

use serde_json::{json, Map, Value};

/// Index-level settings declared by an entity
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSettings {
    pub shards: Option<u32>,
    pub replicas: Option<u32>,
    pub refresh_interval: Option<String>,
    pub store_type: Option<String>,
    pub max_result_window: Option<u64>,
    /// Index sort field names, engine names
    pub sort_fields: Vec<String>,
    /// `asc` / `desc`, parallel to `sort_fields`
    pub sort_orders: Vec<String>,
    /// Raw `analysis` section (analyzers, normalizers, tokenizers, filters)
    pub analysis: Option<Value>,
    /// Raw settings deep-merged over everything generated
    pub overrides: Option<Value>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            shards: Some(1),
            replicas: Some(1),
            refresh_interval: Some("1s".to_string()),
            store_type: None,
            max_result_window: None,
            sort_fields: Vec::new(),
            sort_orders: Vec::new(),
            analysis: None,
            overrides: None,
        }
    }
}

impl IndexSettings {
    /// Settings with nothing set; the engine applies its own defaults.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            shards: None,
            replicas: None,
            refresh_interval: None,
            ..Default::default()
        }
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: impl Into<String>) -> Self {
        self.sort_fields.push(field.into());
        self.sort_orders.push(order.into());
        self
    }
}

pub struct SettingsBuilder;

impl SettingsBuilder {
    pub fn build(settings: &IndexSettings) -> Value {
        let mut index = Map::new();

        if let Some(shards) = settings.shards {
            index.insert("number_of_shards".into(), json!(shards));
        }
        if let Some(replicas) = settings.replicas {
            index.insert("number_of_replicas".into(), json!(replicas));
        }
        if let Some(interval) = &settings.refresh_interval {
            index.insert("refresh_interval".into(), json!(interval));
        }
        if let Some(store) = &settings.store_type {
            index.insert("store".into(), json!({ "type": store }));
        }
        if let Some(window) = settings.max_result_window {
            index.insert("max_result_window".into(), json!(window));
        }
        if !settings.sort_fields.is_empty() {
            let mut sort = Map::new();
            sort.insert("field".into(), json!(settings.sort_fields));
            if !settings.sort_orders.is_empty() {
                sort.insert("order".into(), json!(settings.sort_orders));
            }
            index.insert("sort".into(), Value::Object(sort));
        }

        let mut root = Map::new();
        if !index.is_empty() {
            root.insert("index".into(), Value::Object(index));
        }
        if let Some(analysis) = &settings.analysis {
            root.insert("analysis".into(), analysis.clone());
        }

        let mut value = Value::Object(root);
        if let Some(overrides) = &settings.overrides {
            deep_merge(&mut value, overrides.clone());
        }
        value
    }
}

/// Merge `overlay` into `target`. Objects merge key by key, anything else
/// in the overlay replaces the target value.
pub fn deep_merge(target: &mut Value, overlay: Value) {
    match (target, overlay) {
        (Value::Object(target), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, overlay) => *target = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let value = SettingsBuilder::build(&IndexSettings::default());
        assert_eq!(
            value,
            json!({"index": {"number_of_shards": 1, "number_of_replicas": 1, "refresh_interval": "1s"}})
        );
    }

    #[test]
    fn test_empty_settings() {
        assert_eq!(SettingsBuilder::build(&IndexSettings::empty()), json!({}));
    }

    #[test]
    fn test_sort_and_analysis() {
        let settings = IndexSettings {
            analysis: Some(json!({"analyzer": {"folding": {"tokenizer": "standard"}}})),
            store_type: Some("fs".into()),
            max_result_window: Some(50_000),
            ..IndexSettings::empty()
        }
        .sort_by("published", "desc");

        let value = SettingsBuilder::build(&settings);
        assert_eq!(value["index"]["sort"], json!({"field": ["published"], "order": ["desc"]}));
        assert_eq!(value["index"]["store"]["type"], "fs");
        assert_eq!(value["index"]["max_result_window"], 50_000);
        assert_eq!(value["analysis"]["analyzer"]["folding"]["tokenizer"], "standard");
    }

    #[test]
    fn test_overrides_merge_last() {
        let settings = IndexSettings {
            overrides: Some(json!({"index": {"number_of_replicas": 0, "codec": "best_compression"}})),
            ..IndexSettings::default()
        };
        let value = SettingsBuilder::build(&settings);
        assert_eq!(value["index"]["number_of_replicas"], 0);
        assert_eq!(value["index"]["number_of_shards"], 1);
        assert_eq!(value["index"]["codec"], "best_compression");
    }

    #[test]
    fn test_deep_merge_replaces_non_objects() {
        let mut target = json!({"a": {"b": [1, 2]}, "c": 1});
        deep_merge(&mut target, json!({"a": {"b": [3]}, "d": true}));
        assert_eq!(target, json!({"a": {"b": [3]}, "c": 1, "d": true}));
    }
}
