// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Aggregation results.
//!
//! Results are classified by shape, since the response does not carry the
//! aggregation type unless `typed_keys` is requested:
//!
//! ```text
//! {"buckets": [...] | {...}}              → Buckets
//! {"count", "min", "max", "avg", "sum"}   → Stats
//! {"value": ..}                           → SingleValue
//! anything else                           → Raw
//! ```

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Aggregation results by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregations(BTreeMap<String, Aggregate>);

impl Aggregations {
    /// Parse an `aggregations` object
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        Self(
            obj.iter()
                .map(|(name, body)| (name.clone(), Aggregate::from_json(body)))
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&Aggregate> {
        self.0.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    SingleValue {
        /// `null` for metrics over no documents
        value: Option<f64>,
        value_as_string: Option<String>,
    },
    Stats {
        count: u64,
        min: Option<f64>,
        max: Option<f64>,
        avg: Option<f64>,
        sum: f64,
    },
    Buckets(Vec<Bucket>),
    Raw(Value),
}

impl Aggregate {
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Aggregate::Raw(value.clone());
        };

        if let Some(buckets) = obj.get("buckets") {
            return Aggregate::Buckets(parse_buckets(buckets));
        }

        if ["count", "min", "max", "avg", "sum"].iter().all(|k| obj.contains_key(*k)) {
            return Aggregate::Stats {
                count: obj.get("count").and_then(Value::as_u64).unwrap_or_default(),
                min: obj.get("min").and_then(Value::as_f64),
                max: obj.get("max").and_then(Value::as_f64),
                avg: obj.get("avg").and_then(Value::as_f64),
                sum: obj.get("sum").and_then(Value::as_f64).unwrap_or_default(),
            };
        }

        if let Some(single) = obj.get("value") {
            if single.is_number() || single.is_null() {
                return Aggregate::SingleValue {
                    value: single.as_f64(),
                    value_as_string: obj.get("value_as_string").and_then(Value::as_str).map(str::to_string),
                };
            }
        }

        Aggregate::Raw(value.clone())
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Aggregate::SingleValue { value, .. } => *value,
            _ => None,
        }
    }

    pub fn buckets(&self) -> &[Bucket] {
        match self {
            Aggregate::Buckets(buckets) => buckets,
            _ => &[],
        }
    }
}

/// One bucket of a bucket aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub key: Value,
    pub key_as_string: Option<String>,
    pub doc_count: u64,
    /// Sub-aggregations
    pub aggregations: Aggregations,
}

const BUCKET_FIELDS: &[&str] = &["key", "key_as_string", "doc_count", "from", "from_as_string", "to", "to_as_string"];

fn parse_buckets(value: &Value) -> Vec<Bucket> {
    match value {
        Value::Array(items) => items.iter().filter_map(|b| parse_bucket(None, b)).collect(),
        // Keyed buckets (`"keyed": true`, filters aggregation)
        Value::Object(obj) => obj
            .iter()
            .filter_map(|(key, b)| parse_bucket(Some(key), b))
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_bucket(key: Option<&String>, value: &Value) -> Option<Bucket> {
    let obj = value.as_object()?;
    let sub: Map<String, Value> = obj
        .iter()
        .filter(|(k, v)| !BUCKET_FIELDS.contains(&k.as_str()) && v.is_object())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Some(Bucket {
        key: obj
            .get("key")
            .cloned()
            .or_else(|| key.map(|k| Value::String(k.clone())))
            .unwrap_or(Value::Null),
        key_as_string: obj.get("key_as_string").and_then(Value::as_str).map(str::to_string),
        doc_count: obj.get("doc_count").and_then(Value::as_u64).unwrap_or_default(),
        aggregations: Aggregations::from_json(&Value::Object(sub)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_terms_with_sub_aggregation() {
        let aggs = Aggregations::from_json(&json!({
            "by_year": {
                "doc_count_error_upper_bound": 0,
                "buckets": [
                    {"key": 1965, "doc_count": 2, "avg_pages": {"value": 412.5}},
                    {"key": 1969, "doc_count": 1, "avg_pages": {"value": null}}
                ]
            }
        }));

        let buckets = aggs.get("by_year").unwrap().buckets();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].key, json!(1965));
        assert_eq!(buckets[0].doc_count, 2);
        assert_eq!(buckets[0].aggregations.get("avg_pages").unwrap().value(), Some(412.5));
        assert_eq!(buckets[1].aggregations.get("avg_pages").unwrap().value(), None);
    }

    #[test]
    fn test_stats_and_single_value() {
        let aggs = Aggregations::from_json(&json!({
            "pages": {"count": 3, "min": 100.0, "max": 900.0, "avg": 400.0, "sum": 1200.0},
            "max_year": {"value": 1985.0, "value_as_string": "1985"}
        }));

        assert_eq!(
            aggs.get("pages"),
            Some(&Aggregate::Stats { count: 3, min: Some(100.0), max: Some(900.0), avg: Some(400.0), sum: 1200.0 })
        );
        assert!(matches!(
            aggs.get("max_year"),
            Some(Aggregate::SingleValue { value: Some(v), value_as_string: Some(s) }) if *v == 1985.0 && s == "1985"
        ));
    }

    #[test]
    fn test_keyed_buckets_and_raw() {
        let aggs = Aggregations::from_json(&json!({
            "langs": {"buckets": {"en": {"doc_count": 4}, "de": {"doc_count": 1}}},
            "top": {"hits": {"hits": []}}
        }));
        let buckets = aggs.get("langs").unwrap().buckets();
        assert_eq!(buckets.len(), 2);
        assert!(buckets.iter().any(|b| b.key == json!("en") && b.doc_count == 4));
        assert!(matches!(aggs.get("top"), Some(Aggregate::Raw(_))));
        assert_eq!(aggs.names().count(), 2);
    }

    #[test]
    fn test_non_object_is_empty() {
        assert!(Aggregations::from_json(&json!(null)).is_empty());
    }
}
