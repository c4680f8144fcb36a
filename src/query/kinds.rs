// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::BTreeMap;

use serde_json::Value;

use super::criteria::Criteria;
use super::options::QueryOptions;
use crate::error::OdmError;

/// Criteria-based query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriteriaQuery {
    pub criteria: Criteria,
    pub options: QueryOptions,
}

impl CriteriaQuery {
    pub fn new(criteria: Criteria) -> Self {
        Self {
            criteria,
            options: QueryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }
}

/// Query built directly from query DSL JSON
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeQuery {
    pub query: Option<Value>,
    /// Added as `bool.filter` around `query`
    pub filter: Option<Value>,
    /// Name → aggregation body, sent as `aggs`
    pub aggregations: BTreeMap<String, Value>,
    pub post_filter: Option<Value>,
    pub suggest: Option<Value>,
    pub script_fields: BTreeMap<String, Value>,
    pub runtime_mappings: Option<Value>,
    pub options: QueryOptions,
}

impl NativeQuery {
    pub fn new(query: Value) -> Self {
        Self {
            query: Some(query),
            ..Default::default()
        }
    }

    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn aggregation(mut self, name: impl Into<String>, aggregation: Value) -> Self {
        self.aggregations.insert(name.into(), aggregation);
        self
    }

    pub fn post_filter(mut self, filter: Value) -> Self {
        self.post_filter = Some(filter);
        self
    }

    pub fn suggest(mut self, suggest: Value) -> Self {
        self.suggest = Some(suggest);
        self
    }

    pub fn script_field(mut self, name: impl Into<String>, script: Value) -> Self {
        self.script_fields.insert(name.into(), script);
        self
    }

    pub fn runtime_mappings(mut self, mappings: Value) -> Self {
        self.runtime_mappings = Some(mappings);
        self
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }
}

/// Query DSL string with `?0`, `?1`, ... placeholders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringQuery {
    pub source: String,
    pub params: Vec<Value>,
    pub options: QueryOptions,
}

impl StringQuery {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Substitute placeholders and parse the result.
    ///
    /// Placeholders are replaced with the JSON encoding of the parameter,
    /// so `"?0"` with a string parameter becomes `"\"value\""`; write
    /// placeholders unquoted in the source.
    pub fn render(&self) -> Result<Value, OdmError> {
        let mut rendered = String::with_capacity(self.source.len());
        let mut chars = self.source.char_indices().peekable();

        while let Some((_, c)) = chars.next() {
            if c != '?' {
                rendered.push(c);
                continue;
            }

            let mut digits = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits.push(d);
                chars.next();
            }

            if digits.is_empty() {
                rendered.push('?');
                continue;
            }

            let index: usize = digits
                .parse()
                .map_err(|_| OdmError::InvalidQuery(format!("bad placeholder ?{}", digits)))?;
            let param = self.params.get(index).ok_or_else(|| {
                OdmError::InvalidQuery(format!(
                    "placeholder ?{} has no parameter ({} given)",
                    index,
                    self.params.len()
                ))
            })?;
            rendered.push_str(&param.to_string());
        }

        serde_json::from_str(&rendered)
            .map_err(|e| OdmError::InvalidQuery(format!("rendered string query is not JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_placeholders() {
        let query = StringQuery::new(r#"{"bool": {"must": [{"match": {"title": ?0}}, {"range": {"year": {"gte": ?1}}}]}}"#)
            .param("dune")
            .param(1965);

        assert_eq!(
            query.render().unwrap(),
            json!({"bool": {"must": [{"match": {"title": "dune"}}, {"range": {"year": {"gte": 1965}}}]}})
        );
    }

    #[test]
    fn test_render_escapes_strings() {
        let query = StringQuery::new(r#"{"term": {"title": ?0}}"#).param("say \"hi\"");
        assert_eq!(query.render().unwrap(), json!({"term": {"title": "say \"hi\""}}));
    }

    #[test]
    fn test_render_multi_digit_and_lists() {
        let mut query = StringQuery::new(r#"{"terms": {"tag": ?10}}"#);
        for i in 0..10 {
            query = query.param(i);
        }
        let query = query.param(json!(["a", "b"]));
        assert_eq!(query.render().unwrap(), json!({"terms": {"tag": ["a", "b"]}}));
    }

    #[test]
    fn test_render_missing_param() {
        let query = StringQuery::new(r#"{"term": {"a": ?1}}"#).param("x");
        assert!(matches!(query.render(), Err(OdmError::InvalidQuery(_))));
    }

    #[test]
    fn test_render_invalid_json() {
        let query = StringQuery::new("{not json");
        assert!(matches!(query.render(), Err(OdmError::InvalidQuery(_))));
    }

    #[test]
    fn test_native_builder() {
        let query = NativeQuery::new(json!({"match": {"title": "dune"}}))
            .filter(json!({"term": {"lang": "en"}}))
            .aggregation("by_year", json!({"terms": {"field": "year"}}));
        assert!(query.filter.is_some());
        assert_eq!(query.aggregations.len(), 1);
        assert!(NativeQuery::match_all().query.is_none());
    }
}
