// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Criteria Translator
//!
//! Translates the criteria AST into the engine's JSON query DSL.
//!
//! ```text
//! Equals            {"query_string": {"query": "v", "fields": [f], "default_operator": "and"}}
//! Contains          {"query_string": {"query": "*v*", "fields": [f], "analyze_wildcard": true}}
//! Between / Lt ...  {"range": {f: {"gte": a, "lte": b}}}
//! In / NotIn        {"terms": {f: [...]}}, wrapped in bool.must_not for NotIn
//! Within            {"geo_distance": {"distance": d, f: {...}}}        → bool.filter
//! And               {"bool": {"must": [...], "filter": [...]}}
//! Or                {"bool": {"should": [...], "minimum_should_match": 1}}
//! Not               {"bool": {"must_not": [...]}}
//! nested path       {"nested": {"path": p, "query": leaf}}
//! ```

use serde_json::{json, Map, Value};

use super::criteria::{Condition, Criteria, CriteriaNode, CriteriaValue, Operator};
use crate::error::OdmError;
use crate::mapping::EntityMetadata;

/// Translated node: scoring query or non-scoring filter
enum Clause {
    Query(Value),
    Filter(Value),
}

impl Clause {
    /// As a standalone query
    fn into_query(self) -> Value {
        match self {
            Clause::Query(query) => query,
            Clause::Filter(filter) => json!({ "bool": { "filter": [filter] } }),
        }
    }
}

/// Criteria → query DSL translator
pub struct CriteriaTranslator;

impl CriteriaTranslator {
    /// Translate criteria; property paths resolve through `metadata` when given
    pub fn translate(criteria: &Criteria, metadata: Option<&EntityMetadata>) -> Result<Value, OdmError> {
        if criteria.is_empty() {
            return Ok(json!({ "match_all": {} }));
        }
        Ok(Self::translate_node(&criteria.root, metadata)?.into_query())
    }

    fn translate_node(node: &CriteriaNode, metadata: Option<&EntityMetadata>) -> Result<Clause, OdmError> {
        match node {
            CriteriaNode::Condition(condition) => Self::translate_condition(condition, metadata),
            CriteriaNode::And(nodes) => {
                let children = Self::flatten(nodes, true);
                if children.is_empty() {
                    return Ok(Clause::Query(json!({ "match_all": {} })));
                }
                if children.len() == 1 {
                    return Self::translate_node(children[0], metadata);
                }

                let mut must = Vec::new();
                let mut filter = Vec::new();
                for child in children {
                    match Self::translate_node(child, metadata)? {
                        Clause::Query(query) => must.push(query),
                        Clause::Filter(f) => filter.push(f),
                    }
                }

                let mut bool_query = Map::new();
                if !must.is_empty() {
                    bool_query.insert("must".into(), Value::Array(must));
                }
                if !filter.is_empty() {
                    bool_query.insert("filter".into(), Value::Array(filter));
                }
                Ok(Clause::Query(json!({ "bool": bool_query })))
            }
            CriteriaNode::Or(nodes) => {
                let children = Self::flatten(nodes, false);
                if children.is_empty() {
                    return Ok(Clause::Query(json!({ "match_all": {} })));
                }
                if children.len() == 1 {
                    return Self::translate_node(children[0], metadata);
                }

                let should = children
                    .into_iter()
                    .map(|child| Self::translate_node(child, metadata).map(Clause::into_query))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Clause::Query(json!({
                    "bool": { "should": should, "minimum_should_match": 1 }
                })))
            }
            CriteriaNode::Not(inner) => {
                let inner = Self::translate_node(inner, metadata)?.into_query();
                Ok(Clause::Query(json!({ "bool": { "must_not": [inner] } })))
            }
        }
    }

    /// Inline same-kind children and drop empty groups
    fn flatten(nodes: &[CriteriaNode], and: bool) -> Vec<&CriteriaNode> {
        let mut out = Vec::new();
        for node in nodes {
            match node {
                CriteriaNode::And(inner) if and => out.extend(Self::flatten(inner, and)),
                CriteriaNode::Or(inner) if !and => out.extend(Self::flatten(inner, and)),
                other if other.is_empty() => {}
                other => out.push(other),
            }
        }
        out
    }

    fn translate_condition(condition: &Condition, metadata: Option<&EntityMetadata>) -> Result<Clause, OdmError> {
        if condition.field.trim().is_empty() {
            return Err(OdmError::InvalidQuery("condition without field name".into()));
        }

        let (field, nested_path) = match metadata {
            Some(metadata) => (
                metadata.field_name_for_path(&condition.field),
                metadata.nested_path_for(&condition.field),
            ),
            None => (condition.field.clone(), None),
        };

        let clause = Self::leaf(condition, &field)?;

        match nested_path {
            Some(path) => Ok(Clause::Query(json!({
                "nested": { "path": path, "query": clause.into_query() }
            }))),
            None => Ok(clause),
        }
    }

    fn leaf(condition: &Condition, field: &str) -> Result<Clause, OdmError> {
        let boost = condition.boost;
        let mismatch = || {
            OdmError::InvalidQuery(format!(
                "{:?} cannot be used with {:?} on '{}'",
                condition.operator, condition.value, condition.field
            ))
        };

        let query = match (condition.operator, &condition.value) {
            (Operator::Equals, value) => {
                let text = value.as_text().ok_or_else(mismatch)?;
                let mut qs = query_string(field, &escape(&text), boost);
                qs["query_string"]["default_operator"] = json!("and");
                qs
            }
            (Operator::Contains, CriteriaValue::Text(text)) => {
                wildcard_string(field, &format!("*{}*", escape(text)), boost)
            }
            (Operator::StartsWith, CriteriaValue::Text(text)) => {
                wildcard_string(field, &format!("{}*", escape(text)), boost)
            }
            (Operator::EndsWith, CriteriaValue::Text(text)) => {
                wildcard_string(field, &format!("*{}", escape(text)), boost)
            }
            (Operator::Expression, CriteriaValue::Text(text)) => query_string(field, text, boost),
            (Operator::Fuzzy, CriteriaValue::Text(text)) => {
                json!({ "fuzzy": { field: with_boost(json!({ "value": text }), boost) } })
            }
            (Operator::Matches | Operator::MatchesAll, value) => {
                let query = value.scalar_json().ok_or_else(mismatch)?;
                let operator = if condition.operator == Operator::Matches { "or" } else { "and" };
                json!({ "match": { field: with_boost(json!({ "query": query, "operator": operator }), boost) } })
            }
            (Operator::Between, CriteriaValue::Range { from, to }) => {
                let mut bounds = Map::new();
                if let Some(from) = from {
                    bounds.insert("gte".into(), from.clone());
                }
                if let Some(to) = to {
                    bounds.insert("lte".into(), to.clone());
                }
                json!({ "range": { field: with_boost(Value::Object(bounds), boost) } })
            }
            (
                op @ (Operator::LessThan | Operator::LessThanEqual | Operator::GreaterThan | Operator::GreaterThanEqual),
                value,
            ) => {
                let bound = match value {
                    CriteriaValue::Text(_) | CriteriaValue::Number(_) => value.scalar_json().ok_or_else(mismatch)?,
                    _ => return Err(mismatch()),
                };
                let key = match op {
                    Operator::LessThan => "lt",
                    Operator::LessThanEqual => "lte",
                    Operator::GreaterThan => "gt",
                    _ => "gte",
                };
                json!({ "range": { field: with_boost(json!({ key: bound }), boost) } })
            }
            (Operator::In, CriteriaValue::List(values)) => terms(field, values, boost),
            (Operator::NotIn, CriteriaValue::List(values)) => {
                json!({ "bool": { "must_not": [terms(field, values, boost)] } })
            }
            (Operator::Exists, CriteriaValue::None) => {
                json!({ "exists": with_boost(json!({ "field": field }), boost) })
            }
            (Operator::Empty, CriteriaValue::None) => json!({
                "bool": with_boost(
                    json!({
                        "must": [{ "exists": { "field": field } }],
                        "must_not": [{ "wildcard": { field: { "wildcard": "*" } } }]
                    }),
                    boost
                )
            }),
            (Operator::NotEmpty, CriteriaValue::None) => {
                json!({ "wildcard": { field: with_boost(json!({ "wildcard": "*" }), boost) } })
            }
            (Operator::Regexp, CriteriaValue::Text(pattern)) => {
                json!({ "regexp": { field: with_boost(json!({ "value": pattern }), boost) } })
            }
            (Operator::Within, CriteriaValue::GeoDistance { center, distance }) => {
                return Ok(Clause::Filter(json!({
                    "geo_distance": {
                        "distance": distance,
                        field: { "lat": center.lat, "lon": center.lon }
                    }
                })));
            }
            (Operator::BoundingBox, CriteriaValue::GeoBox { top_left, bottom_right }) => {
                return Ok(Clause::Filter(json!({
                    "geo_bounding_box": {
                        field: {
                            "top_left": { "lat": top_left.lat, "lon": top_left.lon },
                            "bottom_right": { "lat": bottom_right.lat, "lon": bottom_right.lon }
                        }
                    }
                })));
            }
            _ => return Err(mismatch()),
        };

        Ok(Clause::Query(query))
    }
}

fn with_boost(mut body: Value, boost: Option<f32>) -> Value {
    if let (Some(boost), Value::Object(map)) = (boost, &mut body) {
        map.insert("boost".into(), json!(boost));
    }
    body
}

fn query_string(field: &str, query: &str, boost: Option<f32>) -> Value {
    json!({ "query_string": with_boost(json!({ "query": query, "fields": [field] }), boost) })
}

fn wildcard_string(field: &str, query: &str, boost: Option<f32>) -> Value {
    let mut qs = query_string(field, query, boost);
    qs["query_string"]["analyze_wildcard"] = json!(true);
    qs
}

fn terms(field: &str, values: &[Value], boost: Option<f32>) -> Value {
    let mut body = Map::new();
    body.insert(field.to_string(), Value::Array(values.to_vec()));
    json!({ "terms": with_boost(Value::Object(body), boost) })
}

/// Escape query-string syntax characters; whitespace is kept so terms stay separate
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '+' | '-' | '!' | '(' | ')' | ':' | '^' | '[' | ']' | '"' | '{' | '}' | '~' | '*' | '?'
            | '|' | '&' | '/' | '=' | '<' | '>' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{FieldType, PropertyMetadata};
    use crate::query::{CriteriaBuilder, GeoPoint};

    fn translate(criteria: Criteria) -> Value {
        CriteriaTranslator::translate(&criteria, None).unwrap()
    }

    #[test]
    fn test_empty_is_match_all() {
        assert_eq!(translate(Criteria::match_all()), json!({"match_all": {}}));
        assert_eq!(translate(CriteriaBuilder::new().build_or()), json!({"match_all": {}}));
    }

    #[test]
    fn test_equals() {
        assert_eq!(
            translate(Criteria::field("title").is("Dune Messiah")),
            json!({"query_string": {"query": "Dune Messiah", "fields": ["title"], "default_operator": "and"}})
        );
        assert_eq!(
            translate(Criteria::field("year").is(1965)),
            json!({"query_string": {"query": "1965", "fields": ["year"], "default_operator": "and"}})
        );
    }

    #[test]
    fn test_wildcards_escaped() {
        assert_eq!(
            translate(Criteria::field("path").contains("a/b")),
            json!({"query_string": {"query": "*a\\/b*", "fields": ["path"], "analyze_wildcard": true}})
        );
        assert_eq!(translate(Criteria::field("t").starts_with("ru"))["query_string"]["query"], "ru*");
        assert_eq!(translate(Criteria::field("t").ends_with("st"))["query_string"]["query"], "*st");
    }

    #[test]
    fn test_expression_is_raw() {
        assert_eq!(
            translate(Criteria::field("t").expression("a AND (b OR c)"))["query_string"]["query"],
            "a AND (b OR c)"
        );
    }

    #[test]
    fn test_match_and_fuzzy() {
        assert_eq!(
            translate(Criteria::field("t").matches("quick fox")),
            json!({"match": {"t": {"query": "quick fox", "operator": "or"}}})
        );
        assert_eq!(
            translate(Criteria::field("t").matches_all("quick fox"))["match"]["t"]["operator"],
            "and"
        );
        assert_eq!(translate(Criteria::field("t").fuzzy("dnue")), json!({"fuzzy": {"t": {"value": "dnue"}}}));
    }

    #[test]
    fn test_ranges() {
        assert_eq!(
            translate(Criteria::field("year").between(1960, 1970)),
            json!({"range": {"year": {"gte": 1960, "lte": 1970}}})
        );
        assert_eq!(
            translate(Criteria::field("year").range(None, Some(json!(1970)))),
            json!({"range": {"year": {"lte": 1970}}})
        );
        assert_eq!(
            translate(Criteria::field("year").less_than(2000)),
            json!({"range": {"year": {"lt": 2000}}})
        );
        assert_eq!(
            translate(Criteria::field("at").greater_than_equal("2024-01-01")),
            json!({"range": {"at": {"gte": "2024-01-01"}}})
        );
    }

    #[test]
    fn test_terms_and_exists() {
        assert_eq!(
            translate(Criteria::field("tag").in_values(["a", "b"])),
            json!({"terms": {"tag": ["a", "b"]}})
        );
        assert_eq!(
            translate(Criteria::field("tag").not_in(["a"])),
            json!({"bool": {"must_not": [{"terms": {"tag": ["a"]}}]}})
        );
        assert_eq!(translate(Criteria::field("x").exists()), json!({"exists": {"field": "x"}}));
        assert_eq!(
            translate(Criteria::field("x").not_empty()),
            json!({"wildcard": {"x": {"wildcard": "*"}}})
        );
        assert_eq!(
            translate(Criteria::field("x").empty()),
            json!({"bool": {
                "must": [{"exists": {"field": "x"}}],
                "must_not": [{"wildcard": {"x": {"wildcard": "*"}}}]
            }})
        );
    }

    #[test]
    fn test_boost() {
        assert_eq!(
            translate(Criteria::field("t").boost(2.0).is("x")),
            json!({"query_string": {"query": "x", "fields": ["t"], "default_operator": "and", "boost": 2.0}})
        );
        assert_eq!(
            translate(Criteria::field("n").between(1, 2).boost(1.5)),
            json!({"range": {"n": {"gte": 1, "lte": 2, "boost": 1.5}}})
        );
        assert_eq!(
            translate(Criteria::field("x").boost(3.0).empty()),
            json!({"bool": {
                "must": [{"exists": {"field": "x"}}],
                "must_not": [{"wildcard": {"x": {"wildcard": "*"}}}],
                "boost": 3.0
            }})
        );
    }

    #[test]
    fn test_negated_empty_matches_nothing() {
        let nothing = json!({"bool": {"must_not": [{"match_all": {}}]}});
        assert_eq!(translate(Criteria::match_all().negate()), nothing);
        assert_eq!(translate(CriteriaBuilder::new().build_or().negate()), nothing);

        // Inside a group it still excludes everything
        let value = translate(Criteria::field("a").exists().and(Criteria::match_all().negate()));
        assert_eq!(value["bool"]["must"].as_array().unwrap().len(), 2);
        assert_eq!(value["bool"]["must"][1], nothing);
    }

    #[test]
    fn test_geo_goes_to_filter() {
        let criteria = Criteria::field("title")
            .is("cafe")
            .and(Criteria::field("location").within(GeoPoint::new(52.5, 13.4), "2km"));

        assert_eq!(
            translate(criteria),
            json!({"bool": {
                "must": [{"query_string": {"query": "cafe", "fields": ["title"], "default_operator": "and"}}],
                "filter": [{"geo_distance": {"distance": "2km", "location": {"lat": 52.5, "lon": 13.4}}}]
            }})
        );

        let alone = translate(Criteria::field("location").bounding_box(GeoPoint::new(53.0, 13.0), GeoPoint::new(52.0, 14.0)));
        assert_eq!(
            alone["bool"]["filter"][0]["geo_bounding_box"]["location"]["top_left"],
            json!({"lat": 53.0, "lon": 13.0})
        );
    }

    #[test]
    fn test_bool_structure() {
        let criteria = Criteria::field("a")
            .exists()
            .and(Criteria::field("b").exists().and(Criteria::field("c").exists()));
        let value = translate(criteria);
        // Nested AND flattens
        assert_eq!(value["bool"]["must"].as_array().unwrap().len(), 3);

        let value = translate(Criteria::field("s").is("x").or(Criteria::field("s").is("y")));
        assert_eq!(value["bool"]["should"].as_array().unwrap().len(), 2);
        assert_eq!(value["bool"]["minimum_should_match"], 1);

        let value = translate(Criteria::field("d").exists().negate());
        assert_eq!(value, json!({"bool": {"must_not": [{"exists": {"field": "d"}}]}}));
    }

    #[test]
    fn test_single_child_group_collapses() {
        let criteria = Criteria::new(CriteriaNode::And(vec![CriteriaNode::Or(vec![
            Criteria::field("a").exists().root,
        ])]));
        assert_eq!(translate(criteria), json!({"exists": {"field": "a"}}));
    }

    #[test]
    fn test_metadata_field_names_and_nested() {
        let metadata = EntityMetadata::builder("Book", "books")
            .property(PropertyMetadata::new("publishedAt", FieldType::Date).field_name("published"))
            .nested(
                "authors",
                vec![PropertyMetadata::new("lastName", FieldType::Keyword).field_name("last_name")],
            )
            .build()
            .unwrap();

        let value = CriteriaTranslator::translate(&Criteria::field("publishedAt").exists(), Some(&metadata)).unwrap();
        assert_eq!(value, json!({"exists": {"field": "published"}}));

        let value = CriteriaTranslator::translate(
            &Criteria::field("authors.lastName").in_values(["Herbert"]),
            Some(&metadata),
        )
        .unwrap();
        assert_eq!(
            value,
            json!({"nested": {"path": "authors", "query": {"terms": {"authors.last_name": ["Herbert"]}}}})
        );
    }

    #[test]
    fn test_mismatched_value_is_error() {
        let criteria = Criteria::new(CriteriaNode::Condition(Condition {
            field: "t".into(),
            operator: Operator::Between,
            value: CriteriaValue::Text("x".into()),
            boost: None,
        }));
        assert!(matches!(
            CriteriaTranslator::translate(&criteria, None),
            Err(OdmError::InvalidQuery(_))
        ));

        let empty_field = Criteria::field("").exists();
        assert!(CriteriaTranslator::translate(&empty_field, None).is_err());
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a+b (c)"), "a\\+b \\(c\\)");
        assert_eq!(escape("plain text"), "plain text");
    }
}
