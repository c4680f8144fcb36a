// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Criteria - AST for property-level search conditions
//!
//! Conditions name entity properties (dot paths through object and nested
//! properties); the translator resolves them to engine field names.
//!
//! # Example
//!
//! ```rust
//! use search_odm::query::{Criteria, CriteriaBuilder};
//!
//! // Simple condition
//! let criteria = Criteria::field("title").is("Dune");
//!
//! // Several conditions, all required
//! let criteria = CriteriaBuilder::new()
//!     .is("author", "Herbert")
//!     .between("year", 1960, 1970)
//!     .build_and();
//!
//! // Boolean combinations
//! let criteria = Criteria::field("status").is("active")
//!     .or(Criteria::field("status").is("pending"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Criteria AST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    /// Root node
    pub root: CriteriaNode,
}

impl Criteria {
    pub fn new(root: CriteriaNode) -> Self {
        Self { root }
    }

    /// Criteria matching every document
    pub fn match_all() -> Self {
        Self::new(CriteriaNode::And(Vec::new()))
    }

    /// Start a condition on a property path
    pub fn field(field: impl Into<String>) -> FieldCriteria {
        FieldCriteria {
            field: field.into(),
            boost: None,
        }
    }

    /// True when the criteria has no conditions at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Combine with AND
    pub fn and(self, other: Criteria) -> Self {
        Self::new(CriteriaNode::And(vec![self.root, other.root]))
    }

    /// Combine with OR
    pub fn or(self, other: Criteria) -> Self {
        Self::new(CriteriaNode::Or(vec![self.root, other.root]))
    }

    /// Negate
    pub fn negate(self) -> Self {
        Self::new(CriteriaNode::Not(Box::new(self.root)))
    }

    /// Boost a single-condition criteria; groups are left unchanged
    pub fn boost(mut self, boost: f32) -> Self {
        if let CriteriaNode::Condition(condition) = &mut self.root {
            condition.boost = Some(boost);
        }
        self
    }
}

impl Default for Criteria {
    fn default() -> Self {
        Self::match_all()
    }
}

/// Criteria AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CriteriaNode {
    Condition(Condition),
    /// All must match; empty matches everything
    And(Vec<CriteriaNode>),
    /// At least one must match; empty matches everything
    Or(Vec<CriteriaNode>),
    /// Negating an empty node matches nothing
    Not(Box<CriteriaNode>),
}

impl CriteriaNode {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            CriteriaNode::Condition(_) | CriteriaNode::Not(_) => false,
            CriteriaNode::And(nodes) | CriteriaNode::Or(nodes) => nodes.iter().all(CriteriaNode::is_empty),
        }
    }
}

/// Single property condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Property path, e.g. "authors.name"
    pub field: String,
    pub operator: Operator,
    pub value: CriteriaValue,
    pub boost: Option<f32>,
}

/// Condition operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// Analyzed match of all terms
    Equals,
    /// `*value*`
    Contains,
    /// `value*`
    StartsWith,
    /// `*value`
    EndsWith,
    /// Raw query-string expression
    Expression,
    Fuzzy,
    /// Any term matches
    Matches,
    /// All terms match
    MatchesAll,
    Between,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    In,
    NotIn,
    Exists,
    /// Field present but without a value
    Empty,
    /// Field has a non-empty value
    NotEmpty,
    Regexp,
    /// Within a distance of a geo point
    Within,
    BoundingBox,
}

/// Geo point as latitude/longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Condition value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CriteriaValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Inclusive range; open ends are `None`
    Range { from: Option<Value>, to: Option<Value> },
    List(Vec<Value>),
    /// Distance in engine units, e.g. "12km"
    GeoDistance { center: GeoPoint, distance: String },
    GeoBox { top_left: GeoPoint, bottom_right: GeoPoint },
    None,
}

impl CriteriaValue {
    /// Scalar value as JSON, `None` for non-scalars
    pub fn scalar_json(&self) -> Option<Value> {
        match self {
            CriteriaValue::Text(s) => Some(Value::String(s.clone())),
            CriteriaValue::Number(n) => Some(number_json(*n)),
            CriteriaValue::Bool(b) => Some(Value::Bool(*b)),
            _ => None,
        }
    }

    /// Scalar value as query text
    pub fn as_text(&self) -> Option<String> {
        match self.scalar_json()? {
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }
}

/// Whole numbers stay integers on the wire
pub(crate) fn number_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<&str> for CriteriaValue {
    fn from(s: &str) -> Self {
        CriteriaValue::Text(s.to_string())
    }
}

impl From<String> for CriteriaValue {
    fn from(s: String) -> Self {
        CriteriaValue::Text(s)
    }
}

impl From<f64> for CriteriaValue {
    fn from(n: f64) -> Self {
        CriteriaValue::Number(n)
    }
}

impl From<i64> for CriteriaValue {
    fn from(n: i64) -> Self {
        CriteriaValue::Number(n as f64)
    }
}

impl From<i32> for CriteriaValue {
    fn from(n: i32) -> Self {
        CriteriaValue::Number(f64::from(n))
    }
}

impl From<bool> for CriteriaValue {
    fn from(b: bool) -> Self {
        CriteriaValue::Bool(b)
    }
}

/// Condition builder for one property, from [`Criteria::field`]
#[derive(Debug, Clone)]
pub struct FieldCriteria {
    field: String,
    boost: Option<f32>,
}

impl FieldCriteria {
    pub fn boost(mut self, boost: f32) -> Self {
        self.boost = Some(boost);
        self
    }

    fn condition(self, operator: Operator, value: CriteriaValue) -> Criteria {
        Criteria::new(CriteriaNode::Condition(Condition {
            field: self.field,
            operator,
            value,
            boost: self.boost,
        }))
    }

    pub fn is(self, value: impl Into<CriteriaValue>) -> Criteria {
        self.condition(Operator::Equals, value.into())
    }

    pub fn contains(self, text: impl Into<String>) -> Criteria {
        self.condition(Operator::Contains, CriteriaValue::Text(text.into()))
    }

    pub fn starts_with(self, text: impl Into<String>) -> Criteria {
        self.condition(Operator::StartsWith, CriteriaValue::Text(text.into()))
    }

    pub fn ends_with(self, text: impl Into<String>) -> Criteria {
        self.condition(Operator::EndsWith, CriteriaValue::Text(text.into()))
    }

    /// Raw query-string syntax, not escaped
    pub fn expression(self, expression: impl Into<String>) -> Criteria {
        self.condition(Operator::Expression, CriteriaValue::Text(expression.into()))
    }

    pub fn fuzzy(self, text: impl Into<String>) -> Criteria {
        self.condition(Operator::Fuzzy, CriteriaValue::Text(text.into()))
    }

    pub fn matches(self, value: impl Into<CriteriaValue>) -> Criteria {
        self.condition(Operator::Matches, value.into())
    }

    pub fn matches_all(self, value: impl Into<CriteriaValue>) -> Criteria {
        self.condition(Operator::MatchesAll, value.into())
    }

    /// Inclusive on both ends
    pub fn between(self, from: impl Into<Value>, to: impl Into<Value>) -> Criteria {
        self.range(Some(from.into()), Some(to.into()))
    }

    /// Inclusive range with optional ends
    pub fn range(self, from: Option<Value>, to: Option<Value>) -> Criteria {
        self.condition(Operator::Between, CriteriaValue::Range { from, to })
    }

    pub fn less_than(self, value: impl Into<CriteriaValue>) -> Criteria {
        self.condition(Operator::LessThan, value.into())
    }

    pub fn less_than_equal(self, value: impl Into<CriteriaValue>) -> Criteria {
        self.condition(Operator::LessThanEqual, value.into())
    }

    pub fn greater_than(self, value: impl Into<CriteriaValue>) -> Criteria {
        self.condition(Operator::GreaterThan, value.into())
    }

    pub fn greater_than_equal(self, value: impl Into<CriteriaValue>) -> Criteria {
        self.condition(Operator::GreaterThanEqual, value.into())
    }

    pub fn in_values<I, V>(self, values: I) -> Criteria
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.condition(Operator::In, CriteriaValue::List(values.into_iter().map(Into::into).collect()))
    }

    pub fn not_in<I, V>(self, values: I) -> Criteria
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.condition(Operator::NotIn, CriteriaValue::List(values.into_iter().map(Into::into).collect()))
    }

    pub fn exists(self) -> Criteria {
        self.condition(Operator::Exists, CriteriaValue::None)
    }

    pub fn empty(self) -> Criteria {
        self.condition(Operator::Empty, CriteriaValue::None)
    }

    pub fn not_empty(self) -> Criteria {
        self.condition(Operator::NotEmpty, CriteriaValue::None)
    }

    pub fn regexp(self, pattern: impl Into<String>) -> Criteria {
        self.condition(Operator::Regexp, CriteriaValue::Text(pattern.into()))
    }

    pub fn within(self, center: GeoPoint, distance: impl Into<String>) -> Criteria {
        self.condition(
            Operator::Within,
            CriteriaValue::GeoDistance {
                center,
                distance: distance.into(),
            },
        )
    }

    pub fn bounding_box(self, top_left: GeoPoint, bottom_right: GeoPoint) -> Criteria {
        self.condition(Operator::BoundingBox, CriteriaValue::GeoBox { top_left, bottom_right })
    }
}

/// Builder collecting conditions
#[derive(Default)]
pub struct CriteriaBuilder {
    nodes: Vec<CriteriaNode>,
}

impl CriteriaBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add any criteria
    pub fn add(mut self, criteria: Criteria) -> Self {
        self.nodes.push(criteria.root);
        self
    }

    pub fn is(self, field: impl Into<String>, value: impl Into<CriteriaValue>) -> Self {
        self.add(Criteria::field(field).is(value))
    }

    pub fn contains(self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.add(Criteria::field(field).contains(text))
    }

    pub fn between(self, field: impl Into<String>, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        self.add(Criteria::field(field).between(from, to))
    }

    pub fn in_values<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add(Criteria::field(field).in_values(values))
    }

    pub fn exists(self, field: impl Into<String>) -> Self {
        self.add(Criteria::field(field).exists())
    }

    /// Build with AND semantics (all conditions must match)
    pub fn build_and(mut self) -> Criteria {
        match self.nodes.len() {
            1 => Criteria::new(self.nodes.remove(0)),
            _ => Criteria::new(CriteriaNode::And(self.nodes)),
        }
    }

    /// Build with OR semantics (any condition can match)
    pub fn build_or(mut self) -> Criteria {
        match self.nodes.len() {
            0 => Criteria::match_all(),
            1 => Criteria::new(self.nodes.remove(0)),
            _ => Criteria::new(CriteriaNode::Or(self.nodes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_condition() {
        let criteria = Criteria::field("name").is("Alice");
        assert_eq!(
            criteria.root,
            CriteriaNode::Condition(Condition {
                field: "name".to_string(),
                operator: Operator::Equals,
                value: CriteriaValue::Text("Alice".to_string()),
                boost: None,
            })
        );
    }

    #[test]
    fn test_and_or_not() {
        let criteria = Criteria::field("name").is("Alice").and(Criteria::field("age").between(25, 40));
        assert!(matches!(&criteria.root, CriteriaNode::And(nodes) if nodes.len() == 2));

        let criteria = Criteria::field("status").is("a").or(Criteria::field("status").is("b"));
        assert!(matches!(&criteria.root, CriteriaNode::Or(nodes) if nodes.len() == 2));

        let criteria = Criteria::field("deleted").is(true).negate();
        assert!(matches!(criteria.root, CriteriaNode::Not(_)));
    }

    #[test]
    fn test_boost() {
        let criteria = Criteria::field("title").boost(2.0).contains("rust");
        let CriteriaNode::Condition(condition) = &criteria.root else {
            panic!("expected condition");
        };
        assert_eq!(condition.boost, Some(2.0));

        let boosted = Criteria::field("title").is("x").boost(3.0);
        assert!(matches!(boosted.root, CriteriaNode::Condition(Condition { boost: Some(b), .. }) if b == 3.0));
    }

    #[test]
    fn test_builder_empty_is_match_all() {
        assert!(CriteriaBuilder::new().build_and().is_empty());
        assert!(CriteriaBuilder::new().build_or().is_empty());
        assert!(Criteria::default().is_empty());
        assert!(!Criteria::field("a").exists().is_empty());
        assert!(!Criteria::match_all().negate().is_empty());
    }

    #[test]
    fn test_builder_single_collapses() {
        let criteria = CriteriaBuilder::new().is("a", 1).build_and();
        assert!(matches!(criteria.root, CriteriaNode::Condition(_)));
    }

    #[test]
    fn test_in_values() {
        let criteria = Criteria::field("tag").in_values(["a", "b"]);
        let CriteriaNode::Condition(condition) = criteria.root else {
            panic!("expected condition");
        };
        assert_eq!(condition.value, CriteriaValue::List(vec![json!("a"), json!("b")]));
    }

    #[test]
    fn test_scalar_json() {
        assert_eq!(CriteriaValue::Number(3.0).scalar_json(), Some(json!(3)));
        assert_eq!(CriteriaValue::Number(2.5).scalar_json(), Some(json!(2.5)));
        assert_eq!(CriteriaValue::Text("x".into()).as_text().as_deref(), Some("x"));
        assert_eq!(CriteriaValue::Bool(true).as_text().as_deref(), Some("true"));
        assert_eq!(CriteriaValue::None.scalar_json(), None);
    }
}
