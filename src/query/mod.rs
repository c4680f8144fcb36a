// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query building.
//!
//! # Architecture
//!
//! ```text
//! CriteriaQuery ──→ CriteriaTranslator ──┐
//! NativeQuery   ─────────────────────────┤
//! StringQuery   ──→ render() ────────────┼─→ RequestFactory → request body
//! SearchTemplateQuery ──→ to_body() ─────┘
//! ```
//!
//! Every query kind carries [`QueryOptions`] (paging, sort, source
//! filtering, highlighting, ...), rendered by the [`RequestFactory`].

mod criteria;
mod criteria_translator;
mod kinds;
mod options;
mod request_factory;
mod template;
mod update;

pub use criteria::{
    Condition, Criteria, CriteriaBuilder, CriteriaNode, CriteriaValue, FieldCriteria, GeoPoint, Operator,
};
pub use criteria_translator::{escape, CriteriaTranslator};
pub use kinds::{CriteriaQuery, NativeQuery, StringQuery};
pub use options::{
    time_value, Direction, Highlight, HighlightField, Order, Pageable, QueryOptions, SearchType, SortMode,
    SourceFilter, TrackTotalHits,
};
pub use request_factory::RequestFactory;
pub use template::SearchTemplateQuery;
pub use update::{BulkOperation, BulkOptions, Conflicts, DeleteQuery, IndexQuery, UpdateQuery, UpdateScript};

/// Any read query
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Criteria(CriteriaQuery),
    Native(NativeQuery),
    String(StringQuery),
    Template(SearchTemplateQuery),
}

impl Query {
    /// Query matching every document
    pub fn match_all() -> Self {
        Query::Criteria(CriteriaQuery::default())
    }

    pub fn options(&self) -> &QueryOptions {
        match self {
            Query::Criteria(q) => &q.options,
            Query::Native(q) => &q.options,
            Query::String(q) => &q.options,
            Query::Template(q) => &q.options,
        }
    }

    pub fn options_mut(&mut self) -> &mut QueryOptions {
        match self {
            Query::Criteria(q) => &mut q.options,
            Query::Native(q) => &mut q.options,
            Query::String(q) => &mut q.options,
            Query::Template(q) => &mut q.options,
        }
    }

    /// Replace the options
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        *self.options_mut() = options;
        self
    }

    pub fn with_pageable(mut self, pageable: Pageable) -> Self {
        self.options_mut().pageable = Some(pageable);
        self
    }

    pub fn with_sort(mut self, order: Order) -> Self {
        self.options_mut().sort.push(order);
        self
    }

    /// Kind label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Query::Criteria(_) => "criteria",
            Query::Native(_) => "native",
            Query::String(_) => "string",
            Query::Template(_) => "template",
        }
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::match_all()
    }
}

impl From<Criteria> for Query {
    fn from(criteria: Criteria) -> Self {
        Query::Criteria(CriteriaQuery::new(criteria))
    }
}

impl From<CriteriaQuery> for Query {
    fn from(query: CriteriaQuery) -> Self {
        Query::Criteria(query)
    }
}

impl From<NativeQuery> for Query {
    fn from(query: NativeQuery) -> Self {
        Query::Native(query)
    }
}

impl From<StringQuery> for Query {
    fn from(query: StringQuery) -> Self {
        Query::String(query)
    }
}

impl From<SearchTemplateQuery> for Query {
    fn from(query: SearchTemplateQuery) -> Self {
        Query::Template(query)
    }
}
