//! # Search ODM
//!
//! Object-document mapping and query building for Elasticsearch-compatible
//! search engines, spoken over the engine's REST API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SearchOperations                        │
//! │  • Document API: save / get / delete / update / bulk        │
//! │  • Search API: search, pages, msearch, templates, scroll    │
//! │  • Index API: lifecycle, mapping, settings, aliases         │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                     │
//!          ▼                    ▼                     ▼
//! ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────┐
//! │ DocumentConverter│ │  RequestFactory  │ │ResponseConverter │
//! │ entity ⇄ document│ │ Query → body     │ │ body → hits/aggs │
//! │ naming, dates    │ │ Criteria → DSL   │ │ bulk, by-query   │
//! └──────────────────┘ └──────────────────┘ └──────────────────┘
//!          │                    │
//!          ▼                    ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       MappingContext                        │
//! │  • EntityMetadata per type (DashMap, resolved once)         │
//! │  • Field naming strategy, index prefix                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Transport                           │
//! │  • HttpTransport: reqwest, failover, retry, circuit breaker │
//! │  • ScriptedTransport: canned responses for tests            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use search_odm::{Entity, EntityMetadata, SearchOdmConfig, SearchOperations};
//! use search_odm::query::{Criteria, Order, Pageable, Query};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Book {
//!     id: Option<String>,
//!     title: String,
//!     year: i32,
//! }
//!
//! impl Entity for Book {
//!     fn metadata() -> EntityMetadata {
//!         EntityMetadata::builder("Book", "books")
//!             .id("id")
//!             .text("title")
//!             .integer("year")
//!             .build()
//!             .expect("valid metadata")
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), search_odm::OdmError> {
//!     let ops = SearchOperations::connect(SearchOdmConfig::default()).await?;
//!     ops.index_ops::<Book>()?.ensure().await?;
//!
//!     ops.save(Book { id: None, title: "Dune".into(), year: 1965 }).await?;
//!
//!     let query = Query::from(Criteria::field("title").is("dune").and(Criteria::field("year").greater_than(1960)))
//!         .with_pageable(Pageable::of(0, 20))
//!         .with_sort(Order::desc("year"));
//!     for hit in ops.search::<Book>(&query).await? {
//!         println!("{:?} {:?}", hit.score, hit.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`mapping`]: entity metadata, mapping and settings generation
//! - [`convert`]: entity ⇄ document conversion
//! - [`query`]: criteria, native, string and template queries; request bodies
//! - [`response`]: hits, pages, aggregations, bulk results
//! - [`operations`]: [`SearchOperations`] and [`IndexOperations`]
//! - [`transport`]: HTTP and scripted transports
//! - [`resilience`]: circuit breakers and retry

pub mod config;
pub mod convert;
pub mod error;
pub mod mapping;
pub mod metrics;
pub mod operations;
pub mod query;
pub mod resilience;
pub mod response;
pub mod transport;

// Note: We don't expose a `tracing` module to avoid conflict with the tracing crate

pub use config::SearchOdmConfig;
pub use convert::{Document, DocumentConverter, SeqNoPrimaryTerm};
pub use error::OdmError;
pub use mapping::{Entity, EntityMetadata, FieldNamingStrategy, FieldType, MappingContext};
pub use metrics::LatencyTimer;
pub use operations::{IndexCoordinates, IndexOperations, RefreshPolicy, SearchOperations};
pub use query::Query;
pub use resilience::circuit_breaker::{CircuitBreaker, CircuitConfig, CircuitError};
pub use resilience::retry::RetryConfig;
pub use response::{SearchHit, SearchHits, SearchPage};
pub use transport::{HttpTransport, ScriptedTransport, Transport, TransportError};
