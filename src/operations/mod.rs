// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search operations.
//!
//! [`SearchOperations`] is the entry point: it converts entities, builds
//! requests and ships them over a [`Transport`].
//!
//! ```text
//! entity / Query
//!      │
//!      ├─→ DocumentConverter (entity ⇄ document)
//!      ├─→ RequestFactory    (query → body + params)
//!      │
//!      └─→ Transport ──→ engine
//!                │
//!                └─→ ResponseConverter → SearchHits / BulkResult / ...
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! # use search_odm::{SearchOperations, SearchOdmConfig, Entity, EntityMetadata};
//! # use search_odm::query::Criteria;
//! # use serde::{Deserialize, Serialize};
//! #[derive(Serialize, Deserialize)]
//! struct Book { id: Option<String>, title: String }
//!
//! impl Entity for Book {
//!     fn metadata() -> EntityMetadata {
//!         EntityMetadata::builder("Book", "books").id("id").text("title").build().unwrap()
//!     }
//! }
//!
//! # async fn example() -> Result<(), search_odm::OdmError> {
//! let ops = SearchOperations::connect(SearchOdmConfig::default()).await?;
//! ops.index_ops::<Book>()?.ensure().await?;
//!
//! let saved = ops.save(Book { id: None, title: "Dune".into() }).await?;
//! let hits = ops.search::<Book>(&Criteria::field("title").is("dune").into()).await?;
//! # Ok(())
//! # }
//! ```

mod document_api;
mod index_api;
mod scroll_api;
mod script_api;
mod search_api;
mod templates;

pub use index_api::{AliasAction, AliasActionParameters, AliasActions, AliasData, IndexOperations};
pub use script_api::Script;
pub use templates::{
    ComponentTemplateData, IndexTemplateData, PutComponentTemplateRequest, PutIndexTemplateRequest,
    PutTemplateRequest, TemplateData, TemplateSpec,
};

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::SearchOdmConfig;
use crate::convert::DocumentConverter;
use crate::error::OdmError;
use crate::mapping::{Entity, EntityMetadata, MappingContext};
use crate::query::RequestFactory;
use crate::transport::{EngineRequest, EngineResponse, HttpTransport, Transport};

/// When written documents become visible to search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Visible after the next scheduled refresh
    #[default]
    None,
    /// Refresh the affected shards right away
    Immediate,
    /// Wait for the next refresh before answering
    WaitUntil,
}

impl RefreshPolicy {
    /// Value of the `refresh` parameter, `None` when it is omitted
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            RefreshPolicy::None => None,
            RefreshPolicy::Immediate => Some("true"),
            RefreshPolicy::WaitUntil => Some("wait_for"),
        }
    }
}

/// One or more index names (or aliases / patterns)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexCoordinates {
    names: Vec<String>,
}

impl IndexCoordinates {
    pub fn of(name: impl Into<String>) -> Self {
        Self { names: vec![name.into()] }
    }

    pub fn of_many<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// First name; writes go here
    pub fn index_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    /// Comma-joined, for multi-index paths
    pub fn joined(&self) -> String {
        self.names.join(",")
    }
}

/// Entry point for document, search, index and script operations
pub struct SearchOperations {
    pub(super) transport: Arc<dyn Transport>,
    pub(super) context: Arc<MappingContext>,
    pub(super) converter: DocumentConverter,
    pub(super) factory: RequestFactory,
    pub(super) config: SearchOdmConfig,
    /// Scroll ids this instance opened and has not cleared, with the
    /// instant their keep-alive runs out
    pub(super) open_scrolls: Arc<DashMap<String, Instant>>,
}

impl SearchOperations {
    /// Operations over an existing transport
    pub fn new(transport: Arc<dyn Transport>, config: SearchOdmConfig) -> Self {
        let context = Arc::new(MappingContext::new(config.field_naming, config.index_prefix.clone()));
        Self {
            transport,
            converter: DocumentConverter::new(Arc::clone(&context)),
            context,
            factory: RequestFactory::from_config(&config),
            config,
            open_scrolls: Arc::new(DashMap::new()),
        }
    }

    /// Connect an HTTP transport (waiting for the engine) and build operations
    pub async fn connect(config: SearchOdmConfig) -> Result<Self, OdmError> {
        let transport = HttpTransport::connect(&config).await?;
        Ok(Self::new(Arc::new(transport), config))
    }

    /// Operations sharing this instance's transport, mappings and scroll
    /// tracking, whose writes use `policy` instead of the configured one.
    ///
    /// Per-request settings on [`IndexQuery`](crate::query::IndexQuery),
    /// [`UpdateQuery`](crate::query::UpdateQuery),
    /// [`DeleteQuery`](crate::query::DeleteQuery) and
    /// [`BulkOptions`](crate::query::BulkOptions) still win.
    #[must_use]
    pub fn with_refresh_policy(&self, policy: RefreshPolicy) -> SearchOperations {
        let mut config = self.config.clone();
        config.refresh_policy = policy;
        Self {
            transport: Arc::clone(&self.transport),
            converter: DocumentConverter::new(Arc::clone(&self.context)),
            context: Arc::clone(&self.context),
            factory: self.factory.clone(),
            config,
            open_scrolls: Arc::clone(&self.open_scrolls),
        }
    }

    pub fn config(&self) -> &SearchOdmConfig {
        &self.config
    }

    pub fn mapping_context(&self) -> &MappingContext {
        &self.context
    }

    pub fn converter(&self) -> &DocumentConverter {
        &self.converter
    }

    pub fn request_factory(&self) -> &RequestFactory {
        &self.factory
    }

    /// Resolved metadata of `T`
    pub fn metadata_for<T: Entity>(&self) -> Result<Arc<EntityMetadata>, OdmError> {
        self.context.metadata_for::<T>()
    }

    /// Index coordinates of `T`
    pub fn coordinates_for<T: Entity>(&self) -> Result<IndexCoordinates, OdmError> {
        Ok(IndexCoordinates::of(self.metadata_for::<T>()?.index_name.clone()))
    }

    /// Index path segment for coordinates, prefix applied to each name
    pub(super) fn index_path(&self, coordinates: &IndexCoordinates) -> String {
        coordinates
            .names()
            .iter()
            .map(|name| self.context.prefixed(name))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Metadata registered for the first index of `coordinates`, if any
    pub(super) fn metadata_for_coordinates(&self, coordinates: &IndexCoordinates) -> Option<Arc<EntityMetadata>> {
        self.context
            .metadata_by_index(&self.context.prefixed(coordinates.index_name()))
    }

    /// Send a request; transport failures become [`OdmError::Transport`]
    pub(super) async fn execute(&self, request: EngineRequest) -> Result<EngineResponse, OdmError> {
        debug!(request = %request.describe(), params = request.params.len(), "Sending request");
        let response = self.transport.send(request).await?;
        debug!(status = response.status, "Engine responded");
        Ok(response)
    }

    /// Send a request and return the body of a 2xx response; other
    /// statuses are translated with [`OdmError::from_engine_response`]
    pub(super) async fn execute_ok(
        &self,
        request: EngineRequest,
        index: &str,
        id: Option<&str>,
    ) -> Result<Value, OdmError> {
        let response = self.execute(request).await?;
        if response.is_success() {
            Ok(response.body.unwrap_or(Value::Null))
        } else {
            Err(OdmError::from_engine_response(response.status, response.body.as_ref(), index, id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_policy_param() {
        assert_eq!(RefreshPolicy::None.as_param(), None);
        assert_eq!(RefreshPolicy::Immediate.as_param(), Some("true"));
        assert_eq!(RefreshPolicy::WaitUntil.as_param(), Some("wait_for"));
    }

    #[test]
    fn test_index_coordinates() {
        let single = IndexCoordinates::of("books");
        assert_eq!(single.index_name(), "books");
        assert_eq!(single.joined(), "books");

        let many = IndexCoordinates::of_many(["books", "authors"]);
        assert_eq!(many.names().len(), 2);
        assert_eq!(many.joined(), "books,authors");
    }

    #[test]
    fn test_index_path_applies_prefix() {
        let config = SearchOdmConfig {
            index_prefix: Some("dev-".into()),
            ..Default::default()
        };
        let ops = SearchOperations::new(Arc::new(crate::transport::ScriptedTransport::new()), config);
        assert_eq!(ops.index_path(&IndexCoordinates::of_many(["books", "dev-authors"])), "dev-books,dev-authors");
    }
}
