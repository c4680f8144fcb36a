// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Registry of resolved entity metadata.
//!
//! Metadata is resolved once per type: naming strategy applied, index
//! prefix prepended, then cached by `TypeId` and by index name.

use std::any::TypeId;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::metadata::{Entity, EntityMetadata};
use super::naming::FieldNamingStrategy;
use crate::error::OdmError;
use crate::metrics;

pub struct MappingContext {
    by_type: DashMap<TypeId, Arc<EntityMetadata>>,
    by_index: DashMap<String, Arc<EntityMetadata>>,
    naming: FieldNamingStrategy,
    index_prefix: Option<String>,
}

impl MappingContext {
    pub fn new(naming: FieldNamingStrategy, index_prefix: Option<String>) -> Self {
        Self {
            by_type: DashMap::new(),
            by_index: DashMap::new(),
            naming,
            index_prefix: index_prefix.filter(|p| !p.is_empty()),
        }
    }

    #[must_use]
    pub fn naming(&self) -> FieldNamingStrategy {
        self.naming
    }

    /// Resolved metadata of `T`, computed on first use
    pub fn metadata_for<T: Entity>(&self) -> Result<Arc<EntityMetadata>, OdmError> {
        let key = TypeId::of::<T>();
        if let Some(existing) = self.by_type.get(&key) {
            return Ok(Arc::clone(existing.value()));
        }

        // Two threads may resolve concurrently; both produce the same result
        let resolved = self.register(T::metadata())?;
        self.by_type.insert(key, Arc::clone(&resolved));
        Ok(resolved)
    }

    /// Resolve and register metadata not tied to a Rust type
    pub fn register(&self, metadata: EntityMetadata) -> Result<Arc<EntityMetadata>, OdmError> {
        let resolved = Arc::new(self.resolve(metadata)?);
        debug!(
            entity = %resolved.type_name,
            index = %resolved.index_name,
            properties = resolved.properties.len(),
            "Registered entity metadata"
        );
        self.by_index
            .insert(resolved.index_name.clone(), Arc::clone(&resolved));
        metrics::set_registered_entities(self.by_index.len());
        Ok(resolved)
    }

    /// Metadata registered for an index name (prefix included)
    pub fn metadata_by_index(&self, index: &str) -> Option<Arc<EntityMetadata>> {
        self.by_index.get(index).map(|m| Arc::clone(m.value()))
    }

    /// Index name with the configured prefix, applied once
    pub fn prefixed(&self, index: &str) -> String {
        match &self.index_prefix {
            Some(prefix) if !index.starts_with(prefix.as_str()) => format!("{}{}", prefix, index),
            _ => index.to_string(),
        }
    }

    fn resolve(&self, metadata: EntityMetadata) -> Result<EntityMetadata, OdmError> {
        let mut resolved = metadata.with_naming(self.naming)?;
        resolved.index_name = self.prefixed(&resolved.index_name.to_lowercase());
        Ok(resolved)
    }
}

impl Default for MappingContext {
    fn default() -> Self {
        Self::new(FieldNamingStrategy::Identity, None)
    }
}
