// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Entity mapping.
//!
//! Entity types implement [`Entity`] and describe their index, fields and
//! settings with [`EntityMetadata::builder`]. The [`MappingContext`] caches
//! resolved metadata; [`MappingBuilder`] and [`SettingsBuilder`] render it
//! as the JSON the engine expects on index creation.

pub mod context;
pub mod field_type;
pub mod mapping_builder;
pub mod metadata;
pub mod naming;
pub mod settings;

pub use context::MappingContext;
pub use field_type::{DateFormat, Dynamic, FieldType, TemporalKind, WriteType};
pub use mapping_builder::MappingBuilder;
pub use metadata::{Entity, EntityMetadata, EntityMetadataBuilder, IndexAlias, InnerField, PropertyMetadata};
pub use naming::FieldNamingStrategy;
pub use settings::{deep_merge, IndexSettings, SettingsBuilder};
