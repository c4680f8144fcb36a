// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Conversion between entities and stored documents.

pub mod converter;
pub mod date;
pub mod document;
pub mod fields;
pub mod value_converter;

pub use converter::DocumentConverter;
pub use date::{java_pattern_to_chrono, DateFormatter};
pub use document::{Document, SeqNoPrimaryTerm};
pub use value_converter::{FnConverter, PropertyValueConverter};
