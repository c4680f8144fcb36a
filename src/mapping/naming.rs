// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Property name → engine field name translation for properties without an
//! explicit field name.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldNamingStrategy {
    /// Field name equals the serde property name
    #[default]
    Identity,
    /// `publishedAt` → `published_at`
    SnakeCase,
    /// `published_at` → `publishedAt`
    CamelCase,
}

impl FieldNamingStrategy {
    pub fn translate(&self, property: &str) -> String {
        match self {
            FieldNamingStrategy::Identity => property.to_string(),
            FieldNamingStrategy::SnakeCase => to_snake_case(property),
            FieldNamingStrategy::CamelCase => to_camel_case(property),
        }
    }

    /// Best-effort inverse of [`translate`](Self::translate), used for undeclared
    /// fields when the target type's serde names are unknown. Not exact:
    /// `page_count` and `pageCount` both translate to `page_count`.
    pub fn reverse(&self, field: &str) -> String {
        match self {
            FieldNamingStrategy::Identity => field.to_string(),
            FieldNamingStrategy::SnakeCase => to_camel_case(field),
            FieldNamingStrategy::CamelCase => to_snake_case(field),
        }
    }
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(c);
            prev_lower_or_digit = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for (i, c) in name.chars().enumerate() {
        if c == '_' && i > 0 {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
