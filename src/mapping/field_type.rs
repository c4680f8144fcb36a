// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::fmt;

use serde::Deserialize;

/// Engine field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// No explicit type, left to dynamic mapping
    Auto,
    Text,
    Keyword,
    Long,
    Integer,
    Short,
    Byte,
    Double,
    Float,
    HalfFloat,
    ScaledFloat,
    Date,
    DateNanos,
    Boolean,
    Binary,
    Object,
    Nested,
    Ip,
    GeoPoint,
    Flattened,
    DenseVector,
    Wildcard,
}

impl FieldType {
    #[must_use]
    pub fn is_date(&self) -> bool {
        matches!(self, FieldType::Date | FieldType::DateNanos)
    }

    /// Types whose children are described by `properties`
    #[must_use]
    pub fn has_properties(&self) -> bool {
        matches!(self, FieldType::Object | FieldType::Nested)
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Long
                | FieldType::Integer
                | FieldType::Short
                | FieldType::Byte
                | FieldType::Double
                | FieldType::Float
                | FieldType::HalfFloat
                | FieldType::ScaledFloat
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Auto => "auto",
            FieldType::Text => "text",
            FieldType::Keyword => "keyword",
            FieldType::Long => "long",
            FieldType::Integer => "integer",
            FieldType::Short => "short",
            FieldType::Byte => "byte",
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::HalfFloat => "half_float",
            FieldType::ScaledFloat => "scaled_float",
            FieldType::Date => "date",
            FieldType::DateNanos => "date_nanos",
            FieldType::Boolean => "boolean",
            FieldType::Binary => "binary",
            FieldType::Object => "object",
            FieldType::Nested => "nested",
            FieldType::Ip => "ip",
            FieldType::GeoPoint => "geo_point",
            FieldType::Flattened => "flattened",
            FieldType::DenseVector => "dense_vector",
            FieldType::Wildcard => "wildcard",
        };
        write!(f, "{}", name)
    }
}

/// Date formats, either engine built-ins or a custom pattern
/// (`uuuu-MM-dd'T'HH:mm:ss`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateFormat {
    EpochMillis,
    EpochSecond,
    DateOptionalTime,
    StrictDateOptionalTime,
    BasicDate,
    BasicDateTime,
    BasicDateTimeNoMillis,
    Date,
    DateTime,
    DateTimeNoMillis,
    DateHourMinuteSecond,
    DateHourMinuteSecondMillis,
    YearMonthDay,
    Custom(String),
}

impl DateFormat {
    /// Name (or pattern) as written in the mapping's `format`
    pub fn wire_name(&self) -> &str {
        match self {
            DateFormat::EpochMillis => "epoch_millis",
            DateFormat::EpochSecond => "epoch_second",
            DateFormat::DateOptionalTime => "date_optional_time",
            DateFormat::StrictDateOptionalTime => "strict_date_optional_time",
            DateFormat::BasicDate => "basic_date",
            DateFormat::BasicDateTime => "basic_date_time",
            DateFormat::BasicDateTimeNoMillis => "basic_date_time_no_millis",
            DateFormat::Date => "date",
            DateFormat::DateTime => "date_time",
            DateFormat::DateTimeNoMillis => "date_time_no_millis",
            DateFormat::DateHourMinuteSecond => "date_hour_minute_second",
            DateFormat::DateHourMinuteSecondMillis => "date_hour_minute_second_millis",
            DateFormat::YearMonthDay => "year_month_day",
            DateFormat::Custom(pattern) => pattern,
        }
    }

    /// Parse a wire name back into a format; unknown names become custom patterns.
    pub fn from_wire_name(name: &str) -> Self {
        match name {
            "epoch_millis" => DateFormat::EpochMillis,
            "epoch_second" => DateFormat::EpochSecond,
            "date_optional_time" => DateFormat::DateOptionalTime,
            "strict_date_optional_time" => DateFormat::StrictDateOptionalTime,
            "basic_date" => DateFormat::BasicDate,
            "basic_date_time" => DateFormat::BasicDateTime,
            "basic_date_time_no_millis" => DateFormat::BasicDateTimeNoMillis,
            "date" | "strict_date" => DateFormat::Date,
            "date_time" | "strict_date_time" => DateFormat::DateTime,
            "date_time_no_millis" | "strict_date_time_no_millis" => DateFormat::DateTimeNoMillis,
            "date_hour_minute_second" | "strict_date_hour_minute_second" => DateFormat::DateHourMinuteSecond,
            "date_hour_minute_second_millis" | "strict_date_hour_minute_second_millis" => {
                DateFormat::DateHourMinuteSecondMillis
            }
            "year_month_day" | "strict_year_month_day" => DateFormat::YearMonthDay,
            other => DateFormat::Custom(other.to_string()),
        }
    }

    #[must_use]
    pub fn is_epoch(&self) -> bool {
        matches!(self, DateFormat::EpochMillis | DateFormat::EpochSecond)
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// Rust-side representation of a date property, i.e. what serde produces
/// for the entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemporalKind {
    /// `chrono::DateTime<Utc>` (RFC 3339 string)
    #[default]
    DateTimeUtc,
    /// `chrono::NaiveDateTime` (`2024-01-31T10:00:00`)
    NaiveDateTime,
    /// `chrono::NaiveDate` (`2024-01-31`)
    NaiveDate,
    /// `i64` milliseconds since the epoch
    EpochMillis,
}

/// Dynamic mapping policy for an object level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dynamic {
    True,
    False,
    Strict,
    Runtime,
}

impl fmt::Display for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dynamic::True => write!(f, "true"),
            Dynamic::False => write!(f, "false"),
            Dynamic::Strict => write!(f, "strict"),
            Dynamic::Runtime => write!(f, "runtime"),
        }
    }
}

/// How new documents are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteType {
    /// Create or replace
    #[default]
    Index,
    /// Fail when the id already exists
    Create,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_wire_names() {
        assert_eq!(FieldType::HalfFloat.to_string(), "half_float");
        assert_eq!(FieldType::GeoPoint.to_string(), "geo_point");
        assert_eq!(FieldType::DenseVector.to_string(), "dense_vector");
        assert!(FieldType::Nested.has_properties());
        assert!(FieldType::DateNanos.is_date());
        assert!(FieldType::ScaledFloat.is_numeric());
        assert!(!FieldType::Keyword.is_numeric());
    }

    #[test]
    fn test_date_format_names() {
        assert_eq!(DateFormat::BasicDate.wire_name(), "basic_date");
        assert_eq!(DateFormat::from_wire_name("epoch_millis"), DateFormat::EpochMillis);
        assert_eq!(DateFormat::from_wire_name("strict_date_time"), DateFormat::DateTime);
        assert_eq!(
            DateFormat::from_wire_name("uuuu-MM-dd"),
            DateFormat::Custom("uuuu-MM-dd".into())
        );
        assert!(DateFormat::EpochSecond.is_epoch());
    }

    #[test]
    fn test_dynamic_display() {
        assert_eq!(Dynamic::Strict.to_string(), "strict");
        assert_eq!(Dynamic::False.to_string(), "false");
    }
}
