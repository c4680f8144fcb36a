// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Date formatting and parsing for date properties.
//!
//! Every temporal value passes through `DateTime<Utc>`; naive values are
//! taken as UTC. Custom patterns use the engine's (Java-style) pattern
//! letters and are translated to `chrono` format strings:
//!
//! ```text
//! uuuu-MM-dd'T'HH:mm:ss.SSSXXX  →  %Y-%m-%dT%H:%M:%S%3f%:z
//! ```

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{json, Value};

use crate::error::OdmError;
use crate::mapping::{DateFormat, TemporalKind};

const NAIVE_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S%.f";
const NAIVE_DATE: &str = "%Y-%m-%d";

/// Formats and parses values of one date property
#[derive(Debug, Clone, Copy)]
pub struct DateFormatter<'a> {
    formats: &'a [DateFormat],
}

impl<'a> DateFormatter<'a> {
    pub fn new(formats: &'a [DateFormat]) -> Self {
        Self { formats }
    }

    /// Render with the first declared format (RFC 3339 when none)
    pub fn format(&self, at: &DateTime<Utc>) -> Result<Value, OdmError> {
        match self.formats.first() {
            Some(format) => format_with(format, at),
            None => Ok(json!(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
        }
    }

    /// Parse with the first declared format that matches
    pub fn parse(&self, value: &Value) -> Result<DateTime<Utc>, OdmError> {
        if self.formats.is_empty() {
            return parse_iso(value);
        }
        for format in self.formats {
            if let Ok(at) = parse_with(format, value) {
                return Ok(at);
            }
        }
        let names: Vec<&str> = self.formats.iter().map(|f| f.wire_name()).collect();
        Err(OdmError::Conversion(format!(
            "'{}' does not match any of {}",
            value_text(value),
            names.join("||")
        )))
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn builtin_pattern(format: &DateFormat) -> Option<&'static str> {
    match format {
        DateFormat::DateOptionalTime | DateFormat::StrictDateOptionalTime | DateFormat::DateTime => {
            Some("%Y-%m-%dT%H:%M:%S%.3fZ")
        }
        DateFormat::DateTimeNoMillis => Some("%Y-%m-%dT%H:%M:%SZ"),
        DateFormat::BasicDate => Some("%Y%m%d"),
        DateFormat::BasicDateTime => Some("%Y%m%dT%H%M%S%.3fZ"),
        DateFormat::BasicDateTimeNoMillis => Some("%Y%m%dT%H%M%SZ"),
        DateFormat::Date | DateFormat::YearMonthDay => Some("%Y-%m-%d"),
        DateFormat::DateHourMinuteSecond => Some("%Y-%m-%dT%H:%M:%S"),
        DateFormat::DateHourMinuteSecondMillis => Some("%Y-%m-%dT%H:%M:%S%.3f"),
        DateFormat::EpochMillis | DateFormat::EpochSecond | DateFormat::Custom(_) => None,
    }
}

/// Render `at` in one format
pub fn format_with(format: &DateFormat, at: &DateTime<Utc>) -> Result<Value, OdmError> {
    let pattern = match format {
        DateFormat::EpochMillis => return Ok(json!(at.timestamp_millis())),
        DateFormat::EpochSecond => return Ok(json!(at.timestamp())),
        DateFormat::Custom(pattern) => java_pattern_to_chrono(pattern),
        builtin => builtin_pattern(builtin).unwrap_or(NAIVE_DATE_TIME).to_string(),
    };

    let mut out = String::new();
    write!(out, "{}", at.format(&pattern))
        .map_err(|_| OdmError::Conversion(format!("invalid date pattern '{}'", format.wire_name())))?;
    Ok(Value::String(out))
}

/// Parse a stored value in one format
pub fn parse_with(format: &DateFormat, value: &Value) -> Result<DateTime<Utc>, OdmError> {
    let invalid = || {
        OdmError::Conversion(format!(
            "'{}' is not a valid {} date",
            value_text(value),
            format.wire_name()
        ))
    };

    match format {
        DateFormat::EpochMillis => {
            let millis = epoch_number(value).ok_or_else(invalid)?;
            Utc.timestamp_millis_opt(millis).single().ok_or_else(invalid)
        }
        DateFormat::EpochSecond => {
            let secs = epoch_number(value).ok_or_else(invalid)?;
            Utc.timestamp_opt(secs, 0).single().ok_or_else(invalid)
        }
        DateFormat::DateOptionalTime
        | DateFormat::StrictDateOptionalTime
        | DateFormat::DateTime
        | DateFormat::DateTimeNoMillis => parse_iso(value).map_err(|_| invalid()),
        DateFormat::Custom(pattern) => {
            let text = value.as_str().ok_or_else(invalid)?;
            parse_pattern(text, &java_pattern_to_chrono(pattern)).ok_or_else(invalid)
        }
        builtin => {
            let text = value.as_str().ok_or_else(invalid)?;
            let pattern = builtin_pattern(builtin).unwrap_or(NAIVE_DATE_TIME).replace("%.3f", "%.f");
            parse_pattern(text, &pattern).ok_or_else(invalid)
        }
    }
}

fn epoch_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_pattern(text: &str, pattern: &str) -> Option<DateTime<Utc>> {
    if pattern.contains("%z") || pattern.contains("%:z") {
        return DateTime::parse_from_str(text, pattern)
            .ok()
            .map(|at| at.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(text, pattern)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// RFC 3339, then zone-less date-time, then plain date
fn parse_iso(value: &Value) -> Result<DateTime<Utc>, OdmError> {
    let text = value
        .as_str()
        .ok_or_else(|| OdmError::Conversion(format!("'{}' is not a date string", value)))?;

    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Ok(at.with_timezone(&Utc));
    }
    parse_pattern(text, NAIVE_DATE_TIME)
        .or_else(|| parse_pattern(text, NAIVE_DATE))
        .ok_or_else(|| OdmError::Conversion(format!("'{}' is not an ISO-8601 date", text)))
}

/// Translate an engine date pattern (`yyyy-MM-dd'T'HH:mm`) into chrono syntax
pub fn java_pattern_to_chrono(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // '' is an escaped quote, anything else opens a literal
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        out.push('\'');
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            continue;
        }

        if c.is_ascii_alphabetic() {
            let mut run = 1;
            while chars.get(i + run) == Some(&c) {
                run += 1;
            }
            match pattern_token(c, run) {
                Some(token) => out.push_str(token),
                None => (0..run).for_each(|_| push_literal(&mut out, c)),
            }
            i += run;
            continue;
        }

        push_literal(&mut out, c);
        i += 1;
    }

    out
}

fn pattern_token(letter: char, count: usize) -> Option<&'static str> {
    let token = match (letter, count) {
        ('y' | 'u', 2) => "%y",
        ('y' | 'u', _) => "%Y",
        ('M', 1 | 2) => "%m",
        ('M', 3) => "%b",
        ('M', _) => "%B",
        ('d', _) => "%d",
        ('D', _) => "%j",
        ('H', _) => "%H",
        ('h', _) => "%I",
        ('m', _) => "%M",
        ('s', _) => "%S",
        ('S', 1..=3) => "%3f",
        ('S', 4..=6) => "%6f",
        ('S', _) => "%9f",
        ('a', _) => "%p",
        ('E', 1..=3) => "%a",
        ('E', _) => "%A",
        ('X' | 'x', 1 | 2) => "%z",
        ('X' | 'x', _) => "%:z",
        ('Z', 5) => "%:z",
        ('Z', _) => "%z",
        _ => return None,
    };
    Some(token)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

impl TemporalKind {
    /// Entity value as produced by serde → instant
    pub fn decode(&self, value: &Value) -> Result<DateTime<Utc>, OdmError> {
        let invalid = || OdmError::Conversion(format!("'{}' is not a valid {:?} value", value_text(value), self));
        match self {
            TemporalKind::DateTimeUtc => parse_iso(value),
            TemporalKind::NaiveDateTime => value
                .as_str()
                .and_then(|s| parse_pattern(s, NAIVE_DATE_TIME))
                .ok_or_else(invalid),
            TemporalKind::NaiveDate => value
                .as_str()
                .and_then(|s| parse_pattern(s, NAIVE_DATE))
                .ok_or_else(invalid),
            TemporalKind::EpochMillis => epoch_number(value)
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .ok_or_else(invalid),
        }
    }

    /// Instant → the representation serde expects for the entity field
    pub fn encode(&self, at: &DateTime<Utc>) -> Value {
        match self {
            TemporalKind::DateTimeUtc => json!(at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            TemporalKind::NaiveDateTime => json!(at.naive_utc().format(NAIVE_DATE_TIME).to_string()),
            TemporalKind::NaiveDate => json!(at.date_naive().format(NAIVE_DATE).to_string()),
            TemporalKind::EpochMillis => json!(at.timestamp_millis()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 31, 10, 15, 30).unwrap()
    }

    #[test]
    fn test_java_pattern_translation() {
        assert_eq!(java_pattern_to_chrono("uuuu-MM-dd"), "%Y-%m-%d");
        assert_eq!(
            java_pattern_to_chrono("yyyy-MM-dd'T'HH:mm:ss.SSSXXX"),
            "%Y-%m-%dT%H:%M:%S.%3f%:z"
        );
        assert_eq!(java_pattern_to_chrono("dd.MM.yy HH:mm"), "%d.%m.%y %H:%M");
        assert_eq!(java_pattern_to_chrono("'at' HH 'o''clock'"), "at %H o'clock");
        assert_eq!(java_pattern_to_chrono("100%"), "100%%");
    }

    #[test]
    fn test_format_builtins() {
        let at = instant();
        assert_eq!(format_with(&DateFormat::BasicDate, &at).unwrap(), json!("20240131"));
        assert_eq!(format_with(&DateFormat::Date, &at).unwrap(), json!("2024-01-31"));
        assert_eq!(
            format_with(&DateFormat::DateOptionalTime, &at).unwrap(),
            json!("2024-01-31T10:15:30.000Z")
        );
        assert_eq!(
            format_with(&DateFormat::DateHourMinuteSecond, &at).unwrap(),
            json!("2024-01-31T10:15:30")
        );
        assert_eq!(format_with(&DateFormat::EpochMillis, &at).unwrap(), json!(1_706_696_130_000i64));
        assert_eq!(format_with(&DateFormat::EpochSecond, &at).unwrap(), json!(1_706_696_130i64));
    }

    #[test]
    fn test_format_custom() {
        let at = instant();
        let format = DateFormat::Custom("dd.MM.uuuu HH:mm".into());
        assert_eq!(format_with(&format, &at).unwrap(), json!("31.01.2024 10:15"));
    }

    #[test]
    fn test_parse_each_format() {
        let at = instant();
        assert_eq!(parse_with(&DateFormat::BasicDateTime, &json!("20240131T101530.000Z")).unwrap(), at);
        assert_eq!(parse_with(&DateFormat::EpochMillis, &json!(1_706_696_130_000i64)).unwrap(), at);
        assert_eq!(parse_with(&DateFormat::EpochMillis, &json!("1706696130000")).unwrap(), at);
        assert_eq!(parse_with(&DateFormat::DateOptionalTime, &json!("2024-01-31T10:15:30Z")).unwrap(), at);
        assert_eq!(
            parse_with(&DateFormat::Custom("dd.MM.uuuu HH:mm:ss".into()), &json!("31.01.2024 10:15:30")).unwrap(),
            at
        );
        // Date-only patterns parse to midnight
        assert_eq!(
            parse_with(&DateFormat::Date, &json!("2024-01-31")).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_formatter_tries_every_format() {
        let formats = vec![DateFormat::BasicDate, DateFormat::EpochMillis];
        let formatter = DateFormatter::new(&formats);

        assert_eq!(formatter.format(&instant()).unwrap(), json!("20240131"));
        assert!(formatter.parse(&json!(1_706_696_130_000i64)).is_ok());
        assert!(formatter.parse(&json!("20240131")).is_ok());

        let err = formatter.parse(&json!("yesterday")).unwrap_err();
        assert!(err.to_string().contains("basic_date||epoch_millis"));
    }

    #[test]
    fn test_formatter_without_formats_uses_iso() {
        let formatter = DateFormatter::new(&[]);
        assert_eq!(formatter.format(&instant()).unwrap(), json!("2024-01-31T10:15:30Z"));
        assert_eq!(formatter.parse(&json!("2024-01-31T10:15:30+00:00")).unwrap(), instant());
    }

    #[test]
    fn test_temporal_kinds() {
        let at = instant();
        assert_eq!(TemporalKind::NaiveDate.encode(&at), json!("2024-01-31"));
        assert_eq!(TemporalKind::NaiveDateTime.encode(&at), json!("2024-01-31T10:15:30"));
        assert_eq!(TemporalKind::DateTimeUtc.encode(&at), json!("2024-01-31T10:15:30Z"));
        assert_eq!(TemporalKind::EpochMillis.encode(&at), json!(1_706_696_130_000i64));

        assert_eq!(TemporalKind::NaiveDateTime.decode(&json!("2024-01-31T10:15:30")).unwrap(), at);
        assert_eq!(TemporalKind::DateTimeUtc.decode(&json!("2024-01-31T10:15:30Z")).unwrap(), at);
        assert!(TemporalKind::NaiveDate.decode(&json!(12)).is_err());
    }
}
