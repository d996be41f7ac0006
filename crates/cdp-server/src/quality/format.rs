//! Value format checks and parsing helpers
//!
//! One place decides whether a string value conforms to a data type. The
//! accuracy metric, the mapping validator's output type check, and the
//! format-normalizing fixes all go through here so they can never
//! disagree.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use cdp_common::types::DataType;

fn integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?\d+$").unwrap_or_else(|e| unreachable!("{e}")))
}

fn real_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").unwrap_or_else(|e| unreachable!("{e}"))
    })
}

/// Parse a date from the formats sources commonly emit.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    // A timestamp also carries a usable date.
    parse_timestamp(value).map(|ts| ts.date())
}

/// Parse a timestamp from RFC 3339 or the common unzoned forms.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(ts.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }
    None
}

/// Parse the boolean spellings sources use.
pub fn parse_boolean(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Whether a value conforms to the canonical format for a data type.
///
/// Text values must be non-empty and carry no surrounding whitespace;
/// everything else must parse.
pub fn value_matches(data_type: DataType, value: &str) -> bool {
    match data_type {
        DataType::Text => !value.trim().is_empty() && value == value.trim(),
        DataType::Integer => integer_re().is_match(value),
        DataType::Real => integer_re().is_match(value) || real_re().is_match(value),
        DataType::Date => {
            value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        },
        DataType::Timestamp => parse_timestamp(value).is_some(),
        DataType::Boolean => matches!(value, "true" | "false"),
    }
}

/// Best-effort cleanup of a non-conforming value. Returns the normalized
/// form only when it passes `value_matches`; `None` means the value is
/// beyond repair for this type.
pub fn normalize(data_type: DataType, value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = match data_type {
        DataType::Text => trimmed.to_string(),
        DataType::Integer => {
            let digits: String = trimmed
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '+')
                .collect();
            digits.parse::<i64>().ok()?.to_string()
        },
        DataType::Real => {
            let cleaned: String = trimmed
                .chars()
                .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
                .collect();
            cleaned.parse::<f64>().ok()?.to_string()
        },
        DataType::Date => parse_date(trimmed)?.format("%Y-%m-%d").to_string(),
        DataType::Timestamp => parse_timestamp(trimmed)?
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string(),
        DataType::Boolean => parse_boolean(trimmed)?.to_string(),
    };

    value_matches(data_type, &candidate).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_matching() {
        assert!(value_matches(DataType::Integer, "42"));
        assert!(value_matches(DataType::Integer, "-7"));
        assert!(!value_matches(DataType::Integer, "4.2"));
        assert!(!value_matches(DataType::Integer, " 42"));
    }

    #[test]
    fn test_real_accepts_integers() {
        assert!(value_matches(DataType::Real, "42"));
        assert!(value_matches(DataType::Real, "3.14"));
        assert!(!value_matches(DataType::Real, "3.1.4"));
    }

    #[test]
    fn test_text_rejects_padding() {
        assert!(value_matches(DataType::Text, "hello"));
        assert!(!value_matches(DataType::Text, " hello "));
        assert!(!value_matches(DataType::Text, "   "));
    }

    #[test]
    fn test_date_strictness() {
        assert!(value_matches(DataType::Date, "2023-06-01"));
        assert!(!value_matches(DataType::Date, "06/01/2023"));
        assert!(!value_matches(DataType::Date, "2023-13-01"));
    }

    #[test]
    fn test_timestamp_forms() {
        assert!(value_matches(DataType::Timestamp, "2023-06-01T12:00:00"));
        assert!(value_matches(DataType::Timestamp, "2023-06-01 12:00:00"));
        assert!(value_matches(DataType::Timestamp, "2023-06-01T12:00:00Z"));
        assert!(!value_matches(DataType::Timestamp, "2023-06-01"));
    }

    #[test]
    fn test_normalize_repairs_common_damage() {
        assert_eq!(normalize(DataType::Text, "  hello "), Some("hello".to_string()));
        assert_eq!(normalize(DataType::Integer, " 1,234 "), Some("1234".to_string()));
        assert_eq!(
            normalize(DataType::Date, "06/15/2023"),
            Some("2023-06-15".to_string())
        );
        assert_eq!(normalize(DataType::Boolean, "Yes"), Some("true".to_string()));
        assert_eq!(normalize(DataType::Integer, "abc"), None);
    }
}
