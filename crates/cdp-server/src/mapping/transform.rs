//! Transformation logic
//!
//! A mapping's `transformation_logic` is a `|`-separated pipeline of named
//! ops, e.g. `trim | to_integer`. The same interpreter backs the mapping
//! validator's dry-run, the job transform/load steps, and lineage's
//! transformation nodes, so a logic string means exactly one thing
//! everywhere.

use thiserror::Error;

use cdp_common::types::DataType;

use crate::quality::format;

/// Ops accepted in a transformation pipeline.
pub const KNOWN_OPS: &[&str] = &[
    "trim",
    "lower",
    "upper",
    "collapse_ws",
    "digits_only",
    "to_integer",
    "to_real",
    "to_date",
    "to_timestamp",
    "to_boolean",
];

/// Errors from parsing or applying transformation logic
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("Unknown transform op '{0}'")]
    UnknownOp(String),

    #[error("Transformation logic is empty")]
    Empty,

    #[error("Cannot apply '{op}' to '{value}'")]
    Coercion { op: String, value: String },
}

/// Parse a pipeline into its ops, validating each name.
pub fn parse(logic: &str) -> Result<Vec<&str>, TransformError> {
    let ops: Vec<&str> = logic
        .split('|')
        .map(str::trim)
        .filter(|op| !op.is_empty())
        .collect();

    if ops.is_empty() {
        return Err(TransformError::Empty);
    }

    for op in &ops {
        if !KNOWN_OPS.contains(op) {
            return Err(TransformError::UnknownOp(op.to_string()));
        }
    }

    Ok(ops)
}

/// Apply a pipeline to one value. `None` in means `None` out; a value
/// reduced to the empty string also comes out as `None`.
pub fn apply(logic: &str, value: Option<&str>) -> Result<Option<String>, TransformError> {
    let ops = parse(logic)?;

    let Some(input) = value else {
        return Ok(None);
    };

    let mut current = input.to_string();
    for op in ops {
        if current.trim().is_empty() {
            return Ok(None);
        }
        current = apply_op(op, &current)?;
    }

    Ok(if current.is_empty() { None } else { Some(current) })
}

fn coercion(op: &str, value: &str) -> TransformError {
    TransformError::Coercion {
        op: op.to_string(),
        value: value.to_string(),
    }
}

fn apply_op(op: &str, value: &str) -> Result<String, TransformError> {
    match op {
        "trim" => Ok(value.trim().to_string()),
        "lower" => Ok(value.to_lowercase()),
        "upper" => Ok(value.to_uppercase()),
        "collapse_ws" => Ok(value.split_whitespace().collect::<Vec<_>>().join(" ")),
        "digits_only" => Ok(value.chars().filter(|c| c.is_ascii_digit()).collect()),
        "to_integer" => value
            .trim()
            .parse::<i64>()
            .map(|n| n.to_string())
            .map_err(|_| coercion(op, value)),
        "to_real" => value
            .trim()
            .parse::<f64>()
            .map(|n| n.to_string())
            .map_err(|_| coercion(op, value)),
        "to_date" => format::parse_date(value.trim())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .ok_or_else(|| coercion(op, value)),
        "to_timestamp" => format::parse_timestamp(value.trim())
            .map(|ts| ts.format("%Y-%m-%dT%H:%M:%S").to_string())
            .ok_or_else(|| coercion(op, value)),
        "to_boolean" => format::parse_boolean(value.trim())
            .map(|b| b.to_string())
            .ok_or_else(|| coercion(op, value)),
        other => Err(TransformError::UnknownOp(other.to_string())),
    }
}

/// Generate the default transformation for a suggested mapping, based on
/// the source and target data types. `None` means a direct copy.
pub fn generate(source_type: DataType, target_type: DataType) -> Option<String> {
    let logic = match target_type {
        DataType::Integer => "trim | to_integer",
        DataType::Real => "trim | to_real",
        DataType::Date => "trim | to_date",
        DataType::Timestamp => "trim | to_timestamp",
        DataType::Boolean => "trim | to_boolean",
        DataType::Text => {
            if source_type == DataType::Text {
                "trim"
            } else {
                return None;
            }
        },
    };
    Some(logic.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_unknown_op() {
        assert_eq!(
            parse("trim | frobnicate"),
            Err(TransformError::UnknownOp("frobnicate".to_string()))
        );
        assert_eq!(parse("  "), Err(TransformError::Empty));
    }

    #[test]
    fn test_null_in_null_out() {
        assert_eq!(apply("trim | to_integer", None), Ok(None));
    }

    #[test]
    fn test_pipeline_application() {
        assert_eq!(
            apply("trim | lower", Some("  Hello World  ")),
            Ok(Some("hello world".to_string()))
        );
        assert_eq!(
            apply("digits_only", Some("555-123-4567")),
            Ok(Some("5551234567".to_string()))
        );
    }

    #[test]
    fn test_coercion_failure() {
        let result = apply("trim | to_integer", Some("not a number"));
        assert!(matches!(result, Err(TransformError::Coercion { .. })));
    }

    #[test]
    fn test_date_coercion() {
        assert_eq!(
            apply("trim | to_date", Some(" 06/15/2023 ")),
            Ok(Some("2023-06-15".to_string()))
        );
    }

    #[test]
    fn test_whitespace_only_becomes_null() {
        assert_eq!(apply("trim", Some("   ")), Ok(None));
        assert_eq!(apply("to_integer", Some("  ")), Ok(None));
    }

    #[test]
    fn test_generate_matches_target_type() {
        use DataType::*;
        assert_eq!(generate(Text, Integer), Some("trim | to_integer".to_string()));
        assert_eq!(generate(Text, Text), Some("trim".to_string()));
        assert_eq!(generate(Integer, Text), None);
    }
}
