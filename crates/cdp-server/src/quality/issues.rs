//! Quality issue detection
//!
//! A fixed battery of checks over one attribute's materialized rows.
//! Each triggered check upserts an open issue carrying concrete fix
//! options; a check whose condition has cleared resolves its open issue.

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use cdp_common::types::{DataType, FixOption, IssueType, QualityIssue, Severity};

use super::format;
use super::materialized::MaterializedError;
use super::metrics::staleness_score;
use crate::state::AppState;
use crate::store::DetectedIssue;

/// Errors from issue detection
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Target attribute {0} not found")]
    AttributeNotFound(Uuid),

    #[error(transparent)]
    Store(#[from] MaterializedError),
}

/// Severity scales with how far past its threshold a rate is.
fn severity_for(rate: f64, threshold: f64) -> Severity {
    if rate >= threshold * 4.0 {
        Severity::High
    } else if rate >= threshold * 2.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Run the full check battery for one attribute and return its open
/// issues, fix options attached.
#[tracing::instrument(skip(state))]
pub async fn detect(
    state: &AppState,
    target_attribute_id: Uuid,
) -> Result<Vec<QualityIssue>, DetectError> {
    let attribute = state
        .catalog
        .get(target_attribute_id)
        .await
        .ok_or(DetectError::AttributeNotFound(target_attribute_id))?;

    let rows = state.materialized.read(target_attribute_id).await?;
    let total = rows.len();
    let thresholds = &state.config.quality;

    // Completeness: null rate over threshold.
    let null_count = rows.iter().filter(|r| r.value.is_none()).count();
    let null_rate = if total == 0 { 0.0 } else { null_count as f64 / total as f64 };
    if total > 0 && null_rate > thresholds.null_rate_threshold {
        state
            .issues
            .upsert_open(DetectedIssue {
                target_attribute_id,
                issue_type: IssueType::Completeness,
                severity: severity_for(null_rate, thresholds.null_rate_threshold),
                description: format!(
                    "{} of {} records have no value for '{}' ({:.1}% null rate)",
                    null_count,
                    total,
                    attribute.name,
                    null_rate * 100.0
                ),
                affected_record_count: null_count as u64,
                fix_options: completeness_fixes(),
            })
            .await;
    } else {
        state
            .issues
            .resolve_cleared(target_attribute_id, IssueType::Completeness)
            .await;
    }

    // Consistency: duplicate record keys over threshold.
    let mut seen = std::collections::HashSet::new();
    let duplicate_count = rows.iter().filter(|r| !seen.insert(r.record_key.as_str())).count();
    let duplicate_rate = if total == 0 {
        0.0
    } else {
        duplicate_count as f64 / total as f64
    };
    if total > 0 && duplicate_rate > thresholds.duplicate_rate_threshold {
        state
            .issues
            .upsert_open(DetectedIssue {
                target_attribute_id,
                issue_type: IssueType::Consistency,
                severity: severity_for(duplicate_rate, thresholds.duplicate_rate_threshold),
                description: format!(
                    "{} duplicate record keys among {} records of '{}'",
                    duplicate_count, total, attribute.name
                ),
                affected_record_count: duplicate_count as u64,
                fix_options: consistency_fixes(),
            })
            .await;
    } else {
        state
            .issues
            .resolve_cleared(target_attribute_id, IssueType::Consistency)
            .await;
    }

    // Accuracy: format failure rate over threshold.
    let non_null: Vec<&str> = rows.iter().filter_map(|r| r.value.as_deref()).collect();
    let failing = non_null
        .iter()
        .filter(|v| !format::value_matches(attribute.data_type, v))
        .count();
    let failure_rate = if non_null.is_empty() {
        0.0
    } else {
        failing as f64 / non_null.len() as f64
    };
    if !non_null.is_empty() && failure_rate > thresholds.format_failure_threshold {
        state
            .issues
            .upsert_open(DetectedIssue {
                target_attribute_id,
                issue_type: IssueType::Accuracy,
                severity: severity_for(failure_rate, thresholds.format_failure_threshold),
                description: format!(
                    "{} of {} values fail the {} format for '{}'",
                    failing,
                    non_null.len(),
                    attribute.data_type,
                    attribute.name
                ),
                affected_record_count: failing as u64,
                fix_options: accuracy_fixes(attribute.data_type),
            })
            .await;
    } else {
        state
            .issues
            .resolve_cleared(target_attribute_id, IssueType::Accuracy)
            .await;
    }

    // Timeliness: last update beyond SLA.
    let newest = rows.iter().map(|r| r.updated_at).max();
    let stale = newest
        .map(|ts| staleness_score(ts, thresholds.staleness_sla_hours, Utc::now()) < 1.0)
        .unwrap_or(false);
    if stale {
        let severity = newest
            .map(|ts| {
                if staleness_score(ts, thresholds.staleness_sla_hours, Utc::now()) <= 0.0 {
                    Severity::High
                } else {
                    Severity::Medium
                }
            })
            .unwrap_or(Severity::Medium);
        state
            .issues
            .upsert_open(DetectedIssue {
                target_attribute_id,
                issue_type: IssueType::Timeliness,
                severity,
                description: format!(
                    "Materialized data for '{}' has not been refreshed within the {}h SLA",
                    attribute.name, thresholds.staleness_sla_hours
                ),
                affected_record_count: total as u64,
                fix_options: timeliness_fixes(),
            })
            .await;
    } else {
        state
            .issues
            .resolve_cleared(target_attribute_id, IssueType::Timeliness)
            .await;
    }

    Ok(state.issues.list_open(Some(target_attribute_id), None).await)
}

fn completeness_fixes() -> Vec<FixOption> {
    vec![
        FixOption {
            fix_type: "fill_default".to_string(),
            name: "Fill with default".to_string(),
            description: "Replace missing values with a default".to_string(),
            parameters: json!({
                "default_value": {
                    "type": "string",
                    "description": "Value used for missing entries",
                }
            }),
        },
        FixOption {
            fix_type: "drop_missing".to_string(),
            name: "Drop missing records".to_string(),
            description: "Remove records that have no value for this attribute".to_string(),
            parameters: json!({}),
        },
    ]
}

fn consistency_fixes() -> Vec<FixOption> {
    vec![FixOption {
        fix_type: "deduplicate".to_string(),
        name: "Deduplicate records".to_string(),
        description: "Collapse duplicate record keys, keeping one row each".to_string(),
        parameters: json!({
            "keep": {
                "type": "string",
                "description": "Which duplicate to keep",
                "enum": ["most_recent", "first"],
                "default": "most_recent",
            }
        }),
    }]
}

fn accuracy_fixes(data_type: DataType) -> Vec<FixOption> {
    vec![
        FixOption {
            fix_type: "normalize_format".to_string(),
            name: "Strip and re-validate format".to_string(),
            description: format!(
                "Strip noise from non-conforming values and re-validate them as {}",
                data_type
            ),
            parameters: json!({}),
        },
        FixOption {
            fix_type: "null_invalid".to_string(),
            name: "Null out invalid values".to_string(),
            description: "Replace values that fail the format check with nulls".to_string(),
            parameters: json!({}),
        },
    ]
}

fn timeliness_fixes() -> Vec<FixOption> {
    vec![FixOption {
        fix_type: "refresh_snapshot".to_string(),
        name: "Refresh from source".to_string(),
        description: "Re-materialize the attribute from its best validated mapping".to_string(),
        parameters: json!({}),
    }]
}
