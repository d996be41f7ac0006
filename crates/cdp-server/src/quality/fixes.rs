//! Fix application
//!
//! Executes a named remediation against the materialized data as a single
//! all-or-nothing column swap, serialized per target attribute. Malformed
//! parameters fail fast; transient store failures are retried up to a
//! bound and then surface as a fatal error with the data untouched.
//! Re-applying a fix to an already-resolved issue is a no-op returning
//! zero affected records.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use cdp_common::types::{DataType, MappingStatus, QualityIssue};

use super::format;
use super::materialized::{MaterializedError, MaterializedRow};
use crate::mapping::transform;
use crate::state::AppState;

/// Errors from fix application
#[derive(Debug, Error)]
pub enum FixError {
    #[error("Quality issue {0} not found")]
    IssueNotFound(Uuid),

    #[error("Fix type '{fix_type}' is not offered for issue {issue_id}")]
    UnknownFixType { issue_id: Uuid, fix_type: String },

    #[error("Invalid fix parameters: {0}")]
    InvalidParameters(String),

    #[error("Target attribute {0} not found")]
    AttributeNotFound(Uuid),

    /// Transient store failures exhausted their retries; nothing was
    /// modified.
    #[error("Fix could not be applied: {0}")]
    StoreFailure(String),
}

/// One entry of the structured diff summary.
#[derive(Debug, Clone, Serialize)]
pub struct FixChange {
    pub record_key: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// Result of applying a fix.
#[derive(Debug, Clone, Serialize)]
pub struct FixResult {
    pub issue_id: Uuid,
    pub fix_type: String,
    pub affected_records: u64,
    /// Capped change list; `truncated` marks a cut-off
    pub changes: Vec<FixChange>,
    pub truncated: bool,
}

/// Apply a fix to the issue's target attribute.
#[tracing::instrument(skip(state, parameters))]
pub async fn apply(
    state: &AppState,
    issue_id: Uuid,
    fix_type: &str,
    parameters: &Value,
) -> Result<FixResult, FixError> {
    let issue = state
        .issues
        .get(issue_id)
        .await
        .ok_or(FixError::IssueNotFound(issue_id))?;

    // Idempotence: a resolved issue is a completed fix.
    if issue.is_resolved() {
        return Ok(FixResult {
            issue_id,
            fix_type: fix_type.to_string(),
            affected_records: 0,
            changes: vec![],
            truncated: false,
        });
    }

    if !issue.fix_options.iter().any(|o| o.fix_type == fix_type) {
        return Err(FixError::UnknownFixType {
            issue_id,
            fix_type: fix_type.to_string(),
        });
    }

    let attribute = state
        .catalog
        .get(issue.target_attribute_id)
        .await
        .ok_or(FixError::AttributeNotFound(issue.target_attribute_id))?;

    // Serialize fixes per target attribute.
    let lock = state.issues.fix_lock(issue.target_attribute_id).await;
    let _guard = lock.lock().await;

    let rows = read_with_retry(state, issue.target_attribute_id).await?;

    let (new_rows, mut changes) = match fix_type {
        "fill_default" => fill_default(&rows, parameters)?,
        "drop_missing" => drop_missing(&rows, parameters)?,
        "deduplicate" => deduplicate(&rows, parameters)?,
        "normalize_format" => normalize_format(&rows, attribute.data_type),
        "null_invalid" => null_invalid(&rows, attribute.data_type),
        "refresh_snapshot" => refresh_snapshot(state, &issue).await?,
        other => {
            return Err(FixError::UnknownFixType {
                issue_id,
                fix_type: other.to_string(),
            })
        },
    };

    let affected = changes.len() as u64;

    // The whole-column swap is the transaction boundary: it either lands
    // or the data stays exactly as it was.
    write_with_retry(state, issue.target_attribute_id, new_rows).await?;

    state.issues.resolve(issue_id).await;

    tracing::info!(
        issue_id = %issue_id,
        fix_type = %fix_type,
        affected_records = affected,
        "Quality fix applied"
    );

    let cap = state.config.quality.max_change_entries;
    let truncated = changes.len() > cap;
    changes.truncate(cap);

    Ok(FixResult {
        issue_id,
        fix_type: fix_type.to_string(),
        affected_records: affected,
        changes,
        truncated,
    })
}

/// Parameters may be omitted (null) or an object; anything else is a
/// caller error.
fn check_params_shape(parameters: &Value) -> Result<(), FixError> {
    if parameters.is_null() || parameters.is_object() {
        Ok(())
    } else {
        Err(FixError::InvalidParameters(
            "parameters must be an object".to_string(),
        ))
    }
}

fn fill_default(
    rows: &[MaterializedRow],
    parameters: &Value,
) -> Result<(Vec<MaterializedRow>, Vec<FixChange>), FixError> {
    check_params_shape(parameters)?;
    let default = parameters
        .get("default_value")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            FixError::InvalidParameters("'default_value' (string) is required".to_string())
        })?;

    let now = chrono::Utc::now();
    let mut changes = Vec::new();
    let new_rows = rows
        .iter()
        .map(|row| {
            if row.value.is_none() {
                changes.push(FixChange {
                    record_key: row.record_key.clone(),
                    action: "filled".to_string(),
                    before: None,
                    after: Some(default.to_string()),
                });
                MaterializedRow {
                    record_key: row.record_key.clone(),
                    value: Some(default.to_string()),
                    updated_at: now,
                }
            } else {
                row.clone()
            }
        })
        .collect();

    Ok((new_rows, changes))
}

fn drop_missing(
    rows: &[MaterializedRow],
    parameters: &Value,
) -> Result<(Vec<MaterializedRow>, Vec<FixChange>), FixError> {
    check_params_shape(parameters)?;

    let mut changes = Vec::new();
    let new_rows = rows
        .iter()
        .filter(|row| {
            if row.value.is_none() {
                changes.push(FixChange {
                    record_key: row.record_key.clone(),
                    action: "dropped".to_string(),
                    before: None,
                    after: None,
                });
                false
            } else {
                true
            }
        })
        .cloned()
        .collect();

    Ok((new_rows, changes))
}

fn deduplicate(
    rows: &[MaterializedRow],
    parameters: &Value,
) -> Result<(Vec<MaterializedRow>, Vec<FixChange>), FixError> {
    check_params_shape(parameters)?;
    let keep = parameters
        .get("keep")
        .and_then(Value::as_str)
        .unwrap_or("most_recent");
    if !matches!(keep, "most_recent" | "first") {
        return Err(FixError::InvalidParameters(format!(
            "'keep' must be 'most_recent' or 'first', got '{keep}'"
        )));
    }

    let mut kept: Vec<MaterializedRow> = Vec::with_capacity(rows.len());
    let mut changes = Vec::new();

    for row in rows {
        match kept.iter_mut().find(|r| r.record_key == row.record_key) {
            None => kept.push(row.clone()),
            Some(existing) => {
                let replace = keep == "most_recent" && row.updated_at > existing.updated_at;
                let dropped = if replace {
                    let before = existing.value.clone();
                    *existing = row.clone();
                    before
                } else {
                    row.value.clone()
                };
                changes.push(FixChange {
                    record_key: row.record_key.clone(),
                    action: "deduplicated".to_string(),
                    before: dropped,
                    after: None,
                });
            },
        }
    }

    Ok((kept, changes))
}

fn normalize_format(
    rows: &[MaterializedRow],
    data_type: DataType,
) -> (Vec<MaterializedRow>, Vec<FixChange>) {
    let now = chrono::Utc::now();
    let mut changes = Vec::new();
    let new_rows = rows
        .iter()
        .map(|row| match row.value.as_deref() {
            Some(value) if !format::value_matches(data_type, value) => {
                match format::normalize(data_type, value) {
                    Some(normalized) => {
                        changes.push(FixChange {
                            record_key: row.record_key.clone(),
                            action: "normalized".to_string(),
                            before: Some(value.to_string()),
                            after: Some(normalized.clone()),
                        });
                        MaterializedRow {
                            record_key: row.record_key.clone(),
                            value: Some(normalized),
                            updated_at: now,
                        }
                    },
                    None => row.clone(),
                }
            },
            _ => row.clone(),
        })
        .collect();

    (new_rows, changes)
}

fn null_invalid(
    rows: &[MaterializedRow],
    data_type: DataType,
) -> (Vec<MaterializedRow>, Vec<FixChange>) {
    let now = chrono::Utc::now();
    let mut changes = Vec::new();
    let new_rows = rows
        .iter()
        .map(|row| match row.value.as_deref() {
            Some(value) if !format::value_matches(data_type, value) => {
                changes.push(FixChange {
                    record_key: row.record_key.clone(),
                    action: "nulled".to_string(),
                    before: Some(value.to_string()),
                    after: None,
                });
                MaterializedRow {
                    record_key: row.record_key.clone(),
                    value: None,
                    updated_at: now,
                }
            },
            _ => row.clone(),
        })
        .collect();

    (new_rows, changes)
}

/// Re-materialize the attribute from its best validated mapping.
async fn refresh_snapshot(
    state: &AppState,
    issue: &QualityIssue,
) -> Result<(Vec<MaterializedRow>, Vec<FixChange>), FixError> {
    let mappings = state.mappings.for_target(issue.target_attribute_id).await;
    let best = mappings
        .into_iter()
        .filter(|m| m.status == MappingStatus::Validated)
        .max_by(|a, b| a.confidence_score.total_cmp(&b.confidence_score).then(a.id.cmp(&b.id)))
        .ok_or_else(|| {
            FixError::InvalidParameters(
                "no validated mapping to refresh this attribute from".to_string(),
            )
        })?;

    let attribute = state
        .sources
        .attribute(best.source_attribute_id)
        .await
        .ok_or_else(|| {
            FixError::InvalidParameters("the mapping's source attribute no longer exists".to_string())
        })?;
    let source = state
        .sources
        .get(best.source_system_id)
        .await
        .ok_or_else(|| {
            FixError::InvalidParameters("the mapping's source system no longer exists".to_string())
        })?;

    let adapter = state.connectors.adapter_for(source.id).await;
    let values = adapter
        .sample(&source, &attribute.name, state.config.jobs.load_batch_size)
        .await
        .map_err(|e| FixError::StoreFailure(format!("source refresh failed: {e}")))?;

    let now = chrono::Utc::now();
    let mut changes = Vec::new();
    let mut rows = Vec::with_capacity(values.len());
    for (i, value) in values.into_iter().enumerate() {
        let transformed = match &best.transformation_logic {
            Some(logic) => transform::apply(logic, value.as_deref()).unwrap_or(None),
            None => value,
        };
        let record_key = format!("{i:05}");
        changes.push(FixChange {
            record_key: record_key.clone(),
            action: "refreshed".to_string(),
            before: None,
            after: transformed.clone(),
        });
        rows.push(MaterializedRow {
            record_key,
            value: transformed,
            updated_at: now,
        });
    }

    Ok((rows, changes))
}

async fn read_with_retry(
    state: &AppState,
    target_attribute_id: Uuid,
) -> Result<Vec<MaterializedRow>, FixError> {
    let limit = state.config.quality.fix_retry_limit;
    let backoff = state.config.quality.fix_retry_backoff_ms;

    let mut attempt = 0;
    loop {
        match state.materialized.read(target_attribute_id).await {
            Ok(rows) => return Ok(rows),
            Err(MaterializedError::Transient(msg)) if attempt < limit => {
                attempt += 1;
                tracing::warn!(attempt, error = %msg, "Transient store failure during fix, retrying");
                tokio::time::sleep(Duration::from_millis(backoff * attempt as u64)).await;
            },
            Err(MaterializedError::Transient(msg)) => return Err(FixError::StoreFailure(msg)),
        }
    }
}

async fn write_with_retry(
    state: &AppState,
    target_attribute_id: Uuid,
    rows: Vec<MaterializedRow>,
) -> Result<(), FixError> {
    let limit = state.config.quality.fix_retry_limit;
    let backoff = state.config.quality.fix_retry_backoff_ms;

    let mut attempt = 0;
    loop {
        match state
            .materialized
            .replace(target_attribute_id, rows.clone())
            .await
        {
            Ok(()) => return Ok(()),
            Err(MaterializedError::Transient(msg)) if attempt < limit => {
                attempt += 1;
                tracing::warn!(attempt, error = %msg, "Transient store failure during fix, retrying");
                tokio::time::sleep(Duration::from_millis(backoff * attempt as u64)).await;
            },
            Err(MaterializedError::Transient(msg)) => return Err(FixError::StoreFailure(msg)),
        }
    }
}
