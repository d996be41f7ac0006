//! Field issues query
//!
//! Runs the detection battery for an attribute and returns its open
//! issues with their fix options.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cdp_common::types::{QualityIssue, Severity};

use crate::error::AppError;
use crate::quality::issues::{self, DetectError};
use crate::state::AppState;

/// Query for an attribute's open quality issues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldIssuesQuery {
    /// Target attribute name
    pub attribute: String,
    /// Minimum severity to include
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

/// Response with the open issues
#[derive(Debug, Clone, Serialize)]
pub struct FieldIssuesResponse {
    pub target_attribute_id: Uuid,
    pub attribute: String,
    pub issues: Vec<QualityIssue>,
    pub count: usize,
}

/// Errors for the field issues query
#[derive(Debug, thiserror::Error)]
pub enum FieldIssuesError {
    #[error("Target attribute '{0}' not found")]
    AttributeNotFound(String),

    #[error("Unknown severity '{0}'")]
    InvalidSeverity(String),

    #[error(transparent)]
    Detect(#[from] DetectError),
}

impl From<FieldIssuesError> for AppError {
    fn from(e: FieldIssuesError) -> Self {
        match e {
            FieldIssuesError::AttributeNotFound(_) => AppError::NotFound(e.to_string()),
            FieldIssuesError::InvalidSeverity(_) => AppError::Validation(e.to_string()),
            FieldIssuesError::Detect(DetectError::AttributeNotFound(_)) => {
                AppError::NotFound(e.to_string())
            },
            FieldIssuesError::Detect(DetectError::Store(_)) => AppError::Internal(e.to_string()),
        }
    }
}

pub async fn handle(
    state: AppState,
    query: FieldIssuesQuery,
) -> Result<FieldIssuesResponse, FieldIssuesError> {
    let attribute = state
        .catalog
        .find_by_name(&query.attribute)
        .await
        .ok_or_else(|| FieldIssuesError::AttributeNotFound(query.attribute.clone()))?;

    let min_severity = query
        .severity
        .as_deref()
        .map(|s| {
            s.parse::<Severity>()
                .map_err(|_| FieldIssuesError::InvalidSeverity(s.to_string()))
        })
        .transpose()?;

    let issues = issues::detect(&state, attribute.id).await?;
    let issues: Vec<QualityIssue> = issues
        .into_iter()
        .filter(|i| min_severity.is_none_or(|s| i.severity >= s))
        .collect();

    Ok(FieldIssuesResponse {
        target_attribute_id: attribute.id,
        attribute: query.attribute,
        count: issues.len(),
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::materialized::{row, MaterializedStore};
    use crate::state::test_support;

    #[tokio::test]
    async fn test_issues_returned_with_fix_options() {
        let state = test_support::state_with_crm().await;
        let target = state.catalog.find_by_name("email").await.unwrap();
        let rows: Vec<_> = (0..10)
            .map(|i| {
                let value = (i < 7).then(|| format!("user{i}@example.com"));
                row(format!("{i:05}"), value)
            })
            .collect();
        state.materialized.replace(target.id, rows).await.unwrap();

        let response = handle(
            state,
            FieldIssuesQuery {
                attribute: "email".to_string(),
                severity: None,
            },
        )
        .await
        .unwrap();
        assert!(response.count > 0);
        assert!(response.issues.iter().all(|i| !i.fix_options.is_empty()));
    }

    #[tokio::test]
    async fn test_invalid_severity_rejected() {
        let state = test_support::state_with_crm().await;
        let result = handle(
            state,
            FieldIssuesQuery {
                attribute: "email".to_string(),
                severity: Some("catastrophic".to_string()),
            },
        )
        .await;
        assert!(matches!(result, Err(FieldIssuesError::InvalidSeverity(_))));
    }
}
