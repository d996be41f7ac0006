//! Validate mapping command
//!
//! Thin wrapper over the validator engine; see `mapping::validate` for
//! the sampling, classification, and status transition semantics.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cdp_common::types::{MappingStatus, SampleCheck, ValidationAnomaly};

use crate::error::AppError;
use crate::mapping::validate::{self, BulkValidationSummary, ValidateError};
use crate::state::AppState;

/// Command to validate one mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateMappingCommand {
    pub mapping_id: Uuid,
}

/// Response from a validation run
#[derive(Debug, Clone, Serialize)]
pub struct ValidateMappingResponse {
    pub mapping_id: Uuid,
    pub status: MappingStatus,
    pub confidence_score: f64,
    pub valid_count: usize,
    pub null_count: usize,
    pub error_count: usize,
    pub anomalies: Vec<ValidationAnomaly>,
    pub samples: Vec<SampleCheck>,
}

impl From<ValidateError> for AppError {
    fn from(e: ValidateError) -> Self {
        match e {
            ValidateError::MappingNotFound(_)
            | ValidateError::SourceNotFound(_)
            | ValidateError::TargetNotFound(_)
            | ValidateError::SourceAttributeMissing(_) => AppError::NotFound(e.to_string()),
            ValidateError::Sampling(_) => AppError::ScanFailure(e.to_string()),
        }
    }
}

/// Handles single-mapping validation
pub async fn handle(
    state: AppState,
    command: ValidateMappingCommand,
) -> Result<ValidateMappingResponse, ValidateError> {
    let outcome = validate::validate(&state, command.mapping_id).await?;

    Ok(ValidateMappingResponse {
        mapping_id: outcome.mapping.id,
        status: outcome.mapping.status,
        confidence_score: outcome.mapping.confidence_score,
        valid_count: outcome.run.valid_count,
        null_count: outcome.run.null_count,
        error_count: outcome.run.error_count,
        anomalies: outcome.run.anomalies,
        samples: outcome.run.samples,
    })
}

/// Query parameters for bulk validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidateAllQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<Uuid>,
}

/// Handles bulk validation of every not-yet-validated mapping
pub async fn handle_all(state: AppState, query: ValidateAllQuery) -> BulkValidationSummary {
    validate::validate_all(&state, query.source_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;

    #[tokio::test]
    async fn test_validate_via_command() {
        let state = test_support::state_with_crm().await;
        let mapping = test_support::crm_mapping(&state, "cust_id", "customer_id").await;

        let response = handle(
            state,
            ValidateMappingCommand {
                mapping_id: mapping.id,
            },
        )
        .await
        .unwrap();
        assert_eq!(response.status, MappingStatus::Validated);
        assert!(response.confidence_score >= 0.8);
        assert!(!response.samples.is_empty());
    }

    #[tokio::test]
    async fn test_validate_unknown_mapping() {
        let state = test_support::state_with_crm().await;
        let result = handle(
            state,
            ValidateMappingCommand {
                mapping_id: Uuid::new_v4(),
            },
        )
        .await;
        assert!(matches!(result, Err(ValidateError::MappingNotFound(_))));
    }
}
