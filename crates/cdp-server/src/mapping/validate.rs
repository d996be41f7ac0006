//! Mapping validator
//!
//! Draws a bounded sample of source values through the owning system's
//! connector, dry-runs the mapping's transformation, classifies every
//! sample, and moves the mapping through its status machine. All writes
//! for one mapping are serialized behind its validation lock, so
//! concurrent `validate` calls cannot interleave partial updates.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use cdp_common::types::{
    DataType, Mapping, MappingStatus, SampleCheck, SampleOutcome, Severity, ValidationAnomaly,
    ValidationRun,
};

use crate::connectors::ScanError;
use crate::mapping::transform;
use crate::quality::format;
use crate::state::AppState;

/// Sample error fraction at or above which a high-severity anomaly is raised.
const ERROR_RATE_ANOMALY: f64 = 0.2;

/// Sample null fraction at or above which a medium-severity anomaly is raised.
const NULL_RATE_ANOMALY: f64 = 0.5;

/// Errors from the validation path
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("Mapping {0} not found")]
    MappingNotFound(Uuid),

    #[error("Source attribute {0} no longer exists; rescan may have removed it")]
    SourceAttributeMissing(Uuid),

    #[error("Source system {0} not found")]
    SourceNotFound(Uuid),

    #[error("Target attribute {0} not found")]
    TargetNotFound(Uuid),

    #[error("Sampling failed: {0}")]
    Sampling(#[from] ScanError),
}

/// Result of a validation run: the updated mapping plus the audit record.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub mapping: Mapping,
    pub run: ValidationRun,
}

/// Validate one mapping against fresh sample data.
#[tracing::instrument(skip(state))]
pub async fn validate(state: &AppState, mapping_id: Uuid) -> Result<ValidationOutcome, ValidateError> {
    let lock = state.mappings.validation_lock(mapping_id).await;
    let _guard = lock.lock().await;

    let mapping = state
        .mappings
        .get(mapping_id)
        .await
        .ok_or(ValidateError::MappingNotFound(mapping_id))?;

    let attribute = state
        .sources
        .attribute(mapping.source_attribute_id)
        .await
        .ok_or(ValidateError::SourceAttributeMissing(mapping.source_attribute_id))?;

    let source = state
        .sources
        .get(mapping.source_system_id)
        .await
        .ok_or(ValidateError::SourceNotFound(mapping.source_system_id))?;

    let target = state
        .catalog
        .get(mapping.target_attribute_id)
        .await
        .ok_or(ValidateError::TargetNotFound(mapping.target_attribute_id))?;

    let samples = sample_with_retry(state, &source, &attribute.name).await?;

    let (checks, anomalies) = classify(&samples, mapping.transformation_logic.as_deref(), target.data_type);

    let valid_count = checks.iter().filter(|c| c.outcome == SampleOutcome::Valid).count();
    let null_count = checks.iter().filter(|c| c.outcome == SampleOutcome::Null).count();
    let error_count = checks.iter().filter(|c| c.outcome == SampleOutcome::Error).count();

    let validation_confidence = if checks.is_empty() {
        0.0
    } else {
        valid_count as f64 / checks.len() as f64
    };

    // Blend with the prior score, recency-weighted toward this run. A
    // mapping with no prior signal (hand-created, confidence 0) takes the
    // validation confidence as-is.
    let weight = state.config.engine.validation_blend_weight;
    let blended = if mapping.confidence_score > 0.0 {
        ((1.0 - weight) * mapping.confidence_score + weight * validation_confidence).clamp(0.0, 1.0)
    } else {
        validation_confidence
    };

    let high_anomalies = anomalies.iter().filter(|a| a.severity == Severity::High).count();
    let status = if blended >= state.config.engine.validation_threshold && high_anomalies == 0 {
        MappingStatus::Validated
    } else {
        MappingStatus::Issues
    };

    let run = ValidationRun {
        id: Uuid::new_v4(),
        mapping_id,
        run_at: chrono::Utc::now(),
        samples: checks,
        valid_count,
        null_count,
        error_count,
        confidence: blended,
        anomalies,
        outcome: status,
    };

    tracing::info!(
        mapping_id = %mapping_id,
        confidence = blended,
        status = %status,
        valid = valid_count,
        nulls = null_count,
        errors = error_count,
        "Mapping validated"
    );

    let mapping = state
        .mappings
        .record_validation(mapping_id, run.clone(), blended, status)
        .await
        .map_err(|_| ValidateError::MappingNotFound(mapping_id))?;

    Ok(ValidationOutcome { mapping, run })
}

/// Summary entry for bulk validation.
#[derive(Debug, Clone, Serialize)]
pub struct BulkValidationEntry {
    pub mapping_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MappingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a bulk validation pass.
#[derive(Debug, Clone, Serialize)]
pub struct BulkValidationSummary {
    pub total: usize,
    pub validated: usize,
    pub issues: usize,
    pub errors: usize,
    pub results: Vec<BulkValidationEntry>,
}

/// How many mappings a bulk validation pass runs concurrently. Distinct
/// mappings never contend on the same validation lock.
const BULK_VALIDATION_CONCURRENCY: usize = 4;

/// Validate every not-yet-validated mapping, optionally scoped to one
/// source system. Per-mapping failures are reported, not fatal.
pub async fn validate_all(
    state: &AppState,
    source_system_id: Option<Uuid>,
) -> BulkValidationSummary {
    let ids = state.mappings.unvalidated_ids(source_system_id).await;

    let mut summary = BulkValidationSummary {
        total: ids.len(),
        validated: 0,
        issues: 0,
        errors: 0,
        results: Vec::with_capacity(ids.len()),
    };

    let outcomes: Vec<(Uuid, Result<ValidationOutcome, ValidateError>)> = stream::iter(ids)
        .map(|id| async move { (id, validate(state, id).await) })
        .buffered(BULK_VALIDATION_CONCURRENCY)
        .collect()
        .await;

    for (id, result) in outcomes {
        match result {
            Ok(outcome) => {
                match outcome.mapping.status {
                    MappingStatus::Validated => summary.validated += 1,
                    _ => summary.issues += 1,
                }
                summary.results.push(BulkValidationEntry {
                    mapping_id: id,
                    status: Some(outcome.mapping.status),
                    confidence_score: Some(outcome.mapping.confidence_score),
                    error: None,
                });
            },
            Err(e) => {
                summary.errors += 1;
                summary.results.push(BulkValidationEntry {
                    mapping_id: id,
                    status: None,
                    confidence_score: None,
                    error: Some(e.to_string()),
                });
            },
        }
    }

    summary
}

async fn sample_with_retry(
    state: &AppState,
    source: &cdp_common::types::SourceSystem,
    attribute: &str,
) -> Result<Vec<Option<String>>, ScanError> {
    let adapter = state.connectors.adapter_for(source.id).await;
    let limit = state.config.engine.sample_size;
    let retries = state.config.engine.scan_retry_limit;

    let mut attempt = 0;
    loop {
        match adapter.sample(source, attribute, limit).await {
            Ok(values) => return Ok(values),
            Err(ScanError::Transient(msg)) if attempt < retries => {
                attempt += 1;
                tracing::warn!(attempt, error = %msg, "Transient sampling failure, retrying");
                tokio::time::sleep(Duration::from_millis(
                    state.config.engine.scan_retry_backoff_ms * attempt as u64,
                ))
                .await;
            },
            Err(e) => return Err(e),
        }
    }
}

/// Classify each sample as valid, null, or error, collecting anomalies.
fn classify(
    samples: &[Option<String>],
    logic: Option<&str>,
    target_type: DataType,
) -> (Vec<SampleCheck>, Vec<ValidationAnomaly>) {
    let mut anomalies = Vec::new();

    // An unparseable pipeline poisons every sample.
    let parsed_logic = match logic {
        Some(l) => match transform::parse(l) {
            Ok(_) => Some(l),
            Err(e) => {
                anomalies.push(ValidationAnomaly {
                    severity: Severity::High,
                    message: format!("Transformation logic is invalid: {}", e),
                });
                None
            },
        },
        None => None,
    };
    let logic_broken = logic.is_some() && parsed_logic.is_none();

    let mut checks = Vec::with_capacity(samples.len());
    for value in samples {
        let check = if logic_broken {
            SampleCheck {
                input: value.clone(),
                output: None,
                outcome: SampleOutcome::Error,
            }
        } else {
            let transformed = match parsed_logic {
                Some(l) => transform::apply(l, value.as_deref()),
                None => Ok(value.clone()),
            };
            match transformed {
                Err(_) => SampleCheck {
                    input: value.clone(),
                    output: None,
                    outcome: SampleOutcome::Error,
                },
                Ok(None) => SampleCheck {
                    input: value.clone(),
                    output: None,
                    outcome: SampleOutcome::Null,
                },
                Ok(Some(output)) => {
                    let outcome = if format::value_matches(target_type, &output) {
                        SampleOutcome::Valid
                    } else {
                        SampleOutcome::Error
                    };
                    SampleCheck {
                        input: value.clone(),
                        output: Some(output),
                        outcome,
                    }
                },
            }
        };
        checks.push(check);
    }

    let total = checks.len();
    if total == 0 {
        anomalies.push(ValidationAnomaly {
            severity: Severity::Medium,
            message: "No sample data available to validate transformation".to_string(),
        });
        return (checks, anomalies);
    }

    let error_count = checks.iter().filter(|c| c.outcome == SampleOutcome::Error).count();
    let null_count = checks.iter().filter(|c| c.outcome == SampleOutcome::Null).count();

    let error_rate = error_count as f64 / total as f64;
    if error_rate >= ERROR_RATE_ANOMALY {
        anomalies.push(ValidationAnomaly {
            severity: Severity::High,
            message: format!(
                "Transformation errors on {} of {} samples",
                error_count, total
            ),
        });
    }

    let null_rate = null_count as f64 / total as f64;
    if null_rate >= NULL_RATE_ANOMALY {
        anomalies.push(ValidationAnomaly {
            severity: Severity::Medium,
            message: format!("Transformation produces {} nulls out of {} samples", null_count, total),
        });
    }

    (checks, anomalies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;
    use crate::store::NewMapping;

    async fn crm_mapping(
        state: &AppState,
        source_attr_suffix: &str,
        target_name: &str,
        logic: Option<&str>,
    ) -> Mapping {
        let source = state.sources.find_by_name("CRM").await.unwrap();
        let attrs = state.sources.attributes_of(source.id).await;
        let attribute = attrs
            .iter()
            .find(|a| a.name.ends_with(source_attr_suffix))
            .unwrap();
        let target = state.catalog.find_by_name(target_name).await.unwrap();

        state
            .mappings
            .create(NewMapping {
                source_system_id: source.id,
                source_attribute_id: attribute.id,
                target_attribute_id: target.id,
                transformation_logic: logic.map(str::to_string),
                status: MappingStatus::Pending,
                confidence_score: 0.0,
                created_by: "test".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_clean_sample_promotes_to_validated() {
        let state = test_support::state_with_crm().await;
        let mapping = crm_mapping(&state, "cust_id", "customer_id", None).await;

        let outcome = validate(&state, mapping.id).await.unwrap();
        assert_eq!(outcome.mapping.status, MappingStatus::Validated);
        assert!(outcome.mapping.confidence_score >= 0.8);
        assert_eq!(outcome.run.error_count, 0);
        assert_eq!(outcome.run.null_count, 0);
    }

    #[tokio::test]
    async fn test_revalidation_is_stable() {
        let state = test_support::state_with_crm().await;
        let mapping = crm_mapping(&state, "cust_id", "customer_id", None).await;

        let first = validate(&state, mapping.id).await.unwrap();
        let second = validate(&state, mapping.id).await.unwrap();

        assert_eq!(first.mapping.status, second.mapping.status);
        assert!(
            (first.mapping.confidence_score - second.mapping.confidence_score).abs() < 0.05,
            "repeat validation against unchanged samples stays within epsilon"
        );
        assert_eq!(state.mappings.history(mapping.id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_broken_transformation_demotes_to_issues() {
        let state = test_support::state_with_crm().await;
        let mapping = crm_mapping(&state, "cust_id", "customer_id", Some("frobnicate")).await;

        let outcome = validate(&state, mapping.id).await.unwrap();
        assert_eq!(outcome.mapping.status, MappingStatus::Issues);
        assert!(outcome
            .run
            .anomalies
            .iter()
            .any(|a| a.severity == Severity::High));
    }

    #[tokio::test]
    async fn test_type_incompatible_output_fails() {
        let state = test_support::state_with_crm().await;
        // Text identifiers cannot be coerced into an integer credit score.
        let mapping = crm_mapping(&state, "full_nm", "credit_score", Some("trim | to_integer")).await;

        let outcome = validate(&state, mapping.id).await.unwrap();
        assert_eq!(outcome.mapping.status, MappingStatus::Issues);
        assert!(outcome.run.error_count > 0);
    }

    #[tokio::test]
    async fn test_unknown_mapping() {
        let state = test_support::state_with_crm().await;
        let result = validate(&state, Uuid::new_v4()).await;
        assert!(matches!(result, Err(ValidateError::MappingNotFound(_))));
    }

    #[tokio::test]
    async fn test_validate_all_scoped_to_source() {
        let state = test_support::state_with_crm().await;
        let source = state.sources.find_by_name("CRM").await.unwrap();
        crm_mapping(&state, "cust_id", "customer_id", None).await;
        crm_mapping(&state, "full_nm", "full_name", None).await;

        let summary = validate_all(&state, Some(source.id)).await;
        assert_eq!(summary.total, 2);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.validated + summary.issues, 2);
    }
}
