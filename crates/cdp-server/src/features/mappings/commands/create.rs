//! Create mapping command
//!
//! A mapping created from an accepted suggestion carries the suggestion's
//! confidence and starts as `proposed`; a hand-created mapping starts as
//! `pending` with confidence 0.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cdp_common::types::{Mapping, MappingStatus};

use crate::error::AppError;
use crate::mapping::transform;
use crate::state::AppState;
use crate::store::{MappingStoreError, NewMapping};

fn default_created_by() -> String {
    "api".to_string()
}

/// Command to create a new mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMappingCommand {
    pub source_attribute_id: Uuid,
    pub target_attribute_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformation_logic: Option<String>,
    /// Confidence from an accepted suggestion, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default = "default_created_by")]
    pub created_by: String,
}

/// Errors that can occur when creating a mapping
#[derive(Debug, thiserror::Error)]
pub enum CreateMappingError {
    #[error("Source attribute {0} not found")]
    SourceAttributeNotFound(Uuid),

    #[error("Target attribute {0} not found")]
    TargetNotFound(Uuid),

    #[error("Invalid transformation logic: {0}")]
    InvalidTransformation(#[from] transform::TransformError),

    #[error("Confidence score must be within [0, 1], got {0}")]
    InvalidConfidence(f64),

    #[error(transparent)]
    Store(#[from] MappingStoreError),
}

impl From<CreateMappingError> for AppError {
    fn from(e: CreateMappingError) -> Self {
        match e {
            CreateMappingError::SourceAttributeNotFound(_)
            | CreateMappingError::TargetNotFound(_) => AppError::NotFound(e.to_string()),
            CreateMappingError::InvalidTransformation(_)
            | CreateMappingError::InvalidConfidence(_) => AppError::Validation(e.to_string()),
            CreateMappingError::Store(MappingStoreError::NotFound(_)) => {
                AppError::NotFound(e.to_string())
            },
            CreateMappingError::Store(_) => AppError::Conflict(e.to_string()),
        }
    }
}

/// Handles mapping creation, enforcing the fan-in invariants through the
/// store.
#[tracing::instrument(skip(state, command), fields(
    source_attribute_id = %command.source_attribute_id,
    target_attribute_id = %command.target_attribute_id,
))]
pub async fn handle(
    state: AppState,
    command: CreateMappingCommand,
) -> Result<Mapping, CreateMappingError> {
    let attribute = state
        .sources
        .attribute(command.source_attribute_id)
        .await
        .ok_or(CreateMappingError::SourceAttributeNotFound(command.source_attribute_id))?;

    if state.catalog.get(command.target_attribute_id).await.is_none() {
        return Err(CreateMappingError::TargetNotFound(command.target_attribute_id));
    }

    if let Some(logic) = command.transformation_logic.as_deref() {
        transform::parse(logic)?;
    }

    if let Some(confidence) = command.confidence_score {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(CreateMappingError::InvalidConfidence(confidence));
        }
    }

    let status = if command.confidence_score.is_some() {
        MappingStatus::Proposed
    } else {
        MappingStatus::Pending
    };

    let mapping = state
        .mappings
        .create(NewMapping {
            source_system_id: attribute.source_system_id,
            source_attribute_id: command.source_attribute_id,
            target_attribute_id: command.target_attribute_id,
            transformation_logic: command.transformation_logic,
            status,
            confidence_score: command.confidence_score.unwrap_or(0.0),
            created_by: command.created_by,
        })
        .await?;

    tracing::info!(mapping_id = %mapping.id, status = %mapping.status, "Mapping created");

    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;

    async fn command_for(state: &AppState) -> CreateMappingCommand {
        let source = state.sources.find_by_name("CRM").await.unwrap();
        let attrs = state.sources.attributes_of(source.id).await;
        let attribute = attrs.iter().find(|a| a.name.ends_with("cust_id")).unwrap();
        let target = state.catalog.find_by_name("customer_id").await.unwrap();

        CreateMappingCommand {
            source_attribute_id: attribute.id,
            target_attribute_id: target.id,
            transformation_logic: None,
            confidence_score: None,
            created_by: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_hand_created_mapping_is_pending() {
        let state = test_support::state_with_crm().await;
        let command = command_for(&state).await;
        let mapping = handle(state, command).await.unwrap();
        assert_eq!(mapping.status, MappingStatus::Pending);
        assert_eq!(mapping.confidence_score, 0.0);
    }

    #[tokio::test]
    async fn test_suggested_mapping_is_proposed() {
        let state = test_support::state_with_crm().await;
        let mut command = command_for(&state).await;
        command.confidence_score = Some(0.63);
        let mapping = handle(state, command).await.unwrap();
        assert_eq!(mapping.status, MappingStatus::Proposed);
        assert!((mapping.confidence_score - 0.63).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_invalid_transformation_rejected() {
        let state = test_support::state_with_crm().await;
        let mut command = command_for(&state).await;
        command.transformation_logic = Some("frobnicate".to_string());
        let result = handle(state, command).await;
        assert!(matches!(result, Err(CreateMappingError::InvalidTransformation(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_rejected() {
        let state = test_support::state_with_crm().await;
        let mut command = command_for(&state).await;
        command.confidence_score = Some(1.2);
        let result = handle(state, command).await;
        assert!(matches!(result, Err(CreateMappingError::InvalidConfidence(_))));
    }

    #[tokio::test]
    async fn test_unknown_source_attribute() {
        let state = test_support::state_with_crm().await;
        let mut command = command_for(&state).await;
        command.source_attribute_id = Uuid::new_v4();
        let result = handle(state, command).await;
        assert!(matches!(
            result,
            Err(CreateMappingError::SourceAttributeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_pair_conflicts() {
        let state = test_support::state_with_crm().await;
        let command = command_for(&state).await;
        handle(state.clone(), command.clone()).await.unwrap();
        let result = handle(state, command).await;
        assert!(matches!(result, Err(CreateMappingError::Store(_))));
    }
}
