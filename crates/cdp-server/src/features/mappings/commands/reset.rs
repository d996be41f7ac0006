//! Reset mapping command
//!
//! Explicit reset to `pending`, the only transition out of `validated`
//! besides a failed re-validation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cdp_common::types::Mapping;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::MappingStoreError;

/// Command to reset a mapping to pending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetMappingCommand {
    pub mapping_id: Uuid,
}

/// Errors that can occur when resetting
#[derive(Debug, thiserror::Error)]
pub enum ResetMappingError {
    #[error("Mapping {0} not found")]
    NotFound(Uuid),
}

impl From<ResetMappingError> for AppError {
    fn from(e: ResetMappingError) -> Self {
        AppError::NotFound(e.to_string())
    }
}

pub async fn handle(
    state: AppState,
    command: ResetMappingCommand,
) -> Result<Mapping, ResetMappingError> {
    // Serialize with the validator so a reset cannot interleave with a
    // concurrent validation write on the same mapping.
    let lock = state.mappings.validation_lock(command.mapping_id).await;
    let _guard = lock.lock().await;

    match state.mappings.reset(command.mapping_id).await {
        Ok(mapping) => {
            tracing::info!(mapping_id = %mapping.id, "Mapping reset to pending");
            Ok(mapping)
        },
        Err(MappingStoreError::NotFound(id)) => Err(ResetMappingError::NotFound(id)),
        Err(_) => Err(ResetMappingError::NotFound(command.mapping_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::validate;
    use crate::state::test_support;
    use cdp_common::types::MappingStatus;

    #[tokio::test]
    async fn test_reset_validated_mapping() {
        let state = test_support::state_with_crm().await;
        let mapping = test_support::crm_mapping(&state, "cust_id", "customer_id").await;
        validate::validate(&state, mapping.id).await.unwrap();

        let reset = handle(
            state,
            ResetMappingCommand {
                mapping_id: mapping.id,
            },
        )
        .await
        .unwrap();
        assert_eq!(reset.status, MappingStatus::Pending);
    }

    #[tokio::test]
    async fn test_reset_unknown_mapping() {
        let state = test_support::state_with_crm().await;
        let result = handle(
            state,
            ResetMappingCommand {
                mapping_id: Uuid::new_v4(),
            },
        )
        .await;
        assert!(matches!(result, Err(ResetMappingError::NotFound(_))));
    }
}
