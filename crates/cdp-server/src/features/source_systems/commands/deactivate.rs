//! Deactivate source system command
//!
//! Source systems are never hard-deleted; deactivation keeps the record
//! and its mappings but excludes it from job submission.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cdp_common::types::SourceSystem;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::RegistryError;

/// Command to deactivate a source system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeactivateSourceCommand {
    pub source_system_id: Uuid,
}

/// Errors that can occur when deactivating
#[derive(Debug, thiserror::Error)]
pub enum DeactivateSourceError {
    #[error("Source system {0} not found")]
    NotFound(Uuid),
}

impl From<DeactivateSourceError> for AppError {
    fn from(e: DeactivateSourceError) -> Self {
        AppError::NotFound(e.to_string())
    }
}

#[tracing::instrument(skip(state))]
pub async fn handle(
    state: AppState,
    command: DeactivateSourceCommand,
) -> Result<SourceSystem, DeactivateSourceError> {
    match state.sources.deactivate(command.source_system_id).await {
        Ok(system) => {
            tracing::info!(source_system_id = %system.id, "Source system deactivated");
            Ok(system)
        },
        Err(RegistryError::NotFound(id)) => Err(DeactivateSourceError::NotFound(id)),
        Err(_) => Err(DeactivateSourceError::NotFound(command.source_system_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;

    #[tokio::test]
    async fn test_deactivate_keeps_record() {
        let state = test_support::state_with_crm().await;
        let source = state.sources.find_by_name("CRM").await.unwrap();

        let deactivated = handle(
            state.clone(),
            DeactivateSourceCommand {
                source_system_id: source.id,
            },
        )
        .await
        .unwrap();
        assert!(!deactivated.active);
        assert!(state.sources.get(source.id).await.is_some());
    }

    #[tokio::test]
    async fn test_deactivate_unknown() {
        let state = test_support::empty_state().await;
        let result = handle(
            state,
            DeactivateSourceCommand {
                source_system_id: Uuid::new_v4(),
            },
        )
        .await;
        assert!(matches!(result, Err(DeactivateSourceError::NotFound(_))));
    }
}
