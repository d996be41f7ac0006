//! Get source system query

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cdp_common::types::{SourceAttribute, SourceSystem};

use crate::error::AppError;
use crate::state::AppState;

/// Query to fetch one source system with its attributes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSourceSystemQuery {
    pub source_system_id: Uuid,
}

/// Response with the system and its scanned attributes
#[derive(Debug, Clone, Serialize)]
pub struct GetSourceSystemResponse {
    #[serde(flatten)]
    pub system: SourceSystem,
    pub attributes: Vec<SourceAttribute>,
}

/// Errors for the get query
#[derive(Debug, thiserror::Error)]
pub enum GetSourceSystemError {
    #[error("Source system {0} not found")]
    NotFound(Uuid),
}

impl From<GetSourceSystemError> for AppError {
    fn from(e: GetSourceSystemError) -> Self {
        AppError::NotFound(e.to_string())
    }
}

pub async fn handle(
    state: AppState,
    query: GetSourceSystemQuery,
) -> Result<GetSourceSystemResponse, GetSourceSystemError> {
    let system = state
        .sources
        .get(query.source_system_id)
        .await
        .ok_or(GetSourceSystemError::NotFound(query.source_system_id))?;
    let attributes = state.sources.attributes_of(system.id).await;

    Ok(GetSourceSystemResponse { system, attributes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;

    #[tokio::test]
    async fn test_get_with_attributes() {
        let state = test_support::state_with_crm().await;
        let source = state.sources.find_by_name("CRM").await.unwrap();

        let response = handle(
            state,
            GetSourceSystemQuery {
                source_system_id: source.id,
            },
        )
        .await
        .unwrap();
        assert_eq!(response.attributes.len(), 2);
    }

    #[tokio::test]
    async fn test_get_unknown() {
        let state = test_support::empty_state().await;
        let result = handle(
            state,
            GetSourceSystemQuery {
                source_system_id: Uuid::new_v4(),
            },
        )
        .await;
        assert!(matches!(result, Err(GetSourceSystemError::NotFound(_))));
    }
}
