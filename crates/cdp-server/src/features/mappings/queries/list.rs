//! List mappings query

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cdp_common::types::{Mapping, MappingStatus};

use crate::error::AppError;
use crate::state::AppState;
use crate::store::MappingFilter;

/// Query to list mappings with optional filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListMappingsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Response for the listing
#[derive(Debug, Clone, Serialize)]
pub struct ListMappingsResponse {
    pub mappings: Vec<Mapping>,
    pub count: usize,
}

/// Errors for the listing
#[derive(Debug, thiserror::Error)]
pub enum ListMappingsError {
    #[error("Unknown mapping status '{0}'")]
    InvalidStatus(String),
}

impl From<ListMappingsError> for AppError {
    fn from(e: ListMappingsError) -> Self {
        AppError::Validation(e.to_string())
    }
}

pub async fn handle(
    state: AppState,
    query: ListMappingsQuery,
) -> Result<ListMappingsResponse, ListMappingsError> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            s.parse::<MappingStatus>()
                .map_err(|_| ListMappingsError::InvalidStatus(s.to_string()))
        })
        .transpose()?;

    let mappings = state
        .mappings
        .list(&MappingFilter {
            source_system_id: query.source_id,
            target_attribute_id: query.target_id,
            status,
        })
        .await;

    Ok(ListMappingsResponse {
        count: mappings.len(),
        mappings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;

    #[tokio::test]
    async fn test_list_with_status_filter() {
        let state = test_support::state_with_crm().await;
        test_support::crm_mapping(&state, "cust_id", "customer_id").await;

        let all = handle(state.clone(), ListMappingsQuery::default()).await.unwrap();
        assert_eq!(all.count, 1);

        let pending = handle(
            state.clone(),
            ListMappingsQuery {
                status: Some("pending".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(pending.count, 1);

        let validated = handle(
            state,
            ListMappingsQuery {
                status: Some("validated".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(validated.count, 0);
    }

    #[tokio::test]
    async fn test_invalid_status_rejected() {
        let state = test_support::state_with_crm().await;
        let result = handle(
            state,
            ListMappingsQuery {
                status: Some("bogus".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(ListMappingsError::InvalidStatus(_))));
    }
}
