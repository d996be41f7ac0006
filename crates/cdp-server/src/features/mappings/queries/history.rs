//! Mapping validation history query

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cdp_common::types::ValidationRun;

use crate::error::AppError;
use crate::state::AppState;

/// Query for a mapping's validation run history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetHistoryQuery {
    pub mapping_id: Uuid,
}

/// Response with the runs, oldest first
#[derive(Debug, Clone, Serialize)]
pub struct GetHistoryResponse {
    pub mapping_id: Uuid,
    pub runs: Vec<ValidationRun>,
}

/// Errors for the history query
#[derive(Debug, thiserror::Error)]
pub enum GetHistoryError {
    #[error("Mapping {0} not found")]
    NotFound(Uuid),
}

impl From<GetHistoryError> for AppError {
    fn from(e: GetHistoryError) -> Self {
        AppError::NotFound(e.to_string())
    }
}

pub async fn handle(
    state: AppState,
    query: GetHistoryQuery,
) -> Result<GetHistoryResponse, GetHistoryError> {
    if state.mappings.get(query.mapping_id).await.is_none() {
        return Err(GetHistoryError::NotFound(query.mapping_id));
    }

    let runs = state.mappings.history(query.mapping_id).await;

    Ok(GetHistoryResponse {
        mapping_id: query.mapping_id,
        runs,
    })
}
