//! Get ETL job query

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cdp_common::types::Job;

use crate::error::AppError;
use crate::state::AppState;

/// Query to fetch one job with its steps and logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobQuery {
    pub job_id: Uuid,
}

/// Errors for the get query
#[derive(Debug, thiserror::Error)]
pub enum GetJobError {
    #[error("Job {0} not found")]
    NotFound(Uuid),
}

impl From<GetJobError> for AppError {
    fn from(e: GetJobError) -> Self {
        AppError::NotFound(e.to_string())
    }
}

pub async fn handle(state: AppState, query: GetJobQuery) -> Result<Job, GetJobError> {
    state
        .jobs
        .get(query.job_id)
        .await
        .ok_or(GetJobError::NotFound(query.job_id))
}
