//! Submit ETL job command

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cdp_common::types::{JobStatus, JobType};

use crate::error::AppError;
use crate::jobs::SubmitError;
use crate::state::AppState;

fn default_created_by() -> String {
    "api".to_string()
}

/// Command to submit a new ETL job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobCommand {
    pub job_name: String,
    /// One of `full_load`, `incremental`, `refresh_metadata`
    pub job_type: String,
    pub source_id: Uuid,
    #[serde(default = "default_created_by")]
    pub created_by: String,
}

/// Response after enqueueing
#[derive(Debug, Clone, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// Errors that can occur when submitting
#[derive(Debug, thiserror::Error)]
pub enum SubmitJobError {
    #[error("Unknown job type '{0}'")]
    InvalidJobType(String),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl From<SubmitJobError> for AppError {
    fn from(e: SubmitJobError) -> Self {
        match e {
            SubmitJobError::InvalidJobType(_)
            | SubmitJobError::Submit(SubmitError::NameRequired)
            | SubmitJobError::Submit(SubmitError::SourceInactive(_)) => {
                AppError::Validation(e.to_string())
            },
            SubmitJobError::Submit(SubmitError::SourceNotFound(_)) => {
                AppError::NotFound(e.to_string())
            },
        }
    }
}

/// Handles job submission; returns immediately with the queued job.
#[tracing::instrument(skip(state, command), fields(job_name = %command.job_name, job_type = %command.job_type))]
pub async fn handle(
    state: AppState,
    command: SubmitJobCommand,
) -> Result<SubmitJobResponse, SubmitJobError> {
    let job_type: JobType = command
        .job_type
        .parse()
        .map_err(|_| SubmitJobError::InvalidJobType(command.job_type.clone()))?;

    let job = state
        .orchestrator
        .submit(&command.job_name, job_type, command.source_id, &command.created_by)
        .await?;

    Ok(SubmitJobResponse {
        job_id: job.id,
        status: job.status,
    })
}
