//! Cancel ETL job command

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::jobs::{CancelAck, CancelError};
use crate::state::AppState;

/// Command to cancel a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelJobCommand {
    pub job_id: Uuid,
}

impl From<CancelError> for AppError {
    fn from(e: CancelError) -> Self {
        match e {
            CancelError::NotFound(_) => AppError::NotFound(e.to_string()),
            CancelError::AlreadyTerminal { .. } => AppError::AlreadyTerminal(e.to_string()),
        }
    }
}

/// Handles cancellation. The ack for a running job means the cooperative
/// flag is set, not that the job already stopped.
#[tracing::instrument(skip(state))]
pub async fn handle(state: AppState, command: CancelJobCommand) -> Result<CancelAck, CancelError> {
    state.orchestrator.cancel(command.job_id).await
}
