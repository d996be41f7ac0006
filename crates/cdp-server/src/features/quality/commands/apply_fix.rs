//! Apply fix command
//!
//! Thin wrapper over the fix engine; see `quality::fixes` for retry,
//! idempotence, and transaction semantics.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::quality::fixes::{self, FixError, FixResult};
use crate::state::AppState;

/// Command to apply a fix to a quality issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyFixCommand {
    pub issue_id: Uuid,
    /// Optional attribute name cross-check against the issue's target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub fix_type: String,
    #[serde(default)]
    pub parameters: Value,
}

/// Errors that can occur when applying a fix
#[derive(Debug, thiserror::Error)]
pub enum ApplyFixError {
    #[error("Issue {issue_id} does not target attribute '{attribute}'")]
    AttributeMismatch { issue_id: Uuid, attribute: String },

    #[error(transparent)]
    Fix(#[from] FixError),
}

impl From<ApplyFixError> for AppError {
    fn from(e: ApplyFixError) -> Self {
        match e {
            ApplyFixError::AttributeMismatch { .. } => AppError::Validation(e.to_string()),
            ApplyFixError::Fix(FixError::IssueNotFound(_))
            | ApplyFixError::Fix(FixError::AttributeNotFound(_)) => {
                AppError::NotFound(e.to_string())
            },
            ApplyFixError::Fix(FixError::UnknownFixType { .. })
            | ApplyFixError::Fix(FixError::InvalidParameters(_)) => {
                AppError::Validation(e.to_string())
            },
            ApplyFixError::Fix(FixError::StoreFailure(_)) => AppError::FixApplication(e.to_string()),
        }
    }
}

/// Handles fix application
#[tracing::instrument(skip(state, command), fields(issue_id = %command.issue_id, fix_type = %command.fix_type))]
pub async fn handle(state: AppState, command: ApplyFixCommand) -> Result<FixResult, ApplyFixError> {
    // Cross-check the optional attribute name before touching anything.
    if let Some(name) = &command.attribute {
        let issue = state
            .issues
            .get(command.issue_id)
            .await
            .ok_or(FixError::IssueNotFound(command.issue_id))?;
        let matches = state
            .catalog
            .get(issue.target_attribute_id)
            .await
            .map(|a| a.name == *name)
            .unwrap_or(false);
        if !matches {
            return Err(ApplyFixError::AttributeMismatch {
                issue_id: command.issue_id,
                attribute: name.clone(),
            });
        }
    }

    let result = fixes::apply(
        &state,
        command.issue_id,
        &command.fix_type,
        &command.parameters,
    )
    .await?;

    Ok(result)
}
