//! Register source system command

use serde::{Deserialize, Serialize};

use cdp_common::types::SourceSystem;

use crate::error::AppError;
use crate::features::shared::validation::{validate_name, NameValidationError};
use crate::state::AppState;
use crate::store::RegistryError;

/// Command to register a new source system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterSourceCommand {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: String,
}

/// Errors that can occur when registering a source system
#[derive(Debug, thiserror::Error)]
pub enum RegisterSourceError {
    #[error("Name validation failed: {0}")]
    NameValidation(#[from] NameValidationError),

    #[error("Source system '{0}' already exists")]
    Duplicate(String),

    #[error("Registry error: {0}")]
    Registry(RegistryError),
}

impl From<RegisterSourceError> for AppError {
    fn from(e: RegisterSourceError) -> Self {
        match e {
            RegisterSourceError::NameValidation(_) => AppError::Validation(e.to_string()),
            RegisterSourceError::Duplicate(_) => AppError::Conflict(e.to_string()),
            RegisterSourceError::Registry(_) => AppError::Internal(e.to_string()),
        }
    }
}

/// Handles source system registration
#[tracing::instrument(skip(state), fields(name = %command.name))]
pub async fn handle(
    state: AppState,
    command: RegisterSourceCommand,
) -> Result<SourceSystem, RegisterSourceError> {
    validate_name(&command.name, 255)?;

    match state
        .sources
        .register(&command.name, &command.description, &command.owner)
        .await
    {
        Ok(system) => Ok(system),
        Err(RegistryError::DuplicateName(name)) => Err(RegisterSourceError::Duplicate(name)),
        Err(e) => Err(RegisterSourceError::Registry(e)),
    }
}
