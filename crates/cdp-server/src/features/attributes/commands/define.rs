//! Define target attribute command

use serde::{Deserialize, Serialize};

use cdp_common::types::{DataType, TargetAttribute};

use crate::error::AppError;
use crate::features::shared::validation::{validate_identifier, IdentifierValidationError};
use crate::state::AppState;
use crate::store::{CatalogError, NewTargetAttribute};

fn default_category() -> String {
    "other".to_string()
}

/// Command to define a new target attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefineAttributeCommand {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    pub data_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub is_pii: bool,
}

/// Errors that can occur when defining an attribute
#[derive(Debug, thiserror::Error)]
pub enum DefineAttributeError {
    #[error("Attribute name validation failed: {0}")]
    NameValidation(#[from] IdentifierValidationError),

    #[error("Unknown data type '{0}'")]
    InvalidDataType(String),

    #[error("Target attribute '{0}' is already defined")]
    Duplicate(String),
}

impl From<DefineAttributeError> for AppError {
    fn from(e: DefineAttributeError) -> Self {
        match e {
            DefineAttributeError::NameValidation(_) | DefineAttributeError::InvalidDataType(_) => {
                AppError::Validation(e.to_string())
            },
            DefineAttributeError::Duplicate(_) => AppError::Conflict(e.to_string()),
        }
    }
}

/// Handles attribute definition
#[tracing::instrument(skip(state), fields(name = %command.name))]
pub async fn handle(
    state: AppState,
    command: DefineAttributeCommand,
) -> Result<TargetAttribute, DefineAttributeError> {
    validate_identifier(&command.name, 100)?;

    let data_type: DataType = command
        .data_type
        .parse()
        .map_err(|_| DefineAttributeError::InvalidDataType(command.data_type.clone()))?;

    let display_name = command
        .display_name
        .unwrap_or_else(|| command.name.replace('_', " "));

    let attribute = state
        .catalog
        .define(NewTargetAttribute {
            name: command.name,
            display_name,
            category: command.category,
            data_type,
            required: command.required,
            pii: command.is_pii,
        })
        .await
        .map_err(|e| match e {
            CatalogError::DuplicateName(name) => DefineAttributeError::Duplicate(name),
            CatalogError::NotFound(id) => DefineAttributeError::Duplicate(id.to_string()),
        })?;

    Ok(attribute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;

    fn command(name: &str, data_type: &str) -> DefineAttributeCommand {
        DefineAttributeCommand {
            name: name.to_string(),
            display_name: None,
            category: "contact".to_string(),
            data_type: data_type.to_string(),
            required: false,
            is_pii: true,
        }
    }

    #[tokio::test]
    async fn test_define_success() {
        let state = test_support::empty_state().await;
        let attribute = handle(state, command("mobile_phone", "TEXT")).await.unwrap();
        assert_eq!(attribute.display_name, "mobile phone");
        assert_eq!(attribute.data_type, DataType::Text);
        assert!(attribute.pii);
    }

    #[tokio::test]
    async fn test_invalid_identifier() {
        let state = test_support::empty_state().await;
        let result = handle(state, command("Mobile Phone", "TEXT")).await;
        assert!(matches!(result, Err(DefineAttributeError::NameValidation(_))));
    }

    #[tokio::test]
    async fn test_invalid_data_type() {
        let state = test_support::empty_state().await;
        let result = handle(state, command("mobile_phone", "BLOB")).await;
        assert!(matches!(result, Err(DefineAttributeError::InvalidDataType(_))));
    }

    #[tokio::test]
    async fn test_duplicate_name() {
        let state = test_support::empty_state().await;
        handle(state.clone(), command("mobile_phone", "TEXT")).await.unwrap();
        let result = handle(state, command("mobile_phone", "TEXT")).await;
        assert!(matches!(result, Err(DefineAttributeError::Duplicate(_))));
    }
}
