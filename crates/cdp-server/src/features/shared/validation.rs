//! Shared validation utilities
//!
//! Common input validation for commands across features.

use thiserror::Error;

/// Errors that can occur during name validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameValidationError {
    #[error("Name is required and cannot be empty")]
    Required,

    #[error("Name must be between 1 and {max_length} characters")]
    TooLong { max_length: usize },
}

/// Errors that can occur during identifier validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierValidationError {
    #[error("Identifier is required and cannot be empty")]
    Required,

    #[error("Identifier must be between 1 and {max_length} characters")]
    TooLong { max_length: usize },

    #[error("Identifier can only contain lowercase letters, digits, and underscores")]
    InvalidFormat,
}

/// Validate a display name: non-empty, bounded length.
pub fn validate_name(name: &str, max_length: usize) -> Result<(), NameValidationError> {
    if name.trim().is_empty() {
        return Err(NameValidationError::Required);
    }
    if name.len() > max_length {
        return Err(NameValidationError::TooLong { max_length });
    }
    Ok(())
}

/// Validate a machine identifier (target attribute names): snake_case.
pub fn validate_identifier(
    identifier: &str,
    max_length: usize,
) -> Result<(), IdentifierValidationError> {
    if identifier.is_empty() {
        return Err(IdentifierValidationError::Required);
    }
    if identifier.len() > max_length {
        return Err(IdentifierValidationError::TooLong { max_length });
    }
    if !identifier
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(IdentifierValidationError::InvalidFormat);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("CRM System", 255).is_ok());
        assert_eq!(validate_name("  ", 255), Err(NameValidationError::Required));
        assert_eq!(
            validate_name(&"x".repeat(300), 255),
            Err(NameValidationError::TooLong { max_length: 255 })
        );
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("customer_id", 100).is_ok());
        assert_eq!(
            validate_identifier("Customer-ID", 100),
            Err(IdentifierValidationError::InvalidFormat)
        );
        assert_eq!(
            validate_identifier("", 100),
            Err(IdentifierValidationError::Required)
        );
    }
}
