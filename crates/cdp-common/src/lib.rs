//! CDP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the CDP project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all CDP workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Tracing-based logging bootstrap shared by every binary
//! - **Types**: The domain model (source systems, mappings, jobs, quality)
//!
//! # Example
//!
//! ```no_run
//! use cdp_common::types::{DataType, MappingStatus};
//!
//! let dt: DataType = "VARCHAR".parse().unwrap();
//! assert_eq!(dt, DataType::Text);
//! assert!(!MappingStatus::Validated.to_string().is_empty());
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CdpError, Result};
