//! CDP Server Library
//!
//! The mapping / lineage / data-quality / job-orchestration engine behind
//! the customer data product, exposed over a REST API.
//!
//! # Overview
//!
//! - **Source Registry**: registered source systems and their scanned attributes
//! - **Attribute Catalog**: canonical target attributes of the data product
//! - **Mapping Engine**: suggestion scoring and sample-based validation of
//!   source-to-target mappings
//! - **Lineage Assembler**: staged source -> transform -> target graphs
//! - **Data Quality Engine**: metrics, issue detection, and fix application
//!   over materialized data
//! - **Job Orchestrator**: ETL job lifecycle with a bounded worker pool
//!
//! # Architecture
//!
//! The HTTP surface follows a CQRS layout: each feature is a vertical slice
//! with `commands/` (writes), `queries/` (reads), and `routes.rs`. The
//! engine modules (`mapping`, `lineage`, `quality`, `jobs`) hold the core
//! semantics; `store` holds the only process-wide mutable state, behind
//! per-key serialization. External collaborators (source connectors, the
//! materialized-data store, the optional remote confidence scorer, and the
//! per-job-type executors) sit behind async traits in `connectors`,
//! `quality::materialized`, and `jobs::adapter`.
//!
//! # Example
//!
//! ```no_run
//! use cdp_server::{api, config::Config, state::AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let state = AppState::new(config.clone());
//!     state.orchestrator.clone().start();
//!     api::serve(config, state).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod connectors;
pub mod error;
pub mod features;
pub mod jobs;
pub mod lineage;
pub mod mapping;
pub mod quality;
pub mod state;
pub mod store;

// Re-export commonly used types
pub use error::{AppError, ApiResult};
