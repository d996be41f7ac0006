//! Data quality feature: metrics, field issues, fix application

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::{fix_routes, quality_routes};
