//! ETL job feature: submission, listing, cancellation, statistics

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::etl_routes;
