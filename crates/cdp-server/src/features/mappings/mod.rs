//! Mapping feature: creation, listing, suggestions, validation

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::{mappings_routes, suggest_routes};
