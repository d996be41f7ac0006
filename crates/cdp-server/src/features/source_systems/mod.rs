//! Source system feature: registration, scanning, sampling

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::source_systems_routes;
