//! Target attribute catalog feature

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::attributes_routes;
