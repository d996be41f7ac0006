//! Lineage feature: staged lineage graphs

pub mod queries;
pub mod routes;

pub use routes::lineage_routes;
