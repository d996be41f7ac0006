//! Feature modules implementing the CDP API
//!
//! Each feature is a vertical slice following the CQRS pattern: write
//! operations under `commands/`, read operations under `queries/`, HTTP
//! wiring in `routes.rs`. Handlers take the shared `AppState` and return
//! typed results; routes translate feature errors into the common
//! `AppError` taxonomy.
//!
//! # Features
//!
//! - **source_systems**: registration, scanning, and sampling of sources
//! - **attributes**: the target attribute catalog
//! - **mappings**: mapping CRUD, suggestions, validation, history
//! - **lineage**: staged lineage graphs per target attribute
//! - **quality**: metrics, issue detection, and fix application
//! - **etl_jobs**: job submission, listing, cancellation, statistics

pub mod attributes;
pub mod etl_jobs;
pub mod lineage;
pub mod mappings;
pub mod quality;
pub mod shared;
pub mod source_systems;

use axum::Router;

use crate::state::AppState;

/// Creates the main API router with all feature routes mounted.
pub fn router(state: AppState) -> Router<()> {
    Router::new()
        .nest(
            "/source-systems",
            source_systems::source_systems_routes().with_state(state.clone()),
        )
        .nest(
            "/attributes",
            attributes::attributes_routes().with_state(state.clone()),
        )
        .nest(
            "/mappings",
            mappings::mappings_routes().with_state(state.clone()),
        )
        .nest(
            "/suggest-mappings",
            mappings::suggest_routes().with_state(state.clone()),
        )
        .nest(
            "/data-lineage",
            lineage::lineage_routes().with_state(state.clone()),
        )
        .nest(
            "/data-quality",
            quality::quality_routes().with_state(state.clone()),
        )
        .nest(
            "/fix-data-quality",
            quality::fix_routes().with_state(state.clone()),
        )
        .nest("/etl", etl_jobs::etl_routes().with_state(state))
}
