//! Source system routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::state::AppState;

use super::commands::{DeactivateSourceCommand, RegisterSourceCommand, ScanSourceCommand};
use super::queries::{GetSourceSystemQuery, ListSourceSystemsQuery, SampleSourceQuery};

/// Create source system routes
pub fn source_systems_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(register_source).get(list_sources))
        .route("/:id", get(get_source).delete(deactivate_source))
        .route("/:id/scan", get(scan_source))
        .route("/:id/sample", get(sample_source))
}

#[tracing::instrument(skip(state, command), fields(name = %command.name))]
async fn register_source(
    State(state): State<AppState>,
    Json(command): Json<RegisterSourceCommand>,
) -> Result<Response, AppError> {
    let response = super::commands::register::handle(state, command).await?;

    tracing::info!(source_system_id = %response.id, "Source system registered via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

async fn list_sources(
    State(state): State<AppState>,
    Query(query): Query<ListSourceSystemsQuery>,
) -> Result<Response, AppError> {
    let response = super::queries::list::handle(state, query).await;
    Ok(ApiResponse::success(response).into_response())
}

async fn get_source(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let response = super::queries::get::handle(
        state,
        GetSourceSystemQuery {
            source_system_id: id,
        },
    )
    .await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state))]
async fn scan_source(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let response = super::commands::scan::handle(
        state,
        ScanSourceCommand {
            source_system_id: id,
        },
    )
    .await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state))]
async fn deactivate_source(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let response = super::commands::deactivate::handle(
        state,
        DeactivateSourceCommand {
            source_system_id: id,
        },
    )
    .await?;
    Ok(ApiResponse::success(response).into_response())
}

async fn sample_source(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(mut query): Query<SampleSourceQuery>,
) -> Result<Response, AppError> {
    query.source_system_id = id;
    let response = super::queries::sample::handle(state, query).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_structure() {
        let router = source_systems_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }
}
