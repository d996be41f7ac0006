//! Mapping routes

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

use super::commands::validate::ValidateAllQuery;
use super::commands::{CreateMappingCommand, ResetMappingCommand, ValidateMappingCommand};
use super::queries::{GetHistoryQuery, ListMappingsQuery, SuggestMappingsQuery};

/// Create mapping routes
pub fn mappings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_mappings).post(create_mapping))
        .route("/validate-all", post(validate_all))
        .route("/:id/validate", get(validate_mapping))
        .route("/:id/reset", post(reset_mapping))
        .route("/:id/history", get(get_history))
}

/// Create suggestion routes (mounted under /suggest-mappings)
pub fn suggest_routes() -> Router<AppState> {
    Router::new().route("/:source_system_id", get(suggest_mappings))
}

async fn list_mappings(
    State(state): State<AppState>,
    Query(query): Query<ListMappingsQuery>,
) -> Result<Response, AppError> {
    let response = super::queries::list::handle(state, query).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state, command))]
async fn create_mapping(
    State(state): State<AppState>,
    Json(command): Json<CreateMappingCommand>,
) -> Result<Response, AppError> {
    let response = super::commands::create::handle(state, command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

#[tracing::instrument(skip(state))]
async fn validate_mapping(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let response =
        super::commands::validate::handle(state, ValidateMappingCommand { mapping_id: id }).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state))]
async fn validate_all(
    State(state): State<AppState>,
    Query(query): Query<ValidateAllQuery>,
) -> Result<Response, AppError> {
    let response = super::commands::validate::handle_all(state, query).await;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state))]
async fn reset_mapping(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let response =
        super::commands::reset::handle(state, ResetMappingCommand { mapping_id: id }).await?;
    Ok(ApiResponse::success(response).into_response())
}

async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let response =
        super::queries::history::handle(state, GetHistoryQuery { mapping_id: id }).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state, query))]
async fn suggest_mappings(
    State(state): State<AppState>,
    Path(source_system_id): Path<Uuid>,
    Query(mut query): Query<SuggestMappingsQuery>,
) -> Result<Response, AppError> {
    query.source_system_id = source_system_id;
    let response = super::queries::suggest::handle(state, query).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_structure() {
        let router = mappings_routes();
        assert!(format!("{:?}", router).contains("Router"));
        let router = suggest_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }
}
