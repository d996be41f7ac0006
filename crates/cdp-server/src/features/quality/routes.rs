//! Data quality routes

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::state::AppState;

use super::commands::ApplyFixCommand;
use super::queries::{FieldIssuesQuery, MetricsQuery};

/// Create quality read routes (mounted under /data-quality)
pub fn quality_routes() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(get_metrics))
        .route("/fields", get(get_field_issues))
}

/// Create the fix route (mounted under /fix-data-quality)
pub fn fix_routes() -> Router<AppState> {
    Router::new().route("/", post(apply_fix))
}

#[tracing::instrument(skip(state))]
async fn get_metrics(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Result<Response, AppError> {
    let response = super::queries::metrics::handle(state, query).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state))]
async fn get_field_issues(
    State(state): State<AppState>,
    Query(query): Query<FieldIssuesQuery>,
) -> Result<Response, AppError> {
    let response = super::queries::field_issues::handle(state, query).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state, command))]
async fn apply_fix(
    State(state): State<AppState>,
    Json(command): Json<ApplyFixCommand>,
) -> Result<Response, AppError> {
    let response = super::commands::apply_fix::handle(state, command).await?;
    Ok(ApiResponse::success(response).into_response())
}
