//! Target attribute routes

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::state::AppState;

use super::commands::DefineAttributeCommand;
use super::queries::ListAttributesQuery;

/// Create attribute catalog routes
pub fn attributes_routes() -> Router<AppState> {
    Router::new().route("/", get(list_attributes).post(define_attribute))
}

#[tracing::instrument(skip(state, command), fields(name = %command.name))]
async fn define_attribute(
    State(state): State<AppState>,
    Json(command): Json<DefineAttributeCommand>,
) -> Result<Response, AppError> {
    let response = super::commands::define::handle(state, command).await?;

    tracing::info!(attribute_id = %response.id, "Target attribute defined via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

async fn list_attributes(
    State(state): State<AppState>,
    Query(query): Query<ListAttributesQuery>,
) -> Result<Response, AppError> {
    let response = super::queries::list::handle(state, query).await;
    Ok(ApiResponse::success(response).into_response())
}
