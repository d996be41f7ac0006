//! ETL job routes

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

use super::commands::{CancelJobCommand, SubmitJobCommand};
use super::queries::{GetJobQuery, ListJobsQuery};

/// Create ETL routes (mounted under /etl)
pub fn etl_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(submit_job).get(list_jobs))
        .route("/jobs/:id", get(get_job))
        .route("/jobs/:id/cancel", post(cancel_job))
        .route("/statistics", get(get_statistics))
}

#[tracing::instrument(skip(state, command), fields(job_name = %command.job_name))]
async fn submit_job(
    State(state): State<AppState>,
    Json(command): Json<SubmitJobCommand>,
) -> Result<Response, AppError> {
    let response = super::commands::submit::handle(state, command).await?;

    tracing::info!(job_id = %response.job_id, "Job submitted via API");

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(response))).into_response())
}

async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Response, AppError> {
    let response = super::queries::list::handle(state, query).await;
    Ok(ApiResponse::success(response).into_response())
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let response = super::queries::get::handle(state, GetJobQuery { job_id: id }).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state))]
async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let response = super::commands::cancel::handle(state, CancelJobCommand { job_id: id }).await?;
    Ok(ApiResponse::success(response).into_response())
}

async fn get_statistics(State(state): State<AppState>) -> Result<Response, AppError> {
    let response = super::queries::statistics::handle(state).await;
    Ok(ApiResponse::success(response).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_structure() {
        let router = etl_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }
}
