//! Lineage routes

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::state::AppState;

use super::queries::GetLineageQuery;

/// Create lineage routes (mounted under /data-lineage)
pub fn lineage_routes() -> Router<AppState> {
    Router::new().route("/", get(get_lineage))
}

#[tracing::instrument(skip(state))]
async fn get_lineage(
    State(state): State<AppState>,
    Query(query): Query<GetLineageQuery>,
) -> Result<Response, AppError> {
    let response = super::queries::get_lineage::handle(state, query).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_structure() {
        let router = lineage_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }
}
