//! HTTP API assembly
//!
//! Builds the axum router over the shared `AppState`, with the root,
//! health, and system-summary endpoints plus the middleware stack, and
//! runs the server with graceful shutdown.

pub mod response;

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{Config, CorsConfig};
use crate::features;
use crate::state::AppState;

/// Bind and serve the API until a shutdown signal arrives.
pub async fn serve(config: Config, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    tracing::info!("Server shut down gracefully");

    Ok(())
}

/// Create the application router with all routes and middleware.
pub fn create_router(state: AppState, config: &Config) -> Router {
    let api_v1 = features::router(state.clone());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/stats", get(get_stats))
        .with_state(state)
        .nest("/api/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors))
}

/// Create CORS layer from configuration
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-user-id"),
        ])
        .max_age(Duration::from_secs(3600));

    if config.allowed_origins.is_empty() || config.allowed_origins.contains(&"*".to_string()) {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
        if config.allow_credentials {
            cors = cors.allow_credentials(true);
        }
    }

    cors
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "CDP Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// System summary: counts across sources, attributes, mappings, quality,
/// and jobs.
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let source_systems = state.sources.system_count().await;
    let target_attributes = state.catalog.count().await;
    let attribute_categories = state.catalog.category_counts().await;
    let data_mappings = state.mappings.count().await;
    let mapping_status = state.mappings.status_counts().await;
    let open_quality_issues = state.issues.open_count().await;
    let jobs = state.jobs.statistics().await;

    Json(json!({
        "source_systems": source_systems,
        "target_attributes": target_attributes,
        "attribute_categories": attribute_categories,
        "data_mappings": data_mappings,
        "mapping_status": mapping_status,
        "open_quality_issues": open_quality_issues,
        "jobs": jobs,
    }))
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }

    tracing::info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
