//! CDP Server - Main entry point

use anyhow::Result;
use cdp_common::logging::{init_logging, LogConfig};
use tracing::info;

use cdp_server::{api, config::Config, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Base logging config, overridable via LOG_* environment variables.
    let log_config = LogConfig::from_env_or(LogConfig {
        log_file_prefix: "cdp-server".to_string(),
        filter_directives: Some("cdp_server=debug,tower_http=debug".to_string()),
        ..LogConfig::default()
    })?;
    init_logging(&log_config)?;

    info!("Starting CDP Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let state = AppState::new(config.clone());

    // The catalog ships with the standard customer data product
    // attributes; registrations and scans start from a clean registry.
    let seeded = state.catalog.seed_defaults().await;
    info!(seeded, "Attribute catalog ready");

    // Start the job dispatcher worker pool.
    let _dispatcher = state.orchestrator.clone().start();
    info!("Job orchestrator started");

    api::serve(config, state).await?;

    Ok(())
}
