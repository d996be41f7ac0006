//! Scan source system command
//!
//! Runs the source's connector to enumerate attributes. The discovered
//! set replaces the previous one wholesale. Transient connector failures
//! are retried with backoff; exhausting retries marks the source degraded
//! and surfaces a scan failure.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connectors::ScanError;
use crate::error::AppError;
use crate::state::AppState;

/// Command to scan a source system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSourceCommand {
    pub source_system_id: Uuid,
}

/// Response from a successful scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSourceResponse {
    pub source_system_id: Uuid,
    pub attribute_count: usize,
    pub scanned_at: DateTime<Utc>,
}

/// Errors that can occur when scanning
#[derive(Debug, thiserror::Error)]
pub enum ScanSourceError {
    #[error("Source system {0} not found")]
    SourceNotFound(Uuid),

    #[error("Source system {0} is deactivated")]
    SourceInactive(Uuid),

    #[error("Scan of source system '{name}' failed: {message}")]
    ScanFailed { name: String, message: String },
}

impl From<ScanSourceError> for AppError {
    fn from(e: ScanSourceError) -> Self {
        match e {
            ScanSourceError::SourceNotFound(_) => AppError::NotFound(e.to_string()),
            ScanSourceError::SourceInactive(_) => AppError::Validation(e.to_string()),
            ScanSourceError::ScanFailed { .. } => AppError::ScanFailure(e.to_string()),
        }
    }
}

/// Handles the scan command
#[tracing::instrument(skip(state))]
pub async fn handle(
    state: AppState,
    command: ScanSourceCommand,
) -> Result<ScanSourceResponse, ScanSourceError> {
    let source = state
        .sources
        .get(command.source_system_id)
        .await
        .ok_or(ScanSourceError::SourceNotFound(command.source_system_id))?;

    if !source.active {
        return Err(ScanSourceError::SourceInactive(source.id));
    }

    let adapter = state.connectors.adapter_for(source.id).await;
    let retries = state.config.engine.scan_retry_limit;

    let mut attempt = 0;
    let discovered = loop {
        match adapter.scan(&source).await {
            Ok(discovered) => break discovered,
            Err(ScanError::Transient(msg)) if attempt < retries => {
                attempt += 1;
                tracing::warn!(
                    source_system_id = %source.id,
                    attempt,
                    error = %msg,
                    "Transient scan failure, retrying"
                );
                tokio::time::sleep(Duration::from_millis(
                    state.config.engine.scan_retry_backoff_ms * attempt as u64,
                ))
                .await;
            },
            Err(e) => {
                // Mark degraded but keep the source and its last-known
                // attributes.
                let _ = state.sources.record_scan_failure(source.id).await;
                tracing::error!(source_system_id = %source.id, error = %e, "Scan failed");
                return Err(ScanSourceError::ScanFailed {
                    name: source.name.clone(),
                    message: e.to_string(),
                });
            },
        }
    };

    let attribute_count = state
        .sources
        .record_scan_success(source.id, discovered)
        .await
        .map_err(|_| ScanSourceError::SourceNotFound(source.id))?;

    tracing::info!(
        source_system_id = %source.id,
        attribute_count,
        "Source system scanned"
    );

    Ok(ScanSourceResponse {
        source_system_id: source.id,
        attribute_count,
        scanned_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::{DiscoveredAttribute, ScanAdapter};
    use crate::state::test_support;
    use async_trait::async_trait;
    use cdp_common::types::SourceSystem;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Connector failing transiently `failures` times, then succeeding.
    struct FlakyAdapter {
        failures: AtomicU32,
    }

    #[async_trait]
    impl ScanAdapter for FlakyAdapter {
        async fn scan(
            &self,
            _source: &SourceSystem,
        ) -> Result<Vec<DiscoveredAttribute>, ScanError> {
            if self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| {
                (f > 0).then(|| f - 1)
            }).is_ok()
            {
                return Err(ScanError::Transient("connection reset".to_string()));
            }
            Ok(vec![DiscoveredAttribute {
                name: "records.id".to_string(),
                data_type: cdp_common::types::DataType::Text,
            }])
        }

        async fn sample(
            &self,
            _source: &SourceSystem,
            _attribute: &str,
            _limit: usize,
        ) -> Result<Vec<Option<String>>, ScanError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_scan_success() {
        let state = test_support::empty_state().await;
        let source = state.sources.register("CRM_SYSTEM", "", "").await.unwrap();

        let response = handle(
            state.clone(),
            ScanSourceCommand {
                source_system_id: source.id,
            },
        )
        .await
        .unwrap();
        assert!(response.attribute_count > 0);
        assert_eq!(
            state.sources.attribute_count(source.id).await,
            response.attribute_count
        );
    }

    #[tokio::test]
    async fn test_scan_unknown_source() {
        let state = test_support::empty_state().await;
        let result = handle(
            state,
            ScanSourceCommand {
                source_system_id: Uuid::new_v4(),
            },
        )
        .await;
        assert!(matches!(result, Err(ScanSourceError::SourceNotFound(_))));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let state = test_support::empty_state().await;
        let source = state.sources.register("FLAKY", "", "").await.unwrap();
        state
            .connectors
            .register(
                source.id,
                Arc::new(FlakyAdapter {
                    failures: AtomicU32::new(2),
                }),
            )
            .await;

        let response = handle(
            state.clone(),
            ScanSourceCommand {
                source_system_id: source.id,
            },
        )
        .await
        .unwrap();
        assert_eq!(response.attribute_count, 1);
        assert!(!state.sources.get(source.id).await.unwrap().degraded);
    }

    #[tokio::test]
    async fn test_exhausted_retries_mark_degraded() {
        let state = test_support::empty_state().await;
        let source = state.sources.register("DOWN", "", "").await.unwrap();
        state
            .connectors
            .register(
                source.id,
                Arc::new(FlakyAdapter {
                    failures: AtomicU32::new(100),
                }),
            )
            .await;

        let result = handle(
            state.clone(),
            ScanSourceCommand {
                source_system_id: source.id,
            },
        )
        .await;
        assert!(matches!(result, Err(ScanSourceError::ScanFailed { .. })));
        assert!(state.sources.get(source.id).await.unwrap().degraded);
    }
}
