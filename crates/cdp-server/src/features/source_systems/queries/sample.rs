//! Sample source data query
//!
//! Draws a bounded sample of values for one attribute through the
//! source's connector, for display alongside mapping validation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connectors::ScanError;
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_SAMPLE_LIMIT: usize = 10;
const MAX_SAMPLE_LIMIT: usize = 100;

/// Query for sample values of one source attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSourceQuery {
    #[serde(skip)]
    pub source_system_id: Uuid,
    /// Qualified attribute name, e.g. `customers.cust_id`
    pub attribute: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Response with sampled values; `null` entries are missing values
#[derive(Debug, Clone, Serialize)]
pub struct SampleSourceResponse {
    pub source_system_id: Uuid,
    pub attribute: String,
    pub values: Vec<Option<String>>,
}

/// Errors for the sample query
#[derive(Debug, thiserror::Error)]
pub enum SampleSourceError {
    #[error("Source system {0} not found")]
    SourceNotFound(Uuid),

    #[error("Sampling failed: {0}")]
    Sampling(#[from] ScanError),
}

impl From<SampleSourceError> for AppError {
    fn from(e: SampleSourceError) -> Self {
        match e {
            SampleSourceError::SourceNotFound(_) => AppError::NotFound(e.to_string()),
            SampleSourceError::Sampling(ScanError::UnknownAttribute(_)) => {
                AppError::NotFound(e.to_string())
            },
            SampleSourceError::Sampling(_) => AppError::ScanFailure(e.to_string()),
        }
    }
}

pub async fn handle(
    state: AppState,
    query: SampleSourceQuery,
) -> Result<SampleSourceResponse, SampleSourceError> {
    let source = state
        .sources
        .get(query.source_system_id)
        .await
        .ok_or(SampleSourceError::SourceNotFound(query.source_system_id))?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_SAMPLE_LIMIT)
        .min(MAX_SAMPLE_LIMIT);

    let adapter = state.connectors.adapter_for(source.id).await;
    let values = adapter.sample(&source, &query.attribute, limit).await?;

    Ok(SampleSourceResponse {
        source_system_id: source.id,
        attribute: query.attribute,
        values,
    })
}
