//! Quality metrics query

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::quality::metrics::{self, MetricsError, MetricsReport, MetricsScope};
use crate::state::AppState;

/// Query for quality metrics. Without parameters the whole materialized
/// data product is measured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsQuery {
    /// Source system id to scope to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Uuid>,
    /// Target attribute name to scope to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

/// Errors for the metrics query
#[derive(Debug, thiserror::Error)]
pub enum MetricsQueryError {
    #[error("Target attribute '{0}' not found")]
    AttributeNotFound(String),

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

impl From<MetricsQueryError> for AppError {
    fn from(e: MetricsQueryError) -> Self {
        match e {
            MetricsQueryError::AttributeNotFound(_) => AppError::NotFound(e.to_string()),
            MetricsQueryError::Metrics(MetricsError::SourceNotFound(_))
            | MetricsQueryError::Metrics(MetricsError::AttributeNotFound(_)) => {
                AppError::NotFound(e.to_string())
            },
            MetricsQueryError::Metrics(MetricsError::Store(_)) => AppError::Internal(e.to_string()),
        }
    }
}

pub async fn handle(
    state: AppState,
    query: MetricsQuery,
) -> Result<MetricsReport, MetricsQueryError> {
    let scope = if let Some(name) = query.attribute {
        let attribute = state
            .catalog
            .find_by_name(&name)
            .await
            .ok_or(MetricsQueryError::AttributeNotFound(name))?;
        MetricsScope::Attribute(attribute.id)
    } else if let Some(source) = query.source {
        MetricsScope::Source(source)
    } else {
        MetricsScope::All
    };

    Ok(metrics::compute(&state, scope).await?)
}
