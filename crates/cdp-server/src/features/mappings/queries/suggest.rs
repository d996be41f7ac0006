//! Suggest mappings query
//!
//! Thin wrapper over the suggestion engine; see `mapping::suggest`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::mapping::suggest::{self, RankedSuggestions, SuggestError};
use crate::state::AppState;

/// Query for ranked mapping suggestions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestMappingsQuery {
    #[serde(skip)]
    pub source_system_id: Uuid,
    /// Consult the enhanced scorer (falls back silently when unavailable)
    #[serde(default)]
    pub use_ml: bool,
}

impl From<SuggestError> for AppError {
    fn from(e: SuggestError) -> Self {
        match e {
            SuggestError::SourceNotFound(_) => AppError::NotFound(e.to_string()),
            SuggestError::NoScannedAttributes(_) => AppError::Validation(e.to_string()),
        }
    }
}

pub async fn handle(
    state: AppState,
    query: SuggestMappingsQuery,
) -> Result<RankedSuggestions, SuggestError> {
    suggest::suggest(&state, query.source_system_id, query.use_ml).await
}
