//! List source systems query

use serde::{Deserialize, Serialize};

use cdp_common::types::SourceSystem;

use crate::state::AppState;

/// Query to list registered source systems
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListSourceSystemsQuery {
    /// When set, only active systems are returned
    #[serde(default)]
    pub active_only: bool,
}

/// One source system with its scanned attribute count
#[derive(Debug, Clone, Serialize)]
pub struct SourceSystemSummary {
    #[serde(flatten)]
    pub system: SourceSystem,
    pub attribute_count: usize,
}

/// Response for the listing
#[derive(Debug, Clone, Serialize)]
pub struct ListSourceSystemsResponse {
    pub source_systems: Vec<SourceSystemSummary>,
    pub count: usize,
}

pub async fn handle(state: AppState, query: ListSourceSystemsQuery) -> ListSourceSystemsResponse {
    let systems = state.sources.list().await;

    let mut summaries = Vec::with_capacity(systems.len());
    for system in systems {
        if query.active_only && !system.active {
            continue;
        }
        let attribute_count = state.sources.attribute_count(system.id).await;
        summaries.push(SourceSystemSummary {
            system,
            attribute_count,
        });
    }

    ListSourceSystemsResponse {
        count: summaries.len(),
        source_systems: summaries,
    }
}
