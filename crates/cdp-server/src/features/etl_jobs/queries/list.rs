//! List ETL jobs query

use serde::{Deserialize, Serialize};

use cdp_common::types::Job;

use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 500;

/// Query to list jobs
///
/// `status=active` lists queued and running jobs; anything else (or no
/// status) lists recent history across all statuses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListJobsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Response for the listing
#[derive(Debug, Clone, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<Job>,
    pub count: usize,
}

pub async fn handle(state: AppState, query: ListJobsQuery) -> ListJobsResponse {
    let jobs = if query.status.as_deref() == Some("active") {
        state.jobs.list_active().await
    } else {
        let limit = query
            .limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .min(MAX_HISTORY_LIMIT);
        state.jobs.list_history(limit).await
    };

    ListJobsResponse {
        count: jobs.len(),
        jobs,
    }
}
