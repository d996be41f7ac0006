//! ETL job statistics query

use cdp_common::types::JobStatistics;

use crate::state::AppState;

pub async fn handle(state: AppState) -> JobStatistics {
    state.jobs.statistics().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;
    use cdp_common::types::JobType;

    #[tokio::test]
    async fn test_statistics_counts() {
        let state = test_support::state_with_crm().await;
        let source = state.sources.find_by_name("CRM").await.unwrap();
        for i in 0..3 {
            state
                .orchestrator
                .submit(&format!("job {i}"), JobType::FullLoad, source.id, "test")
                .await
                .unwrap();
        }

        let stats = handle(state).await;
        assert_eq!(stats.queued, 3);
        assert_eq!(
            stats.total,
            stats.queued + stats.running + stats.completed + stats.failed + stats.cancelled
        );
    }
}
