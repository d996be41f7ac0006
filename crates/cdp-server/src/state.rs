//! Application state wiring
//!
//! `AppState` bundles the stores, the collaborator adapters, and the job
//! orchestrator. It is the state every feature route and engine function
//! operates on; cloning it is cheap (handles only).

use std::sync::Arc;

use crate::config::Config;
use crate::connectors::{ConnectorRegistry, FixtureScanAdapter, ScanAdapter};
use crate::jobs::adapter::{builtin_adapters, LoadContext};
use crate::jobs::JobOrchestrator;
use crate::mapping::scorer::{ConfidenceScorer, HttpScorer};
use crate::quality::materialized::{InMemoryMaterialized, MaterializedStore};
use crate::store::{AttributeCatalog, JobStore, MappingStore, QualityIssueStore, SourceRegistry};

/// Shared state for the whole engine.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sources: SourceRegistry,
    pub catalog: AttributeCatalog,
    pub mappings: MappingStore,
    pub issues: QualityIssueStore,
    pub jobs: JobStore,
    pub materialized: Arc<dyn MaterializedStore>,
    pub connectors: ConnectorRegistry,
    pub scorer: Option<Arc<dyn ConfidenceScorer>>,
    pub orchestrator: Arc<JobOrchestrator>,
}

impl AppState {
    /// Wire up the engine with the built-in fixture connector and the
    /// in-memory materialized store.
    pub fn new(config: Config) -> Self {
        Self::with_connector(config, Arc::new(FixtureScanAdapter::new()))
    }

    /// Wire up the engine with a specific default connector.
    pub fn with_connector(config: Config, connector: Arc<dyn ScanAdapter>) -> Self {
        let config = Arc::new(config);
        let sources = SourceRegistry::new();
        let catalog = AttributeCatalog::new();
        let mappings = MappingStore::new();
        let issues = QualityIssueStore::new();
        let jobs = JobStore::new();
        let materialized: Arc<dyn MaterializedStore> = Arc::new(InMemoryMaterialized::new());
        let connectors = ConnectorRegistry::new(connector);

        let scorer: Option<Arc<dyn ConfidenceScorer>> = config
            .engine
            .scorer_endpoint
            .as_deref()
            .map(|endpoint| Arc::new(HttpScorer::new(endpoint)) as Arc<dyn ConfidenceScorer>);

        let adapters = builtin_adapters(LoadContext {
            registry: sources.clone(),
            mappings: mappings.clone(),
            materialized: materialized.clone(),
            connectors: connectors.clone(),
            batch_size: config.jobs.load_batch_size,
        });

        let orchestrator = Arc::new(JobOrchestrator::new(
            jobs.clone(),
            sources.clone(),
            adapters,
            config.jobs.clone(),
        ));

        Self {
            config,
            sources,
            catalog,
            mappings,
            issues,
            jobs,
            materialized,
            connectors,
            scorer,
            orchestrator,
        }
    }
}

#[cfg(test)]
pub mod test_support {
    //! Shared fixtures for engine tests.

    use super::*;
    use crate::jobs::adapter::LoadContext;
    use crate::store::NewMapping;
    use cdp_common::types::{DataType, Mapping, MappingStatus};

    /// A bare state with the default fixture connector.
    pub async fn empty_state() -> AppState {
        AppState::new(Config::default())
    }

    /// A state with the default catalog and a scanned "CRM" source whose
    /// schema is `customers.cust_id` and `customers.full_nm`.
    pub async fn state_with_crm() -> AppState {
        let adapter = FixtureScanAdapter::new().with_schema(
            "CRM",
            vec![
                ("customers.cust_id", DataType::Text),
                ("customers.full_nm", DataType::Text),
            ],
        );
        let state = AppState::with_connector(Config::default(), Arc::new(adapter));
        state.catalog.seed_defaults().await;
        scan_source(&state, "CRM").await;
        state
    }

    /// `state_with_crm` plus a scanned "BILLING" source.
    pub async fn state_with_two_sources() -> AppState {
        let adapter = FixtureScanAdapter::new()
            .with_schema(
                "CRM",
                vec![
                    ("customers.cust_id", DataType::Text),
                    ("customers.full_nm", DataType::Text),
                ],
            )
            .with_schema("BILLING", vec![("invoices.bill_cust_id", DataType::Text)]);
        let state = AppState::with_connector(Config::default(), Arc::new(adapter));
        state.catalog.seed_defaults().await;
        scan_source(&state, "CRM").await;
        scan_source(&state, "BILLING").await;
        state
    }

    /// Register and scan a source through its connector.
    pub async fn scan_source(state: &AppState, name: &str) {
        let source = state
            .sources
            .register(name, "test source", "tester")
            .await
            .unwrap();
        let adapter = state.connectors.adapter_for(source.id).await;
        let discovered = adapter.scan(&source).await.unwrap();
        state
            .sources
            .record_scan_success(source.id, discovered)
            .await
            .unwrap();
    }

    /// Create a pending CRM mapping from an attribute suffix to a target.
    pub async fn crm_mapping(state: &AppState, attr_suffix: &str, target_name: &str) -> Mapping {
        let source = state.sources.find_by_name("CRM").await.unwrap();
        let attrs = state.sources.attributes_of(source.id).await;
        let attribute = attrs.iter().find(|a| a.name.ends_with(attr_suffix)).unwrap();
        let target = state.catalog.find_by_name(target_name).await.unwrap();

        state
            .mappings
            .create(NewMapping {
                source_system_id: source.id,
                source_attribute_id: attribute.id,
                target_attribute_id: target.id,
                transformation_logic: None,
                status: MappingStatus::Pending,
                confidence_score: 0.0,
                created_by: "test".to_string(),
            })
            .await
            .unwrap()
    }

    /// The load context the built-in job adapters run with.
    pub fn load_context(state: &AppState) -> LoadContext {
        LoadContext {
            registry: state.sources.clone(),
            mappings: state.mappings.clone(),
            materialized: state.materialized.clone(),
            connectors: state.connectors.clone(),
            batch_size: state.config.jobs.load_batch_size,
        }
    }
}
