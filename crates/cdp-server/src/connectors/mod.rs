//! Source system connectors
//!
//! Scanning a source system is delegated to a pluggable adapter: the
//! engine only sees the `ScanAdapter` trait. Adapters enumerate a
//! system's attributes and draw bounded value samples; both calls may
//! block on external I/O and are the scan path's only suspension points.

pub mod fixture;

pub use fixture::FixtureScanAdapter;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use cdp_common::types::{DataType, SourceSystem};

/// An attribute discovered by scanning a source system.
#[derive(Debug, Clone)]
pub struct DiscoveredAttribute {
    /// Qualified name, e.g. `customers.cust_id`
    pub name: String,
    pub data_type: DataType,
}

/// Errors a connector can report
#[derive(Debug, Error)]
pub enum ScanError {
    /// The connector could not reach the source right now; retried with
    /// backoff by the caller before surfacing as a scan failure.
    #[error("Transient connector failure: {0}")]
    Transient(String),

    /// The connector does not know how to talk to this source.
    #[error("Source system not supported by connector: {0}")]
    Unsupported(String),

    /// The requested attribute does not exist in the source.
    #[error("Unknown source attribute: {0}")]
    UnknownAttribute(String),
}

/// A per-source-system connector.
#[async_trait]
pub trait ScanAdapter: Send + Sync {
    /// Enumerate the source system's attributes.
    async fn scan(&self, source: &SourceSystem) -> Result<Vec<DiscoveredAttribute>, ScanError>;

    /// Draw up to `limit` values for one attribute. `None` entries are
    /// genuinely missing values in the source.
    async fn sample(
        &self,
        source: &SourceSystem,
        attribute: &str,
        limit: usize,
    ) -> Result<Vec<Option<String>>, ScanError>;
}

/// Dispatches to the adapter registered for a source system, falling back
/// to the default connector.
#[derive(Clone)]
pub struct ConnectorRegistry {
    default: Arc<dyn ScanAdapter>,
    overrides: Arc<RwLock<HashMap<Uuid, Arc<dyn ScanAdapter>>>>,
}

impl ConnectorRegistry {
    pub fn new(default: Arc<dyn ScanAdapter>) -> Self {
        Self {
            default,
            overrides: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a dedicated adapter for one source system.
    pub async fn register(&self, source_system_id: Uuid, adapter: Arc<dyn ScanAdapter>) {
        self.overrides.write().await.insert(source_system_id, adapter);
    }

    pub async fn adapter_for(&self, source_system_id: Uuid) -> Arc<dyn ScanAdapter> {
        self.overrides
            .read()
            .await
            .get(&source_system_id)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}
