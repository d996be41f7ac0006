//! Source system registry
//!
//! Stores registered source systems and the attributes discovered by
//! scanning them. A successful scan replaces a system's attribute set
//! wholesale; incremental merging would let stale attributes drift.
//! Systems are never hard-deleted, only deactivated.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use cdp_common::types::{SourceAttribute, SourceSystem};

use crate::connectors::DiscoveredAttribute;

/// Errors from registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Source system '{0}' is already registered")]
    DuplicateName(String),

    #[error("Source system {0} not found")]
    NotFound(Uuid),
}

#[derive(Default)]
struct Inner {
    systems: HashMap<Uuid, SourceSystem>,
    attributes: HashMap<Uuid, SourceAttribute>,
    by_system: HashMap<Uuid, Vec<Uuid>>,
}

/// Handle to the source system registry
#[derive(Clone, Default)]
pub struct SourceRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new source system. Names are unique.
    pub async fn register(
        &self,
        name: &str,
        description: &str,
        owner: &str,
    ) -> Result<SourceSystem, RegistryError> {
        let mut inner = self.inner.write().await;

        if inner.systems.values().any(|s| s.name == name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }

        let system = SourceSystem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            owner: owner.to_string(),
            active: true,
            degraded: false,
            last_scanned_at: None,
            created_at: Utc::now(),
        };

        inner.systems.insert(system.id, system.clone());
        inner.by_system.insert(system.id, Vec::new());

        tracing::info!(source_system_id = %system.id, name = %system.name, "Source system registered");

        Ok(system)
    }

    pub async fn get(&self, id: Uuid) -> Option<SourceSystem> {
        self.inner.read().await.systems.get(&id).cloned()
    }

    pub async fn find_by_name(&self, name: &str) -> Option<SourceSystem> {
        self.inner
            .read()
            .await
            .systems
            .values()
            .find(|s| s.name == name)
            .cloned()
    }

    /// All registered systems, sorted by name for stable listings.
    pub async fn list(&self) -> Vec<SourceSystem> {
        let inner = self.inner.read().await;
        let mut systems: Vec<_> = inner.systems.values().cloned().collect();
        systems.sort_by(|a, b| a.name.cmp(&b.name));
        systems
    }

    /// Deactivate a system instead of deleting it.
    pub async fn deactivate(&self, id: Uuid) -> Result<SourceSystem, RegistryError> {
        let mut inner = self.inner.write().await;
        let system = inner
            .systems
            .get_mut(&id)
            .ok_or(RegistryError::NotFound(id))?;
        system.active = false;
        Ok(system.clone())
    }

    /// Record a successful scan: the discovered attributes replace the
    /// previous set (cascade), the scan timestamp is updated, and any
    /// degraded flag is cleared. Returns the new attribute count.
    pub async fn record_scan_success(
        &self,
        id: Uuid,
        discovered: Vec<DiscoveredAttribute>,
    ) -> Result<usize, RegistryError> {
        let mut inner = self.inner.write().await;

        if !inner.systems.contains_key(&id) {
            return Err(RegistryError::NotFound(id));
        }

        // Drop the previous attribute set wholesale.
        if let Some(old_ids) = inner.by_system.remove(&id) {
            for attr_id in old_ids {
                inner.attributes.remove(&attr_id);
            }
        }

        let mut ids = Vec::with_capacity(discovered.len());
        for d in discovered {
            let attribute = SourceAttribute {
                id: Uuid::new_v4(),
                source_system_id: id,
                name: d.name,
                data_type: d.data_type,
            };
            ids.push(attribute.id);
            inner.attributes.insert(attribute.id, attribute);
        }
        let count = ids.len();
        inner.by_system.insert(id, ids);

        if let Some(system) = inner.systems.get_mut(&id) {
            system.last_scanned_at = Some(Utc::now());
            system.degraded = false;
        }

        Ok(count)
    }

    /// Record a failed scan: the system is marked degraded, its existing
    /// attributes are kept as-is.
    pub async fn record_scan_failure(&self, id: Uuid) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        let system = inner
            .systems
            .get_mut(&id)
            .ok_or(RegistryError::NotFound(id))?;
        system.degraded = true;
        Ok(())
    }

    /// Attributes of a system, sorted by name.
    pub async fn attributes_of(&self, id: Uuid) -> Vec<SourceAttribute> {
        let inner = self.inner.read().await;
        let mut attrs: Vec<_> = inner
            .by_system
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|attr_id| inner.attributes.get(attr_id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        attrs.sort_by(|a: &SourceAttribute, b: &SourceAttribute| a.name.cmp(&b.name));
        attrs
    }

    pub async fn attribute(&self, attribute_id: Uuid) -> Option<SourceAttribute> {
        self.inner
            .read()
            .await
            .attributes
            .get(&attribute_id)
            .cloned()
    }

    pub async fn attribute_count(&self, id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .by_system
            .get(&id)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    pub async fn system_count(&self) -> usize {
        self.inner.read().await.systems.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_common::types::DataType;

    fn discovered(name: &str, data_type: DataType) -> DiscoveredAttribute {
        DiscoveredAttribute {
            name: name.to_string(),
            data_type,
        }
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = SourceRegistry::new();
        let system = registry.register("CRM", "CRM system", "sales").await.unwrap();
        assert!(system.active);
        assert!(!system.degraded);
        assert!(registry.get(system.id).await.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let registry = SourceRegistry::new();
        registry.register("CRM", "", "").await.unwrap();
        let result = registry.register("CRM", "", "").await;
        assert!(matches!(result, Err(RegistryError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_scan_replaces_attributes_wholesale() {
        let registry = SourceRegistry::new();
        let system = registry.register("CRM", "", "").await.unwrap();

        let count = registry
            .record_scan_success(
                system.id,
                vec![
                    discovered("contacts.email", DataType::Text),
                    discovered("contacts.phone", DataType::Text),
                ],
            )
            .await
            .unwrap();
        assert_eq!(count, 2);

        // A rescan drops the old set entirely.
        let count = registry
            .record_scan_success(system.id, vec![discovered("contacts.email", DataType::Text)])
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(registry.attributes_of(system.id).await.len(), 1);

        let refreshed = registry.get(system.id).await.unwrap();
        assert!(refreshed.last_scanned_at.is_some());
    }

    #[tokio::test]
    async fn test_scan_failure_marks_degraded_and_keeps_attributes() {
        let registry = SourceRegistry::new();
        let system = registry.register("CRM", "", "").await.unwrap();
        registry
            .record_scan_success(system.id, vec![discovered("contacts.email", DataType::Text)])
            .await
            .unwrap();

        registry.record_scan_failure(system.id).await.unwrap();

        let refreshed = registry.get(system.id).await.unwrap();
        assert!(refreshed.degraded);
        assert_eq!(registry.attributes_of(system.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_deactivate_keeps_record() {
        let registry = SourceRegistry::new();
        let system = registry.register("CRM", "", "").await.unwrap();
        let deactivated = registry.deactivate(system.id).await.unwrap();
        assert!(!deactivated.active);
        assert!(registry.get(system.id).await.is_some());
    }
}
