//! Mapping store
//!
//! Mappings are the join entity between source attributes and target
//! attributes and the only entity other components mutate concurrently.
//! All status/confidence writes go through `record_validation`, which the
//! validator calls while holding the per-mapping lock from
//! `validation_lock`, so concurrent validations of the same mapping can
//! never interleave partial updates. Reads return snapshots and never
//! block writers beyond the short lock hold.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use cdp_common::types::{Mapping, MappingStatus, ValidationRun};

/// Errors from mapping store operations
#[derive(Debug, Error)]
pub enum MappingStoreError {
    #[error("Mapping {0} not found")]
    NotFound(Uuid),

    #[error("Source attribute {source_attribute_id} is already mapped to target attribute {target_attribute_id}")]
    DuplicatePair {
        source_attribute_id: Uuid,
        target_attribute_id: Uuid,
    },

    #[error(
        "Target attribute {target_attribute_id} already has a mapping from source system {source_system_id}"
    )]
    DuplicateSourceFanIn {
        source_system_id: Uuid,
        target_attribute_id: Uuid,
    },
}

/// Parameters for creating a mapping
#[derive(Debug, Clone)]
pub struct NewMapping {
    pub source_system_id: Uuid,
    pub source_attribute_id: Uuid,
    pub target_attribute_id: Uuid,
    pub transformation_logic: Option<String>,
    pub status: MappingStatus,
    pub confidence_score: f64,
    pub created_by: String,
}

/// Filter for mapping listings
#[derive(Debug, Clone, Default)]
pub struct MappingFilter {
    pub source_system_id: Option<Uuid>,
    pub target_attribute_id: Option<Uuid>,
    pub status: Option<MappingStatus>,
}

#[derive(Default)]
struct Inner {
    mappings: HashMap<Uuid, Mapping>,
    history: HashMap<Uuid, Vec<ValidationRun>>,
}

/// Handle to the mapping store
#[derive(Clone, Default)]
pub struct MappingStore {
    inner: Arc<RwLock<Inner>>,
    locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mapping, enforcing the fan-in invariants:
    /// at most one mapping per (source attribute, target attribute) pair,
    /// and at most one mapping per (target attribute, source system).
    /// Multi-source fan-in is allowed, duplicate-source fan-in is not.
    pub async fn create(&self, new: NewMapping) -> Result<Mapping, MappingStoreError> {
        let mut inner = self.inner.write().await;

        for existing in inner.mappings.values() {
            if existing.source_attribute_id == new.source_attribute_id
                && existing.target_attribute_id == new.target_attribute_id
            {
                return Err(MappingStoreError::DuplicatePair {
                    source_attribute_id: new.source_attribute_id,
                    target_attribute_id: new.target_attribute_id,
                });
            }
            if existing.target_attribute_id == new.target_attribute_id
                && existing.source_system_id == new.source_system_id
            {
                return Err(MappingStoreError::DuplicateSourceFanIn {
                    source_system_id: new.source_system_id,
                    target_attribute_id: new.target_attribute_id,
                });
            }
        }

        let now = Utc::now();
        let mapping = Mapping {
            id: Uuid::new_v4(),
            source_system_id: new.source_system_id,
            source_attribute_id: new.source_attribute_id,
            target_attribute_id: new.target_attribute_id,
            transformation_logic: new.transformation_logic,
            status: new.status,
            confidence_score: new.confidence_score.clamp(0.0, 1.0),
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };

        inner.mappings.insert(mapping.id, mapping.clone());
        inner.history.insert(mapping.id, Vec::new());

        Ok(mapping)
    }

    pub async fn get(&self, id: Uuid) -> Option<Mapping> {
        self.inner.read().await.mappings.get(&id).cloned()
    }

    /// List mappings matching a filter, oldest first for stable output.
    pub async fn list(&self, filter: &MappingFilter) -> Vec<Mapping> {
        let inner = self.inner.read().await;
        let mut mappings: Vec<_> = inner
            .mappings
            .values()
            .filter(|m| {
                filter.source_system_id.is_none_or(|id| m.source_system_id == id)
                    && filter
                        .target_attribute_id
                        .is_none_or(|id| m.target_attribute_id == id)
                    && filter.status.is_none_or(|s| m.status == s)
            })
            .cloned()
            .collect();
        mappings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        mappings
    }

    /// All mappings referencing a target attribute.
    pub async fn for_target(&self, target_attribute_id: Uuid) -> Vec<Mapping> {
        self.list(&MappingFilter {
            target_attribute_id: Some(target_attribute_id),
            ..Default::default()
        })
        .await
    }

    /// Validated mappings originating from a source system.
    pub async fn validated_for_source(&self, source_system_id: Uuid) -> Vec<Mapping> {
        self.list(&MappingFilter {
            source_system_id: Some(source_system_id),
            status: Some(MappingStatus::Validated),
            ..Default::default()
        })
        .await
    }

    /// Ids of mappings not yet validated, optionally scoped to a source.
    pub async fn unvalidated_ids(&self, source_system_id: Option<Uuid>) -> Vec<Uuid> {
        let inner = self.inner.read().await;
        let mut mappings: Vec<&Mapping> = inner
            .mappings
            .values()
            .filter(|m| m.status != MappingStatus::Validated)
            .filter(|m| source_system_id.is_none_or(|id| m.source_system_id == id))
            .collect();
        mappings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        mappings.into_iter().map(|m| m.id).collect()
    }

    /// Already-mapped (source attribute, target attribute) pairs for a
    /// source system; the suggestion engine excludes these candidates.
    pub async fn mapped_pairs(&self, source_system_id: Uuid) -> HashSet<(Uuid, Uuid)> {
        self.inner
            .read()
            .await
            .mappings
            .values()
            .filter(|m| m.source_system_id == source_system_id)
            .map(|m| (m.source_attribute_id, m.target_attribute_id))
            .collect()
    }

    /// Exclusive section for a single mapping's validation path. Callers
    /// hold the returned mutex for the whole sample-validate-write cycle.
    pub async fn validation_lock(&self, id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Record the result of a validation run: append to the audit history
    /// and update the mapping's status and blended confidence.
    pub async fn record_validation(
        &self,
        id: Uuid,
        run: ValidationRun,
        confidence: f64,
        status: MappingStatus,
    ) -> Result<Mapping, MappingStoreError> {
        let mut inner = self.inner.write().await;

        let mapping = inner
            .mappings
            .get_mut(&id)
            .ok_or(MappingStoreError::NotFound(id))?;
        mapping.confidence_score = confidence.clamp(0.0, 1.0);
        mapping.status = status;
        mapping.updated_at = Utc::now();
        let updated = mapping.clone();

        inner.history.entry(id).or_default().push(run);

        Ok(updated)
    }

    /// Explicit reset to pending. The only way out of `validated` besides
    /// a failed re-validation.
    pub async fn reset(&self, id: Uuid) -> Result<Mapping, MappingStoreError> {
        let mut inner = self.inner.write().await;
        let mapping = inner
            .mappings
            .get_mut(&id)
            .ok_or(MappingStoreError::NotFound(id))?;
        mapping.status = MappingStatus::Pending;
        mapping.updated_at = Utc::now();
        Ok(mapping.clone())
    }

    /// Validation history for a mapping, oldest run first.
    pub async fn history(&self, id: Uuid) -> Vec<ValidationRun> {
        self.inner
            .read()
            .await
            .history
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Mapping counts by status, for the system summary.
    pub async fn status_counts(&self) -> std::collections::BTreeMap<String, usize> {
        let inner = self.inner.read().await;
        let mut counts = std::collections::BTreeMap::new();
        for mapping in inner.mappings.values() {
            *counts.entry(mapping.status.to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.mappings.len()
    }
}
