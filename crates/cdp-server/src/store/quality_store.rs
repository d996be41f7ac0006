//! Quality issue store
//!
//! Open issues are upserted by (target attribute, issue type) so repeated
//! detection runs refresh counts in place instead of piling up duplicates.
//! Resolved issues are kept for history.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use cdp_common::types::{FixOption, IssueType, QualityIssue, Severity};

/// A freshly detected issue before it is reconciled with the store.
#[derive(Debug, Clone)]
pub struct DetectedIssue {
    pub target_attribute_id: Uuid,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
    pub affected_record_count: u64,
    pub fix_options: Vec<FixOption>,
}

/// Handle to the quality issue store
#[derive(Clone, Default)]
pub struct QualityIssueStore {
    inner: Arc<RwLock<HashMap<Uuid, QualityIssue>>>,
    fix_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl QualityIssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile a fresh detection with the store: update the open issue
    /// for the same (attribute, type) in place, or insert a new one.
    pub async fn upsert_open(&self, detected: DetectedIssue) -> QualityIssue {
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner.values_mut().find(|i| {
            i.target_attribute_id == detected.target_attribute_id
                && i.issue_type == detected.issue_type
                && !i.is_resolved()
        }) {
            existing.severity = detected.severity;
            existing.description = detected.description;
            existing.affected_record_count = detected.affected_record_count;
            existing.fix_options = detected.fix_options;
            return existing.clone();
        }

        let issue = QualityIssue {
            id: Uuid::new_v4(),
            target_attribute_id: detected.target_attribute_id,
            issue_type: detected.issue_type,
            severity: detected.severity,
            description: detected.description,
            affected_record_count: detected.affected_record_count,
            detected_at: Utc::now(),
            resolved_at: None,
            fix_options: detected.fix_options,
        };
        inner.insert(issue.id, issue.clone());
        issue
    }

    /// Resolve the open issue of a given type for an attribute, if any.
    /// Used when a detection run finds the condition has cleared.
    pub async fn resolve_cleared(
        &self,
        target_attribute_id: Uuid,
        issue_type: IssueType,
    ) -> Option<QualityIssue> {
        let mut inner = self.inner.write().await;
        let issue = inner.values_mut().find(|i| {
            i.target_attribute_id == target_attribute_id
                && i.issue_type == issue_type
                && !i.is_resolved()
        })?;
        issue.resolved_at = Some(Utc::now());
        Some(issue.clone())
    }

    pub async fn get(&self, id: Uuid) -> Option<QualityIssue> {
        self.inner.read().await.get(&id).cloned()
    }

    /// Mark an issue resolved.
    pub async fn resolve(&self, id: Uuid) -> Option<QualityIssue> {
        let mut inner = self.inner.write().await;
        let issue = inner.get_mut(&id)?;
        if issue.resolved_at.is_none() {
            issue.resolved_at = Some(Utc::now());
        }
        Some(issue.clone())
    }

    /// Open issues, optionally filtered by attribute and minimum severity,
    /// most severe first then newest.
    pub async fn list_open(
        &self,
        target_attribute_id: Option<Uuid>,
        min_severity: Option<Severity>,
    ) -> Vec<QualityIssue> {
        let inner = self.inner.read().await;
        let mut issues: Vec<_> = inner
            .values()
            .filter(|i| !i.is_resolved())
            .filter(|i| target_attribute_id.is_none_or(|id| i.target_attribute_id == id))
            .filter(|i| min_severity.is_none_or(|s| i.severity >= s))
            .cloned()
            .collect();
        issues.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(b.detected_at.cmp(&a.detected_at))
                .then(a.id.cmp(&b.id))
        });
        issues
    }

    /// Exclusive section serializing fix application per target attribute,
    /// so two concurrent fixes cannot double-count affected records.
    pub async fn fix_lock(&self, target_attribute_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.fix_locks.lock().await;
        locks
            .entry(target_attribute_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn open_count(&self) -> usize {
        self.inner
            .read()
            .await
            .values()
            .filter(|i| !i.is_resolved())
            .count()
    }
}
