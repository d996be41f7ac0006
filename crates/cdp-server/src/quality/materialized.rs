//! Materialized data store
//!
//! Reader/writer collaborator over the physically materialized
//! per-attribute rows that quality metrics and fixes operate on. Writes
//! replace a whole attribute column in one swap, so a fix either fully
//! applies or fully does not.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One materialized value of a target attribute for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedRow {
    /// Stable record identifier within the data product
    pub record_key: String,
    /// `None` is a genuinely missing value
    pub value: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Errors from the materialized store
#[derive(Debug, Error)]
pub enum MaterializedError {
    /// The store could not serve the request right now; callers retry
    /// with backoff up to a bound.
    #[error("Transient materialized-store failure: {0}")]
    Transient(String),
}

/// Reader/writer over the materialized data product.
#[async_trait]
pub trait MaterializedStore: Send + Sync {
    /// All rows for an attribute. Unknown attributes read as empty.
    async fn read(&self, target_attribute_id: Uuid)
        -> Result<Vec<MaterializedRow>, MaterializedError>;

    /// Replace the attribute's rows in one atomic swap.
    async fn replace(
        &self,
        target_attribute_id: Uuid,
        rows: Vec<MaterializedRow>,
    ) -> Result<(), MaterializedError>;

    /// Insert or overwrite rows by record key. Returns the number of rows
    /// written.
    async fn upsert(
        &self,
        target_attribute_id: Uuid,
        rows: Vec<MaterializedRow>,
    ) -> Result<usize, MaterializedError>;

    /// Attribute ids with materialized data, in stable order.
    async fn attribute_ids(&self) -> Result<Vec<Uuid>, MaterializedError>;
}

/// In-memory materialized store, the default backing.
#[derive(Default)]
pub struct InMemoryMaterialized {
    inner: Arc<RwLock<HashMap<Uuid, Vec<MaterializedRow>>>>,
}

impl InMemoryMaterialized {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MaterializedStore for InMemoryMaterialized {
    async fn read(
        &self,
        target_attribute_id: Uuid,
    ) -> Result<Vec<MaterializedRow>, MaterializedError> {
        Ok(self
            .inner
            .read()
            .await
            .get(&target_attribute_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace(
        &self,
        target_attribute_id: Uuid,
        rows: Vec<MaterializedRow>,
    ) -> Result<(), MaterializedError> {
        self.inner.write().await.insert(target_attribute_id, rows);
        Ok(())
    }

    async fn upsert(
        &self,
        target_attribute_id: Uuid,
        rows: Vec<MaterializedRow>,
    ) -> Result<usize, MaterializedError> {
        let mut inner = self.inner.write().await;
        let column = inner.entry(target_attribute_id).or_default();
        let written = rows.len();
        for row in rows {
            match column.iter_mut().find(|r| r.record_key == row.record_key) {
                Some(existing) => *existing = row,
                None => column.push(row),
            }
        }
        Ok(written)
    }

    async fn attribute_ids(&self) -> Result<Vec<Uuid>, MaterializedError> {
        let mut ids: Vec<_> = self.inner.read().await.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

/// Build a row with the current timestamp.
pub fn row(record_key: impl Into<String>, value: Option<String>) -> MaterializedRow {
    MaterializedRow {
        record_key: record_key.into(),
        value,
        updated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_unknown_attribute_is_empty() {
        let store = InMemoryMaterialized::new();
        assert!(store.read(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_swaps_whole_column() {
        let store = InMemoryMaterialized::new();
        let attr = Uuid::new_v4();

        store
            .replace(attr, vec![row("1", Some("a".into())), row("2", Some("b".into()))])
            .await
            .unwrap();
        store.replace(attr, vec![row("3", Some("c".into()))]).await.unwrap();

        let rows = store.read(attr).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record_key, "3");
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_key() {
        let store = InMemoryMaterialized::new();
        let attr = Uuid::new_v4();

        store.upsert(attr, vec![row("1", Some("a".into()))]).await.unwrap();
        let written = store
            .upsert(attr, vec![row("1", Some("z".into())), row("2", Some("b".into()))])
            .await
            .unwrap();

        assert_eq!(written, 2);
        let rows = store.read(attr).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, Some("z".to_string()));
    }
}
