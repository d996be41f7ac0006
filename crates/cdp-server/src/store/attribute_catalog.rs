//! Target attribute catalog
//!
//! Canonical attributes exposed by the data product. Attribute identity is
//! immutable once referenced by a mapping; a rename is a new attribute.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use cdp_common::types::{DataType, TargetAttribute};

/// Errors from catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Target attribute '{0}' is already defined")]
    DuplicateName(String),

    #[error("Target attribute {0} not found")]
    NotFound(Uuid),
}

/// Handle to the target attribute catalog
#[derive(Clone, Default)]
pub struct AttributeCatalog {
    inner: Arc<RwLock<HashMap<Uuid, TargetAttribute>>>,
}

/// Parameters for defining a new target attribute
#[derive(Debug, Clone)]
pub struct NewTargetAttribute {
    pub name: String,
    pub display_name: String,
    pub category: String,
    pub data_type: DataType,
    pub required: bool,
    pub pii: bool,
}

impl AttributeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new target attribute. Names are unique.
    pub async fn define(&self, new: NewTargetAttribute) -> Result<TargetAttribute, CatalogError> {
        let mut inner = self.inner.write().await;

        if inner.values().any(|a| a.name == new.name) {
            return Err(CatalogError::DuplicateName(new.name));
        }

        let attribute = TargetAttribute {
            id: Uuid::new_v4(),
            name: new.name,
            display_name: new.display_name,
            category: new.category,
            data_type: new.data_type,
            required: new.required,
            pii: new.pii,
            created_at: Utc::now(),
        };

        inner.insert(attribute.id, attribute.clone());

        tracing::info!(attribute_id = %attribute.id, name = %attribute.name, "Target attribute defined");

        Ok(attribute)
    }

    pub async fn get(&self, id: Uuid) -> Option<TargetAttribute> {
        self.inner.read().await.get(&id).cloned()
    }

    pub async fn find_by_name(&self, name: &str) -> Option<TargetAttribute> {
        self.inner
            .read()
            .await
            .values()
            .find(|a| a.name == name)
            .cloned()
    }

    /// List attributes, optionally filtered by category, sorted by name.
    pub async fn list(&self, category: Option<&str>) -> Vec<TargetAttribute> {
        let inner = self.inner.read().await;
        let mut attrs: Vec<_> = inner
            .values()
            .filter(|a| category.is_none_or(|c| a.category == c))
            .cloned()
            .collect();
        attrs.sort_by(|a, b| a.name.cmp(&b.name));
        attrs
    }

    /// Attribute counts per category.
    pub async fn category_counts(&self) -> BTreeMap<String, usize> {
        let inner = self.inner.read().await;
        let mut counts = BTreeMap::new();
        for attribute in inner.values() {
            *counts.entry(attribute.category.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Seed the standard customer data product attributes when the catalog
    /// is empty. No-op otherwise.
    pub async fn seed_defaults(&self) -> usize {
        if self.count().await > 0 {
            return 0;
        }

        let defaults = [
            ("customer_id", "Customer ID", "identity", DataType::Text, true, false),
            ("first_name", "First Name", "demographic", DataType::Text, true, true),
            ("last_name", "Last Name", "demographic", DataType::Text, true, true),
            ("full_name", "Full Name", "demographic", DataType::Text, false, true),
            ("email", "Email Address", "contact", DataType::Text, false, true),
            ("phone", "Phone Number", "contact", DataType::Text, false, true),
            ("address", "Mailing Address", "contact", DataType::Text, false, true),
            ("date_of_birth", "Date of Birth", "demographic", DataType::Date, false, true),
            ("customer_since", "Customer Since", "relationship", DataType::Date, false, false),
            ("credit_score", "Credit Score", "financial", DataType::Integer, false, false),
            ("account_balance", "Account Balance", "financial", DataType::Real, false, false),
            ("lifetime_value", "Lifetime Value", "financial", DataType::Real, false, false),
            ("marketing_opt_in", "Marketing Opt-In", "preference", DataType::Boolean, false, false),
            ("last_interaction", "Last Interaction", "engagement", DataType::Timestamp, false, false),
        ];

        let mut seeded = 0;
        for (name, display_name, category, data_type, required, pii) in defaults {
            let result = self
                .define(NewTargetAttribute {
                    name: name.to_string(),
                    display_name: display_name.to_string(),
                    category: category.to_string(),
                    data_type,
                    required,
                    pii,
                })
                .await;
            if result.is_ok() {
                seeded += 1;
            }
        }

        tracing::info!(count = seeded, "Seeded default target attributes");
        seeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_attribute(name: &str, category: &str) -> NewTargetAttribute {
        NewTargetAttribute {
            name: name.to_string(),
            display_name: name.to_string(),
            category: category.to_string(),
            data_type: DataType::Text,
            required: false,
            pii: false,
        }
    }

    #[tokio::test]
    async fn test_define_and_find() {
        let catalog = AttributeCatalog::new();
        let attr = catalog.define(new_attribute("email", "contact")).await.unwrap();
        assert_eq!(catalog.find_by_name("email").await.unwrap().id, attr.id);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let catalog = AttributeCatalog::new();
        catalog.define(new_attribute("email", "contact")).await.unwrap();
        let result = catalog.define(new_attribute("email", "contact")).await;
        assert!(matches!(result, Err(CatalogError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_category_filter_and_counts() {
        let catalog = AttributeCatalog::new();
        catalog.define(new_attribute("email", "contact")).await.unwrap();
        catalog.define(new_attribute("phone", "contact")).await.unwrap();
        catalog.define(new_attribute("first_name", "demographic")).await.unwrap();

        assert_eq!(catalog.list(Some("contact")).await.len(), 2);
        assert_eq!(catalog.list(None).await.len(), 3);

        let counts = catalog.category_counts().await;
        assert_eq!(counts.get("contact"), Some(&2));
        assert_eq!(counts.get("demographic"), Some(&1));
    }

    #[tokio::test]
    async fn test_seed_defaults_once() {
        let catalog = AttributeCatalog::new();
        let seeded = catalog.seed_defaults().await;
        assert!(seeded > 0);
        assert_eq!(catalog.seed_defaults().await, 0);
    }
}
