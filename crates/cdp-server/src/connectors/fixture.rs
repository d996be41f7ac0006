//! Built-in fixture connector
//!
//! Deterministic connector used for demos and tests. It carries schema
//! fixtures for the standard banking source systems and a generic
//! fallback schema for anything else; sample values are a pure function
//! of (attribute name, data type, row index), so repeated scans and
//! samples always agree.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};

use cdp_common::types::{DataType, SourceSystem};

use super::{DiscoveredAttribute, ScanAdapter, ScanError};

/// Deterministic in-process connector.
#[derive(Default)]
pub struct FixtureScanAdapter {
    custom: HashMap<String, Vec<DiscoveredAttribute>>,
}

impl FixtureScanAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or override) the schema served for a system name.
    pub fn with_schema(mut self, system_name: &str, attributes: Vec<(&str, DataType)>) -> Self {
        self.custom.insert(
            system_name.to_string(),
            attributes
                .into_iter()
                .map(|(name, data_type)| DiscoveredAttribute {
                    name: name.to_string(),
                    data_type,
                })
                .collect(),
        );
        self
    }

    fn schema_for(&self, system_name: &str) -> Vec<DiscoveredAttribute> {
        if let Some(custom) = self.custom.get(system_name) {
            return custom.clone();
        }

        let attrs: &[(&str, DataType)] = match system_name {
            "CORE_BANKING" => &[
                ("customers.customer_id", DataType::Text),
                ("customers.first_name", DataType::Text),
                ("customers.last_name", DataType::Text),
                ("customers.date_of_birth", DataType::Date),
                ("customers.creation_date", DataType::Timestamp),
                ("accounts.account_id", DataType::Text),
                ("accounts.balance", DataType::Real),
                ("accounts.open_date", DataType::Date),
                ("accounts.status", DataType::Text),
            ],
            "CRM_SYSTEM" => &[
                ("contacts.contact_id", DataType::Text),
                ("contacts.crm_customer_id", DataType::Text),
                ("contacts.email", DataType::Text),
                ("contacts.phone", DataType::Text),
                ("contacts.city", DataType::Text),
                ("contacts.state", DataType::Text),
                ("preferences.marketing_opt_in", DataType::Boolean),
                ("preferences.last_updated", DataType::Timestamp),
            ],
            "LOAN_SYSTEM" => &[
                ("loans.loan_id", DataType::Text),
                ("loans.loan_customer_id", DataType::Text),
                ("loans.principal", DataType::Real),
                ("loans.interest_rate", DataType::Real),
                ("loans.term_months", DataType::Integer),
                ("loans.start_date", DataType::Date),
                ("credit_scores.score_value", DataType::Integer),
                ("credit_scores.score_date", DataType::Date),
            ],
            "CARD_SYSTEM" => &[
                ("cards.card_id", DataType::Text),
                ("cards.card_customer_id", DataType::Text),
                ("cards.credit_limit", DataType::Real),
                ("cards.expiry_date", DataType::Date),
                ("card_transactions.amount", DataType::Real),
                ("card_transactions.transaction_date", DataType::Timestamp),
            ],
            "DIGITAL_BANKING" => &[
                ("users.user_id", DataType::Text),
                ("users.digital_customer_id", DataType::Text),
                ("users.username", DataType::Text),
                ("users.email", DataType::Text),
                ("users.registration_date", DataType::Timestamp),
                ("users.last_login", DataType::Timestamp),
            ],
            _ => &[
                ("records.id", DataType::Text),
                ("records.value", DataType::Text),
            ],
        };

        attrs
            .iter()
            .map(|(name, data_type)| DiscoveredAttribute {
                name: name.to_string(),
                data_type: *data_type,
            })
            .collect()
    }

    fn sample_value(attribute: &str, data_type: DataType, i: usize) -> Option<String> {
        let column = attribute.rsplit('.').next().unwrap_or(attribute);
        let lower = column.to_lowercase();

        let value = match data_type {
            DataType::Text => {
                if lower.contains("id") {
                    let prefix: String = column.chars().take(3).collect();
                    format!("{}{}", prefix.to_uppercase(), 100000 + i)
                } else if lower.contains("name") {
                    const FIRST: [&str; 6] = ["John", "Jane", "Michael", "Sarah", "David", "Lisa"];
                    const LAST: [&str; 6] = ["Smith", "Johnson", "Brown", "Davis", "Wilson", "Lee"];
                    format!("{} {}", FIRST[i % FIRST.len()], LAST[i % LAST.len()])
                } else if lower.contains("email") {
                    const DOMAINS: [&str; 4] =
                        ["gmail.com", "yahoo.com", "outlook.com", "example.com"];
                    format!("user{}@{}", i, DOMAINS[i % DOMAINS.len()])
                } else if lower.contains("phone") {
                    format!("555-{:03}-{:04}", 100 + i, 1000 + i)
                } else if lower.contains("city") {
                    const CITIES: [&str; 5] =
                        ["New York", "Los Angeles", "Chicago", "Houston", "Phoenix"];
                    CITIES[i % CITIES.len()].to_string()
                } else if lower.contains("state") {
                    const STATES: [&str; 5] = ["NY", "CA", "IL", "TX", "AZ"];
                    STATES[i % STATES.len()].to_string()
                } else if lower.contains("status") {
                    const STATUSES: [&str; 4] = ["Active", "Inactive", "Pending", "Suspended"];
                    STATUSES[i % STATUSES.len()].to_string()
                } else {
                    format!("sample-{}-{}", column, i)
                }
            },
            DataType::Integer => {
                if lower.contains("score") {
                    (500 + i * 50).to_string()
                } else {
                    (i * 1000).to_string()
                }
            },
            DataType::Real => {
                if lower.contains("balance") || lower.contains("amount") {
                    format!("{:.2}", 1000.0 + i as f64 * 500.75)
                } else if lower.contains("rate") {
                    format!("{:.3}", 0.01 + i as f64 * 0.005)
                } else {
                    format!("{:.2}", i as f64 * 100.5)
                }
            },
            DataType::Date => {
                let base = NaiveDate::from_ymd_opt(2023, 1, 1)?;
                (base + Duration::days(i as i64 * 30))
                    .format("%Y-%m-%d")
                    .to_string()
            },
            DataType::Timestamp => {
                let base = NaiveDate::from_ymd_opt(2023, 1, 1)?.and_hms_opt(12, 0, 0)?;
                let ts: NaiveDateTime = base + Duration::days(i as i64) + Duration::hours(i as i64);
                ts.format("%Y-%m-%dT%H:%M:%S").to_string()
            },
            DataType::Boolean => (i % 2 == 0).to_string(),
        };

        Some(value)
    }
}

#[async_trait]
impl ScanAdapter for FixtureScanAdapter {
    async fn scan(&self, source: &SourceSystem) -> Result<Vec<DiscoveredAttribute>, ScanError> {
        Ok(self.schema_for(&source.name))
    }

    async fn sample(
        &self,
        source: &SourceSystem,
        attribute: &str,
        limit: usize,
    ) -> Result<Vec<Option<String>>, ScanError> {
        let schema = self.schema_for(&source.name);
        let discovered = schema
            .iter()
            .find(|a| a.name == attribute)
            .ok_or_else(|| ScanError::UnknownAttribute(attribute.to_string()))?;

        Ok((0..limit)
            .map(|i| Self::sample_value(attribute, discovered.data_type, i))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn source(name: &str) -> SourceSystem {
        SourceSystem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            owner: String::new(),
            active: true,
            degraded: false,
            last_scanned_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_known_system_schema() {
        let adapter = FixtureScanAdapter::new();
        let attrs = adapter.scan(&source("CRM_SYSTEM")).await.unwrap();
        assert!(attrs.iter().any(|a| a.name == "contacts.email"));
    }

    #[tokio::test]
    async fn test_unknown_system_gets_generic_schema() {
        let adapter = FixtureScanAdapter::new();
        let attrs = adapter.scan(&source("SOMETHING_ELSE")).await.unwrap();
        assert_eq!(attrs.len(), 2);
    }

    #[tokio::test]
    async fn test_custom_schema_overrides() {
        let adapter = FixtureScanAdapter::new()
            .with_schema("CRM", vec![("customers.cust_id", DataType::Text)]);
        let attrs = adapter.scan(&source("CRM")).await.unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].name, "customers.cust_id");
    }

    #[tokio::test]
    async fn test_samples_are_deterministic_and_non_null() {
        let adapter = FixtureScanAdapter::new();
        let src = source("CRM_SYSTEM");
        let first = adapter.sample(&src, "contacts.email", 10).await.unwrap();
        let second = adapter.sample(&src, "contacts.email", 10).await.unwrap();
        assert_eq!(first, second);
        assert!(first.iter().all(|v| v.is_some()));
    }

    #[tokio::test]
    async fn test_unknown_attribute_rejected() {
        let adapter = FixtureScanAdapter::new();
        let result = adapter.sample(&source("CRM_SYSTEM"), "nope.nope", 5).await;
        assert!(matches!(result, Err(ScanError::UnknownAttribute(_))));
    }
}
