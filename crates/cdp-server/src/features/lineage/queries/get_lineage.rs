//! Get lineage query
//!
//! With an `attribute` parameter, assembles the full staged graph for
//! that target attribute. Without one, returns a per-attribute overview
//! of every mapped attribute.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cdp_common::types::MappingStatus;

use crate::error::AppError;
use crate::lineage::{self, LineageError, LineageGraph};
use crate::state::AppState;
use crate::store::MappingFilter;

/// Query for lineage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetLineageQuery {
    /// Target attribute name (or id) to assemble the graph for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

/// Overview entry for one mapped target attribute
#[derive(Debug, Clone, Serialize)]
pub struct LineageOverviewEntry {
    pub target_attribute_id: Uuid,
    pub target_attribute_name: String,
    pub mapping_count: usize,
    pub validated_count: usize,
    pub distinct_source_count: usize,
}

/// Either a full graph or the overview
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GetLineageResponse {
    Graph(LineageGraph),
    Overview {
        attributes: Vec<LineageOverviewEntry>,
        count: usize,
    },
}

/// Errors for the lineage query
#[derive(Debug, thiserror::Error)]
pub enum GetLineageError {
    #[error("Target attribute '{0}' not found")]
    AttributeNotFound(String),

    #[error(transparent)]
    Lineage(#[from] LineageError),
}

impl From<GetLineageError> for AppError {
    fn from(e: GetLineageError) -> Self {
        AppError::NotFound(e.to_string())
    }
}

pub async fn handle(
    state: AppState,
    query: GetLineageQuery,
) -> Result<GetLineageResponse, GetLineageError> {
    match query.attribute {
        Some(attribute) => {
            let target = match state.catalog.find_by_name(&attribute).await {
                Some(target) => target,
                None => {
                    // Fall back to an id lookup for API convenience.
                    match attribute.parse::<Uuid>() {
                        Ok(id) => state
                            .catalog
                            .get(id)
                            .await
                            .ok_or_else(|| GetLineageError::AttributeNotFound(attribute.clone()))?,
                        Err(_) => return Err(GetLineageError::AttributeNotFound(attribute)),
                    }
                },
            };

            let graph = lineage::assemble(&state, target.id).await?;
            Ok(GetLineageResponse::Graph(graph))
        },
        None => {
            let mappings = state.mappings.list(&MappingFilter::default()).await;

            let mut by_target: BTreeMap<Uuid, (usize, usize, std::collections::BTreeSet<Uuid>)> =
                BTreeMap::new();
            for mapping in &mappings {
                let entry = by_target.entry(mapping.target_attribute_id).or_default();
                entry.0 += 1;
                if mapping.status == MappingStatus::Validated {
                    entry.1 += 1;
                }
                entry.2.insert(mapping.source_system_id);
            }

            let mut attributes = Vec::with_capacity(by_target.len());
            for (target_id, (mapping_count, validated_count, sources)) in by_target {
                let name = state
                    .catalog
                    .get(target_id)
                    .await
                    .map(|a| a.name)
                    .unwrap_or_else(|| target_id.to_string());
                attributes.push(LineageOverviewEntry {
                    target_attribute_id: target_id,
                    target_attribute_name: name,
                    mapping_count,
                    validated_count,
                    distinct_source_count: sources.len(),
                });
            }

            Ok(GetLineageResponse::Overview {
                count: attributes.len(),
                attributes,
            })
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;

    #[tokio::test]
    async fn test_graph_by_attribute_name() {
        let state = test_support::state_with_crm().await;
        test_support::crm_mapping(&state, "cust_id", "customer_id").await;

        let response = handle(
            state,
            GetLineageQuery {
                attribute: Some("customer_id".to_string()),
            },
        )
        .await
        .unwrap();
        assert!(matches!(response, GetLineageResponse::Graph(_)));
    }

    #[tokio::test]
    async fn test_overview_without_attribute() {
        let state = test_support::state_with_crm().await;
        test_support::crm_mapping(&state, "cust_id", "customer_id").await;
        test_support::crm_mapping(&state, "full_nm", "full_name").await;

        let response = handle(state, GetLineageQuery::default()).await.unwrap();
        match response {
            GetLineageResponse::Overview { count, attributes } => {
                assert_eq!(count, 2);
                assert!(attributes.iter().all(|a| a.mapping_count == 1));
            },
            other => panic!("expected overview, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_attribute() {
        let state = test_support::state_with_crm().await;
        let result = handle(
            state,
            GetLineageQuery {
                attribute: Some("nonexistent".to_string()),
            },
        )
        .await;
        assert!(matches!(result, Err(GetLineageError::AttributeNotFound(_))));
    }
}
