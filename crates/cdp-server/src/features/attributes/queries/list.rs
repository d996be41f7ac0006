//! List target attributes query

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use cdp_common::types::TargetAttribute;

use crate::state::AppState;

/// Query to list target attributes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAttributesQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Response with attributes and per-category counts
#[derive(Debug, Clone, Serialize)]
pub struct ListAttributesResponse {
    pub attributes: Vec<TargetAttribute>,
    pub count: usize,
    pub category_counts: BTreeMap<String, usize>,
}

pub async fn handle(state: AppState, query: ListAttributesQuery) -> ListAttributesResponse {
    let attributes = state.catalog.list(query.category.as_deref()).await;
    let category_counts = state.catalog.category_counts().await;

    ListAttributesResponse {
        count: attributes.len(),
        attributes,
        category_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;

    #[tokio::test]
    async fn test_list_with_category_filter() {
        let state = test_support::state_with_crm().await;

        let all = handle(state.clone(), ListAttributesQuery::default()).await;
        assert!(all.count > 0);

        let contact = handle(
            state,
            ListAttributesQuery {
                category: Some("contact".to_string()),
            },
        )
        .await;
        assert!(contact.count < all.count);
        assert!(contact.attributes.iter().all(|a| a.category == "contact"));
    }
}
