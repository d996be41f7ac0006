//! Mapping suggestion engine
//!
//! Proposes candidate mappings for a scanned source system against the
//! target attribute catalog. Suggestions are advisory: nothing is
//! persisted until a caller explicitly creates a mapping from one.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::mapping::score;
use crate::mapping::scorer::ScoreCandidate;
use crate::mapping::transform;
use crate::state::AppState;

/// Where a suggestion's score came from. `heuristic` is also the tag for
/// an enhanced request that fell back, so callers can tell a degraded
/// answer from an enhanced one instead of being silently served either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreOrigin {
    Heuristic,
    Enhanced,
}

/// One ranked candidate mapping, not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MappingSuggestion {
    pub source_attribute_id: Uuid,
    pub source_attribute_name: String,
    pub target_attribute_id: Uuid,
    pub target_attribute_name: String,
    pub confidence_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformation_logic: Option<String>,
}

/// The ranked suggestion list for one source system.
#[derive(Debug, Clone, Serialize)]
pub struct RankedSuggestions {
    pub source_system_id: Uuid,
    pub source_system_name: String,
    pub origin: ScoreOrigin,
    pub suggestions: Vec<MappingSuggestion>,
}

/// Errors from the suggestion engine
#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("Source system {0} not found")]
    SourceNotFound(Uuid),

    #[error("Source system {0} has no scanned attributes")]
    NoScannedAttributes(Uuid),
}

/// Rank candidate mappings for a source system.
///
/// Every (source attribute, target attribute) pair not already mapped is
/// scored heuristically; with `use_enhanced` the pluggable scorer refines
/// those scores under a bounded timeout, falling back silently on any
/// error. Ordering: score descending, then Levenshtein distance between
/// names ascending, then target attribute id for determinism.
#[tracing::instrument(skip(state))]
pub async fn suggest(
    state: &AppState,
    source_system_id: Uuid,
    use_enhanced: bool,
) -> Result<RankedSuggestions, SuggestError> {
    let source = state
        .sources
        .get(source_system_id)
        .await
        .ok_or(SuggestError::SourceNotFound(source_system_id))?;

    let attributes = state.sources.attributes_of(source_system_id).await;
    if attributes.is_empty() {
        return Err(SuggestError::NoScannedAttributes(source_system_id));
    }

    let targets = state.catalog.list(None).await;
    let mapped = state.mappings.mapped_pairs(source_system_id).await;

    let mut candidates = Vec::new();
    for attribute in &attributes {
        for target in &targets {
            if mapped.contains(&(attribute.id, target.id)) {
                continue;
            }
            let base = score::base_score(
                &attribute.name,
                attribute.data_type,
                &target.name,
                target.data_type,
            );
            candidates.push(ScoreCandidate {
                source_attribute_id: attribute.id,
                target_attribute_id: target.id,
                source_name: attribute.name.clone(),
                target_name: target.name.clone(),
                base_score: base,
            });
        }
    }

    let mut scores: HashMap<(Uuid, Uuid), f64> = candidates
        .iter()
        .map(|c| ((c.source_attribute_id, c.target_attribute_id), c.base_score))
        .collect();

    let mut origin = ScoreOrigin::Heuristic;
    if use_enhanced {
        if let Some(scorer) = &state.scorer {
            let budget = Duration::from_millis(state.config.engine.scorer_timeout_ms);
            match tokio::time::timeout(budget, scorer.score(&candidates)).await {
                Ok(Ok(refined)) => {
                    for scored in refined {
                        scores.insert(
                            (scored.source_attribute_id, scored.target_attribute_id),
                            scored.score.clamp(0.0, 1.0),
                        );
                    }
                    origin = ScoreOrigin::Enhanced;
                },
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Enhanced scorer failed, falling back to heuristic scores");
                },
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = state.config.engine.scorer_timeout_ms,
                        "Enhanced scorer timed out, falling back to heuristic scores"
                    );
                },
            }
        } else {
            tracing::debug!("Enhanced scoring requested but no scorer is configured");
        }
    }

    let attribute_types: HashMap<Uuid, _> = attributes.iter().map(|a| (a.id, a.data_type)).collect();
    let target_types: HashMap<Uuid, _> = targets.iter().map(|t| (t.id, t.data_type)).collect();

    let floor = state.config.engine.suggestion_floor;
    let mut ranked: Vec<(MappingSuggestion, usize)> = candidates
        .iter()
        .filter_map(|c| {
            let confidence = *scores.get(&(c.source_attribute_id, c.target_attribute_id))?;
            if confidence < floor {
                return None;
            }
            let source_type = *attribute_types.get(&c.source_attribute_id)?;
            let target_type = *target_types.get(&c.target_attribute_id)?;
            let distance = score::levenshtein(score::column_part(&c.source_name), &c.target_name);
            Some((
                MappingSuggestion {
                    source_attribute_id: c.source_attribute_id,
                    source_attribute_name: c.source_name.clone(),
                    target_attribute_id: c.target_attribute_id,
                    target_attribute_name: c.target_name.clone(),
                    confidence_score: confidence,
                    transformation_logic: transform::generate(source_type, target_type),
                },
                distance,
            ))
        })
        .collect();

    ranked.sort_by(|(a, da), (b, db)| {
        b.confidence_score
            .total_cmp(&a.confidence_score)
            .then(da.cmp(db))
            .then(a.target_attribute_id.cmp(&b.target_attribute_id))
    });

    Ok(RankedSuggestions {
        source_system_id,
        source_system_name: source.name,
        origin,
        suggestions: ranked.into_iter().map(|(s, _)| s).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support;
    use cdp_common::types::DataType;

    #[tokio::test]
    async fn test_identifier_ranks_above_unrelated_target() {
        let state = test_support::state_with_crm().await;
        let source = state.sources.find_by_name("CRM").await.unwrap();

        let ranked = suggest(&state, source.id, false).await.unwrap();
        assert_eq!(ranked.origin, ScoreOrigin::Heuristic);

        let position = |target: &str| {
            ranked
                .suggestions
                .iter()
                .position(|s| {
                    s.target_attribute_name == target && s.source_attribute_name.ends_with("cust_id")
                })
        };

        let id_rank = position("customer_id").expect("cust_id -> customer_id suggested");
        // cust_id -> full_name scores zero token overlap and is either
        // dropped by the floor or ranked strictly below.
        if let Some(name_rank) = position("full_name") {
            assert!(id_rank < name_rank);
        }
    }

    #[tokio::test]
    async fn test_unscanned_source_is_rejected() {
        let state = test_support::empty_state().await;
        let source = state
            .sources
            .register("EMPTY", "", "")
            .await
            .unwrap();

        let result = suggest(&state, source.id, false).await;
        assert!(matches!(result, Err(SuggestError::NoScannedAttributes(_))));
    }

    #[tokio::test]
    async fn test_unknown_source_is_rejected() {
        let state = test_support::empty_state().await;
        let result = suggest(&state, Uuid::new_v4(), false).await;
        assert!(matches!(result, Err(SuggestError::SourceNotFound(_))));
    }

    #[tokio::test]
    async fn test_enhanced_request_without_scorer_falls_back() {
        let state = test_support::state_with_crm().await;
        let source = state.sources.find_by_name("CRM").await.unwrap();

        let ranked = suggest(&state, source.id, true).await.unwrap();
        assert_eq!(ranked.origin, ScoreOrigin::Heuristic);
        assert!(!ranked.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_already_mapped_pairs_are_excluded() {
        let state = test_support::state_with_crm().await;
        let source = state.sources.find_by_name("CRM").await.unwrap();
        let attributes = state.sources.attributes_of(source.id).await;
        let cust_id = attributes
            .iter()
            .find(|a| a.name.ends_with("cust_id"))
            .unwrap();
        let target = state.catalog.find_by_name("customer_id").await.unwrap();

        state
            .mappings
            .create(crate::store::NewMapping {
                source_system_id: source.id,
                source_attribute_id: cust_id.id,
                target_attribute_id: target.id,
                transformation_logic: None,
                status: cdp_common::types::MappingStatus::Pending,
                confidence_score: 0.0,
                created_by: "test".to_string(),
            })
            .await
            .unwrap();

        let ranked = suggest(&state, source.id, false).await.unwrap();
        assert!(!ranked.suggestions.iter().any(|s| {
            s.source_attribute_id == cust_id.id && s.target_attribute_id == target.id
        }));
    }

    #[tokio::test]
    async fn test_determinism() {
        let state = test_support::state_with_crm().await;
        let source = state.sources.find_by_name("CRM").await.unwrap();

        let first = suggest(&state, source.id, false).await.unwrap();
        let second = suggest(&state, source.id, false).await.unwrap();
        let a: Vec<_> = first
            .suggestions
            .iter()
            .map(|s| (s.source_attribute_id, s.target_attribute_id))
            .collect();
        let b: Vec<_> = second
            .suggestions
            .iter()
            .map(|s| (s.source_attribute_id, s.target_attribute_id))
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_suggestion_type_compat() {
        // date-of-birth style attribute should prefer the date target
        let date_score = score::base_score(
            "customers.date_of_birth",
            DataType::Date,
            "date_of_birth",
            DataType::Date,
        );
        assert!(date_score > 0.9);
    }
}
