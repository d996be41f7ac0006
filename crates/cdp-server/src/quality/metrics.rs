//! Quality metrics
//!
//! Computes completeness, uniqueness, consistency, accuracy, and
//! timeliness over materialized rows, each in [0, 1], with the overall
//! score as their unweighted mean.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use cdp_common::types::{DataType, QualityMetrics};

use super::format;
use super::materialized::{MaterializedError, MaterializedRow};
use crate::state::AppState;

/// Scope of a metrics computation.
#[derive(Debug, Clone, Copy)]
pub enum MetricsScope {
    All,
    Source(Uuid),
    Attribute(Uuid),
}

/// Errors from metrics computation
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Source system {0} not found")]
    SourceNotFound(Uuid),

    #[error("Target attribute {0} not found")]
    AttributeNotFound(Uuid),

    #[error(transparent)]
    Store(#[from] MaterializedError),
}

/// Metrics for one target attribute.
#[derive(Debug, Clone, Serialize)]
pub struct AttributeQuality {
    pub target_attribute_id: Uuid,
    pub attribute_name: String,
    pub row_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    pub metrics: QualityMetrics,
}

/// Metrics report for a scope.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub scope: String,
    pub attributes: Vec<AttributeQuality>,
    /// Mean across the attributes in scope; absent when nothing is
    /// materialized yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall: Option<QualityMetrics>,
}

/// Compute metrics for a scope against the materialized data.
#[tracing::instrument(skip(state))]
pub async fn compute(state: &AppState, scope: MetricsScope) -> Result<MetricsReport, MetricsError> {
    let now = Utc::now();

    let (label, attribute_ids) = match scope {
        MetricsScope::Attribute(id) => {
            if state.catalog.get(id).await.is_none() {
                return Err(MetricsError::AttributeNotFound(id));
            }
            (format!("attribute:{id}"), vec![id])
        },
        MetricsScope::Source(id) => {
            if state.sources.get(id).await.is_none() {
                return Err(MetricsError::SourceNotFound(id));
            }
            let mut ids: Vec<Uuid> = state
                .mappings
                .validated_for_source(id)
                .await
                .into_iter()
                .map(|m| m.target_attribute_id)
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            ids.sort();
            (format!("source:{id}"), ids)
        },
        MetricsScope::All => {
            let ids = state.materialized.attribute_ids().await?;
            ("all".to_string(), ids)
        },
    };

    let type_by_id: HashMap<Uuid, (String, DataType)> = {
        let mut map = HashMap::new();
        for id in &attribute_ids {
            if let Some(attr) = state.catalog.get(*id).await {
                map.insert(*id, (attr.name, attr.data_type));
            }
        }
        map
    };

    let mut attributes = Vec::with_capacity(attribute_ids.len());
    for id in attribute_ids {
        let Some((name, data_type)) = type_by_id.get(&id).cloned() else {
            continue;
        };
        let rows = state.materialized.read(id).await?;
        let last_updated = rows.iter().map(|r| r.updated_at).max();
        let metrics = compute_for_rows(
            data_type,
            &rows,
            state.config.quality.staleness_sla_hours,
            now,
        );
        attributes.push(AttributeQuality {
            target_attribute_id: id,
            attribute_name: name,
            row_count: rows.len() as u64,
            last_updated,
            metrics,
        });
    }

    let overall = mean_metrics(&attributes);

    Ok(MetricsReport {
        scope: label,
        attributes,
        overall,
    })
}

/// Compute the five dimensions for one attribute's rows.
pub fn compute_for_rows(
    data_type: DataType,
    rows: &[MaterializedRow],
    sla_hours: i64,
    now: DateTime<Utc>,
) -> QualityMetrics {
    let total = rows.len();
    if total == 0 {
        return QualityMetrics::new(0.0, 0.0, 0.0, 0.0, 0.0);
    }

    let non_null: Vec<&str> = rows.iter().filter_map(|r| r.value.as_deref()).collect();

    let completeness = non_null.len() as f64 / total as f64;

    let uniqueness = if non_null.is_empty() {
        0.0
    } else {
        let distinct: HashSet<&&str> = non_null.iter().collect();
        distinct.len() as f64 / non_null.len() as f64
    };

    let mut seen_keys = HashSet::new();
    let mut duplicates = 0usize;
    for row in rows {
        if !seen_keys.insert(row.record_key.as_str()) {
            duplicates += 1;
        }
    }
    let consistency = 1.0 - duplicates as f64 / total as f64;

    let accuracy = if non_null.is_empty() {
        0.0
    } else {
        let matching = non_null
            .iter()
            .filter(|v| format::value_matches(data_type, v))
            .count();
        matching as f64 / non_null.len() as f64
    };

    let timeliness = match rows.iter().map(|r| r.updated_at).max() {
        Some(newest) => staleness_score(newest, sla_hours, now),
        None => 0.0,
    };

    QualityMetrics::new(completeness, uniqueness, consistency, accuracy, timeliness)
}

/// 1.0 while within the SLA, then linear decay to 0 at twice the SLA.
pub fn staleness_score(newest: DateTime<Utc>, sla_hours: i64, now: DateTime<Utc>) -> f64 {
    let sla = Duration::hours(sla_hours);
    let age = now - newest;
    if age <= sla {
        1.0
    } else {
        let overshoot = (age - sla).num_seconds() as f64;
        (1.0 - overshoot / sla.num_seconds() as f64).max(0.0)
    }
}

fn mean_metrics(attributes: &[AttributeQuality]) -> Option<QualityMetrics> {
    if attributes.is_empty() {
        return None;
    }
    let n = attributes.len() as f64;
    let sum = |f: fn(&QualityMetrics) -> f64| attributes.iter().map(|a| f(&a.metrics)).sum::<f64>() / n;
    Some(QualityMetrics::new(
        sum(|m| m.completeness),
        sum(|m| m.uniqueness),
        sum(|m| m.consistency),
        sum(|m| m.accuracy),
        sum(|m| m.timeliness),
    ))
}
