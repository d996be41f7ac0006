//! Lineage assembler
//!
//! Builds, per target attribute, a staged directed graph: contributing
//! source systems first, distinct transformation nodes in the middle, the
//! target attribute last. The graph is derived on demand from mapping and
//! job state and never persisted, so it can never drift from its sources.
//! Assembly is a pure function of store state: identical state always
//! yields a byte-identical serialized graph.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use cdp_common::types::{JobStatus, MappingStatus};

use crate::state::AppState;

/// Errors from lineage assembly
#[derive(Debug, Error)]
pub enum LineageError {
    #[error("Target attribute '{0}' not found")]
    AttributeNotFound(String),

    #[error("No mapping references target attribute {0}")]
    NoMappings(Uuid),
}

/// A contributing source attribute inside a source node.
#[derive(Debug, Clone, Serialize)]
pub struct ContributingAttribute {
    pub mapping_id: Uuid,
    pub source_attribute_id: Uuid,
    pub source_attribute_name: String,
    pub status: MappingStatus,
    pub confidence_score: f64,
}

/// The most recent completed load for a source system.
#[derive(Debug, Clone, Serialize)]
pub struct LastCompletedJob {
    pub job_id: Uuid,
    pub job_name: String,
    pub ended_at: Option<DateTime<Utc>>,
}

/// One node in the lineage graph.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineageNode {
    Source {
        source_system_id: Uuid,
        source_system_name: String,
        degraded: bool,
        attributes: Vec<ContributingAttribute>,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_completed_job: Option<LastCompletedJob>,
    },
    Transformation {
        logic: String,
        mapping_count: usize,
    },
    Target {
        target_attribute_id: Uuid,
        target_attribute_name: String,
        distinct_source_count: usize,
    },
}

/// One stage of the graph. Stage 0 holds sources, the final stage the
/// target; an intermediate stage exists only when transformations do.
#[derive(Debug, Clone, Serialize)]
pub struct LineageStage {
    pub index: usize,
    pub nodes: Vec<LineageNode>,
}

/// The assembled lineage graph for one target attribute.
#[derive(Debug, Clone, Serialize)]
pub struct LineageGraph {
    pub target_attribute_id: Uuid,
    pub target_attribute_name: String,
    pub stages: Vec<LineageStage>,
}

/// Assemble the lineage graph for a target attribute.
#[tracing::instrument(skip(state))]
pub async fn assemble(
    state: &AppState,
    target_attribute_id: Uuid,
) -> Result<LineageGraph, LineageError> {
    let target = state
        .catalog
        .get(target_attribute_id)
        .await
        .ok_or_else(|| LineageError::AttributeNotFound(target_attribute_id.to_string()))?;

    let mappings = state.mappings.for_target(target_attribute_id).await;
    if mappings.is_empty() {
        return Err(LineageError::NoMappings(target_attribute_id));
    }

    // Stage 0: one node per distinct contributing source system, keyed and
    // ordered by system id for determinism.
    let mut by_system: BTreeMap<Uuid, Vec<ContributingAttribute>> = BTreeMap::new();
    for mapping in &mappings {
        let name = state
            .sources
            .attribute(mapping.source_attribute_id)
            .await
            .map(|a| a.name)
            .unwrap_or_else(|| mapping.source_attribute_id.to_string());
        by_system
            .entry(mapping.source_system_id)
            .or_default()
            .push(ContributingAttribute {
                mapping_id: mapping.id,
                source_attribute_id: mapping.source_attribute_id,
                source_attribute_name: name,
                status: mapping.status,
                confidence_score: mapping.confidence_score,
            });
    }

    let mut source_nodes = Vec::with_capacity(by_system.len());
    for (system_id, mut attributes) in by_system {
        attributes.sort_by(|a, b| {
            a.source_attribute_name
                .cmp(&b.source_attribute_name)
                .then(a.mapping_id.cmp(&b.mapping_id))
        });

        let (name, degraded) = match state.sources.get(system_id).await {
            Some(system) => (system.name, system.degraded),
            None => (system_id.to_string(), false),
        };

        source_nodes.push(LineageNode::Source {
            source_system_id: system_id,
            source_system_name: name,
            degraded,
            attributes,
            last_completed_job: last_completed_job(state, system_id).await,
        });
    }

    let distinct_source_count = source_nodes.len();

    // Intermediate stage: one node per distinct non-empty transformation
    // logic string; nodes with identical logic text merge.
    let mut transformations: BTreeMap<String, usize> = BTreeMap::new();
    for mapping in &mappings {
        if let Some(logic) = mapping
            .transformation_logic
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
        {
            *transformations.entry(logic.to_string()).or_insert(0) += 1;
        }
    }

    let mut stages = Vec::with_capacity(3);
    stages.push(LineageStage {
        index: 0,
        nodes: source_nodes,
    });

    if !transformations.is_empty() {
        stages.push(LineageStage {
            index: 1,
            nodes: transformations
                .into_iter()
                .map(|(logic, mapping_count)| LineageNode::Transformation {
                    logic,
                    mapping_count,
                })
                .collect(),
        });
    }

    let terminal_index = stages.len();
    stages.push(LineageStage {
        index: terminal_index,
        nodes: vec![LineageNode::Target {
            target_attribute_id,
            target_attribute_name: target.name,
            distinct_source_count,
        }],
    });

    Ok(LineageGraph {
        target_attribute_id,
        target_attribute_name: target.display_name,
        stages,
    })
}

/// The newest completed job for a source system, by end time then id so
/// the answer is stable for fixed job data.
async fn last_completed_job(state: &AppState, source_system_id: Uuid) -> Option<LastCompletedJob> {
    let jobs = state.jobs.list_history(usize::MAX).await;
    jobs.into_iter()
        .filter(|j| j.source_system_id == source_system_id && j.status == JobStatus::Completed)
        .max_by(|a, b| a.ended_at.cmp(&b.ended_at).then(a.id.cmp(&b.id)))
        .map(|job| LastCompletedJob {
            job_id: job.id,
            job_name: job.name,
            ended_at: job.ended_at,
        })
}
