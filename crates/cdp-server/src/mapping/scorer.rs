//! Pluggable confidence scorer
//!
//! The suggestion engine can consult an external model to refine its
//! heuristic scores. The call is strictly time-bounded by the caller; any
//! error or timeout falls back to the heuristic scores and is never
//! surfaced to the API caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// One candidate pair sent to the scorer, with its heuristic base score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreCandidate {
    pub source_attribute_id: Uuid,
    pub target_attribute_id: Uuid,
    pub source_name: String,
    pub target_name: String,
    pub base_score: f64,
}

/// A refined score returned by the scorer.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredCandidate {
    pub source_attribute_id: Uuid,
    pub target_attribute_id: Uuid,
    pub score: f64,
}

/// Errors from a scorer call
#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("Scorer request failed: {0}")]
    Request(String),

    #[error("Scorer returned a malformed payload: {0}")]
    Malformed(String),
}

/// An external confidence scorer.
#[async_trait]
pub trait ConfidenceScorer: Send + Sync {
    async fn score(
        &self,
        candidates: &[ScoreCandidate],
    ) -> Result<Vec<ScoredCandidate>, ScorerError>;
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    candidates: &'a [ScoreCandidate],
}

#[derive(Deserialize)]
struct ScoreResponse {
    scores: Vec<ScoredCandidate>,
}

/// Scorer backed by a remote HTTP service.
pub struct HttpScorer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpScorer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ConfidenceScorer for HttpScorer {
    async fn score(
        &self,
        candidates: &[ScoreCandidate],
    ) -> Result<Vec<ScoredCandidate>, ScorerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ScoreRequest { candidates })
            .send()
            .await
            .map_err(|e| ScorerError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| ScorerError::Request(e.to_string()))?;

        let payload: ScoreResponse = response
            .json()
            .await
            .map_err(|e| ScorerError::Malformed(e.to_string()))?;

        Ok(payload.scores)
    }
}
