//! Common domain types used across CDP
//!
//! The entities here mirror the registry model: source systems and their
//! scanned attributes, the canonical target attribute catalog, mappings
//! between the two, quality issues detected over materialized data, and
//! ETL jobs with their steps and logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CdpError;

/// Data type vocabulary shared by source attributes and target attributes.
///
/// Parsing accepts the wider vocabulary seen in source schemas (VARCHAR,
/// DECIMAL, DATETIME, ...) and normalizes it to this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
    Integer,
    Real,
    Date,
    Timestamp,
    Boolean,
}

impl DataType {
    /// Whether a value of `self` can be coerced into `target` through a
    /// simple transformation (cast, parse, format).
    pub fn is_coercible_to(self, target: DataType) -> bool {
        use DataType::*;
        matches!(
            (self, target),
            (_, Text)
                | (Text, _)
                | (Integer, Real)
                | (Date, Timestamp)
                | (Timestamp, Date)
                | (Boolean, Integer)
        )
    }

    /// Multiplicative compatibility factor used by suggestion scoring:
    /// 1.0 for an exact type match, 0.6 for coercible, 0.1 otherwise.
    pub fn compatibility_factor(self, target: DataType) -> f64 {
        if self == target {
            1.0
        } else if self.is_coercible_to(target) {
            0.6
        } else {
            0.1
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = CdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TEXT" | "STRING" | "VARCHAR" | "CHAR" => Ok(DataType::Text),
            "INTEGER" | "INT" | "BIGINT" => Ok(DataType::Integer),
            "REAL" | "FLOAT" | "DOUBLE" | "DECIMAL" | "NUMERIC" => Ok(DataType::Real),
            "DATE" => Ok(DataType::Date),
            "TIMESTAMP" | "DATETIME" => Ok(DataType::Timestamp),
            "BOOLEAN" | "BOOL" => Ok(DataType::Boolean),
            other => Err(CdpError::InvalidDataType(other.to_string())),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataType::Text => "text",
            DataType::Integer => "integer",
            DataType::Real => "real",
            DataType::Date => "date",
            DataType::Timestamp => "timestamp",
            DataType::Boolean => "boolean",
        };
        write!(f, "{}", s)
    }
}

/// A registered source system.
///
/// Source systems are never hard-deleted; `active` is flipped off instead.
/// `degraded` is set when the most recent scan attempt failed, so callers
/// can distinguish "never scanned" from "scan currently failing".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSystem {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub active: bool,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An attribute discovered by scanning a source system.
///
/// The full set for a system is replaced wholesale on each successful
/// scan; attributes are never merged incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAttribute {
    pub id: Uuid,
    pub source_system_id: Uuid,
    /// Qualified name as reported by the connector, e.g. `customers.cust_id`
    pub name: String,
    pub data_type: DataType,
}

/// A canonical target attribute exposed by the data product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetAttribute {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub category: String,
    pub data_type: DataType,
    pub required: bool,
    pub pii: bool,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle status of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    Pending,
    Proposed,
    Validated,
    Issues,
}

impl std::str::FromStr for MappingStatus {
    type Err = CdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(MappingStatus::Pending),
            "proposed" => Ok(MappingStatus::Proposed),
            "validated" => Ok(MappingStatus::Validated),
            "issues" => Ok(MappingStatus::Issues),
            other => Err(CdpError::InvalidStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MappingStatus::Pending => "pending",
            MappingStatus::Proposed => "proposed",
            MappingStatus::Validated => "validated",
            MappingStatus::Issues => "issues",
        };
        write!(f, "{}", s)
    }
}

/// A mapping between one source attribute and one target attribute.
///
/// `source_system_id` is denormalized from the source attribute so fan-in
/// checks and lineage assembly need no cross-store lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mapping {
    pub id: Uuid,
    pub source_system_id: Uuid,
    pub source_attribute_id: Uuid,
    pub target_attribute_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformation_logic: Option<String>,
    pub status: MappingStatus,
    pub confidence_score: f64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Classification of one sampled value during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleOutcome {
    Valid,
    Null,
    Error,
}

/// One input/output pair recorded during a validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub outcome: SampleOutcome,
}

/// Severity of a validation anomaly or quality issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::str::FromStr for Severity {
    type Err = CdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(CdpError::InvalidStatus(other.to_string())),
        }
    }
}

/// An anomaly observed while validating a mapping against sample data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationAnomaly {
    pub severity: Severity,
    pub message: String,
}

/// The audit record of a single validation run. Runs are append-only; a
/// new run supersedes the previous one for display but history is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRun {
    pub id: Uuid,
    pub mapping_id: Uuid,
    pub run_at: DateTime<Utc>,
    pub samples: Vec<SampleCheck>,
    pub valid_count: usize,
    pub null_count: usize,
    pub error_count: usize,
    pub confidence: f64,
    pub anomalies: Vec<ValidationAnomaly>,
    pub outcome: MappingStatus,
}

/// Quality dimension that an issue is reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Completeness,
    Uniqueness,
    Consistency,
    Accuracy,
    Timeliness,
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IssueType::Completeness => "completeness",
            IssueType::Uniqueness => "uniqueness",
            IssueType::Consistency => "consistency",
            IssueType::Accuracy => "accuracy",
            IssueType::Timeliness => "timeliness",
        };
        write!(f, "{}", s)
    }
}

/// A candidate remediation attached to a quality issue.
///
/// `parameters` describes the accepted parameters as a JSON object of
/// `name -> {type, description, default?}` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixOption {
    pub fix_type: String,
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A detected data quality issue with its candidate fixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    pub id: Uuid,
    pub target_attribute_id: Uuid,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
    pub affected_record_count: u64,
    pub detected_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    pub fix_options: Vec<FixOption>,
}

impl QualityIssue {
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}

/// Per-attribute quality metrics, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub completeness: f64,
    pub uniqueness: f64,
    pub consistency: f64,
    pub accuracy: f64,
    pub timeliness: f64,
    /// Unweighted mean of the five dimensions
    pub overall: f64,
}

impl QualityMetrics {
    pub fn new(
        completeness: f64,
        uniqueness: f64,
        consistency: f64,
        accuracy: f64,
        timeliness: f64,
    ) -> Self {
        let overall = (completeness + uniqueness + consistency + accuracy + timeliness) / 5.0;
        Self {
            completeness,
            uniqueness,
            consistency,
            accuracy,
            timeliness,
            overall,
        }
    }
}

/// ETL job type. Job types are fixed, not user-scriptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullLoad,
    Incremental,
    RefreshMetadata,
}

impl std::str::FromStr for JobType {
    type Err = CdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full_load" => Ok(JobType::FullLoad),
            "incremental" => Ok(JobType::Incremental),
            "refresh_metadata" => Ok(JobType::RefreshMetadata),
            other => Err(CdpError::InvalidJobType(other.to_string())),
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobType::FullLoad => "full_load",
            JobType::Incremental => "incremental",
            JobType::RefreshMetadata => "refresh_metadata",
        };
        write!(f, "{}", s)
    }
}

/// Job lifecycle status: `queued -> running -> {completed|failed|cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Execution status of a single job step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// One ordered step inside a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStep {
    pub name: String,
    pub status: StepStatus,
    pub records_processed: u64,
    pub records_failed: u64,
}

/// Log line severity for job logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobLogLevel {
    Info,
    Warn,
    Error,
}

/// One ordered log entry attached to a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLog {
    pub timestamp: DateTime<Utc>,
    pub level: JobLogLevel,
    pub message: String,
}

/// An ETL job with its ordered steps and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    pub job_type: JobType,
    pub source_system_id: Uuid,
    pub status: JobStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub steps: Vec<JobStep>,
    pub logs: Vec<JobLog>,
}

/// Job counts by status. `total` is always the sum of the five buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatistics {
    pub queued: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub total: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_parsing() {
        assert_eq!("VARCHAR".parse::<DataType>().unwrap(), DataType::Text);
        assert_eq!("DECIMAL".parse::<DataType>().unwrap(), DataType::Real);
        assert_eq!("datetime".parse::<DataType>().unwrap(), DataType::Timestamp);
        assert!("BLOB".parse::<DataType>().is_err());
    }

    #[test]
    fn test_compatibility_factor() {
        assert_eq!(DataType::Text.compatibility_factor(DataType::Text), 1.0);
        assert_eq!(DataType::Integer.compatibility_factor(DataType::Real), 0.6);
        assert_eq!(DataType::Date.compatibility_factor(DataType::Boolean), 0.1);
        // everything can be rendered as text
        assert_eq!(DataType::Boolean.compatibility_factor(DataType::Text), 0.6);
    }

    #[test]
    fn test_mapping_status_round_trip() {
        for s in ["pending", "proposed", "validated", "issues"] {
            let status: MappingStatus = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_quality_metrics_overall_is_mean() {
        let m = QualityMetrics::new(1.0, 0.5, 1.0, 0.5, 0.5);
        assert!((m.overall - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_job_type_serde_names() {
        let t = serde_json::to_string(&JobType::FullLoad).unwrap();
        assert_eq!(t, "\"full_load\"");
    }
}
