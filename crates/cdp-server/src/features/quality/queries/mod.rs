pub mod field_issues;
pub mod metrics;

pub use field_issues::FieldIssuesQuery;
pub use metrics::MetricsQuery;
