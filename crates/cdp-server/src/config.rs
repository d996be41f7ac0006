//! Configuration management

use serde::{Deserialize, Serialize};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Default confidence threshold for promoting a mapping to `validated`.
pub const DEFAULT_VALIDATION_THRESHOLD: f64 = 0.8;

/// Default weight of the fresh validation result when blending with the
/// mapping's prior confidence (recency-weighted toward validation).
pub const DEFAULT_VALIDATION_BLEND_WEIGHT: f64 = 0.7;

/// Default number of source values sampled per validation run.
pub const DEFAULT_SAMPLE_SIZE: usize = 20;

/// Suggestions scoring below this floor are dropped from the ranking.
pub const DEFAULT_SUGGESTION_FLOOR: f64 = 0.2;

/// Default time budget for the optional remote confidence scorer.
pub const DEFAULT_SCORER_TIMEOUT_MS: u64 = 1500;

/// Default retry bound for transient scan failures.
pub const DEFAULT_SCAN_RETRY_LIMIT: u32 = 2;
pub const DEFAULT_SCAN_RETRY_BACKOFF_MS: u64 = 200;

/// Default null-rate threshold above which a completeness issue is raised.
pub const DEFAULT_NULL_RATE_THRESHOLD: f64 = 0.05;

/// Default duplicate-key-rate threshold for consistency issues.
pub const DEFAULT_DUPLICATE_RATE_THRESHOLD: f64 = 0.02;

/// Default format-failure-rate threshold for accuracy issues.
pub const DEFAULT_FORMAT_FAILURE_THRESHOLD: f64 = 0.05;

/// Default staleness SLA for timeliness, in hours.
pub const DEFAULT_STALENESS_SLA_HOURS: i64 = 24;

/// Default retry bound for transient materialized-store failures during
/// fix application.
pub const DEFAULT_FIX_RETRY_LIMIT: u32 = 3;
pub const DEFAULT_FIX_RETRY_BACKOFF_MS: u64 = 100;

/// Maximum change entries returned in a fix application diff summary.
pub const DEFAULT_MAX_CHANGE_ENTRIES: usize = 25;

/// Default worker-pool concurrency for job execution.
pub const DEFAULT_JOB_CONCURRENCY: usize = 4;

/// Default retry bound for retryable job step errors.
pub const DEFAULT_STEP_RETRY_LIMIT: u32 = 2;
pub const DEFAULT_STEP_RETRY_BACKOFF_MS: u64 = 100;

/// Default number of source rows materialized per load step.
pub const DEFAULT_LOAD_BATCH_SIZE: usize = 50;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub engine: EngineConfig,
    pub quality: QualityConfig,
    pub jobs: JobsConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Mapping suggestion / validation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub validation_threshold: f64,
    pub validation_blend_weight: f64,
    pub sample_size: usize,
    pub suggestion_floor: f64,
    /// Endpoint of the optional remote confidence scorer; unset disables it
    pub scorer_endpoint: Option<String>,
    pub scorer_timeout_ms: u64,
    pub scan_retry_limit: u32,
    pub scan_retry_backoff_ms: u64,
}

/// Data quality engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    pub null_rate_threshold: f64,
    pub duplicate_rate_threshold: f64,
    pub format_failure_threshold: f64,
    pub staleness_sla_hours: i64,
    pub fix_retry_limit: u32,
    pub fix_retry_backoff_ms: u64,
    pub max_change_entries: usize,
}

/// Job orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    pub max_concurrency: usize,
    pub step_retry_limit: u32,
    pub step_retry_backoff_ms: u64,
    pub load_batch_size: usize,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("CDP_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_parse("CDP_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_parse(
                    "CDP_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
                allow_credentials: env_parse("CORS_ALLOW_CREDENTIALS", true),
            },
            engine: EngineConfig {
                validation_threshold: env_parse(
                    "CDP_VALIDATION_THRESHOLD",
                    DEFAULT_VALIDATION_THRESHOLD,
                ),
                validation_blend_weight: env_parse(
                    "CDP_VALIDATION_BLEND_WEIGHT",
                    DEFAULT_VALIDATION_BLEND_WEIGHT,
                ),
                sample_size: env_parse("CDP_SAMPLE_SIZE", DEFAULT_SAMPLE_SIZE),
                suggestion_floor: env_parse("CDP_SUGGESTION_FLOOR", DEFAULT_SUGGESTION_FLOOR),
                scorer_endpoint: std::env::var("CDP_SCORER_ENDPOINT").ok(),
                scorer_timeout_ms: env_parse("CDP_SCORER_TIMEOUT_MS", DEFAULT_SCORER_TIMEOUT_MS),
                scan_retry_limit: env_parse("CDP_SCAN_RETRY_LIMIT", DEFAULT_SCAN_RETRY_LIMIT),
                scan_retry_backoff_ms: env_parse(
                    "CDP_SCAN_RETRY_BACKOFF_MS",
                    DEFAULT_SCAN_RETRY_BACKOFF_MS,
                ),
            },
            quality: QualityConfig {
                null_rate_threshold: env_parse(
                    "CDP_NULL_RATE_THRESHOLD",
                    DEFAULT_NULL_RATE_THRESHOLD,
                ),
                duplicate_rate_threshold: env_parse(
                    "CDP_DUPLICATE_RATE_THRESHOLD",
                    DEFAULT_DUPLICATE_RATE_THRESHOLD,
                ),
                format_failure_threshold: env_parse(
                    "CDP_FORMAT_FAILURE_THRESHOLD",
                    DEFAULT_FORMAT_FAILURE_THRESHOLD,
                ),
                staleness_sla_hours: env_parse(
                    "CDP_STALENESS_SLA_HOURS",
                    DEFAULT_STALENESS_SLA_HOURS,
                ),
                fix_retry_limit: env_parse("CDP_FIX_RETRY_LIMIT", DEFAULT_FIX_RETRY_LIMIT),
                fix_retry_backoff_ms: env_parse(
                    "CDP_FIX_RETRY_BACKOFF_MS",
                    DEFAULT_FIX_RETRY_BACKOFF_MS,
                ),
                max_change_entries: env_parse("CDP_MAX_CHANGE_ENTRIES", DEFAULT_MAX_CHANGE_ENTRIES),
            },
            jobs: JobsConfig {
                max_concurrency: env_parse("CDP_JOB_CONCURRENCY", DEFAULT_JOB_CONCURRENCY),
                step_retry_limit: env_parse("CDP_STEP_RETRY_LIMIT", DEFAULT_STEP_RETRY_LIMIT),
                step_retry_backoff_ms: env_parse(
                    "CDP_STEP_RETRY_BACKOFF_MS",
                    DEFAULT_STEP_RETRY_BACKOFF_MS,
                ),
                load_batch_size: env_parse("CDP_LOAD_BATCH_SIZE", DEFAULT_LOAD_BATCH_SIZE),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if !(0.0..=1.0).contains(&self.engine.validation_threshold) {
            anyhow::bail!(
                "Validation threshold must be within [0, 1], got {}",
                self.engine.validation_threshold
            );
        }

        if !(0.0..=1.0).contains(&self.engine.validation_blend_weight) {
            anyhow::bail!(
                "Validation blend weight must be within [0, 1], got {}",
                self.engine.validation_blend_weight
            );
        }

        if self.engine.sample_size == 0 {
            anyhow::bail!("Sample size must be greater than 0");
        }

        if self.jobs.max_concurrency == 0 {
            anyhow::bail!("Job concurrency must be greater than 0");
        }

        if self.quality.staleness_sla_hours <= 0 {
            anyhow::bail!("Staleness SLA must be greater than 0 hours");
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            engine: EngineConfig {
                validation_threshold: DEFAULT_VALIDATION_THRESHOLD,
                validation_blend_weight: DEFAULT_VALIDATION_BLEND_WEIGHT,
                sample_size: DEFAULT_SAMPLE_SIZE,
                suggestion_floor: DEFAULT_SUGGESTION_FLOOR,
                scorer_endpoint: None,
                scorer_timeout_ms: DEFAULT_SCORER_TIMEOUT_MS,
                scan_retry_limit: DEFAULT_SCAN_RETRY_LIMIT,
                scan_retry_backoff_ms: DEFAULT_SCAN_RETRY_BACKOFF_MS,
            },
            quality: QualityConfig {
                null_rate_threshold: DEFAULT_NULL_RATE_THRESHOLD,
                duplicate_rate_threshold: DEFAULT_DUPLICATE_RATE_THRESHOLD,
                format_failure_threshold: DEFAULT_FORMAT_FAILURE_THRESHOLD,
                staleness_sla_hours: DEFAULT_STALENESS_SLA_HOURS,
                fix_retry_limit: DEFAULT_FIX_RETRY_LIMIT,
                fix_retry_backoff_ms: DEFAULT_FIX_RETRY_BACKOFF_MS,
                max_change_entries: DEFAULT_MAX_CHANGE_ENTRIES,
            },
            jobs: JobsConfig {
                max_concurrency: DEFAULT_JOB_CONCURRENCY,
                step_retry_limit: DEFAULT_STEP_RETRY_LIMIT,
                step_retry_backoff_ms: DEFAULT_STEP_RETRY_BACKOFF_MS,
                load_batch_size: DEFAULT_LOAD_BATCH_SIZE,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut config = Config::default();
        config.engine.validation_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = Config::default();
        config.jobs.max_concurrency = 0;
        assert!(config.validate().is_err());
    }
}
