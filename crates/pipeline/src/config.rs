//! Pipeline configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use vantage_core::report::DEFAULT_RETENTION_DAYS;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Read `var`, falling back to `default` when unset. A set but unparsable
/// value is an error rather than a silent fallback.
pub fn env_or<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

/// Read a required variable.
pub fn env_required(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(var))
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pause between successive text-generation calls within one run.
    pub generation_delay: Duration,
    /// How long a finished job stays queryable.
    pub job_ttl: Duration,
    pub job_eviction_interval: Duration,
    /// Days a generated report stays downloadable.
    pub report_retention_days: i64,
    pub report_output_dir: PathBuf,
    /// Frontend base URL used for links in notification emails.
    pub app_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generation_delay: Duration::from_secs(15),
            job_ttl: Duration::from_secs(3600),
            job_eviction_interval: Duration::from_secs(60),
            report_retention_days: DEFAULT_RETENTION_DAYS,
            report_output_dir: PathBuf::from("./data/reports"),
            app_base_url: "http://localhost:5173".to_string(),
        }
    }
}

impl PipelineConfig {
    /// | Env Var                      | Default                 |
    /// |------------------------------|-------------------------|
    /// | `GENERATION_DELAY_SECS`      | `15`                    |
    /// | `JOB_TTL_SECS`               | `3600`                  |
    /// | `JOB_EVICTION_INTERVAL_SECS` | `60`                    |
    /// | `REPORT_RETENTION_DAYS`      | `30`                    |
    /// | `REPORT_OUTPUT_DIR`          | `./data/reports`        |
    /// | `APP_BASE_URL`               | `http://localhost:5173` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let report_retention_days: i64 =
            env_or("REPORT_RETENTION_DAYS", defaults.report_retention_days)?;
        if report_retention_days < 1 {
            return Err(ConfigError::Invalid {
                var: "REPORT_RETENTION_DAYS",
                value: report_retention_days.to_string(),
            });
        }

        Ok(Self {
            generation_delay: Duration::from_secs(env_or("GENERATION_DELAY_SECS", 15u64)?),
            job_ttl: Duration::from_secs(env_or("JOB_TTL_SECS", 3600u64)?),
            job_eviction_interval: Duration::from_secs(env_or(
                "JOB_EVICTION_INTERVAL_SECS",
                60u64,
            )?),
            report_retention_days,
            report_output_dir: env_or("REPORT_OUTPUT_DIR", defaults.report_output_dir)?,
            app_base_url: env_or("APP_BASE_URL", defaults.app_base_url)?,
        })
    }
}
