use anyhow::{Context, Result};
use bon::Builder;
use chrono::Duration;
use std::str::FromStr;

use crate::descriptor::Tier;
use crate::error::LifecycleError;

pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_SMALL_DB_SIZE: &str = "db.r5.2xlarge";
pub const DEFAULT_BIG_DB_SIZE: &str = "db.r5.8xlarge";

/// Process-wide settings, read once at cold start.
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(on(String, into))]
pub struct LifecycleConfig {
    /// Raw tier selector. Validated per request so that a bad value surfaces
    /// as a rejected invocation rather than a crashed runtime.
    #[builder(default = "TEST".to_string())]
    pub stage: String,

    #[builder(default = DEFAULT_REGION.to_string())]
    pub region: String,

    #[builder(default = DEFAULT_SMALL_DB_SIZE.to_string())]
    pub small_instance_class: String,

    #[builder(default = DEFAULT_BIG_DB_SIZE.to_string())]
    pub big_instance_class: String,

    #[builder(default = 70.0)]
    pub grow_threshold: f64,

    #[builder(default = 25.0)]
    pub shrink_threshold: f64,

    #[builder(default = 300)]
    pub grow_window_seconds: i64,

    #[builder(default = 900)]
    pub shrink_window_seconds: i64,

    #[builder(default = 300)]
    pub metric_period_seconds: i32,

    /// Batch jobs started longer ago than this are treated as abandoned.
    #[builder(default = 4)]
    pub etl_staleness_days: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl LifecycleConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            stage: std::env::var("STAGE").unwrap_or(defaults.stage),
            region: std::env::var("AWS_DEPLOYMENT_REGION").unwrap_or(defaults.region),
            small_instance_class: std::env::var("SMALL_DB_SIZE")
                .unwrap_or(defaults.small_instance_class),
            big_instance_class: std::env::var("BIG_DB_SIZE").unwrap_or(defaults.big_instance_class),
            grow_threshold: env_or("GROW_CPU_THRESHOLD", defaults.grow_threshold)?,
            shrink_threshold: env_or("SHRINK_CPU_THRESHOLD", defaults.shrink_threshold)?,
            grow_window_seconds: env_or("GROW_EVALUATION_SECONDS", defaults.grow_window_seconds)?,
            shrink_window_seconds: env_or(
                "SHRINK_EVALUATION_SECONDS",
                defaults.shrink_window_seconds,
            )?,
            metric_period_seconds: env_or(
                "CPU_METRIC_PERIOD_SECONDS",
                defaults.metric_period_seconds,
            )?,
            etl_staleness_days: env_or("ETL_STALENESS_DAYS", defaults.etl_staleness_days)?,
        })
    }

    pub fn tier(&self) -> Result<Tier, LifecycleError> {
        self.stage.parse()
    }

    pub fn etl_staleness(&self) -> Duration {
        Duration::days(self.etl_staleness_days)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
