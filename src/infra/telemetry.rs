use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

static METRIC_DESCRIPTIONS: Once = Once::new();

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry error: {0}")]
    Init(String),
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Compact,
        }
    }
}

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), TelemetryError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| TelemetryError::Init(format!("failed to install tracing subscriber: {err}")))
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "freshet_cache_hit_total",
            Unit::Count,
            "Total number of cache hits, labeled by read kind."
        );
        describe_counter!(
            "freshet_cache_miss_total",
            Unit::Count,
            "Total number of cache misses, labeled by read kind."
        );
        describe_counter!(
            "freshet_cache_bypass_total",
            Unit::Count,
            "Total number of reads served directly from the store without consulting the cache."
        );
        describe_counter!(
            "freshet_invalidation_purged_total",
            Unit::Count,
            "Total number of cache entries purged by invalidation."
        );
        describe_counter!(
            "freshet_invalidation_failed_total",
            Unit::Count,
            "Total number of invalidation steps that failed and were dropped."
        );
        describe_histogram!(
            "freshet_invalidation_ms",
            Unit::Milliseconds,
            "Invalidation pass latency in milliseconds."
        );
    });
}
