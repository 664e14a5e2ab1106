use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
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
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "helpgate_loader_batches_total",
            Unit::Count,
            "Total number of batches dispatched per loader."
        );
        describe_histogram!(
            "helpgate_loader_batch_size",
            Unit::Count,
            "Number of keys in each dispatched loader batch."
        );
        describe_counter!(
            "helpgate_loader_cache_hit_total",
            Unit::Count,
            "Total number of value-cache hits per family."
        );
        describe_counter!(
            "helpgate_loader_cache_miss_total",
            Unit::Count,
            "Total number of value-cache misses per family."
        );
        describe_counter!(
            "helpgate_cache_evict_total",
            Unit::Count,
            "Total number of value-cache evictions due to capacity."
        );
        describe_counter!(
            "helpgate_examiner_dropped_total",
            Unit::Count,
            "Total number of freshness checks dropped because the examiner queue was full."
        );
        describe_counter!(
            "helpgate_examiner_sync_total",
            Unit::Count,
            "Total number of examiner syncs by family and result."
        );
    });
}
