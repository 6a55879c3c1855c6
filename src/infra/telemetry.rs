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

/// Register units and help text for the collection cache metrics.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "folio_cache_hit_total",
            Unit::Count,
            "Reads served from a fresh collection entry."
        );
        describe_counter!(
            "folio_cache_miss_total",
            Unit::Count,
            "Reads that went to the store, labelled by why the entry was unusable."
        );
        describe_counter!(
            "folio_cache_invalidate_total",
            Unit::Count,
            "Collection entries cleared after a write or an explicit flush."
        );
        describe_counter!(
            "folio_cache_fetch_error_total",
            Unit::Count,
            "Store fetches that failed during read-through or preload."
        );
        describe_histogram!(
            "folio_cache_fetch_ms",
            Unit::Milliseconds,
            "Store fetch latency per collection in milliseconds."
        );
        describe_histogram!(
            "folio_cache_preload_ms",
            Unit::Milliseconds,
            "Wall time of the start-up preload in milliseconds."
        );
    });
}
