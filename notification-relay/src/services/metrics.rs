//! Metrics for notification-relay.
//!
//! HTTP request metrics come from the `metrics` recorder; relay outcomes and
//! provider calls are kept in a `prometheus` registry and appended to the
//! same scrape output.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static RELAY_NOTIFICATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static RELAY_PROVIDER_CALLS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Install the recorder and register relay counters. Call once at startup.
pub fn init_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    METRICS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("metrics recorder already initialized"))?;

    let registry = Registry::new();

    let notifications_counter = IntCounterVec::new(
        Opts::new(
            "relay_notifications_total",
            "Relay requests by FCM mode and outcome",
        ),
        &["mode", "outcome"],
    )?;

    let provider_calls_counter = IntCounterVec::new(
        Opts::new(
            "relay_provider_calls_total",
            "FCM API calls by endpoint and HTTP status",
        ),
        &["endpoint", "status"],
    )?;

    registry.register(Box::new(notifications_counter.clone()))?;
    registry.register(Box::new(provider_calls_counter.clone()))?;

    PROMETHEUS_REGISTRY
        .set(registry)
        .map_err(|_| anyhow::anyhow!("prometheus registry already initialized"))?;
    RELAY_NOTIFICATIONS_TOTAL
        .set(notifications_counter)
        .map_err(|_| anyhow::anyhow!("relay_notifications_total already initialized"))?;
    RELAY_PROVIDER_CALLS_TOTAL
        .set(provider_calls_counter)
        .map_err(|_| anyhow::anyhow!("relay_provider_calls_total already initialized"))?;

    Ok(())
}

/// Metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

pub fn record_notification(mode: &str, outcome: &str) {
    if let Some(counter) = RELAY_NOTIFICATIONS_TOTAL.get() {
        counter.with_label_values(&[mode, outcome]).inc();
    }
}

pub fn record_provider_call(endpoint: &str, status: &str) {
    if let Some(counter) = RELAY_PROVIDER_CALLS_TOTAL.get() {
        counter.with_label_values(&[endpoint, status]).inc();
    }
}
