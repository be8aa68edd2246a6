// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::sync::OnceLock;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    // 1. Initialize Tracing (Logs)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "witness_node=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Initialize Metrics (Prometheus)
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => tracing::warn!("Metrics recorder not installed: {}", e),
    }

    metrics::describe_counter!("witness_inbound_messages_total", "Replication messages received, by topic");
    metrics::describe_counter!("witness_malformed_messages_total", "Replication messages discarded as malformed");
    metrics::describe_counter!("witness_publications_total", "Events persisted and published, by topic");
    metrics::describe_counter!("witness_retries_total", "Store or transport calls retried");
    metrics::describe_counter!("witness_promotions_total", "Rumors promoted to news");
    metrics::describe_counter!("witness_notifications_total", "Notifications posted, by severity");
    metrics::describe_gauge!("witness_known_events", "Events held by the local replica");

    metrics::gauge!("witness_node_up", 1.0);
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
