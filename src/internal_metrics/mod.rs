//! # Internal Metrics Module
//!
//! Prometheus instrumentation for the watcher.
//!
//! - **`MetricsBuilder`**: installs the Prometheus recorder and binds the
//!   listener for the `/metrics` endpoint.
//! - **`MetricsServer`**: (Defined in `server.rs`) the `axum` server that
//!   renders the exposition format.
//!
//! Components record through the `metrics` macros directly; when metrics are
//! disabled no recorder is installed and those calls are no-ops.

pub mod server;

use crate::config::MetricsConfig;
use crate::internal_metrics::server::MetricsServer;
use anyhow::{Context, Result};
use metrics::Unit;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::error;

/// Registers descriptions for every metric the application emits.
pub fn describe_metrics() {
    metrics::describe_counter!("station_polls_total", Unit::Count, "Background polls of the station endpoint, labeled by outcome.");
    metrics::describe_histogram!("station_fetch_duration_seconds", Unit::Seconds, "Latency of a single station fetch.");
    metrics::describe_counter!("notifications_dispatched_total", Unit::Count, "Availability notifications fanned out to subscribers.");
    metrics::describe_counter!("push_deliveries_total", Unit::Count, "Individual push deliveries, labeled by outcome.");
    metrics::describe_counter!("subscriptions_pruned_total", Unit::Count, "Subscriptions removed because the push service reported them gone.");
    metrics::describe_gauge!("push_subscriptions", Unit::Count, "Push subscriptions currently registered.");
}

/// Builder for the metrics system.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    /// Creates a new `MetricsBuilder` with the given configuration.
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Installs the recorder and returns the server with its bound address.
    ///
    /// Returns `Ok(None)` when metrics are disabled.
    pub async fn build(
        self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<Option<(MetricsServer, SocketAddr)>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0],
            )?
            .build_recorder();
        let handle = recorder.handle();

        let listener = TcpListener::bind(self.config.listen_address)
            .await
            .with_context(|| format!("Failed to bind metrics server to {}", self.config.listen_address))?;
        let addr = listener.local_addr()?;

        if let Err(e) = metrics::set_global_recorder(recorder) {
            // A recorder can only be installed once per process.
            error!("Failed to install Prometheus recorder: {}", e);
            return Ok(None);
        }
        describe_metrics();

        Ok(Some((MetricsServer::new(listener, handle, shutdown_rx), addr)))
    }
}
