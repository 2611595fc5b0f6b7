//! Prometheus Metrics Registry - Reserve Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards:
//! orchestrated operations by outcome, snapshot versions per domain and
//! invalid fetch results per source.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

/// Centralized Prometheus metrics for the reserve.
///
/// All metrics follow the naming convention `reserve_*`.
pub struct MetricsRegistry {
    registry: Registry,
    /// Orchestrated operations by action and outcome (`ok` / `error`).
    pub operations_total: IntCounterVec,
    /// Latest version written per snapshot domain.
    pub snapshot_version: IntGaugeVec,
    /// Fetch results that came back invalid, by source and kind.
    pub fetch_invalid_total: IntCounterVec,
    /// Wall time of one complete fetch cycle.
    pub fetch_cycle_seconds: Histogram,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let operations_total = IntCounterVec::new(
            Opts::new(
                "reserve_operations_total",
                "Orchestrated reserve operations by outcome",
            ),
            &["action", "outcome"],
        )?;

        let snapshot_version = IntGaugeVec::new(
            Opts::new(
                "reserve_snapshot_version",
                "Latest snapshot version per data domain",
            ),
            &["domain"],
        )?;

        let fetch_invalid_total = IntCounterVec::new(
            Opts::new(
                "reserve_fetch_invalid_total",
                "Fetched entries marked invalid",
            ),
            &["source", "kind"],
        )?;

        let fetch_cycle_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "reserve_fetch_cycle_seconds",
                "Duration of a complete fetch cycle",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;

        registry.register(Box::new(operations_total.clone()))?;
        registry.register(Box::new(snapshot_version.clone()))?;
        registry.register(Box::new(fetch_invalid_total.clone()))?;
        registry.register(Box::new(fetch_cycle_seconds.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            snapshot_version,
            fetch_invalid_total,
            fetch_cycle_seconds,
        })
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Serve `/metrics` on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics = Arc::clone(&self);
        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics);
                async move { metrics.render() }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_registered_metrics() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics
            .operations_total
            .with_label_values(&["trade", "ok"])
            .inc();
        metrics
            .snapshot_version
            .with_label_values(&["price"])
            .set(3);

        let text = metrics.render();
        assert!(text.contains("reserve_operations_total{action=\"trade\",outcome=\"ok\"} 1"));
        assert!(text.contains("reserve_snapshot_version{domain=\"price\"} 3"));
    }
}
