//! # Prometheus Metrics
//!
//! Exposes operational metrics for the custody node. Scraped by Prometheus
//! at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (wraps `Arc` internally via prometheus handles) so it can
/// be shared across request handlers and the event bridge.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total number of vaults opened since startup.
    pub vaults_opened_total: IntCounter,
    /// Total number of top-up deposits accepted.
    pub deposits_total: IntCounter,
    /// Total number of withdrawals paid out (owner withdrawals and
    /// beneficiary claims both count).
    pub withdrawals_total: IntCounter,
    /// Total number of emergency releases, penalty and all.
    pub emergency_releases_total: IntCounter,
    /// Current number of active vaults.
    pub active_vaults: IntGauge,
    /// Embers currently locked across all active vaults.
    pub embers_locked: IntGauge,
    /// Histogram of inbound deposit sizes in embers (creations and top-ups).
    pub deposit_size_embers: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("vesta".into()), None)
            .expect("failed to create prometheus registry");

        let vaults_opened_total = IntCounter::new(
            "vaults_opened_total",
            "Total number of vaults opened since startup",
        )
        .expect("metric creation");
        registry
            .register(Box::new(vaults_opened_total.clone()))
            .expect("metric registration");

        let deposits_total = IntCounter::new(
            "deposits_total",
            "Total number of top-up deposits accepted",
        )
        .expect("metric creation");
        registry
            .register(Box::new(deposits_total.clone()))
            .expect("metric registration");

        let withdrawals_total = IntCounter::new(
            "withdrawals_total",
            "Total number of withdrawals paid out, claims included",
        )
        .expect("metric creation");
        registry
            .register(Box::new(withdrawals_total.clone()))
            .expect("metric registration");

        let emergency_releases_total = IntCounter::new(
            "emergency_releases_total",
            "Total number of emergency releases",
        )
        .expect("metric creation");
        registry
            .register(Box::new(emergency_releases_total.clone()))
            .expect("metric registration");

        let active_vaults = IntGauge::new("active_vaults", "Current number of active vaults")
            .expect("metric creation");
        registry
            .register(Box::new(active_vaults.clone()))
            .expect("metric registration");

        let embers_locked = IntGauge::new(
            "embers_locked",
            "Embers currently locked across all active vaults",
        )
        .expect("metric creation");
        registry
            .register(Box::new(embers_locked.clone()))
            .expect("metric registration");

        let deposit_size_embers = Histogram::with_opts(
            HistogramOpts::new(
                "deposit_size_embers",
                "Inbound deposit sizes in embers, creations and top-ups",
            )
            .buckets(vec![
                10.0, 100.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0, 10_000_000.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(deposit_size_embers.clone()))
            .expect("metric registration");

        Self {
            registry,
            vaults_opened_total,
            deposits_total,
            withdrawals_total,
            emergency_releases_total,
            active_vaults,
            embers_locked,
            deposit_size_embers,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers via extension.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
