//! # Prometheus Metrics
//!
//! Operational metrics in Prometheus text exposition format, scraped from
//! `GET /metrics`.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `sitebeam_http_request_duration_seconds` | Histogram | `method`, `path` | Request latency |
//! | `sitebeam_reconcile_runs` | Counter | `mode` | Reconciler invocations (report/repair/batch) |
//! | `sitebeam_projects_needing_update` | Gauge | — | Projects with progress drift |
//! | `sitebeam_db_pool_active` / `_idle` | Gauge | — | Connection pool state |
//!
//! Gauges are refreshed by the dashboard's background audit loop; the
//! histogram is fed by the request middleware.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

/// Label set for the request duration histogram.
#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct HttpLabel {
    pub method: String,
    pub path: String,
}

/// Label set for reconciler counters.
#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct ModeLabel {
    pub mode: String,
}

/// Thread-safe metrics registry. All fields are atomic and safe to update
/// from any async task.
pub struct Metrics {
    pub registry: Registry,
    pub http_request_duration: Family<HttpLabel, Histogram>,
    pub reconcile_runs: Family<ModeLabel, Counter>,
    pub projects_needing_update: Gauge,
    pub db_pool_active: Gauge,
    pub db_pool_idle: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_request_duration = Family::<HttpLabel, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.001, 2.0, 14))
        });
        registry.register(
            "sitebeam_http_request_duration_seconds",
            "HTTP request duration by method and normalized path",
            http_request_duration.clone(),
        );

        let reconcile_runs = Family::<ModeLabel, Counter>::default();
        registry.register(
            "sitebeam_reconcile_runs",
            "Progress reconciler invocations by mode",
            reconcile_runs.clone(),
        );

        let projects_needing_update = Gauge::default();
        registry.register(
            "sitebeam_projects_needing_update",
            "Projects whose persisted progress/status drifted from milestones",
            projects_needing_update.clone(),
        );

        let db_pool_active = Gauge::default();
        registry.register(
            "sitebeam_db_pool_active",
            "Active database connections",
            db_pool_active.clone(),
        );

        let db_pool_idle = Gauge::default();
        registry.register(
            "sitebeam_db_pool_idle",
            "Idle database connections",
            db_pool_idle.clone(),
        );

        Self {
            registry,
            http_request_duration,
            reconcile_runs,
            projects_needing_update,
            db_pool_active,
            db_pool_idle,
        }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        encode(&mut buf, &self.registry).expect("encoding metrics should not fail");
        buf
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_encode_returns_valid_text() {
        let m = Metrics::new();
        m.projects_needing_update.set(3);
        m.reconcile_runs
            .get_or_create(&ModeLabel {
                mode: "repair".to_string(),
            })
            .inc();

        let output = m.encode();
        assert!(output.contains("sitebeam_projects_needing_update"));
        assert!(output.contains("sitebeam_reconcile_runs"));
        assert!(output.contains("repair"));
    }

    #[test]
    fn metrics_default_values_are_zero() {
        let m = Metrics::new();
        let output = m.encode();
        assert!(output.contains("sitebeam_db_pool_active"));
        assert!(output.contains("sitebeam_db_pool_idle"));
    }
}
