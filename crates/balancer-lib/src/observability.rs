//! Observability infrastructure for the load balancer
//!
//! Provides:
//! - Prometheus metrics (routing decisions, forecasts, spikes, server health)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge, register_gauge_vec, register_histogram, register_int_counter,
    register_int_counter_vec, register_int_gauge, Gauge, GaugeVec, Histogram, IntCounter,
    IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for selection latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.000005, 0.00001, 0.000025, 0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.005, 0.01,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<BalancerMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct BalancerMetricsInner {
    selection_latency_seconds: Histogram,
    routing_decisions: IntCounterVec,
    no_server_available: IntCounter,
    traffic_spikes: IntCounter,
    ingestion_errors: IntCounterVec,
    predicted_traffic: Gauge,
    current_traffic: Gauge,
    server_health_score: GaugeVec,
    servers_known: IntGauge,
    servers_overloaded: IntGauge,
}

impl BalancerMetricsInner {
    fn new() -> Self {
        Self {
            selection_latency_seconds: register_histogram!(
                "predictive_lb_selection_latency_seconds",
                "Time spent choosing a destination server",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register selection_latency_seconds"),

            routing_decisions: register_int_counter_vec!(
                "predictive_lb_routing_decisions_total",
                "Routing decisions by selection mode",
                &["mode"]
            )
            .expect("Failed to register routing_decisions"),

            no_server_available: register_int_counter!(
                "predictive_lb_no_server_available_total",
                "Routing requests that found no server at all"
            )
            .expect("Failed to register no_server_available"),

            traffic_spikes: register_int_counter!(
                "predictive_lb_traffic_spikes_total",
                "Traffic observations flagged as spikes"
            )
            .expect("Failed to register traffic_spikes"),

            ingestion_errors: register_int_counter_vec!(
                "predictive_lb_ingestion_errors_total",
                "Failed traffic or metrics probes",
                &["source"]
            )
            .expect("Failed to register ingestion_errors"),

            predicted_traffic: register_gauge!(
                "predictive_lb_predicted_traffic",
                "Most recent traffic forecast"
            )
            .expect("Failed to register predicted_traffic"),

            current_traffic: register_gauge!(
                "predictive_lb_current_traffic",
                "Most recent observed aggregate traffic"
            )
            .expect("Failed to register current_traffic"),

            server_health_score: register_gauge_vec!(
                "predictive_lb_server_health_score",
                "Latest health score per server",
                &["server"]
            )
            .expect("Failed to register server_health_score"),

            servers_known: register_int_gauge!(
                "predictive_lb_servers_known",
                "Number of servers with reported metrics"
            )
            .expect("Failed to register servers_known"),

            servers_overloaded: register_int_gauge!(
                "predictive_lb_servers_overloaded",
                "Number of servers above an overload threshold"
            )
            .expect("Failed to register servers_overloaded"),
        }
    }
}

/// Balancer metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct BalancerMetrics {
    _private: (),
}

impl Default for BalancerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BalancerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(BalancerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &BalancerMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_selection_latency(&self, duration_secs: f64) {
        self.inner().selection_latency_seconds.observe(duration_secs);
    }

    pub fn inc_routing_decision(&self, mode: &str) {
        self.inner()
            .routing_decisions
            .with_label_values(&[mode])
            .inc();
    }

    pub fn inc_no_server_available(&self) {
        self.inner().no_server_available.inc();
    }

    pub fn inc_traffic_spikes(&self) {
        self.inner().traffic_spikes.inc();
    }

    pub fn inc_ingestion_errors(&self, source: &str) {
        self.inner()
            .ingestion_errors
            .with_label_values(&[source])
            .inc();
    }

    pub fn set_predicted_traffic(&self, value: f64) {
        self.inner().predicted_traffic.set(value);
    }

    pub fn set_current_traffic(&self, value: f64) {
        self.inner().current_traffic.set(value);
    }

    pub fn set_server_health(&self, server_id: &str, score: f64) {
        self.inner()
            .server_health_score
            .with_label_values(&[server_id])
            .set(score);
    }

    pub fn set_server_counts(&self, known: i64, overloaded: i64) {
        self.inner().servers_known.set(known);
        self.inner().servers_overloaded.set(overloaded);
    }
}

/// Structured logger for balancer events
///
/// Provides consistent JSON-formatted logging for routing decisions,
/// spikes and overloads.
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    /// Log a routing decision
    pub fn log_routing_decision(
        &self,
        server_id: &str,
        mode: &str,
        predicted_traffic: f64,
        candidates: usize,
    ) {
        if mode == "fallback" {
            warn!(
                event = "routing_fallback",
                node = %self.node_name,
                server_id = %server_id,
                predicted_traffic = predicted_traffic,
                "No candidate server qualified, routing to best health score"
            );
        } else {
            info!(
                event = "routing_decision",
                node = %self.node_name,
                server_id = %server_id,
                mode = %mode,
                predicted_traffic = predicted_traffic,
                candidates = candidates,
                "Request routed"
            );
        }
    }

    /// Log a routing request that found no server at all
    pub fn log_no_server_available(&self) {
        warn!(
            event = "no_server_available",
            node = %self.node_name,
            "No servers available for routing"
        );
    }

    /// Log a traffic spike
    pub fn log_traffic_spike(&self, observed: f64, baseline: f64, percentage_above: f64) {
        warn!(
            event = "traffic_spike_detected",
            node = %self.node_name,
            observed = observed,
            baseline = baseline,
            percentage_above = percentage_above,
            "Traffic spike detected"
        );
    }

    /// Log a server crossing into overload
    pub fn log_server_overloaded(&self, server_id: &str, health_score: f64) {
        warn!(
            event = "server_overloaded",
            node = %self.node_name,
            server_id = %server_id,
            health_score = health_score,
            "Server exceeds an overload threshold"
        );
    }

    /// Log balancer startup
    pub fn log_startup(&self, version: &str, servers: usize) {
        info!(
            event = "balancer_started",
            node = %self.node_name,
            version = %version,
            configured_servers = servers,
            "Predictive load balancer started"
        );
    }

    /// Log balancer shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "balancer_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Predictive load balancer shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balancer_metrics_creation() {
        let metrics = BalancerMetrics::new();

        metrics.observe_selection_latency(0.00002);
        metrics.inc_routing_decision("predictive");
        metrics.inc_routing_decision("fallback");
        metrics.inc_no_server_available();
        metrics.inc_traffic_spikes();
        metrics.inc_ingestion_errors("metrics");
        metrics.set_predicted_traffic(120.0);
        metrics.set_current_traffic(100.0);
        metrics.set_server_health("server1", 88.5);
        metrics.set_server_counts(3, 1);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-node");
        assert_eq!(logger.node_name, "test-node");
    }
}
