//! Server health monitoring
//!
//! Keeps the latest metrics of every backend, scores them, and answers the
//! two questions the selection policy asks: is a server overloaded right
//! now, and how risky is it under the predicted traffic. Unknown servers
//! are always treated as overloaded.

mod registry;
mod scoring;

pub use registry::ServerRegistry;
pub use scoring::HealthScorer;

use crate::clock::Clock;
use crate::config::{OverloadThresholds, RiskConfig, ScoreWeights};
use crate::models::{MetricsUpdate, RiskLevel, ServerMetrics};
use std::sync::Arc;

/// Per-server metrics store with health scoring and overload checks
pub struct HealthMonitor {
    registry: ServerRegistry,
    thresholds: OverloadThresholds,
    scorer: HealthScorer,
    risk: RiskConfig,
    clock: Arc<dyn Clock>,
}

impl HealthMonitor {
    pub fn new(
        thresholds: OverloadThresholds,
        weights: ScoreWeights,
        risk: RiskConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry: ServerRegistry::new(),
            thresholds,
            scorer: HealthScorer::new(weights),
            risk,
            clock,
        }
    }

    /// Replace the snapshot of `server_id`, creating it if absent
    pub fn update_metrics(&self, server_id: &str, update: MetricsUpdate) -> ServerMetrics {
        let update = update.sanitized();
        let snapshot = ServerMetrics {
            server_id: server_id.to_string(),
            cpu_usage: update.cpu_usage,
            memory_usage: update.memory_usage,
            response_time: update.response_time,
            error_rate: update.error_rate,
            request_rate: update.request_rate,
            health_score: self.scorer.score(&update),
            last_update: self.clock.timestamp(),
        };
        self.registry.upsert(snapshot.clone());
        snapshot
    }

    /// Health score in [0, 100] for the given metrics
    pub fn health_score(&self, metrics: &MetricsUpdate) -> f64 {
        self.scorer.score(metrics)
    }

    /// Server with the highest stored health score
    ///
    /// Ties go to the server registered first.
    pub fn best_server(&self) -> Option<String> {
        let mut best: Option<ServerMetrics> = None;
        for metrics in self.registry.list() {
            match &best {
                Some(current) if metrics.health_score <= current.health_score => {}
                _ => best = Some(metrics),
            }
        }
        best.map(|m| m.server_id)
    }

    /// Whether any raw metric of `server_id` exceeds its threshold
    pub fn is_overloaded(&self, server_id: &str) -> bool {
        match self.registry.get(server_id) {
            Some(metrics) => self.exceeds_thresholds(&metrics),
            None => true,
        }
    }

    /// Classify the overload risk of `server_id` under `predicted_traffic`
    pub fn overload_risk(&self, server_id: &str, predicted_traffic: f64) -> RiskLevel {
        match self.registry.get(server_id) {
            Some(metrics) => self.classify_risk(&metrics, predicted_traffic),
            None => RiskLevel::Unknown,
        }
    }

    /// Overload status and risk from a single consistent snapshot
    pub fn assess(&self, server_id: &str, predicted_traffic: f64) -> (bool, RiskLevel) {
        match self.registry.get(server_id) {
            Some(metrics) => self.assess_snapshot(&metrics, predicted_traffic),
            None => (true, RiskLevel::Unknown),
        }
    }

    /// Overload status and risk of an already fetched snapshot
    pub fn assess_snapshot(
        &self,
        metrics: &ServerMetrics,
        predicted_traffic: f64,
    ) -> (bool, RiskLevel) {
        (
            self.exceeds_thresholds(metrics),
            self.classify_risk(metrics, predicted_traffic),
        )
    }

    pub fn snapshot(&self, server_id: &str) -> Option<ServerMetrics> {
        self.registry.get(server_id)
    }

    /// All snapshots in first-seen order
    pub fn snapshots(&self) -> Vec<ServerMetrics> {
        self.registry.list()
    }

    pub fn server_ids(&self) -> Vec<String> {
        self.registry.ids()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    fn exceeds_thresholds(&self, metrics: &ServerMetrics) -> bool {
        let t = &self.thresholds;
        metrics.cpu_usage > t.cpu_usage
            || metrics.memory_usage > t.memory_usage
            || metrics.response_time > t.response_time
            || metrics.error_rate > t.error_rate
    }

    fn classify_risk(&self, metrics: &ServerMetrics, predicted_traffic: f64) -> RiskLevel {
        let ratio = predicted_traffic / metrics.request_rate.max(1.0);
        if ratio > self.risk.high_ratio {
            RiskLevel::High
        } else if ratio > self.risk.medium_ratio {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}
