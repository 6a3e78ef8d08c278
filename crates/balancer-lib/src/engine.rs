//! Predictive routing decision engine
//!
//! Owns the traffic predictor, the health monitor and the selection
//! policy, and is the single object front doors and ingestion loops hold
//! (usually as `Arc<DecisionEngine>`). Every operation is synchronous,
//! in-memory and bounded in time.

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{
    DashboardSummary, MetricsUpdate, RiskLevel, RoutingDecision, ServerMetrics, ServerSnapshots,
    ServerStatus,
};
use crate::monitor::HealthMonitor;
use crate::observability::{BalancerMetrics, StructuredLogger};
use crate::predictor::TrafficPredictor;
use crate::random::{RandomSource, ThreadRandom};
use crate::selection::SelectionPolicy;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Builder for [`DecisionEngine`] with injectable clock and randomness
pub struct DecisionEngineBuilder {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    node_name: String,
}

impl DecisionEngineBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Name attached to structured log events
    pub fn node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = node_name.into();
        self
    }

    pub fn build(self) -> Result<DecisionEngine> {
        self.config.validate()?;
        let config = self.config;

        let predictor = TrafficPredictor::new(
            config.history_capacity,
            config.forecast.clone(),
            config.spike,
            self.clock.clone(),
            self.random.clone(),
        );
        let monitor = HealthMonitor::new(
            config.overload_thresholds,
            config.scoring,
            config.risk,
            self.clock,
        );

        Ok(DecisionEngine {
            predictor,
            monitor,
            policy: SelectionPolicy::new(self.random),
            configured_servers: config.servers,
            metrics: BalancerMetrics::new(),
            logger: StructuredLogger::new(self.node_name),
        })
    }
}

pub struct DecisionEngine {
    predictor: TrafficPredictor,
    monitor: HealthMonitor,
    policy: SelectionPolicy,
    configured_servers: Vec<String>,
    metrics: BalancerMetrics,
    logger: StructuredLogger,
}

impl DecisionEngine {
    /// Engine on the system clock and thread-local randomness
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: EngineConfig) -> DecisionEngineBuilder {
        DecisionEngineBuilder {
            config,
            clock: Arc::new(SystemClock),
            random: Arc::new(ThreadRandom),
            node_name: "local".to_string(),
        }
    }

    /// Feed one aggregate-traffic observation
    ///
    /// Returns true when the value is a spike relative to the history that
    /// preceded it.
    pub fn record_traffic(&self, value: f64) -> bool {
        let spike = self.predictor.observe(value);
        self.metrics.set_current_traffic(self.current_traffic());

        match spike {
            Some(spike) => {
                self.metrics.inc_traffic_spikes();
                self.logger.log_traffic_spike(
                    spike.observed,
                    spike.baseline,
                    spike.percentage_above_baseline(),
                );
                true
            }
            None => false,
        }
    }

    pub fn forecast_traffic(&self) -> f64 {
        let forecast = self.predictor.forecast();
        self.metrics.set_predicted_traffic(forecast);
        forecast
    }

    pub fn is_spike(&self, value: f64) -> bool {
        self.predictor.detect_spike(value)
    }

    /// Latest observed traffic, 0 before the first observation
    pub fn current_traffic(&self) -> f64 {
        self.predictor.latest().unwrap_or(0.0)
    }

    /// Replace the metrics of `server_id` and rescore it
    pub fn update_server_metrics(&self, server_id: &str, update: MetricsUpdate) -> ServerMetrics {
        let was_overloaded = self
            .monitor
            .snapshot(server_id)
            .map(|_| self.monitor.is_overloaded(server_id))
            .unwrap_or(false);

        let stored = self.monitor.update_metrics(server_id, update);
        let overloaded = self.monitor.is_overloaded(server_id);
        if overloaded && !was_overloaded {
            self.logger
                .log_server_overloaded(server_id, stored.health_score);
        }

        self.metrics.set_server_health(server_id, stored.health_score);
        self.refresh_server_counts();
        debug!(
            server_id = %server_id,
            health_score = stored.health_score,
            overloaded = overloaded,
            "Server metrics updated"
        );
        stored
    }

    /// Choose a destination server; `None` when no server is known
    pub fn select_server(&self) -> Option<String> {
        self.decide().map(|d| d.server_id)
    }

    /// Full routing decision; `None` when no server is known
    pub fn decide(&self) -> Option<RoutingDecision> {
        let start = Instant::now();
        let predicted = self.forecast_traffic();
        let decision = self.policy.select(&self.monitor, predicted);
        self.metrics
            .observe_selection_latency(start.elapsed().as_secs_f64());

        match &decision {
            Some(d) => {
                self.metrics.inc_routing_decision(d.mode.as_str());
                self.logger.log_routing_decision(
                    &d.server_id,
                    d.mode.as_str(),
                    d.predicted_traffic,
                    d.candidates.len(),
                );
            }
            None => {
                self.metrics.inc_no_server_available();
                self.logger.log_no_server_available();
            }
        }

        decision
    }

    /// Routing decision, failing when no server is available
    pub fn route(&self) -> Result<RoutingDecision> {
        self.decide().ok_or(EngineError::NoServersAvailable)
    }

    pub fn server_snapshot(&self, server_id: &str) -> Option<ServerMetrics> {
        self.monitor.snapshot(server_id)
    }

    /// Every snapshot keyed by server id, in first-seen order
    pub fn all_server_snapshots(&self) -> ServerSnapshots {
        self.monitor.snapshots().into_iter().collect()
    }

    pub fn best_server(&self) -> Option<String> {
        self.monitor.best_server()
    }

    pub fn is_overloaded(&self, server_id: &str) -> bool {
        self.monitor.is_overloaded(server_id)
    }

    pub fn overload_risk(&self, server_id: &str, predicted_traffic: f64) -> RiskLevel {
        self.monitor.overload_risk(server_id, predicted_traffic)
    }

    pub fn health_score(&self, metrics: &MetricsUpdate) -> f64 {
        self.monitor.health_score(metrics)
    }

    pub fn configured_servers(&self) -> &[String] {
        &self.configured_servers
    }

    /// Configured servers followed by any others that reported metrics
    pub fn known_servers(&self) -> Vec<String> {
        let mut ids = self.configured_servers.clone();
        for id in self.monitor.server_ids() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Aggregate view for dashboards
    pub fn dashboard(&self) -> DashboardSummary {
        let predicted_traffic = self.forecast_traffic();
        let current_traffic = self.current_traffic();

        let servers: Vec<ServerStatus> = self
            .known_servers()
            .into_iter()
            .map(|id| self.server_status(id, predicted_traffic))
            .collect();

        DashboardSummary {
            current_traffic,
            predicted_traffic,
            traffic_spike: self.is_spike(current_traffic),
            healthy_servers: servers.iter().filter(|s| !s.overloaded).count(),
            total_servers: servers.len(),
            servers,
        }
    }

    pub fn predictor(&self) -> &TrafficPredictor {
        &self.predictor
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    fn server_status(&self, server_id: String, predicted_traffic: f64) -> ServerStatus {
        match self.monitor.snapshot(&server_id) {
            Some(m) => {
                let (overloaded, risk_level) = self.monitor.assess_snapshot(&m, predicted_traffic);
                ServerStatus {
                    server_id,
                    cpu_usage: m.cpu_usage,
                    memory_usage: m.memory_usage,
                    response_time: m.response_time,
                    error_rate: m.error_rate,
                    request_rate: m.request_rate,
                    health_score: m.health_score,
                    risk_level,
                    overloaded,
                    last_update: Some(m.last_update),
                }
            }
            None => ServerStatus {
                server_id,
                cpu_usage: 0.0,
                memory_usage: 0.0,
                response_time: 0.0,
                error_rate: 0.0,
                request_rate: 0.0,
                health_score: 0.0,
                risk_level: RiskLevel::Unknown,
                overloaded: true,
                last_update: None,
            },
        }
    }

    fn refresh_server_counts(&self) {
        let ids = self.monitor.server_ids();
        let overloaded = ids
            .iter()
            .filter(|id| self.monitor.is_overloaded(id))
            .count();
        self.metrics
            .set_server_counts(ids.len() as i64, overloaded as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::OverloadThresholds;
    use crate::models::SelectionMode;
    use crate::random::SeededRandom;
    use chrono::{FixedOffset, TimeZone};

    fn scenario_config() -> EngineConfig {
        EngineConfig {
            servers: vec!["A".to_string(), "B".to_string()],
            overload_thresholds: OverloadThresholds {
                cpu_usage: 0.8,
                memory_usage: 0.85,
                response_time: 1.0,
                error_rate: 0.05,
            },
            ..EngineConfig::default()
        }
    }

    fn server_a() -> MetricsUpdate {
        MetricsUpdate {
            cpu_usage: 0.1,
            memory_usage: 0.2,
            response_time: 0.1,
            error_rate: 0.0,
            request_rate: 100.0,
        }
    }

    fn server_b() -> MetricsUpdate {
        MetricsUpdate {
            cpu_usage: 0.9,
            memory_usage: 0.9,
            response_time: 2.0,
            error_rate: 0.1,
            request_rate: 100.0,
        }
    }

    fn wednesday_noon() -> Arc<dyn Clock> {
        let at = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 3, 12, 0, 0)
            .unwrap();
        Arc::new(FixedClock(at))
    }

    #[test]
    fn test_end_to_end_routes_to_only_candidate() {
        let engine = DecisionEngine::new(scenario_config()).unwrap();
        engine.update_server_metrics("A", server_a());
        engine.update_server_metrics("B", server_b());

        assert!(engine.is_overloaded("B"));
        assert!(!engine.is_overloaded("A"));
        for _ in 0..50 {
            assert_eq!(engine.select_server().as_deref(), Some("A"));
        }
    }

    #[test]
    fn test_empty_registry() {
        let engine = DecisionEngine::new(EngineConfig::default()).unwrap();
        assert_eq!(engine.select_server(), None);
        assert_eq!(engine.best_server(), None);
        assert_eq!(engine.route(), Err(EngineError::NoServersAvailable));
    }

    #[test]
    fn test_fallback_never_returns_none_when_servers_exist() {
        let engine = DecisionEngine::new(scenario_config()).unwrap();
        engine.update_server_metrics("B", server_b());
        engine.update_server_metrics(
            "C",
            MetricsUpdate {
                cpu_usage: 0.95,
                ..server_b()
            },
        );

        let decision = engine.route().unwrap();
        assert_eq!(decision.mode, SelectionMode::Fallback);
        assert_eq!(Some(decision.server_id), engine.best_server());
    }

    #[test]
    fn test_high_predicted_traffic_triggers_fallback() {
        let engine = DecisionEngine::builder(scenario_config())
            .clock(wednesday_noon())
            .random(Arc::new(SeededRandom::new(5)))
            .build()
            .unwrap();
        engine.update_server_metrics("A", server_a());
        // Forecast 1000 * 1.3 = 1300, ratio 13 against 100 req/s
        for _ in 0..10 {
            engine.record_traffic(1000.0);
        }

        let decision = engine.route().unwrap();
        assert_eq!(decision.mode, SelectionMode::Fallback);
        assert_eq!(decision.server_id, "A");
        assert!((decision.predicted_traffic - 1300.0).abs() < 1e-6);
    }

    #[test]
    fn test_record_traffic_reports_spikes() {
        let engine = DecisionEngine::new(EngineConfig::default()).unwrap();
        for _ in 0..5 {
            assert!(!engine.record_traffic(100.0));
        }
        assert!(engine.record_traffic(500.0));
        assert_eq!(engine.current_traffic(), 500.0);
    }

    #[test]
    fn test_is_spike_boundary() {
        let engine = DecisionEngine::new(EngineConfig::default()).unwrap();
        for _ in 0..5 {
            engine.record_traffic(100.0);
        }
        assert!(engine.is_spike(151.0));
        assert!(!engine.is_spike(150.0));
    }

    #[test]
    fn test_cold_start_forecast_range() {
        let engine = DecisionEngine::new(EngineConfig::default()).unwrap();
        for _ in 0..9 {
            engine.record_traffic(5000.0);
            let f = engine.forecast_traffic();
            assert!((50.0..=150.0).contains(&f));
        }
    }

    #[test]
    fn test_snapshots() {
        let engine = DecisionEngine::new(scenario_config()).unwrap();
        assert!(engine.server_snapshot("A").is_none());

        engine.update_server_metrics("A", server_a());
        engine.update_server_metrics("B", server_b());

        let a = engine.server_snapshot("A").unwrap();
        assert_eq!(a.request_rate, 100.0);

        let all = engine.all_server_snapshots();
        assert_eq!(all.len(), 2);
        assert_eq!(all.ids().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(all["B"].cpu_usage, 0.9);
    }

    #[test]
    fn test_dashboard_includes_unreported_configured_servers() {
        let mut config = scenario_config();
        config.servers.push("C".to_string());
        let engine = DecisionEngine::new(config).unwrap();
        engine.update_server_metrics("A", server_a());
        engine.update_server_metrics("B", server_b());
        engine.update_server_metrics("D", server_a());

        let summary = engine.dashboard();
        let ids: Vec<&str> = summary.servers.iter().map(|s| s.server_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C", "D"]);
        assert_eq!(summary.total_servers, 4);
        assert_eq!(summary.healthy_servers, 2);

        let c = &summary.servers[2];
        assert!(c.overloaded);
        assert_eq!(c.risk_level, RiskLevel::Unknown);
        assert_eq!(c.last_update, None);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.risk.medium_ratio = 5.0;
        assert!(matches!(
            DecisionEngine::new(config),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_concurrent_ingestion_and_routing() {
        let engine = Arc::new(DecisionEngine::new(scenario_config()).unwrap());
        engine.update_server_metrics("A", server_a());

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    for n in 0..100 {
                        engine.record_traffic(100.0 + n as f64);
                        engine.update_server_metrics(&format!("w{}", i), server_a());
                    }
                })
            })
            .collect();
        let reader = {
            let engine = engine.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    assert!(engine.select_server().is_some());
                }
            })
        };

        for handle in writers {
            handle.join().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(engine.predictor().history_len(), 100);
        assert_eq!(engine.monitor().len(), 5);
    }

    #[test]
    fn test_dashboard_rows_match_their_metrics_under_updates() {
        let engine = Arc::new(DecisionEngine::new(scenario_config()).unwrap());
        engine.update_server_metrics("A", server_a());
        engine.update_server_metrics("B", server_a());

        let writer = {
            let engine = engine.clone();
            std::thread::spawn(move || {
                for n in 0..500 {
                    let update = if n % 2 == 0 { server_b() } else { server_a() };
                    engine.update_server_metrics("A", update);
                }
            })
        };

        for _ in 0..200 {
            let summary = engine.dashboard();
            let a = &summary.servers[0];
            assert_eq!(a.server_id, "A");
            assert_eq!(a.overloaded, a.cpu_usage > 0.8);
        }
        writer.join().unwrap();
    }
}
