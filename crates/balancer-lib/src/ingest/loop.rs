//! Ingestion loop
//!
//! Polls the traffic source and the metrics probe on independent intervals
//! and feeds the results into the decision engine. Failed polls are logged,
//! counted and reflected on the ingestion health component; they never stop
//! the loop.

use super::{MetricsProbe, ProbeContext, TrafficSource};
use crate::engine::DecisionEngine;
use crate::health::{components, HealthRegistry};
use crate::observability::BalancerMetrics;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Configuration for the ingestion loop
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Traffic polling interval (default: 5 seconds)
    pub traffic_interval: Duration,
    /// Server metrics polling interval (default: 10 seconds)
    pub metrics_interval: Duration,
    /// Status summary interval (default: 30 seconds)
    pub report_interval: Duration,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            traffic_interval: Duration::from_secs(5),
            metrics_interval: Duration::from_secs(10),
            report_interval: Duration::from_secs(30),
        }
    }
}

/// Results from a metrics probing cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResults {
    pub success_count: usize,
    pub error_count: usize,
}

pub struct IngestionLoop {
    engine: Arc<DecisionEngine>,
    traffic: Arc<dyn TrafficSource>,
    probe: Arc<dyn MetricsProbe>,
    config: IngestionConfig,
    health: Option<HealthRegistry>,
    metrics: BalancerMetrics,
    traffic_failing: bool,
    probe_failing: bool,
}

impl IngestionLoop {
    pub fn new(
        engine: Arc<DecisionEngine>,
        traffic: Arc<dyn TrafficSource>,
        probe: Arc<dyn MetricsProbe>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            engine,
            traffic,
            probe,
            config,
            health: None,
            metrics: BalancerMetrics::new(),
            traffic_failing: false,
            probe_failing: false,
        }
    }

    /// Report ingestion failures on this health registry
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Run until a shutdown signal arrives
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            traffic_interval_secs = self.config.traffic_interval.as_secs(),
            metrics_interval_secs = self.config.metrics_interval.as_secs(),
            "Starting ingestion loop"
        );

        let mut traffic_ticker = interval(self.config.traffic_interval);
        let mut metrics_ticker = interval(self.config.metrics_interval);
        let mut report_ticker = interval(self.config.report_interval);

        loop {
            tokio::select! {
                _ = traffic_ticker.tick() => {
                    let ok = self.poll_traffic().await;
                    self.traffic_failing = !ok;
                    self.update_health().await;
                }
                _ = metrics_ticker.tick() => {
                    let results = self.probe_servers().await;
                    self.probe_failing = results.error_count > 0;
                    self.update_health().await;
                }
                _ = report_ticker.tick() => {
                    self.report();
                }
                _ = shutdown.recv() => {
                    info!("Shutting down ingestion loop");
                    break;
                }
            }
        }
    }

    /// Take one traffic observation; false when the source failed
    pub async fn poll_traffic(&self) -> bool {
        match self.traffic.observe().await {
            Ok(value) => {
                let spike = self.engine.record_traffic(value);
                debug!(traffic = value, spike = spike, "Traffic observed");
                true
            }
            Err(e) => {
                self.metrics.inc_ingestion_errors("traffic");
                warn!(error = %e, "Failed to observe traffic");
                false
            }
        }
    }

    /// Probe every known server once
    pub async fn probe_servers(&self) -> ProbeResults {
        let servers = self.engine.known_servers();
        let context = ProbeContext {
            current_traffic: self.engine.current_traffic(),
            server_count: servers.len(),
        };
        let mut results = ProbeResults::default();

        for server_id in servers {
            match self.probe.probe(&server_id, &context).await {
                Ok(update) => {
                    self.engine.update_server_metrics(&server_id, update);
                    results.success_count += 1;
                }
                Err(e) => {
                    results.error_count += 1;
                    self.metrics.inc_ingestion_errors("metrics");
                    warn!(server_id = %server_id, error = %e, "Failed to probe server metrics");
                }
            }
        }

        results
    }

    fn report(&self) {
        let summary = self.engine.dashboard();
        info!(
            event = "balancer_status",
            current_traffic = summary.current_traffic,
            predicted_traffic = summary.predicted_traffic,
            traffic_spike = summary.traffic_spike,
            healthy_servers = summary.healthy_servers,
            total_servers = summary.total_servers,
            "Balancer status"
        );
    }

    async fn update_health(&self) {
        let Some(health) = &self.health else {
            return;
        };

        health.record_server_count(self.engine.monitor().len()).await;

        match (self.traffic_failing, self.probe_failing) {
            (false, false) => health.set_healthy(components::INGESTION).await,
            (true, _) => {
                health
                    .set_degraded(components::INGESTION, "Traffic source failing")
                    .await
            }
            (false, true) => {
                health
                    .set_degraded(components::INGESTION, "Metrics probe failing")
                    .await
            }
        }
    }
}

/// Builder for the ingestion loop
#[derive(Default)]
pub struct IngestionLoopBuilder {
    engine: Option<Arc<DecisionEngine>>,
    traffic: Option<Arc<dyn TrafficSource>>,
    probe: Option<Arc<dyn MetricsProbe>>,
    health: Option<HealthRegistry>,
    config: IngestionConfig,
}

impl IngestionLoopBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engine(mut self, engine: Arc<DecisionEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn traffic_source(mut self, traffic: Arc<dyn TrafficSource>) -> Self {
        self.traffic = Some(traffic);
        self
    }

    pub fn metrics_probe(mut self, probe: Arc<dyn MetricsProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn traffic_interval(mut self, interval: Duration) -> Self {
        self.config.traffic_interval = interval;
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.config.metrics_interval = interval;
        self
    }

    pub fn report_interval(mut self, interval: Duration) -> Self {
        self.config.report_interval = interval;
        self
    }

    pub fn build(self) -> Result<IngestionLoop> {
        let engine = self
            .engine
            .ok_or_else(|| anyhow::anyhow!("Engine is required"))?;
        let traffic = self
            .traffic
            .ok_or_else(|| anyhow::anyhow!("Traffic source is required"))?;
        let probe = self
            .probe
            .ok_or_else(|| anyhow::anyhow!("Metrics probe is required"))?;

        let ingestion = IngestionLoop::new(engine, traffic, probe, self.config);
        Ok(match self.health {
            Some(health) => ingestion.with_health(health),
            None => ingestion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::health::ComponentStatus;
    use crate::ingest::async_trait;
    use crate::models::MetricsUpdate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedTraffic(f64);

    #[async_trait]
    impl TrafficSource for FixedTraffic {
        async fn observe(&self) -> Result<f64> {
            Ok(self.0)
        }
    }

    struct FailingTraffic;

    #[async_trait]
    impl TrafficSource for FailingTraffic {
        async fn observe(&self) -> Result<f64> {
            anyhow::bail!("traffic feed unreachable")
        }
    }

    /// Healthy metrics for every server except the ones named "down*"
    struct MockProbe {
        call_count: AtomicUsize,
    }

    impl MockProbe {
        fn new() -> Self {
            Self {
                call_count: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MetricsProbe for MockProbe {
        async fn probe(&self, server_id: &str, context: &ProbeContext) -> Result<MetricsUpdate> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if server_id.starts_with("down") {
                anyhow::bail!("probe timed out");
            }
            Ok(MetricsUpdate {
                cpu_usage: 0.2,
                memory_usage: 0.3,
                response_time: 0.2,
                error_rate: 0.0,
                request_rate: context.traffic_per_server(),
            })
        }
    }

    fn engine(servers: &[&str]) -> Arc<DecisionEngine> {
        let config = EngineConfig {
            servers: servers.iter().map(|s| s.to_string()).collect(),
            ..EngineConfig::default()
        };
        Arc::new(DecisionEngine::new(config).unwrap())
    }

    #[test]
    fn test_ingestion_config_default() {
        let config = IngestionConfig::default();
        assert_eq!(config.traffic_interval, Duration::from_secs(5));
        assert_eq!(config.metrics_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_builder_requires_sources() {
        let result = IngestionLoopBuilder::new()
            .engine(engine(&["a"]))
            .traffic_source(Arc::new(FixedTraffic(100.0)))
            .build();
        assert!(result.is_err());

        let result = IngestionLoopBuilder::new()
            .engine(engine(&["a"]))
            .traffic_source(Arc::new(FixedTraffic(100.0)))
            .metrics_probe(Arc::new(MockProbe::new()))
            .build();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_poll_traffic_records_observation() {
        let engine = engine(&["a"]);
        let ingestion = IngestionLoop::new(
            engine.clone(),
            Arc::new(FixedTraffic(240.0)),
            Arc::new(MockProbe::new()),
            IngestionConfig::default(),
        );

        assert!(ingestion.poll_traffic().await);
        assert_eq!(engine.current_traffic(), 240.0);
        assert_eq!(engine.predictor().history_len(), 1);
    }

    #[tokio::test]
    async fn test_failed_traffic_poll_leaves_history_untouched() {
        let engine = engine(&["a"]);
        let ingestion = IngestionLoop::new(
            engine.clone(),
            Arc::new(FailingTraffic),
            Arc::new(MockProbe::new()),
            IngestionConfig::default(),
        );

        assert!(!ingestion.poll_traffic().await);
        assert_eq!(engine.predictor().history_len(), 0);
    }

    #[tokio::test]
    async fn test_probe_servers_uses_traffic_share() {
        let engine = engine(&["a", "b"]);
        let probe = Arc::new(MockProbe::new());
        let ingestion = IngestionLoop::new(
            engine.clone(),
            Arc::new(FixedTraffic(300.0)),
            probe.clone(),
            IngestionConfig::default(),
        );

        ingestion.poll_traffic().await;
        let results = ingestion.probe_servers().await;

        assert_eq!(results, ProbeResults { success_count: 2, error_count: 0 });
        assert_eq!(probe.call_count.load(Ordering::SeqCst), 2);
        assert_eq!(engine.server_snapshot("b").unwrap().request_rate, 150.0);
    }

    #[tokio::test]
    async fn test_probe_failure_keeps_previous_snapshot() {
        let engine = engine(&["a", "down1"]);
        let ingestion = IngestionLoop::new(
            engine.clone(),
            Arc::new(FixedTraffic(100.0)),
            Arc::new(MockProbe::new()),
            IngestionConfig::default(),
        );

        let results = ingestion.probe_servers().await;
        assert_eq!(results.success_count, 1);
        assert_eq!(results.error_count, 1);
        assert!(engine.server_snapshot("down1").is_none());
        assert!(engine.server_snapshot("a").is_some());
    }

    #[tokio::test]
    async fn test_run_until_shutdown_and_report_health() {
        let engine = engine(&["a", "down1"]);
        let health = HealthRegistry::new();
        health.register(components::INGESTION).await;

        let ingestion = IngestionLoopBuilder::new()
            .engine(engine.clone())
            .traffic_source(Arc::new(FixedTraffic(100.0)))
            .metrics_probe(Arc::new(MockProbe::new()))
            .health(health.clone())
            .traffic_interval(Duration::from_millis(10))
            .metrics_interval(Duration::from_millis(10))
            .report_interval(Duration::from_millis(50))
            .build()
            .unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(ingestion.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        assert!(engine.predictor().history_len() >= 2);
        assert!(engine.server_snapshot("a").is_some());

        let status = health.health().await.components[components::INGESTION].status;
        assert_eq!(status, ComponentStatus::Degraded);
    }

    #[tokio::test]
    async fn test_probed_servers_clear_engine_outage() {
        let engine = engine(&["a"]);
        let health = HealthRegistry::new();
        health.register(components::ENGINE).await;
        health.record_routing(None).await;

        let ingestion = IngestionLoop::new(
            engine,
            Arc::new(FixedTraffic(100.0)),
            Arc::new(MockProbe::new()),
            IngestionConfig::default(),
        )
        .with_health(health.clone());

        let results = ingestion.probe_servers().await;
        assert_eq!(results.success_count, 1);
        ingestion.update_health().await;

        let status = health.health().await.components[components::ENGINE].status;
        assert_eq!(status, ComponentStatus::Healthy);
    }
}
