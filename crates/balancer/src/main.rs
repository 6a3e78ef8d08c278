//! Predictive load balancer
//!
//! Serves routing decisions over HTTP, feeding the decision engine from
//! simulated telemetry when enabled.

use anyhow::{Context, Result};
use balancer_lib::{
    clock::SystemClock,
    health::{components, HealthRegistry},
    ingest::{IngestionLoopBuilder, SimulatedProbe, SimulatedTraffic},
    random::{RandomSource, SeededRandom, ThreadRandom},
    BalancerMetrics, DecisionEngine, StructuredLogger,
};
use predictive_balancer::{api, config::BalancerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const BALANCER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = BalancerConfig::load().context("Failed to load configuration")?;
    info!(
        node_name = %config.node_name,
        servers = ?config.servers,
        api_port = config.api_port,
        "Balancer configured"
    );

    let random: Arc<dyn RandomSource> = match config.simulation.seed {
        Some(seed) => Arc::new(SeededRandom::new(seed)),
        None => Arc::new(ThreadRandom),
    };

    let engine = Arc::new(
        DecisionEngine::builder(config.engine())
            .random(random.clone())
            .node_name(config.node_name.clone())
            .build()
            .context("Failed to build decision engine")?,
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::ENGINE).await;
    health_registry.register(components::API).await;

    let metrics = BalancerMetrics::new();
    let logger = StructuredLogger::new(&config.node_name);
    logger.log_startup(BALANCER_VERSION, config.servers.len());

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let ingestion_handle = if config.simulation.enabled {
        health_registry.register(components::INGESTION).await;

        let probe = Arc::new(SimulatedProbe::new(random.clone()));
        for server_id in engine.configured_servers() {
            engine.update_server_metrics(server_id, probe.initial_metrics());
        }

        let sim = &config.simulation;
        let ingestion = IngestionLoopBuilder::new()
            .engine(engine.clone())
            .traffic_source(Arc::new(SimulatedTraffic::new(
                Arc::new(SystemClock),
                random.clone(),
            )))
            .metrics_probe(probe)
            .health(health_registry.clone())
            .traffic_interval(Duration::from_secs(sim.traffic_interval_secs))
            .metrics_interval(Duration::from_secs(sim.metrics_interval_secs))
            .report_interval(Duration::from_secs(sim.report_interval_secs))
            .build()?;

        Some(tokio::spawn(ingestion.run(shutdown_tx.subscribe())))
    } else {
        info!("Simulation disabled, waiting for reported traffic and metrics");
        None
    };

    let app_state = Arc::new(
        api::AppState::new(engine.clone(), health_registry.clone(), metrics).with_random(random),
    );

    // Mark balancer as ready after initialization
    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(
        config.api_port,
        app_state,
        shutdown_tx.subscribe(),
    ));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            health_registry
                .set_unhealthy(components::API, "API server stopped")
                .await;
            match result {
                Ok(Ok(())) => warn!("API server exited"),
                Ok(Err(e)) => return Err(e.context("API server failed")),
                Err(e) => return Err(anyhow::Error::new(e).context("API server task panicked")),
            }
            logger.log_shutdown("API server exited");
        }
    }

    let _ = shutdown_tx.send(());
    if let Some(handle) = ingestion_handle {
        if let Err(e) = handle.await {
            warn!(error = %e, "Ingestion loop did not stop cleanly");
        }
    }

    info!("Shutting down");
    Ok(())
}
