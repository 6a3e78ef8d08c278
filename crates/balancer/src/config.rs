//! Balancer configuration
//!
//! Loaded once at startup from an optional file layered under environment
//! variables (`BALANCER_*`, `__` between nested keys).

use anyhow::{Context, Result};
use balancer_lib::config::{
    ForecastConfig, OverloadThresholds, RiskConfig, ScoreWeights, SpikeConfig,
    DEFAULT_HISTORY_CAPACITY,
};
use balancer_lib::EngineConfig;
use serde::Deserialize;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_VAR: &str = "BALANCER_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config";

/// Balancer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BalancerConfig {
    /// Backend server ids known at startup
    #[serde(default)]
    pub servers: Vec<String>,

    #[serde(default)]
    pub overload_thresholds: OverloadThresholds,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default)]
    pub forecast: ForecastConfig,

    #[serde(default)]
    pub spike: SpikeConfig,

    #[serde(default)]
    pub scoring: ScoreWeights,

    #[serde(default)]
    pub risk: RiskConfig,

    /// HTTP port for the routing API, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Name attached to log events
    #[serde(default = "default_node_name")]
    pub node_name: String,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Simulated telemetry feeding the engine
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_traffic_interval")]
    pub traffic_interval_secs: u64,

    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,

    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,

    /// Seed for reproducible simulated runs
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            traffic_interval_secs: default_traffic_interval(),
            metrics_interval_secs: default_metrics_interval(),
            report_interval_secs: default_report_interval(),
            seed: None,
        }
    }
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_api_port() -> u16 {
    5000
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME").unwrap_or_else(|_| "balancer".to_string())
}

fn default_true() -> bool {
    true
}

fn default_traffic_interval() -> u64 {
    5
}

fn default_metrics_interval() -> u64 {
    10
}

fn default_report_interval() -> u64 {
    30
}

impl BalancerConfig {
    /// Load configuration from the environment and the file named by
    /// `BALANCER_CONFIG` (default `config.*`, optional)
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from `path` layered under the process environment
    pub fn load_from(path: &str) -> Result<Self> {
        Self::build(path, environment())
    }

    fn build(path: &str, env: config::Environment) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        let config: BalancerConfig = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Engine part of the configuration
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            servers: self.servers.clone(),
            overload_thresholds: self.overload_thresholds,
            history_capacity: self.history_capacity,
            forecast: self.forecast.clone(),
            spike: self.spike,
            scoring: self.scoring,
            risk: self.risk,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.engine()
            .validate()
            .context("Invalid engine configuration")?;

        let sim = &self.simulation;
        if sim.traffic_interval_secs == 0
            || sim.metrics_interval_secs == 0
            || sim.report_interval_secs == 0
        {
            anyhow::bail!("Simulation intervals must be at least 1 second");
        }

        Ok(())
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("BALANCER")
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("servers")
        .try_parsing(true)
}
