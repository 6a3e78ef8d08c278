//! Traffic and server-metrics ingestion
//!
//! The decision engine is fed from outside: a [`TrafficSource`] reports the
//! aggregate request rate and a [`MetricsProbe`] reports per-server metrics.
//! [`IngestionLoop`] polls both on independent intervals. Simulated
//! implementations stand in for real telemetry during demos and tests.

mod r#loop;
mod simulated;

pub use r#loop::{IngestionConfig, IngestionLoop, IngestionLoopBuilder, ProbeResults};
pub use simulated::{SimulatedProbe, SimulatedTraffic};

use crate::models::MetricsUpdate;
use anyhow::Result;

pub use async_trait::async_trait;

/// Source of aggregate traffic observations (requests per second)
#[async_trait]
pub trait TrafficSource: Send + Sync {
    async fn observe(&self) -> Result<f64>;
}

/// What a probe knows about the system when it is asked for metrics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeContext {
    /// Latest aggregate traffic, 0 before the first observation
    pub current_traffic: f64,
    /// Number of servers probed in this cycle
    pub server_count: usize,
}

impl ProbeContext {
    /// Traffic share of a single server
    pub fn traffic_per_server(&self) -> f64 {
        self.current_traffic / self.server_count.max(1) as f64
    }
}

/// Source of per-server metrics
#[async_trait]
pub trait MetricsProbe: Send + Sync {
    async fn probe(&self, server_id: &str, context: &ProbeContext) -> Result<MetricsUpdate>;
}
