//! Simulated telemetry
//!
//! Traffic follows a daily shape with occasional bursts; server metrics
//! grow with each server's share of that traffic.

use super::{async_trait, MetricsProbe, ProbeContext, TrafficSource};
use crate::clock::Clock;
use crate::models::MetricsUpdate;
use crate::random::RandomSource;
use anyhow::Result;
use std::sync::Arc;

/// Probability that a simulated observation is a burst
const BURST_PROBABILITY: f64 = 0.1;

/// Aggregate traffic following business hours and evening peaks
pub struct SimulatedTraffic {
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl SimulatedTraffic {
    pub fn new(clock: Arc<dyn Clock>, random: Arc<dyn RandomSource>) -> Self {
        Self { clock, random }
    }

    /// Integer draw in `[low, high]`
    fn between(&self, low: u32, high: u32) -> f64 {
        (low as usize + self.random.index((high - low + 1) as usize)) as f64
    }

    pub fn sample(&self) -> f64 {
        if self.random.uniform(0.0, 1.0) < BURST_PROBABILITY {
            return self.between(500, 800);
        }

        match self.clock.hour() {
            9..=17 => self.between(150, 300),
            18..=22 => self.between(200, 400),
            _ => self.between(50, 150),
        }
    }
}

#[async_trait]
impl TrafficSource for SimulatedTraffic {
    async fn observe(&self) -> Result<f64> {
        Ok(self.sample())
    }
}

/// Server metrics derived from each server's share of traffic
pub struct SimulatedProbe {
    random: Arc<dyn RandomSource>,
}

impl SimulatedProbe {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// Plausible metrics for a server that has not served traffic yet
    pub fn initial_metrics(&self) -> MetricsUpdate {
        MetricsUpdate {
            cpu_usage: self.random.uniform(0.1, 0.4),
            memory_usage: self.random.uniform(0.3, 0.6),
            response_time: self.random.uniform(0.1, 0.5),
            error_rate: self.random.uniform(0.0, 0.02),
            request_rate: self.random.uniform(80.0, 120.0),
        }
    }

    pub fn sample(&self, context: &ProbeContext) -> MetricsUpdate {
        let share = context.traffic_per_server();
        MetricsUpdate {
            cpu_usage: (share / 100.0 * 0.3 + self.random.uniform(0.1, 0.3)).min(0.95),
            memory_usage: (0.4 + self.random.uniform(0.1, 0.3)).min(0.95),
            response_time: (share / 100.0 * 0.2 + self.random.uniform(0.1, 0.4)).max(0.1),
            error_rate: (share / 500.0 * 0.1 + self.random.uniform(0.0, 0.05)).max(0.0),
            request_rate: share,
        }
    }
}

#[async_trait]
impl MetricsProbe for SimulatedProbe {
    async fn probe(&self, _server_id: &str, context: &ProbeContext) -> Result<MetricsUpdate> {
        Ok(self.sample(context))
    }
}
