//! Server selection policy
//!
//! Spreads load uniformly over servers that are neither overloaded nor at
//! high risk under the predicted traffic. When none qualify it degrades to
//! the server with the best health score instead of refusing.

use crate::models::{RiskLevel, RoutingDecision, SelectionMode};
use crate::monitor::HealthMonitor;
use crate::random::RandomSource;
use std::sync::Arc;

pub struct SelectionPolicy {
    random: Arc<dyn RandomSource>,
}

impl SelectionPolicy {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// Servers eligible for predictive routing, in first-seen order
    pub fn candidates(&self, monitor: &HealthMonitor, predicted_traffic: f64) -> Vec<String> {
        monitor
            .server_ids()
            .into_iter()
            .filter(|id| {
                let (overloaded, risk) = monitor.assess(id, predicted_traffic);
                !overloaded && risk != RiskLevel::High
            })
            .collect()
    }

    /// Choose a destination server
    ///
    /// Returns `None` only when the registry is empty.
    pub fn select(
        &self,
        monitor: &HealthMonitor,
        predicted_traffic: f64,
    ) -> Option<RoutingDecision> {
        let candidates = self.candidates(monitor, predicted_traffic);

        if !candidates.is_empty() {
            let server_id = candidates[self.random.index(candidates.len())].clone();
            return Some(RoutingDecision {
                server_id,
                mode: SelectionMode::Predictive,
                predicted_traffic,
                candidates,
            });
        }

        monitor.best_server().map(|server_id| RoutingDecision {
            server_id,
            mode: SelectionMode::Fallback,
            predicted_traffic,
            candidates,
        })
    }
}
