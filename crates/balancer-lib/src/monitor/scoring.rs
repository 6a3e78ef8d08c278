//! Health scoring
//!
//! The score is the plain mean of four sub-scores, one per raw metric,
//! each `100 - value * weight` floored at zero. The default weights put
//! typical good values (10% CPU, 0.1 s response, 1% errors) at about 90
//! points each.

use crate::config::ScoreWeights;
use crate::models::MetricsUpdate;

/// Computes a 0-100 health score from raw metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthScorer {
    weights: ScoreWeights,
}

impl HealthScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, metrics: &MetricsUpdate) -> f64 {
        let w = &self.weights;
        let scores = [
            sub_score(metrics.cpu_usage, w.cpu_usage),
            sub_score(metrics.memory_usage, w.memory_usage),
            sub_score(metrics.response_time, w.response_time),
            sub_score(metrics.error_rate, w.error_rate),
        ];
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

fn sub_score(value: f64, weight: f64) -> f64 {
    (100.0 - value * weight).max(0.0)
}
