//! Traffic spike detection
//!
//! Flags an observed traffic value that exceeds a multiple of the mean of
//! the most recent samples.

use crate::config::SpikeConfig;
use crate::predictor::TrafficHistory;

/// Detects traffic values well above the short-term average
#[derive(Debug, Clone, Copy)]
pub struct SpikeDetector {
    /// Number of most recent samples forming the baseline
    pub window: usize,
    /// Multiple of the baseline above which a value is a spike
    pub ratio: f64,
}

impl SpikeDetector {
    pub fn new(config: SpikeConfig) -> Self {
        Self {
            window: config.window.max(1),
            ratio: config.ratio,
        }
    }

    /// Detect a spike from the current value and the traffic history
    ///
    /// # Returns
    /// * `Some(TrafficSpike)` if `current` strictly exceeds `ratio` times
    ///   the mean of the last `window` samples
    /// * `None` if there is no spike or fewer than `window` samples
    pub fn detect(&self, current: f64, history: &TrafficHistory) -> Option<TrafficSpike> {
        if history.len() < self.window {
            return None;
        }

        let baseline = history.mean_of_recent(self.window)?;

        if current > baseline * self.ratio {
            Some(TrafficSpike {
                observed: current,
                baseline,
                ratio: self.ratio,
            })
        } else {
            None
        }
    }
}

impl Default for SpikeDetector {
    fn default() -> Self {
        Self::new(SpikeConfig::default())
    }
}

/// Traffic spike details
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficSpike {
    /// Traffic value that triggered the spike
    pub observed: f64,
    /// Mean of the recent samples
    pub baseline: f64,
    /// Threshold multiple that was exceeded
    pub ratio: f64,
}

impl TrafficSpike {
    /// Get the percentage above the baseline
    pub fn percentage_above_baseline(&self) -> f64 {
        if self.baseline < f64::EPSILON {
            return 0.0;
        }
        ((self.observed - self.baseline) / self.baseline) * 100.0
    }
}
