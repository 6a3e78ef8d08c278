//! Heuristic traffic forecasting
//!
//! Extrapolates the mean of the latest observations with time-of-day and
//! weekend multipliers keyed off the current wall-clock time. Until enough
//! history exists the forecast is a random placeholder.

use super::TrafficHistory;
use crate::anomaly::{SpikeDetector, TrafficSpike};
use crate::clock::Clock;
use crate::config::{ForecastConfig, SpikeConfig};
use crate::models::TrafficSample;
use crate::random::RandomSource;
use chrono::{Datelike, Timelike};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Traffic predictor over a bounded history of observations
pub struct TrafficPredictor {
    history: RwLock<TrafficHistory>,
    config: ForecastConfig,
    spike_detector: SpikeDetector,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl TrafficPredictor {
    pub fn new(
        capacity: usize,
        config: ForecastConfig,
        spike: SpikeConfig,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            history: RwLock::new(TrafficHistory::new(capacity)),
            config,
            spike_detector: SpikeDetector::new(spike),
            clock,
            random,
        }
    }

    /// Append an observation stamped with the current time
    pub fn record(&self, value: f64) {
        let sample = self.sample(value);
        self.history.write().push(sample);
    }

    /// Check `value` against the history, then append it
    ///
    /// Both steps happen under one write guard, so the spike baseline is
    /// exactly the history preceding this observation.
    pub fn observe(&self, value: f64) -> Option<TrafficSpike> {
        let sample = self.sample(value);
        let mut history = self.history.write();
        let spike = self.spike_detector.detect(sample.value, &history);
        history.push(sample);
        spike
    }

    /// Predict traffic for the near future
    pub fn forecast(&self) -> f64 {
        let avg_recent = {
            let history = self.history.read();
            if history.len() < self.config.min_samples {
                let guess = self
                    .random
                    .uniform(self.config.cold_start_min, self.config.cold_start_max);
                debug!(
                    samples = history.len(),
                    forecast = guess,
                    "Cold start forecast"
                );
                return guess;
            }
            history.mean_of_recent(self.config.window).unwrap_or(0.0)
        };

        let now = self.clock.now();
        let hour = now.hour();
        let day = now.weekday().num_days_from_monday();

        let prediction = avg_recent
            * self.config.hour_multiplier(hour)
            * self.config.day_multiplier(day);

        prediction.max(self.config.floor)
    }

    /// Spike details for `value` against the current history
    pub fn spike(&self, value: f64) -> Option<TrafficSpike> {
        self.spike_detector.detect(value, &self.history.read())
    }

    /// Whether `value` is a spike against the current history
    pub fn detect_spike(&self, value: f64) -> bool {
        self.spike(value).is_some()
    }

    /// Most recent observed value
    pub fn latest(&self) -> Option<f64> {
        self.history.read().latest().map(|s| s.value)
    }

    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }

    /// Copy of the current history, oldest first
    pub fn samples(&self) -> Vec<TrafficSample> {
        self.history.read().iter().cloned().collect()
    }

    fn sample(&self, value: f64) -> TrafficSample {
        let now = self.clock.now();
        TrafficSample {
            timestamp: now.timestamp(),
            value: if value.is_finite() { value.max(0.0) } else { 0.0 },
            hour_of_day: now.hour(),
            day_of_week: now.weekday().num_days_from_monday(),
        }
    }
}
