//! Engine configuration
//!
//! Every calibration constant of the forecaster, scorer and risk classifier
//! lives here with its default value, so deployments can tune them without
//! code changes. Loading from files and the environment is the front door's
//! job; this module only defines the shapes and validates them.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Default traffic history capacity
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Complete configuration of a decision engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Server ids known at startup
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
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            overload_thresholds: OverloadThresholds::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            forecast: ForecastConfig::default(),
            spike: SpikeConfig::default(),
            scoring: ScoreWeights::default(),
            risk: RiskConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Check the configuration for values that would make decisions meaningless
    pub fn validate(&self) -> Result<()> {
        let t = &self.overload_thresholds;
        for (name, value) in [
            ("overload_thresholds.cpu_usage", t.cpu_usage),
            ("overload_thresholds.memory_usage", t.memory_usage),
            ("overload_thresholds.response_time", t.response_time),
            ("overload_thresholds.error_rate", t.error_rate),
        ] {
            ensure_non_negative(name, value)?;
        }

        let f = &self.forecast;
        ensure_non_negative("forecast.cold_start_min", f.cold_start_min)?;
        if !f.cold_start_max.is_finite() || f.cold_start_max < f.cold_start_min {
            return Err(EngineError::InvalidConfig(format!(
                "forecast cold start range [{}, {}] is not ordered",
                f.cold_start_min, f.cold_start_max
            )));
        }
        if f.window == 0 {
            return Err(EngineError::InvalidConfig(
                "forecast.window must be at least 1".to_string(),
            ));
        }
        for band in [&f.business_hours, &f.evening_peak] {
            if band.start > 23 || band.end > 23 || band.start > band.end {
                return Err(EngineError::InvalidConfig(format!(
                    "hour band {}..={} is not within 0..=23",
                    band.start, band.end
                )));
            }
        }

        if self.spike.window == 0 {
            return Err(EngineError::InvalidConfig(
                "spike.window must be at least 1".to_string(),
            ));
        }

        let r = &self.risk;
        ensure_non_negative("risk.medium_ratio", r.medium_ratio)?;
        ensure_non_negative("risk.high_ratio", r.high_ratio)?;
        if r.medium_ratio > r.high_ratio {
            return Err(EngineError::InvalidConfig(format!(
                "risk.medium_ratio ({}) exceeds risk.high_ratio ({})",
                r.medium_ratio, r.high_ratio
            )));
        }

        Ok(())
    }
}

fn ensure_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{name} must be a non-negative number, got {value}"
        )))
    }
}

/// Hard-overload ceilings per raw metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverloadThresholds {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub response_time: f64,
    pub error_rate: f64,
}

impl Default for OverloadThresholds {
    fn default() -> Self {
        Self {
            cpu_usage: 0.8,
            memory_usage: 0.85,
            response_time: 1.0,
            error_rate: 0.05,
        }
    }
}

/// Inclusive range of hours sharing one traffic multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourBand {
    pub start: u32,
    pub end: u32,
    pub multiplier: f64,
}

impl HourBand {
    pub fn contains(&self, hour: u32) -> bool {
        (self.start..=self.end).contains(&hour)
    }
}

/// Heuristic forecast parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Samples needed before leaving cold start
    pub min_samples: usize,
    /// Number of recent samples averaged
    pub window: usize,
    pub cold_start_min: f64,
    pub cold_start_max: f64,
    pub business_hours: HourBand,
    pub evening_peak: HourBand,
    pub off_peak_multiplier: f64,
    /// Days counted as weekend (0 = Monday)
    pub weekend_days: Vec<u32>,
    pub weekend_multiplier: f64,
    /// Lower bound of any pattern-based forecast
    pub floor: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_samples: 10,
            window: 10,
            cold_start_min: 50.0,
            cold_start_max: 150.0,
            business_hours: HourBand {
                start: 9,
                end: 17,
                multiplier: 1.3,
            },
            evening_peak: HourBand {
                start: 18,
                end: 22,
                multiplier: 1.5,
            },
            off_peak_multiplier: 0.7,
            weekend_days: vec![5, 6],
            weekend_multiplier: 0.8,
            floor: 10.0,
        }
    }
}

impl ForecastConfig {
    /// Multiplier applied for the given hour of day
    pub fn hour_multiplier(&self, hour: u32) -> f64 {
        if self.business_hours.contains(hour) {
            self.business_hours.multiplier
        } else if self.evening_peak.contains(hour) {
            self.evening_peak.multiplier
        } else {
            self.off_peak_multiplier
        }
    }

    /// Multiplier applied for the given day of week
    pub fn day_multiplier(&self, day_of_week: u32) -> f64 {
        if self.weekend_days.contains(&day_of_week) {
            self.weekend_multiplier
        } else {
            1.0
        }
    }
}

/// Spike detection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeConfig {
    /// Number of most recent samples forming the baseline
    pub window: usize,
    /// A value above `ratio` times the baseline is a spike
    pub ratio: f64,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            window: 5,
            ratio: 1.5,
        }
    }
}

/// Multipliers turning raw metrics into 0-100 sub-scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub response_time: f64,
    pub error_rate: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            cpu_usage: 100.0,
            memory_usage: 100.0,
            response_time: 10.0,
            error_rate: 1000.0,
        }
    }
}

/// Ratio boundaries of the overload risk classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub medium_ratio: f64,
    pub high_ratio: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            medium_ratio: 1.5,
            high_ratio: 2.0,
        }
    }
}
