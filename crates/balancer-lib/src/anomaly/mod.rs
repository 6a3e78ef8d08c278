//! Anomaly detection for aggregate traffic
//!
//! Currently covers short-term spikes: an observation well above the mean
//! of the latest samples.

mod spike_detector;

pub use spike_detector::{SpikeDetector, TrafficSpike};
