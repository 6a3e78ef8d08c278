//! Bounded traffic history
//!
//! Ring buffer of traffic observations with FIFO eviction: once the
//! capacity is reached the oldest sample is dropped on every push.

use crate::models::TrafficSample;
use std::collections::VecDeque;

/// Ordered, bounded sequence of traffic samples
#[derive(Debug, Clone)]
pub struct TrafficHistory {
    samples: VecDeque<TrafficSample>,
    capacity: usize,
}

impl TrafficHistory {
    /// Create an empty history; a zero capacity is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(10_000)),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest ones beyond capacity
    pub fn push(&mut self, sample: TrafficSample) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently pushed sample
    pub fn latest(&self) -> Option<&TrafficSample> {
        self.samples.back()
    }

    /// Values of the `k` most recent samples, oldest first
    pub fn recent(&self, k: usize) -> Vec<f64> {
        let skip = self.samples.len().saturating_sub(k);
        self.samples.iter().skip(skip).map(|s| s.value).collect()
    }

    /// Mean of the `k` most recent values, `None` when empty or `k == 0`
    pub fn mean_of_recent(&self, k: usize) -> Option<f64> {
        let values = self.recent(k);
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrafficSample> {
        self.samples.iter()
    }
}

impl Default for TrafficHistory {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp: i64, value: f64) -> TrafficSample {
        TrafficSample {
            timestamp,
            value,
            hour_of_day: 12,
            day_of_week: 0,
        }
    }

    #[test]
    fn test_push_within_capacity() {
        let mut history = TrafficHistory::new(10);
        for i in 0..5 {
            history.push(sample(i, i as f64));
        }
        assert_eq!(history.len(), 5);
        assert_eq!(history.latest().unwrap().value, 4.0);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut history = TrafficHistory::new(100);
        for i in 0..101 {
            history.push(sample(i, i as f64));
        }

        assert_eq!(history.len(), 100);
        // Sample 0 is gone, sample 1 is now the oldest
        assert_eq!(history.iter().next().unwrap().value, 1.0);
        assert_eq!(history.latest().unwrap().value, 100.0);
    }

    #[test]
    fn test_recent_preserves_insertion_order() {
        let mut history = TrafficHistory::new(10);
        for i in 0..6 {
            history.push(sample(i, i as f64));
        }
        assert_eq!(history.recent(3), vec![3.0, 4.0, 5.0]);
        assert_eq!(history.recent(50).len(), 6);
    }

    #[test]
    fn test_mean_of_recent() {
        let mut history = TrafficHistory::new(10);
        assert_eq!(history.mean_of_recent(5), None);

        for v in [10.0, 20.0, 30.0, 40.0] {
            history.push(sample(0, v));
        }
        assert_eq!(history.mean_of_recent(2), Some(35.0));
        assert_eq!(history.mean_of_recent(0), None);
    }

    #[test]
    fn test_zero_capacity_keeps_one_sample() {
        let mut history = TrafficHistory::new(0);
        history.push(sample(0, 1.0));
        history.push(sample(1, 2.0));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().value, 2.0);
    }
}
