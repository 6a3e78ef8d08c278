//! Core data models for the decision engine

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// One observation of aggregate traffic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSample {
    pub timestamp: i64,
    pub value: f64,
    pub hour_of_day: u32,
    pub day_of_week: u32,
}

/// Inbound metrics for a single server
///
/// Every field defaults to zero when absent, so a partial report never
/// inherits values from the previous snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsUpdate {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    /// Seconds
    pub response_time: f64,
    pub error_rate: f64,
    pub request_rate: f64,
}

impl MetricsUpdate {
    /// Clamp values into their natural ranges.
    ///
    /// Non-finite values become 0; fractions are clamped to [0, 1];
    /// response time and request rate are floored at 0.
    pub fn sanitized(self) -> Self {
        Self {
            cpu_usage: unit_interval(self.cpu_usage),
            memory_usage: unit_interval(self.memory_usage),
            response_time: non_negative(self.response_time),
            error_rate: unit_interval(self.error_rate),
            request_rate: non_negative(self.request_rate),
        }
    }
}

/// Stored snapshot of a server's metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMetrics {
    pub server_id: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub response_time: f64,
    pub error_rate: f64,
    pub request_rate: f64,
    pub health_score: f64,
    pub last_update: i64,
}

/// Snapshots keyed by server id, in first-seen order
///
/// Serialises as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerSnapshots(Vec<ServerMetrics>);

impl ServerSnapshots {
    pub fn get(&self, server_id: &str) -> Option<&ServerMetrics> {
        self.0.iter().find(|m| m.server_id == server_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|m| m.server_id.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ServerMetrics> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ServerMetrics> for ServerSnapshots {
    fn from_iter<I: IntoIterator<Item = ServerMetrics>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ServerSnapshots {
    type Item = ServerMetrics;
    type IntoIter = std::vec::IntoIter<ServerMetrics>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl std::ops::Index<&str> for ServerSnapshots {
    type Output = ServerMetrics;

    fn index(&self, server_id: &str) -> &ServerMetrics {
        match self.get(server_id) {
            Some(metrics) => metrics,
            None => panic!("no snapshot for server {}", server_id),
        }
    }
}

impl Serialize for ServerSnapshots {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for metrics in &self.0 {
            map.serialize_entry(&metrics.server_id, metrics)?;
        }
        map.end()
    }
}

/// Forward-looking overload classification for a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a routing decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Random pick among servers that are neither overloaded nor at high risk
    Predictive,
    /// No server qualified; routed to the best health score instead
    Fallback,
}

impl SelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Predictive => "predictive",
            SelectionMode::Fallback => "fallback",
        }
    }
}

/// Result of a routing decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub server_id: String,
    pub mode: SelectionMode,
    pub predicted_traffic: f64,
    pub candidates: Vec<String>,
}

/// Per-server row of the dashboard feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    pub server_id: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub response_time: f64,
    pub error_rate: f64,
    pub request_rate: f64,
    pub health_score: f64,
    pub risk_level: RiskLevel,
    pub overloaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<i64>,
}

/// Aggregate view consumed by dashboards and telemetry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub current_traffic: f64,
    pub predicted_traffic: f64,
    pub traffic_spike: bool,
    pub healthy_servers: usize,
    pub total_servers: usize,
    pub servers: Vec<ServerStatus>,
}

fn unit_interval(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
