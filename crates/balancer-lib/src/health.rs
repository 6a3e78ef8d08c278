//! Component health for the balancer process
//!
//! Tracks the status of the decision engine, metrics ingestion and the API
//! for liveness and readiness probes. A route against an empty registry
//! makes the engine unhealthy until a server reports metrics. A fallback
//! routing decision only degrades it.

use crate::models::SelectionMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Operational, but decisions are best-effort
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across components; healthy when there are none
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|c| c.status)
            .fold(ComponentStatus::Healthy, |worst, status| match (worst, status) {
                (ComponentStatus::Unhealthy, _) | (_, ComponentStatus::Unhealthy) => {
                    ComponentStatus::Unhealthy
                }
                (ComponentStatus::Degraded, _) | (_, ComponentStatus::Degraded) => {
                    ComponentStatus::Degraded
                }
                _ => ComponentStatus::Healthy,
            })
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const ENGINE: &str = "engine";
    pub const INGESTION: &str = "ingestion";
    pub const API: &str = "api";
}

/// Health registry for tracking component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components
            .write()
            .await
            .insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Reflect a routing outcome on the engine component
    pub async fn record_routing(&self, outcome: Option<SelectionMode>) {
        match outcome {
            Some(SelectionMode::Predictive) => self.set_healthy(components::ENGINE).await,
            Some(SelectionMode::Fallback) => {
                self.set_degraded(
                    components::ENGINE,
                    "No server qualified; routing to best available",
                )
                .await
            }
            None => {
                self.set_unhealthy(components::ENGINE, "No servers available")
                    .await
            }
        }
    }

    /// Clear an engine outage once the registry holds servers again
    ///
    /// Only the unhealthy state set by an empty-registry route is cleared;
    /// a fallback degradation stays until the next predictive decision.
    pub async fn record_server_count(&self, count: usize) {
        if count == 0 {
            return;
        }

        let mut registered = self.components.write().await;
        if let Some(engine) = registered.get_mut(components::ENGINE) {
            if engine.status == ComponentStatus::Unhealthy {
                *engine = ComponentHealth::healthy();
            }
        }
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        let reason = if !ready {
            Some("Balancer not yet initialized")
        } else if !health.status.is_operational() {
            Some("Critical component unhealthy")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_routing_degrades_engine() {
        let registry = HealthRegistry::new();
        registry.register(components::ENGINE).await;
        registry.register(components::INGESTION).await;

        registry.record_routing(Some(SelectionMode::Fallback)).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(health.components[components::ENGINE].message.is_some());
    }

    #[tokio::test]
    async fn test_no_server_makes_engine_unhealthy_until_recovery() {
        let registry = HealthRegistry::new();
        registry.register(components::ENGINE).await;

        registry.record_routing(None).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);

        registry.record_routing(Some(SelectionMode::Predictive)).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_registered_server_clears_unhealthy_engine() {
        let registry = HealthRegistry::new();
        registry.register(components::ENGINE).await;
        registry.set_ready(true).await;

        registry.record_routing(None).await;
        assert!(!registry.readiness().await.ready);

        registry.record_server_count(1).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_server_count_keeps_fallback_degradation() {
        let registry = HealthRegistry::new();
        registry.register(components::ENGINE).await;

        registry.record_routing(Some(SelectionMode::Fallback)).await;
        registry.record_server_count(2).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry.record_routing(None).await;
        registry.record_server_count(0).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_unhealthy_wins_over_degraded() {
        let registry = HealthRegistry::new();
        registry.set_degraded(components::INGESTION, "probe timeout").await;
        registry.set_unhealthy(components::ENGINE, "No servers available").await;

        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_readiness_ready_when_degraded() {
        let registry = HealthRegistry::new();
        registry.set_ready(true).await;
        registry.set_degraded(components::ENGINE, "fallback").await;

        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_readiness_not_ready_when_unhealthy() {
        let registry = HealthRegistry::new();
        registry.set_ready(true).await;
        registry.record_routing(None).await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("Critical component unhealthy")
        );
    }
}
