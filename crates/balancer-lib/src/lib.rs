//! Predictive load balancing library
//!
//! This crate provides the core functionality for:
//! - Traffic forecasting and spike detection
//! - Server health scoring and overload risk assessment
//! - Predictive server selection with best-health fallback
//! - Traffic and metrics ingestion
//! - Health checks and observability

pub mod anomaly;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod ingest;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod predictor;
pub mod random;
pub mod selection;

pub use config::EngineConfig;
pub use engine::{DecisionEngine, DecisionEngineBuilder};
pub use error::{EngineError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{BalancerMetrics, StructuredLogger};
