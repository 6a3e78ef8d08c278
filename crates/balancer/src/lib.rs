//! Predictive load balancer front door
//!
//! Configuration loading and the HTTP API around a
//! [`balancer_lib::DecisionEngine`].

pub mod api;
pub mod config;
