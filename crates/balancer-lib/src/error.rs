//! Error types for the decision engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// The registry holds no server at all
    #[error("no servers available")]
    NoServersAvailable,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
