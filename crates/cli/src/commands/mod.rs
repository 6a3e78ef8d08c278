//! Subcommand implementations

pub mod routing;
pub mod servers;
