//! Predictive Load Balancer CLI
//!
//! A command-line tool for routing requests, inspecting forecasts and
//! reporting server metrics to a running balancer.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::MetricsReport;
use commands::{routing, servers};

/// Predictive Load Balancer CLI
#[derive(Parser)]
#[command(name = "plb")]
#[command(author, version, about = "CLI for the Predictive Load Balancer", long_about = None)]
pub struct Cli {
    /// Balancer URL (can also be set via PLB_API_URL env var)
    #[arg(long, env = "PLB_API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Route one request and show the chosen server
    Route,

    /// Show current and predicted traffic
    Predict,

    /// List server metrics, or show one server
    Servers {
        /// Server ID
        id: Option<String>,
    },

    /// Report metrics for a server
    Report {
        /// Server ID
        id: String,

        /// CPU usage fraction (0-1)
        #[arg(long, default_value_t = 0.0)]
        cpu: f64,

        /// Memory usage fraction (0-1)
        #[arg(long, default_value_t = 0.0)]
        memory: f64,

        /// Response time in seconds
        #[arg(long, default_value_t = 0.0)]
        response_time: f64,

        /// Error rate fraction (0-1)
        #[arg(long, default_value_t = 0.0)]
        error_rate: f64,

        /// Requests per second
        #[arg(long, default_value_t = 0.0)]
        request_rate: f64,
    },

    /// Record an aggregate traffic observation
    Traffic {
        /// Requests per second
        value: f64,
    },

    /// Show the dashboard summary
    Dashboard,

    /// Simulate a traffic spike
    Spike,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Route => routing::route(&client, cli.format).await?,
        Commands::Predict => routing::predict(&client, cli.format).await?,
        Commands::Servers { id } => match id {
            Some(id) => servers::show_server(&client, &id, cli.format).await?,
            None => servers::list_servers(&client, cli.format).await?,
        },
        Commands::Report {
            id,
            cpu,
            memory,
            response_time,
            error_rate,
            request_rate,
        } => {
            let report = MetricsReport {
                cpu_usage: cpu,
                memory_usage: memory,
                response_time,
                error_rate,
                request_rate,
            };
            servers::report_metrics(&client, &id, report, cli.format).await?;
        }
        Commands::Traffic { value } => {
            routing::record_traffic(&client, value, cli.format).await?
        }
        Commands::Dashboard => routing::dashboard(&client, cli.format).await?,
        Commands::Spike => routing::simulate_spike(&client, cli.format).await?,
    }

    Ok(())
}
