//! Server metrics commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, MetricsReport, ServerMetrics};
use crate::output::{
    color_health, format_latency, format_percent, format_rate, format_timestamp, print_json,
    print_success, print_table, OutputFormat,
};

/// Row for the server list table
#[derive(Tabled)]
struct ServerRow {
    #[tabled(rename = "Server")]
    server: String,
    #[tabled(rename = "Health")]
    health: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Response")]
    response: String,
    #[tabled(rename = "Errors")]
    errors: String,
    #[tabled(rename = "Requests")]
    requests: String,
}

impl From<&ServerMetrics> for ServerRow {
    fn from(m: &ServerMetrics) -> Self {
        Self {
            server: m.server_id.clone(),
            health: color_health(m.health_score),
            cpu: format_percent(m.cpu_usage),
            memory: format_percent(m.memory_usage),
            response: format_latency(m.response_time),
            errors: format_percent(m.error_rate),
            requests: format_rate(m.request_rate),
        }
    }
}

/// List every server snapshot
pub async fn list_servers(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let servers = client.servers().await?;

    match format {
        OutputFormat::Json => print_json(&servers)?,
        OutputFormat::Table => print_table(servers.iter().map(ServerRow::from).collect()),
    }

    Ok(())
}

/// Show one server snapshot
pub async fn show_server(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let server = client.server(id).await?;

    match format {
        OutputFormat::Json => print_json(&server)?,
        OutputFormat::Table => print_details(&server),
    }

    Ok(())
}

/// Report metrics for one server
pub async fn report_metrics(
    client: &ApiClient,
    id: &str,
    report: MetricsReport,
    format: OutputFormat,
) -> Result<()> {
    let stored = client.report_metrics(id, &report).await?;

    match format {
        OutputFormat::Json => print_json(&stored)?,
        OutputFormat::Table => {
            print_success(&format!("Metrics recorded for {}", stored.server_id));
            print_details(&stored);
        }
    }

    Ok(())
}

fn print_details(m: &ServerMetrics) {
    println!("{}", format!("Server {}", m.server_id).bold());
    println!("{}", "-".repeat(40));
    println!("Health score:  {}", color_health(m.health_score));
    println!("CPU:           {}", format_percent(m.cpu_usage));
    println!("Memory:        {}", format_percent(m.memory_usage));
    println!("Response time: {}", format_latency(m.response_time));
    println!("Error rate:    {}", format_percent(m.error_rate));
    println!("Request rate:  {}", format_rate(m.request_rate));
    println!("Last update:   {}", format_timestamp(m.last_update).dimmed());
}
