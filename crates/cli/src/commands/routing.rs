//! Routing, forecast and traffic commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_health, color_mode, color_risk, color_status, format_latency, format_percent,
    format_rate, print_info, print_json, print_success, print_table, print_warning,
    OutputFormat,
};

/// Row for the dashboard server table
#[derive(Tabled)]
struct DashboardRow {
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
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Ask the balancer for a destination server
pub async fn route(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.route().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_success(&result.message);
            println!("Server:            {}", result.server.cyan().bold());
            println!("Mode:              {}", color_mode(&result.mode));
            println!("Current traffic:   {}", format_rate(result.current_traffic));
            println!("Predicted traffic: {}", format_rate(result.predicted_traffic));
            if result.mode == "fallback" {
                print_warning("No server qualified; routed to the best health score");
            }
        }
    }

    Ok(())
}

/// Show the traffic forecast
pub async fn predict(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.predict().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Traffic Forecast".bold());
            println!("{}", "=".repeat(40));
            println!("Current:   {}", format_rate(result.current_traffic));
            println!("Predicted: {}", format_rate(result.predicted_traffic).cyan());
            if result.traffic_spike_detected {
                print_warning("Traffic spike detected");
            }
        }
    }

    Ok(())
}

/// Record one traffic observation
pub async fn record_traffic(client: &ApiClient, value: f64, format: OutputFormat) -> Result<()> {
    let result = client.record_traffic(value).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_success(&format!("Recorded {}", format_rate(result.recorded)));
            if result.spike {
                print_warning("Traffic spike detected");
            }
        }
    }

    Ok(())
}

/// Simulate a traffic spike on the balancer
pub async fn simulate_spike(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.simulate_spike().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_warning(&format!(
                "{}: {}",
                result.message,
                format_rate(result.new_traffic)
            ));
        }
    }

    Ok(())
}

/// Show the dashboard summary
pub async fn dashboard(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.dashboard().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Load Balancer Dashboard".bold());
            println!("{}", "=".repeat(60));
            println!("Current traffic:   {}", format_rate(result.current_traffic));
            println!("Predicted traffic: {}", format_rate(result.predicted_traffic));
            println!(
                "Healthy servers:   {}/{}",
                result.healthy_servers, result.total_servers
            );
            if result.traffic_spike {
                print_warning("Traffic spike detected");
            }
            println!();

            let rows: Vec<DashboardRow> = result
                .servers
                .iter()
                .map(|s| DashboardRow {
                    server: s.server_id.clone(),
                    health: color_health(s.health_score),
                    cpu: format_percent(s.cpu_usage),
                    memory: format_percent(s.memory_usage),
                    response: format_latency(s.response_time),
                    errors: format_percent(s.error_rate),
                    risk: color_risk(&s.risk_level),
                    status: color_status(s.overloaded),
                })
                .collect();
            print_table(rows);

            if result.servers.iter().any(|s| s.last_update.is_none()) {
                print_info("Servers without reported metrics count as overloaded");
            }
        }
    }

    Ok(())
}
