//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        println!("{}", "No servers found".yellow());
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a fraction in [0, 1] as a percentage
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Format seconds as milliseconds
pub fn format_latency(seconds: f64) -> String {
    format!("{:.0}ms", seconds * 1000.0)
}

/// Format a requests-per-second value
pub fn format_rate(rate: f64) -> String {
    format!("{:.0} req/s", rate)
}

/// Format a Unix timestamp as local time
pub fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| timestamp.to_string())
}

/// Color a health score: green from 80, yellow from 50, red below
pub fn color_health(score: f64) -> String {
    let formatted = format!("{:.1}", score);
    if score >= 80.0 {
        formatted.green().to_string()
    } else if score >= 50.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color an overload risk level
pub fn color_risk(risk: &str) -> String {
    match risk.to_lowercase().as_str() {
        "low" => risk.green().to_string(),
        "medium" => risk.yellow().to_string(),
        "high" => risk.red().to_string(),
        _ => risk.dimmed().to_string(),
    }
}

/// Color a selection mode
pub fn color_mode(mode: &str) -> String {
    match mode {
        "predictive" => mode.green().to_string(),
        "fallback" => mode.yellow().to_string(),
        _ => mode.to_string(),
    }
}

/// Color an overload flag as a status word
pub fn color_status(overloaded: bool) -> String {
    if overloaded {
        "overloaded".red().to_string()
    } else {
        "healthy".green().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatters() {
        assert_eq!(format_percent(0.255), "25.5%");
        assert_eq!(format_latency(0.25), "250ms");
        assert_eq!(format_rate(99.6), "100 req/s");
    }

    #[test]
    fn test_color_helpers_keep_text() {
        colored::control::set_override(false);
        assert_eq!(color_health(91.0), "91.0");
        assert_eq!(color_risk("high"), "high");
        assert_eq!(color_mode("fallback"), "fallback");
        assert_eq!(color_status(true), "overloaded");
    }
}
