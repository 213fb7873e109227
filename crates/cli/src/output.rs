//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use risk_lib::predictor::{GaugeParams, HIGH_RISK_PERCENT};
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Width of the text gauge in cells
const GAUGE_CELLS: usize = 20;

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message to stderr, keeping stdout parseable
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Render a gauge as a text bar, e.g. `[███████████████░░░░░] 78%`
pub fn render_gauge(gauge: &GaugeParams) -> String {
    let filled = (gauge.percent as usize * GAUGE_CELLS + 50) / 100;
    let bar = format!(
        "{}{}",
        "█".repeat(filled),
        "░".repeat(GAUGE_CELLS - filled)
    );
    format!("[{}] {}%", bar, gauge.percent)
}

/// Color a risk percentage: red at or above the alarm threshold, green below
pub fn color_percentage(percent: u8) -> String {
    let formatted = format!("{}%", percent);
    if percent >= HIGH_RISK_PERCENT {
        formatted.red().bold().to_string()
    } else {
        formatted.green().to_string()
    }
}

/// Color the verdict from the classifier's label
pub fn color_verdict(message: &str, high_risk: bool) -> String {
    if high_risk {
        message.red().bold().to_string()
    } else {
        message.green().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_lib::predictor::GAUGE_LABEL;

    #[test]
    fn test_render_gauge() {
        assert_eq!(
            render_gauge(&GaugeParams::new(GAUGE_LABEL, 78)),
            format!("[{}{}] 78%", "█".repeat(16), "░".repeat(4))
        );
        assert_eq!(
            render_gauge(&GaugeParams::new(GAUGE_LABEL, 0)),
            format!("[{}] 0%", "░".repeat(20))
        );
        assert_eq!(
            render_gauge(&GaugeParams::new(GAUGE_LABEL, 100)),
            format!("[{}] 100%", "█".repeat(20))
        );
    }

    #[test]
    fn test_color_percentage_keeps_value() {
        colored::control::set_override(false);
        assert_eq!(color_percentage(78), "78%");
        assert_eq!(color_percentage(12), "12%");
    }
}
