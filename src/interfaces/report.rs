use crate::domain::scan::ScanReport;
use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

const SEPARATOR_WIDTH: usize = 96;

/// Fixed-width table, one row per scored ticker in rank order.
///
/// The composite score is not shown; the row order carries it. Excluded
/// tickers are left out here and only appear in the JSON report.
pub fn render_table(report: &ScanReport) -> String {
    let mut out = String::new();
    let rule = "=".repeat(SEPARATOR_WIDTH);

    let _ = writeln!(
        out,
        "MARKET SCAN {}",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(
        out,
        "{:<28} {:>10} {:>6} {:>9}  {:<18} {}",
        "Company", "Price", "RSI", "Var %", "Technical", "Recommendation"
    );
    let _ = writeln!(out, "{}", rule);

    if report.is_empty() {
        let _ = writeln!(out, "No ticker could be scored.");
    }
    for row in &report.results {
        let _ = writeln!(
            out,
            "{:<28} {:>10.2} {:>6.1} {:>+8.2}%  {:<18} {}",
            row.display_name,
            row.last_close,
            row.oscillator,
            row.predicted_variation_pct,
            row.technical.to_string(),
            row.recommendation
        );
    }

    out
}

pub fn render_json(report: &ScanReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize scan report")
}

pub fn render(report: &ScanReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(render_table(report)),
        ReportFormat::Json => render_json(report),
    }
}

pub fn write_report(path: &Path, rendered: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, rendered).with_context(|| format!("Failed to write {}", path.display()))
}
