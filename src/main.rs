//! rustscan - ranked buy/sell/neutral scan of a ticker universe
//!
//! # Usage
//! ```sh
//! cargo run -- --mode yahoo --tickers AAPL,MSFT,NVDA --workers 4
//! cargo run -- --config scan.toml --format json --output reports/scan.json
//! ```
//!
//! # Environment Variables
//! - `SCAN_MODE`, `SCAN_UNIVERSE`, `SCAN_WINDOW`, `SCAN_WORKERS`, `SCAN_PERIOD`,
//!   `SCAN_INTERVAL`, `SCAN_DEADLINE_SECS`, `SCAN_SEED` override the config file
//! - `RUST_LOG` - log filter (default: info); logs go to stderr

use anyhow::{Context, Result};
use clap::Parser;
use rustscan::application::scan::ScanOrchestrator;
use rustscan::config::universe::parse_ticker_list;
use rustscan::config::{Mode, ScanConfig};
use rustscan::domain::ports::MarketDataSource;
use rustscan::infrastructure::{MockMarketDataSource, YahooMarketDataSource};
use rustscan::interfaces::{ReportFormat, render, write_report};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Bars generated per ticker in mock mode (about three years of sessions)
const MOCK_BARS: usize = 756;

#[derive(Parser)]
#[command(name = "rustscan")]
#[command(version, about = "Parallel market scan: indicators, per-ticker models, ranked report", long_about = None)]
struct Cli {
    /// TOML config file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Market data source
    #[arg(short, long)]
    mode: Option<Mode>,

    /// Comma separated universe, e.g. "AAPL,MSFT"
    #[arg(short, long)]
    tickers: Option<String>,

    /// Scoring worker threads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Feature window length in bars
    #[arg(long)]
    window: Option<usize>,

    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut ScanConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(raw) = &self.tickers {
            let tickers = parse_ticker_list(raw);
            if !tickers.is_empty() {
                config.universe = tickers;
            }
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(window) = self.window {
            config.window = window;
        }
    }
}

fn data_source(config: &ScanConfig) -> Arc<dyn MarketDataSource> {
    match config.mode {
        Mode::Mock => Arc::new(MockMarketDataSource::synthetic(
            &config.universe,
            MOCK_BARS,
            config.trainer.seed,
        )),
        Mode::Yahoo => Arc::new(YahooMarketDataSource::new()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // stdout carries only the report
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(stderr_layer)
        .init();

    let cli = Cli::parse();
    let mut config = ScanConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate().context("Invalid scan configuration")?;

    info!(
        "rustscan {} starting: mode={}, {} tickers, window={}, workers={}",
        env!("CARGO_PKG_VERSION"),
        config.mode,
        config.universe.len(),
        config.window,
        config.workers
    );

    let source = data_source(&config);
    let report = ScanOrchestrator::new(config, source).run().await?;
    let rendered = render(&report, cli.format)?;

    match &cli.output {
        Some(path) => {
            write_report(path, &rendered)?;
            info!("Report written to {}", path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}
