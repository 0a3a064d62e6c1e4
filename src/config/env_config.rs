//! Scan configuration overrides from environment variables.
//!
//! Values are read through a lookup function so the parsing can be exercised
//! without touching the process environment.

use super::universe::parse_ticker_list;
use super::{Mode, ScanConfig};
use crate::domain::market::{HistoryPeriod, Interval};
use anyhow::{Context, Result};
use std::str::FromStr;

pub const SCAN_MODE: &str = "SCAN_MODE";
pub const SCAN_UNIVERSE: &str = "SCAN_UNIVERSE";
pub const SCAN_WINDOW: &str = "SCAN_WINDOW";
pub const SCAN_WORKERS: &str = "SCAN_WORKERS";
pub const SCAN_PERIOD: &str = "SCAN_PERIOD";
pub const SCAN_INTERVAL: &str = "SCAN_INTERVAL";
pub const SCAN_DEADLINE_SECS: &str = "SCAN_DEADLINE_SECS";
pub const SCAN_SEED: &str = "SCAN_SEED";

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("Failed to parse {}={}", key, raw))?;
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}

impl ScanConfig {
    /// Overrides fields whose variable is set and non-empty
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(SCAN_MODE).filter(|v| !v.trim().is_empty()) {
            self.mode = Mode::from_str(raw.trim())?;
        }
        if let Some(raw) = lookup(SCAN_UNIVERSE) {
            let tickers = parse_ticker_list(&raw);
            if !tickers.is_empty() {
                self.universe = tickers;
            }
        }
        if let Some(window) = parse_var::<usize>(&lookup, SCAN_WINDOW)? {
            self.window = window;
        }
        if let Some(workers) = parse_var::<usize>(&lookup, SCAN_WORKERS)? {
            self.workers = workers;
        }
        if let Some(raw) = lookup(SCAN_PERIOD).filter(|v| !v.trim().is_empty()) {
            self.period = HistoryPeriod::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", SCAN_PERIOD))?;
        }
        if let Some(raw) = lookup(SCAN_INTERVAL).filter(|v| !v.trim().is_empty()) {
            self.interval = Interval::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", SCAN_INTERVAL))?;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, SCAN_DEADLINE_SECS)? {
            self.score_deadline_secs = Some(secs);
        }
        if let Some(seed) = parse_var::<u64>(&lookup, SCAN_SEED)? {
            self.trainer.seed = seed;
        }
        Ok(())
    }

    /// Overrides from the process environment
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }
}
