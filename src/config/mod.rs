//! Configuration module for rustscan.
//!
//! A [`ScanConfig`] is assembled once per run from, in increasing priority,
//! built-in defaults, an optional TOML file, environment variables and CLI
//! flags, then handed to the orchestrator unchanged.

mod env_config;
pub mod universe;

pub use env_config::{
    SCAN_DEADLINE_SECS, SCAN_INTERVAL, SCAN_MODE, SCAN_PERIOD, SCAN_SEED, SCAN_UNIVERSE,
    SCAN_WINDOW, SCAN_WORKERS,
};

use crate::application::indicator_engine::IndicatorConfig;
use crate::application::ml::TrainerConfig;
use crate::domain::market::{HistoryPeriod, Interval, Ticker};
use crate::domain::scan::ScoringPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Where market data comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Mock,
    Yahoo,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "yahoo" => Ok(Mode::Yahoo),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'mock' or 'yahoo'", s),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Mock => write!(f, "mock"),
            Mode::Yahoo => write!(f, "yahoo"),
        }
    }
}

/// Everything one scan needs to know
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub mode: Mode,
    pub universe: Vec<Ticker>,
    /// Report names; tickers without an entry are shown as-is
    pub display_names: BTreeMap<Ticker, String>,
    /// Feature window length in bars
    pub window: usize,
    /// Cleaned bars required beyond one window
    pub min_extra_bars: usize,
    pub workers: usize,
    pub period: HistoryPeriod,
    pub interval: Interval,
    /// Tickers still scoring after this many seconds are dropped
    pub score_deadline_secs: Option<u64>,
    pub indicators: IndicatorConfig,
    pub trainer: TrainerConfig,
    pub policy: ScoringPolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Mock,
            universe: universe::default_tickers(),
            display_names: universe::default_display_names(),
            window: 60,
            min_extra_bars: 20,
            workers: 2,
            period: HistoryPeriod::default(),
            interval: Interval::default(),
            score_deadline_secs: None,
            indicators: IndicatorConfig::default(),
            trainer: TrainerConfig::default(),
            policy: ScoringPolicy::default(),
        }
    }
}

impl ScanConfig {
    /// Parses a TOML document; missing keys keep their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse scan config")
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Defaults, then the optional file, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_process_env()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            anyhow::bail!("window must be at least 1 bar");
        }
        if self.workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }
        if self.score_deadline_secs == Some(0) {
            anyhow::bail!("score_deadline_secs must be positive when set");
        }
        if self.indicators.rsi_period == 0
            || self.indicators.signal_period == 0
            || self.indicators.long_ma_period == 0
        {
            anyhow::bail!("indicator periods must be positive: {:?}", self.indicators);
        }
        if !(0.0..1.0).contains(&self.trainer.dropout) {
            anyhow::bail!("trainer.dropout must lie in [0, 1), got {}", self.trainer.dropout);
        }
        if self.trainer.learning_rate.is_nan() || self.trainer.learning_rate <= 0.0 {
            anyhow::bail!(
                "trainer.learning_rate must be positive, got {}",
                self.trainer.learning_rate
            );
        }
        if self.trainer.batch_size == 0 || self.trainer.max_epochs == 0 {
            anyhow::bail!("trainer.batch_size and trainer.max_epochs must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();

        assert_eq!(config.mode, Mode::Mock);
        assert_eq!(config.universe.len(), 21);
        assert_eq!(config.window, 60);
        assert_eq!(config.workers, 2);
        assert_eq!(config.period, HistoryPeriod::Years(3));
        assert_eq!(config.interval, Interval::OneDay);
        assert_eq!(config.indicators.long_ma_period, 200);
        assert_eq!(config.trainer.max_epochs, 30);
        assert_eq!(config.policy.overbought_above, 70.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ScanConfig::from_toml_str(
            r#"
            mode = "yahoo"
            universe = ["AAPL", "NVDA"]
            workers = 4
            period = "1y"
            interval = "1wk"

            [display_names]
            AAPL = "Apple Inc."

            [trainer]
            max_epochs = 10

            [policy]
            oversold_below = 30.0
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, Mode::Yahoo);
        assert_eq!(config.universe, vec!["AAPL", "NVDA"]);
        assert_eq!(config.workers, 4);
        assert_eq!(config.period, HistoryPeriod::Years(1));
        assert_eq!(config.interval, Interval::OneWeek);
        assert_eq!(config.display_names["AAPL"], "Apple Inc.");
        assert_eq!(config.trainer.max_epochs, 10);
        assert_eq!(config.trainer.batch_size, 64);
        assert_eq!(config.policy.oversold_below, 30.0);
        assert_eq!(config.policy.overbought_above, 70.0);
        assert_eq!(config.window, 60);
    }

    #[test]
    fn test_invalid_toml_values_rejected() {
        assert!(ScanConfig::from_toml_str(r#"period = "3w""#).is_err());
        assert!(ScanConfig::from_toml_str(r#"mode = "polygon""#).is_err());
    }

    #[test]
    fn test_validate_rejects_unusable_settings() {
        let mut config = ScanConfig::default();
        config.workers = 0;
        assert!(config.validate().is_err());

        let mut config = ScanConfig::default();
        config.trainer.dropout = 1.0;
        assert!(config.validate().is_err());

        let mut config = ScanConfig::default();
        config.score_deadline_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(Mode::from_str("YAHOO").unwrap(), Mode::Yahoo);
        assert!(Mode::from_str("binance").is_err());
        assert_eq!(Mode::Mock.to_string(), "mock");
    }
}
