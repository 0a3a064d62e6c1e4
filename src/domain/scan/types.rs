use crate::domain::errors::{MarketDataError, ScoreError};
use crate::domain::market::Ticker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Valuation multiple substituted when the real one is unavailable.
/// High enough to always trip the valuation penalty.
pub const FUNDAMENTAL_SENTINEL: f64 = 999.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundamentalSource {
    Reported,
    Sentinel,
}

/// Per-ticker valuation multiple (trailing P/E). Never absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub value: f64,
    pub source: FundamentalSource,
}

impl FundamentalSnapshot {
    pub fn reported(value: f64) -> Self {
        Self {
            value,
            source: FundamentalSource::Reported,
        }
    }

    pub fn sentinel() -> Self {
        Self {
            value: FUNDAMENTAL_SENTINEL,
            source: FundamentalSource::Sentinel,
        }
    }

    /// Maps a fetch outcome onto a snapshot.
    ///
    /// Errors, missing values, zero and non-finite values all become the sentinel.
    pub fn from_fetch(result: Result<Option<f64>, MarketDataError>) -> Self {
        match result {
            Ok(Some(v)) if v.is_finite() && v != 0.0 => Self::reported(v),
            _ => Self::sentinel(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.source == FundamentalSource::Sentinel
    }
}

impl Default for FundamentalSnapshot {
    fn default() -> Self {
        Self::sentinel()
    }
}

/// Oscillator-only diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TechnicalLabel {
    Overbought,
    Oversold,
    Neutral,
}

impl fmt::Display for TechnicalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TechnicalLabel::Overbought => write!(f, "SELL (overbought)"),
            TechnicalLabel::Oversold => write!(f, "BUY (oversold)"),
            TechnicalLabel::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Final verdict derived from the composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Buy,
    Sell,
    Neutral,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Buy => write!(f, "BUY"),
            Recommendation::Sell => write!(f, "SELL"),
            Recommendation::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Outcome of scoring one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub ticker: Ticker,
    pub display_name: String,
    pub last_close: f64,
    pub predicted_close: f64,
    /// Predicted move in percent of `last_close`
    pub predicted_variation_pct: f64,
    pub oscillator: f64,
    pub oscillator_signal: f64,
    pub long_ma: f64,
    pub valuation: FundamentalSnapshot,
    pub technical: TechnicalLabel,
    pub score: i32,
    pub recommendation: Recommendation,
}

/// A ticker left out of the report and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub ticker: Ticker,
    pub reason: String,
}

impl Exclusion {
    pub fn new(ticker: impl Into<Ticker>, error: &ScoreError) -> Self {
        Self {
            ticker: ticker.into(),
            reason: error.to_string(),
        }
    }
}

/// Ranked results of one scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub generated_at: DateTime<Utc>,
    pub results: Vec<ScoreResult>,
    pub excluded: Vec<Exclusion>,
}

impl ScanReport {
    /// Sorts by score descending. The sort is stable, so ties keep input order.
    pub fn ranked(mut results: Vec<ScoreResult>, excluded: Vec<Exclusion>) -> Self {
        results.sort_by(|a, b| b.score.cmp(&a.score));
        Self {
            generated_at: Utc::now(),
            results,
            excluded,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn get(&self, ticker: &str) -> Option<&ScoreResult> {
        self.results.iter().find(|r| r.ticker == ticker)
    }

    pub fn is_excluded(&self, ticker: &str) -> bool {
        self.excluded.iter().any(|e| e.ticker == ticker)
    }
}
