use crate::domain::errors::MarketDataError;
use crate::domain::market::{Bar, HistoryPeriod, Interval, PriceSeries, PriceTable, Ticker};
use crate::domain::ports::MarketDataSource;
use async_trait::async_trait;
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
enum FundamentalStub {
    Value(f64),
    Missing,
    Failing(String),
}

/// In-memory market data for tests and `mock` mode.
///
/// Period and interval are accepted but not applied: the stored series are
/// returned as they are.
#[derive(Clone, Default)]
pub struct MockMarketDataSource {
    series: HashMap<Ticker, PriceSeries>,
    fundamentals: HashMap<Ticker, FundamentalStub>,
    history_failure: Option<String>,
    latency: Option<Duration>,
    history_calls: Arc<AtomicUsize>,
    fundamental_calls: Arc<AtomicUsize>,
}

impl MockMarketDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.series.insert(series.ticker.clone(), series);
        self
    }

    pub fn with_fundamental(mut self, ticker: &str, value: f64) -> Self {
        self.fundamentals
            .insert(ticker.to_string(), FundamentalStub::Value(value));
        self
    }

    /// The source answers, but has no valuation multiple for `ticker`
    pub fn with_missing_fundamental(mut self, ticker: &str) -> Self {
        self.fundamentals
            .insert(ticker.to_string(), FundamentalStub::Missing);
        self
    }

    pub fn with_failing_fundamental(mut self, ticker: &str) -> Self {
        self.fundamentals.insert(
            ticker.to_string(),
            FundamentalStub::Failing(format!("quote summary for {} unavailable", ticker)),
        );
        self
    }

    /// Every history request fails
    pub fn with_history_failure(mut self, reason: &str) -> Self {
        self.history_failure = Some(reason.to_string());
        self
    }

    /// Delay applied to every request
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Seeded random walks and valuation multiples for every ticker
    pub fn synthetic(universe: &[Ticker], n_bars: usize, seed: u64) -> Self {
        let mut source = Self::new();
        for (i, ticker) in universe.iter().enumerate() {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            let drift = rng.random_range(-0.001..0.0015);
            let mut close = rng.random_range(20.0..400.0);
            let closes: Vec<f64> = (0..n_bars)
                .map(|_| {
                    close *= 1.0 + drift + rng.random_range(-0.02..0.02);
                    close
                })
                .collect();
            let pe = rng.random_range(8.0..120.0);

            source = source
                .with_series(daily_series(ticker, &closes, &mut rng))
                .with_fundamental(ticker, pe);
        }
        source
    }

    /// Straight-line closes: `start`, `start + step`, ...
    pub fn linear_series(ticker: &str, n_bars: usize, start: f64, step: f64) -> PriceSeries {
        let closes: Vec<f64> = (0..n_bars).map(|i| start + step * i as f64).collect();
        let mut rng = StdRng::seed_from_u64(n_bars as u64);
        daily_series(ticker, &closes, &mut rng)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn fundamental_calls(&self) -> usize {
        self.fundamental_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

/// Weekday bars from 2021-01-04 with the given closes
fn daily_series(ticker: &str, closes: &[f64], rng: &mut StdRng) -> PriceSeries {
    let mut date = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap_or_default();
    let mut bars = Vec::with_capacity(closes.len());
    for close in closes {
        let spread = close.abs() * 0.01;
        bars.push(Bar {
            date,
            open: close - spread * 0.5,
            high: close + spread,
            low: close - spread,
            close: *close,
            volume: rng.random_range(1.0e6..5.0e6),
        });
        date = next_weekday(date);
    }
    PriceSeries::new(ticker, bars)
}

fn next_weekday(date: NaiveDate) -> NaiveDate {
    let step = match date.weekday() {
        Weekday::Fri => 3,
        Weekday::Sat => 2,
        _ => 1,
    };
    date + ChronoDuration::days(step)
}

#[async_trait]
impl MarketDataSource for MockMarketDataSource {
    async fn fetch_history(
        &self,
        tickers: &[Ticker],
        period: HistoryPeriod,
        interval: Interval,
    ) -> Result<PriceTable, MarketDataError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        debug!(
            "MockMarketDataSource: history for {} tickers ({} {})",
            tickers.len(),
            period,
            interval
        );

        if let Some(reason) = &self.history_failure {
            return Err(MarketDataError::RequestFailed {
                reason: reason.clone(),
            });
        }

        let found: Vec<PriceSeries> = tickers
            .iter()
            .filter_map(|t| self.series.get(t).cloned())
            .collect();
        if found.is_empty() {
            return Err(MarketDataError::EmptyHistory {
                requested: tickers.len(),
            });
        }
        Ok(PriceTable::align(found))
    }

    async fn fetch_fundamental(&self, ticker: &str) -> Result<Option<f64>, MarketDataError> {
        self.fundamental_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        match self.fundamentals.get(ticker) {
            Some(FundamentalStub::Value(v)) => Ok(Some(*v)),
            Some(FundamentalStub::Failing(reason)) => Err(MarketDataError::RequestFailed {
                reason: reason.clone(),
            }),
            Some(FundamentalStub::Missing) | None => Ok(None),
        }
    }
}
