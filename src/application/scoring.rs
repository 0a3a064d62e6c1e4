use crate::application::indicator_engine::IndicatorSet;
use crate::application::ml::{MinMaxScaler, RegressorFactory, build_windows, latest_window};
use crate::domain::errors::ScoreError;
use crate::domain::market::{PriceTable, Ticker};
use crate::domain::scan::{FundamentalSnapshot, ScoreResult, ScoringPolicy};
use chrono::NaiveDate;
use ndarray::Array2;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Columns of the model input, in order
pub const FEATURE_COUNT: usize = 3;
const CLOSE_FEATURE: usize = 0;

/// One ticker's cleaned, indicator-enriched history.
///
/// Only rows where every price field and every indicator is defined survive.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerSeries {
    pub ticker: Ticker,
    pub dates: Vec<NaiveDate>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
    pub oscillator: Vec<f64>,
    pub oscillator_signal: Vec<f64>,
    pub long_ma: Vec<f64>,
}

impl TickerSeries {
    /// Joins the price table and the indicator tables for `ticker`.
    ///
    /// Returns `None` when the ticker is not a column of the table.
    pub fn assemble(table: &PriceTable, indicators: &IndicatorSet, ticker: &str) -> Option<Self> {
        let col = table.column_of(ticker)?;
        let mut series = Self {
            ticker: ticker.to_string(),
            dates: Vec::new(),
            close: Vec::new(),
            volume: Vec::new(),
            oscillator: Vec::new(),
            oscillator_signal: Vec::new(),
            long_ma: Vec::new(),
        };

        for row in 0..table.n_bars().min(indicators.n_bars()) {
            let Some(bar) = table.bar_at(ticker, row) else {
                continue;
            };
            let osc = indicators.oscillator[[row, col]];
            let signal = indicators.oscillator_signal[[row, col]];
            let ma = indicators.long_ma[[row, col]];
            if !(osc.is_finite() && signal.is_finite() && ma.is_finite()) {
                continue;
            }

            series.dates.push(bar.date);
            series.close.push(bar.close);
            series.volume.push(bar.volume);
            series.oscillator.push(osc);
            series.oscillator_signal.push(signal);
            series.long_ma.push(ma);
        }

        Some(series)
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    /// `(close, volume, oscillator)` per row
    pub fn feature_matrix(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.len(), FEATURE_COUNT), |(row, col)| match col {
            0 => self.close[row],
            1 => self.volume[row],
            _ => self.oscillator[row],
        })
    }
}

/// Trains one model per ticker and turns its forecast into a verdict
pub struct PredictiveScorer {
    window: usize,
    min_extra_bars: usize,
    seed: u64,
    policy: ScoringPolicy,
    factory: Arc<dyn RegressorFactory>,
    display_names: BTreeMap<Ticker, String>,
}

impl PredictiveScorer {
    pub fn new(
        window: usize,
        min_extra_bars: usize,
        seed: u64,
        policy: ScoringPolicy,
        factory: Arc<dyn RegressorFactory>,
    ) -> Self {
        Self {
            window,
            min_extra_bars,
            seed,
            policy,
            factory,
            display_names: BTreeMap::new(),
        }
    }

    pub fn with_display_names(mut self, names: BTreeMap<Ticker, String>) -> Self {
        self.display_names = names;
        self
    }

    /// Cleaned bars a ticker needs before it is worth training on
    pub fn required_bars(&self) -> usize {
        self.window + self.min_extra_bars
    }

    /// Model seed for `ticker`: stable across runs and distinct per ticker
    pub fn seed_for(&self, ticker: &str) -> u64 {
        self.seed ^ fnv1a(ticker.as_bytes())
    }

    pub fn score(
        &self,
        series: &TickerSeries,
        fundamental: FundamentalSnapshot,
    ) -> Result<ScoreResult, ScoreError> {
        let required = self.required_bars();
        if series.len() < required {
            return Err(ScoreError::InsufficientHistory {
                available: series.len(),
                required,
            });
        }

        let features = series.feature_matrix();
        let (scaler, scaled) = MinMaxScaler::fit_transform(features.view())?;
        let dataset = build_windows(scaled.view(), self.window, CLOSE_FEATURE)?;

        let mut model = self
            .factory
            .build(self.window, FEATURE_COUNT, self.seed_for(&series.ticker));
        let summary = model.fit(dataset.inputs.view(), dataset.targets.view())?;
        debug!(
            "{}: {} trained {} epochs (best {} loss {:.6})",
            series.ticker,
            model.name(),
            summary.epochs_run,
            summary.best_epoch,
            summary.best_loss
        );

        let scaled_prediction = model.predict(latest_window(scaled.view(), self.window)?)?;
        let predicted_close = scaler.inverse(CLOSE_FEATURE, scaled_prediction);

        let last = series.len() - 1;
        let last_close = series.close[last];
        if !(last_close.is_finite() && last_close > 0.0) {
            return Err(ScoreError::Prediction {
                reason: format!("last close {} is not a positive price", last_close),
            });
        }
        let variation = (predicted_close - last_close) / last_close * 100.0;
        if !variation.is_finite() {
            return Err(ScoreError::Prediction {
                reason: format!("non-finite variation from prediction {}", predicted_close),
            });
        }

        let oscillator = series.oscillator[last];
        let score = self
            .policy
            .composite_score(variation, oscillator, fundamental.value);

        Ok(ScoreResult {
            ticker: series.ticker.clone(),
            display_name: self
                .display_names
                .get(&series.ticker)
                .cloned()
                .unwrap_or_else(|| series.ticker.clone()),
            last_close,
            predicted_close,
            predicted_variation_pct: variation,
            oscillator,
            oscillator_signal: series.oscillator_signal[last],
            long_ma: series.long_ma[last],
            valuation: fundamental,
            technical: self.policy.technical_label(oscillator),
            score,
            recommendation: self.policy.recommendation(score),
        })
    }
}

/// 64-bit FNV-1a
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
