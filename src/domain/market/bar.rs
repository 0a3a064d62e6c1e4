use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Opaque instrument symbol
pub type Ticker = String;

/// One daily OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// True when every price/volume field is a finite number
    pub fn is_complete(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Bars of one ticker with strictly increasing dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPriceSeries")]
pub struct PriceSeries {
    pub ticker: Ticker,
    bars: Vec<Bar>,
}

/// Wire form of a series; goes through [`PriceSeries::new`] on the way in
#[derive(Deserialize)]
struct RawPriceSeries {
    ticker: Ticker,
    bars: Vec<Bar>,
}

impl From<RawPriceSeries> for PriceSeries {
    fn from(raw: RawPriceSeries) -> Self {
        PriceSeries::new(raw.ticker, raw.bars)
    }
}

impl PriceSeries {
    /// Builds a series, sorting by date. On a duplicate date the bar that
    /// came last in the input wins.
    pub fn new(ticker: impl Into<Ticker>, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.date);

        let mut unique: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match unique.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => unique.push(bar),
            }
        }

        Self {
            ticker: ticker.into(),
            bars: unique,
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
