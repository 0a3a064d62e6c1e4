use crate::domain::errors::MarketDataError;
use crate::domain::market::{Bar, PriceSeries};
use chrono::DateTime;
use serde::Deserialize;

// ===== Chart endpoint (v8) =====

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
pub struct YahooError {
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    #[serde(default)]
    pub gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<QuoteColumns>,
    #[serde(default)]
    pub adjclose: Vec<AdjCloseColumn>,
}

/// Column arrays; Yahoo sends `null` for bars without trades
#[derive(Debug, Default, Deserialize)]
pub struct QuoteColumns {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct AdjCloseColumn {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Converts the first chart result into dividend/split adjusted bars.
    ///
    /// Open, high and low are rescaled by `adjclose / close`; volume is left
    /// untouched. Bars with a null field are kept as `NaN` and dropped later
    /// by the scorer's cleaning step.
    pub fn into_series(self, ticker: &str) -> Result<PriceSeries, MarketDataError> {
        if let Some(err) = self.chart.error {
            return Err(MarketDataError::InvalidData {
                symbol: ticker.to_string(),
                reason: format!(
                    "{}: {}",
                    err.code,
                    err.description.unwrap_or_default()
                ),
            });
        }

        let result = self
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| MarketDataError::InvalidData {
                symbol: ticker.to_string(),
                reason: "empty chart result".to_string(),
            })?;

        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
        let adjclose = result
            .indicators
            .adjclose
            .into_iter()
            .next()
            .map(|c| c.adjclose);

        let value = |column: &[Option<f64>], i: usize| -> f64 {
            column.get(i).copied().flatten().unwrap_or(f64::NAN)
        };

        let mut bars = Vec::with_capacity(result.timestamp.len());
        for (i, ts) in result.timestamp.iter().enumerate() {
            let Some(moment) = DateTime::from_timestamp(ts + result.meta.gmtoffset, 0) else {
                continue;
            };

            let close = value(&quote.close, i);
            let factor = match &adjclose {
                Some(adj) => {
                    let adj = value(adj, i);
                    if close.is_finite() && close != 0.0 && adj.is_finite() {
                        adj / close
                    } else {
                        1.0
                    }
                }
                None => 1.0,
            };

            bars.push(Bar {
                date: moment.date_naive(),
                open: value(&quote.open, i) * factor,
                high: value(&quote.high, i) * factor,
                low: value(&quote.low, i) * factor,
                close: close * factor,
                volume: value(&quote.volume, i),
            });
        }

        Ok(PriceSeries::new(result.meta.symbol, bars))
    }
}

// ===== Quote summary endpoint (v10) =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryResponse {
    pub quote_summary: QuoteSummaryEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct QuoteSummaryEnvelope {
    pub result: Option<Vec<QuoteSummaryResult>>,
    pub error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryResult {
    pub summary_detail: Option<SummaryDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
pub struct RawValue {
    pub raw: Option<f64>,
}

impl QuoteSummaryResponse {
    /// Trailing P/E if Yahoo reports one
    pub fn trailing_pe(self, ticker: &str) -> Result<Option<f64>, MarketDataError> {
        if let Some(err) = self.quote_summary.error {
            return Err(MarketDataError::InvalidData {
                symbol: ticker.to_string(),
                reason: format!("{}: {}", err.code, err.description.unwrap_or_default()),
            });
        }

        Ok(self
            .quote_summary
            .result
            .and_then(|results| results.into_iter().next())
            .and_then(|r| r.summary_detail)
            .and_then(|d| d.trailing_pe)
            .and_then(|v| v.raw))
    }
}
