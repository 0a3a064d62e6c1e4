use crate::domain::errors::MarketDataError;
use crate::domain::market::{HistoryPeriod, Interval, PriceTable, Ticker};
use async_trait::async_trait;

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Aligned OHLCV history for the whole universe in one request.
    ///
    /// Tickers the source knows nothing about may be missing from the table;
    /// an error means no usable history at all.
    async fn fetch_history(
        &self,
        tickers: &[Ticker],
        period: HistoryPeriod,
        interval: Interval,
    ) -> Result<PriceTable, MarketDataError>;

    /// Trailing valuation multiple, `Ok(None)` when the source has none.
    async fn fetch_fundamental(&self, ticker: &str) -> Result<Option<f64>, MarketDataError>;
}
