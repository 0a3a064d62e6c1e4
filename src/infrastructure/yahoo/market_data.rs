use super::common::{ChartResponse, QuoteSummaryResponse};
use crate::domain::errors::MarketDataError;
use crate::domain::market::{HistoryPeriod, Interval, PriceSeries, PriceTable, Ticker};
use crate::domain::ports::MarketDataSource;
use crate::infrastructure::core::http_client_factory::{
    HttpClientFactory, HttpClientSettings, build_url_with_query, encode_component,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

pub const DEFAULT_CHART_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_SUMMARY_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// Yahoo Finance over its public JSON endpoints.
///
/// The "bulk" history request fans out one chart request per ticker, at most
/// `max_concurrency` in flight, and aligns the answers into one table.
pub struct YahooMarketDataSource {
    client: ClientWithMiddleware,
    chart_base_url: String,
    summary_base_url: String,
    max_concurrency: usize,
}

impl YahooMarketDataSource {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> YahooMarketDataSourceBuilder {
        YahooMarketDataSourceBuilder::default()
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, symbol: &str) -> Result<T, MarketDataError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MarketDataError::RequestFailed {
                reason: format!("{}: {}", symbol, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "YahooMarketDataSource: API error {} for {}: {}",
                status, symbol, body
            );
            return Err(MarketDataError::BadStatus {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| MarketDataError::InvalidData {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })
    }

    async fn fetch_series(
        &self,
        ticker: &str,
        period: HistoryPeriod,
        interval: Interval,
    ) -> Result<PriceSeries, MarketDataError> {
        let url = build_url_with_query(
            &format!(
                "{}/v8/finance/chart/{}",
                self.chart_base_url,
                encode_component(ticker)
            ),
            &[
                ("range", period.to_string()),
                ("interval", interval.to_yahoo_string().to_string()),
                ("includeAdjustedClose", "true".to_string()),
                ("events", "div,split".to_string()),
            ],
        );
        debug!("YahooMarketDataSource: fetching {}", url);

        let response: ChartResponse = self.get_json(&url, ticker).await?;
        let mut series = response.into_series(ticker)?;
        // Keep the requested spelling as the table key
        series.ticker = ticker.to_string();
        Ok(series)
    }
}

impl Default for YahooMarketDataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct YahooMarketDataSourceBuilder {
    chart_base_url: Option<String>,
    summary_base_url: Option<String>,
    max_concurrency: Option<usize>,
    http: Option<HttpClientSettings>,
}

impl YahooMarketDataSourceBuilder {
    pub fn chart_base_url(mut self, url: impl Into<String>) -> Self {
        self.chart_base_url = Some(url.into());
        self
    }

    pub fn summary_base_url(mut self, url: impl Into<String>) -> Self {
        self.summary_base_url = Some(url.into());
        self
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    pub fn http_settings(mut self, settings: HttpClientSettings) -> Self {
        self.http = Some(settings);
        self
    }

    pub fn build(self) -> YahooMarketDataSource {
        let settings = self.http.unwrap_or_default();
        YahooMarketDataSource {
            client: HttpClientFactory::create_client(&settings),
            chart_base_url: trim_base(self.chart_base_url, DEFAULT_CHART_BASE_URL),
            summary_base_url: trim_base(self.summary_base_url, DEFAULT_SUMMARY_BASE_URL),
            max_concurrency: self.max_concurrency.unwrap_or(8).max(1),
        }
    }
}

fn trim_base(url: Option<String>, default: &str) -> String {
    url.unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

#[async_trait]
impl MarketDataSource for YahooMarketDataSource {
    async fn fetch_history(
        &self,
        tickers: &[Ticker],
        period: HistoryPeriod,
        interval: Interval,
    ) -> Result<PriceTable, MarketDataError> {
        info!(
            "YahooMarketDataSource: downloading {} tickers ({} {})",
            tickers.len(),
            period,
            interval
        );

        let fetched: Vec<(Ticker, Result<PriceSeries, MarketDataError>)> =
            stream::iter(tickers.iter().cloned())
                .map(|ticker: Ticker| async move {
                    let result = self.fetch_series(&ticker, period, interval).await;
                    (ticker, result)
                })
                .buffer_unordered(self.max_concurrency)
                .collect()
                .await;

        let mut series = Vec::with_capacity(fetched.len());
        for (ticker, result) in fetched {
            match result {
                Ok(s) if !s.is_empty() => series.push(s),
                Ok(_) => warn!("YahooMarketDataSource: no bars for {}", ticker),
                Err(e) => warn!("YahooMarketDataSource: history for {} failed: {}", ticker, e),
            }
        }

        if series.is_empty() {
            return Err(MarketDataError::EmptyHistory {
                requested: tickers.len(),
            });
        }
        Ok(PriceTable::align(series))
    }

    async fn fetch_fundamental(&self, ticker: &str) -> Result<Option<f64>, MarketDataError> {
        let url = build_url_with_query(
            &format!(
                "{}/v10/finance/quoteSummary/{}",
                self.summary_base_url,
                encode_component(ticker)
            ),
            &[("modules", "summaryDetail")],
        );

        let response: QuoteSummaryResponse = self.get_json(&url, ticker).await?;
        response.trailing_pe(ticker)
    }
}
