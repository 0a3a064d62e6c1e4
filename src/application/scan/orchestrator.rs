use super::worker_pool::{CpuPool, TaskHandle};
use crate::application::indicator_engine::{IndicatorEngine, IndicatorSet};
use crate::application::ml::{MlpRegressorFactory, RegressorFactory};
use crate::application::scoring::{PredictiveScorer, TickerSeries};
use crate::config::ScanConfig;
use crate::domain::errors::{ScanError, ScoreError};
use crate::domain::market::{PriceTable, Ticker};
use crate::domain::ports::MarketDataSource;
use crate::domain::scan::{
    Exclusion, FUNDAMENTAL_SENTINEL, FundamentalSnapshot, ScanReport, ScoreResult,
};
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

type Outcome = Result<ScoreResult, ScoreError>;

/// Drives one scan: concurrent acquisition, one indicator pass, bounded
/// parallel scoring and ranking.
///
/// # Example
///
/// ```no_run
/// use rustscan::application::scan::ScanOrchestrator;
/// use rustscan::config::ScanConfig;
/// use rustscan::infrastructure::mock::MockMarketDataSource;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = ScanConfig::default();
/// let source = Arc::new(MockMarketDataSource::synthetic(&config.universe, 400, 7));
/// let report = ScanOrchestrator::new(config, source).run().await?;
/// for row in &report.results {
///     println!("{} {}", row.display_name, row.recommendation);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ScanOrchestrator {
    config: ScanConfig,
    source: Arc<dyn MarketDataSource>,
    factory: Arc<dyn RegressorFactory>,
}

impl ScanOrchestrator {
    pub fn new(config: ScanConfig, source: Arc<dyn MarketDataSource>) -> Self {
        let factory = Arc::new(MlpRegressorFactory::new(config.trainer.clone()));
        Self {
            config,
            source,
            factory,
        }
    }

    /// Replaces the default regressor used for every ticker
    pub fn with_regressor_factory(mut self, factory: Arc<dyn RegressorFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Runs a full scan.
    ///
    /// Only an empty universe, a failed history request or an unusable worker
    /// pool fail the scan; every per-ticker problem becomes an exclusion.
    pub async fn run(&self) -> Result<ScanReport, ScanError> {
        let universe = self.universe()?;
        let pool = CpuPool::new(self.config.workers)?;
        info!(
            "Scan started: {} tickers, {} workers, period {} interval {}",
            universe.len(),
            pool.workers(),
            self.config.period,
            self.config.interval
        );

        let (table, fundamentals) = self.acquire(&universe).await?;
        info!(
            "Market data acquired: {} bars x {} tickers",
            table.n_bars(),
            table.n_tickers()
        );

        let indicators = IndicatorEngine::new(self.config.indicators.clone()).compute(table.close());
        debug!("Indicators computed for {} tickers", indicators.n_tickers());

        let (results, excluded) = self
            .score_all(&pool, &universe, Arc::new(table), Arc::new(indicators), fundamentals)
            .await;

        let report = ScanReport::ranked(results, excluded);
        info!(
            "Scan finished: {} scored, {} excluded",
            report.len(),
            report.excluded.len()
        );
        Ok(report)
    }

    /// Configured universe without duplicates, in first-seen order
    fn universe(&self) -> Result<Vec<Ticker>, ScanError> {
        let mut seen = HashSet::new();
        let mut universe = Vec::with_capacity(self.config.universe.len());
        for ticker in &self.config.universe {
            let ticker = ticker.trim();
            if ticker.is_empty() {
                continue;
            }
            if seen.insert(ticker.to_string()) {
                universe.push(ticker.to_string());
            } else {
                warn!("Duplicate ticker {} ignored", ticker);
            }
        }

        if universe.is_empty() {
            return Err(ScanError::EmptyUniverse);
        }
        Ok(universe)
    }

    /// I/O phase: the bulk history request and every fundamental request run
    /// concurrently, and the phase ends once all of them have completed.
    async fn acquire(
        &self,
        universe: &[Ticker],
    ) -> Result<(PriceTable, Vec<FundamentalSnapshot>), ScanError> {
        let source = &self.source;
        let history = source.fetch_history(universe, self.config.period, self.config.interval);
        let fundamentals = join_all(universe.iter().map(|ticker| async move {
            let fetched = source.fetch_fundamental(ticker).await;
            if let Err(e) = &fetched {
                warn!("{}: fundamental fetch failed: {}", ticker, e);
            }
            let snapshot = FundamentalSnapshot::from_fetch(fetched);
            if snapshot.is_sentinel() {
                warn!(
                    "{}: no valuation multiple, using sentinel {}",
                    ticker, FUNDAMENTAL_SENTINEL
                );
            }
            snapshot
        }));

        let (history, fundamentals) = tokio::join!(history, fundamentals);
        let table = history.map_err(ScanError::HistoryUnavailable)?;
        if no_valuations(&fundamentals) {
            warn!(
                "No valuation multiple for any of {} tickers; every score carries the sentinel penalty",
                fundamentals.len()
            );
        }
        Ok((table, fundamentals))
    }

    /// CPU phase: one task per ticker on the pool, collected as they finish.
    async fn score_all(
        &self,
        pool: &CpuPool,
        universe: &[Ticker],
        table: Arc<PriceTable>,
        indicators: Arc<IndicatorSet>,
        fundamentals: Vec<FundamentalSnapshot>,
    ) -> (Vec<ScoreResult>, Vec<Exclusion>) {
        let scorer = Arc::new(
            PredictiveScorer::new(
                self.config.window,
                self.config.min_extra_bars,
                self.config.trainer.seed,
                self.config.policy.clone(),
                self.factory.clone(),
            )
            .with_display_names(self.config.display_names.clone()),
        );

        let mut outcomes: Vec<Option<Outcome>> = universe.iter().map(|_| None).collect();
        let mut pending = FuturesUnordered::new();

        for (pos, (ticker, fundamental)) in universe.iter().zip(fundamentals).enumerate() {
            if table.column_of(ticker).is_none() {
                outcomes[pos] = Some(Err(ScoreError::InsufficientHistory {
                    available: 0,
                    required: scorer.required_bars(),
                }));
                continue;
            }

            let handle: TaskHandle<ScoreResult> = {
                let scorer = scorer.clone();
                let table = table.clone();
                let indicators = indicators.clone();
                let ticker = ticker.clone();
                pool.spawn(move || {
                    let series = TickerSeries::assemble(&table, &indicators, &ticker).ok_or(
                        ScoreError::InsufficientHistory {
                            available: 0,
                            required: scorer.required_bars(),
                        },
                    )?;
                    scorer.score(&series, fundamental)
                })
            };
            pending.push(async move { (pos, handle.join().await) });
        }
        info!("Dispatched {} scoring tasks", pending.len());

        // A deadline too far out to represent means no deadline
        let deadline = self
            .config
            .score_deadline_secs
            .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)));
        loop {
            let next = match deadline {
                Some(at) => match timeout_at(at, pending.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(
                            "Scoring deadline reached with {} tasks still running",
                            pending.len()
                        );
                        break;
                    }
                },
                None => pending.next().await,
            };
            let Some((pos, outcome)) = next else {
                break;
            };
            debug!("{}: scoring task finished", universe[pos]);
            outcomes[pos] = Some(outcome);
        }

        let deadline_ms = self
            .config
            .score_deadline_secs
            .map_or(0, |secs| secs.saturating_mul(1000));
        let mut results = Vec::new();
        let mut excluded = Vec::new();
        for (ticker, outcome) in universe.iter().zip(outcomes) {
            match outcome.unwrap_or(Err(ScoreError::TimedOut { deadline_ms })) {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!("{}: excluded from report: {}", ticker, e);
                    excluded.push(Exclusion::new(ticker.as_str(), &e));
                }
            }
        }

        (results, excluded)
    }
}

/// True when the fundamental source produced nothing usable for the whole universe
fn no_valuations(fundamentals: &[FundamentalSnapshot]) -> bool {
    !fundamentals.is_empty() && fundamentals.iter().all(FundamentalSnapshot::is_sentinel)
}
