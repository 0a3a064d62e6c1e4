use ndarray::{ArrayView1, ArrayView2, ArrayView3};
use rustscan::application::ml::{RegressorFactory, SequenceRegressor, TrainingSummary};
use rustscan::application::scan::ScanOrchestrator;
use rustscan::config::ScanConfig;
use rustscan::domain::errors::{ScanError, ScoreError};
use rustscan::domain::scan::{FUNDAMENTAL_SENTINEL, Recommendation, TechnicalLabel};
use rustscan::infrastructure::mock::MockMarketDataSource;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

fn config(universe: &[&str]) -> ScanConfig {
    let mut config = ScanConfig::default();
    config.universe = universe.iter().map(|t| t.to_string()).collect();
    config.trainer.max_epochs = 5;
    config.trainer.hidden_units = 8;
    config
}

/// Predicts a fixed scaled close, optionally after a delay
struct FixedRegressor {
    scaled: f64,
    delay: Duration,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl SequenceRegressor for FixedRegressor {
    fn fit(
        &mut self,
        _inputs: ArrayView3<'_, f64>,
        _targets: ArrayView1<'_, f64>,
    ) -> Result<TrainingSummary, ScoreError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(TrainingSummary {
            epochs_run: 1,
            best_epoch: 1,
            best_loss: 0.0,
            stopped_early: false,
        })
    }

    fn predict(&self, _window: ArrayView2<'_, f64>) -> Result<f64, ScoreError> {
        Ok(self.scaled)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[derive(Default)]
struct FixedFactory {
    scaled: f64,
    delay: Duration,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl FixedFactory {
    fn new(scaled: f64) -> Self {
        Self {
            scaled,
            ..Self::default()
        }
    }
}

impl RegressorFactory for FixedFactory {
    fn build(&self, _window: usize, _n_features: usize, _seed: u64) -> Box<dyn SequenceRegressor> {
        Box::new(FixedRegressor {
            scaled: self.scaled,
            delay: self.delay,
            running: self.running.clone(),
            peak: self.peak.clone(),
        })
    }
}

struct PanickingRegressor;

impl SequenceRegressor for PanickingRegressor {
    fn fit(
        &mut self,
        _inputs: ArrayView3<'_, f64>,
        _targets: ArrayView1<'_, f64>,
    ) -> Result<TrainingSummary, ScoreError> {
        panic!("numerical blow-up");
    }

    fn predict(&self, _window: ArrayView2<'_, f64>) -> Result<f64, ScoreError> {
        Ok(0.0)
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

/// Panics for tickers built with the marked seed, defers to `inner` otherwise
struct PanicOnSeed {
    seed: u64,
    inner: FixedFactory,
}

impl RegressorFactory for PanicOnSeed {
    fn build(&self, window: usize, n_features: usize, seed: u64) -> Box<dyn SequenceRegressor> {
        if seed == self.seed {
            Box::new(PanickingRegressor)
        } else {
            self.inner.build(window, n_features, seed)
        }
    }
}

#[tokio::test]
async fn test_short_history_ticker_is_dropped() {
    init_tracing();
    let source = Arc::new(
        MockMarketDataSource::new()
            .with_series(MockMarketDataSource::linear_series("AAA", 300, 100.0, 1.0))
            .with_series(MockMarketDataSource::linear_series("BBB", 40, 50.0, 0.5))
            .with_fundamental("AAA", 20.0)
            .with_fundamental("BBB", 15.0),
    );

    let report = ScanOrchestrator::new(config(&["AAA", "BBB"]), source)
        .run()
        .await
        .unwrap();

    assert_eq!(report.len(), 1);
    let aaa = report.get("AAA").unwrap();
    assert_eq!(aaa.technical, TechnicalLabel::Overbought);
    assert_eq!(aaa.technical.to_string(), "SELL (overbought)");
    assert_eq!(aaa.last_close, 399.0);
    assert_eq!(aaa.valuation.value, 20.0);
    assert!([-2, 0, 2].contains(&aaa.score));

    assert!(report.get("BBB").is_none());
    assert!(report.is_excluded("BBB"));
}

#[tokio::test]
async fn test_failed_fundamental_costs_two_points() {
    init_tracing();
    let source = Arc::new(
        MockMarketDataSource::new()
            .with_series(MockMarketDataSource::linear_series("CCC", 300, 50.0, 0.0))
            .with_failing_fundamental("CCC"),
    );

    let report = ScanOrchestrator::new(config(&["CCC"]), source)
        .run()
        .await
        .unwrap();

    let ccc = report.get("CCC").unwrap();
    assert_eq!(ccc.valuation.value, FUNDAMENTAL_SENTINEL);
    assert!(ccc.valuation.is_sentinel());
    // Flat price: no predicted move and a neutral oscillator
    assert_eq!(ccc.oscillator, 50.0);
    assert!(ccc.predicted_variation_pct.abs() < 1e-9);
    assert_eq!(ccc.score, -2);
    assert_eq!(ccc.recommendation, Recommendation::Sell);
}

#[tokio::test]
async fn test_report_is_ranked_with_stable_ties() {
    init_tracing();
    let source = Arc::new(
        MockMarketDataSource::new()
            // Rising, expensive: -2
            .with_series(MockMarketDataSource::linear_series("EXP", 300, 100.0, 1.0))
            .with_fundamental("EXP", 150.0)
            // Rising, fair: 0
            .with_series(MockMarketDataSource::linear_series("FAIR", 300, 100.0, 1.0))
            .with_fundamental("FAIR", 20.0)
            // Falling: oversold and predicted rebound to the old high, +4
            .with_series(MockMarketDataSource::linear_series("DIP", 300, 400.0, -1.0))
            .with_fundamental("DIP", 20.0)
            // Rising, fair: 0, ties with FAIR
            .with_series(MockMarketDataSource::linear_series("TIE", 300, 10.0, 0.1))
            .with_fundamental("TIE", 30.0),
    );

    let report = ScanOrchestrator::new(config(&["EXP", "FAIR", "DIP", "TIE"]), source)
        .with_regressor_factory(Arc::new(FixedFactory::new(1.0)))
        .run()
        .await
        .unwrap();

    let order: Vec<&str> = report.results.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(order, vec!["DIP", "FAIR", "TIE", "EXP"]);

    let scores: Vec<i32> = report.results.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![4, 0, 0, -2]);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));

    let dip = report.get("DIP").unwrap();
    assert_eq!(dip.technical, TechnicalLabel::Oversold);
    assert_eq!(dip.recommendation, Recommendation::Buy);
}

#[tokio::test]
async fn test_history_failure_aborts_scan() {
    init_tracing();
    let source = Arc::new(MockMarketDataSource::new().with_history_failure("upstream down"));

    let result = ScanOrchestrator::new(config(&["AAA"]), source).run().await;

    assert!(matches!(result, Err(ScanError::HistoryUnavailable(_))));
}

#[tokio::test]
async fn test_zero_successes_yield_empty_report() {
    init_tracing();
    let source = Arc::new(
        MockMarketDataSource::new()
            .with_series(MockMarketDataSource::linear_series("AAA", 30, 10.0, 1.0))
            .with_series(MockMarketDataSource::linear_series("BBB", 60, 10.0, 1.0)),
    );

    let report = ScanOrchestrator::new(config(&["AAA", "BBB"]), source)
        .run()
        .await
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(report.excluded.len(), 2);
}

#[tokio::test]
async fn test_one_bulk_history_request_per_scan() {
    init_tracing();
    let universe: Vec<String> = ["A1", "A2", "A3", "A4", "A5"]
        .iter()
        .map(|t| t.to_string())
        .collect();
    let source = Arc::new(
        MockMarketDataSource::synthetic(&universe, 300, 5).with_latency(Duration::from_millis(10)),
    );

    let mut cfg = config(&[]);
    cfg.universe = universe.clone();
    let report = ScanOrchestrator::new(cfg, source.clone())
        .with_regressor_factory(Arc::new(FixedFactory::new(0.5)))
        .run()
        .await
        .unwrap();

    assert_eq!(source.history_calls(), 1);
    assert_eq!(source.fundamental_calls(), universe.len());
    assert_eq!(report.len(), universe.len());
}

#[tokio::test]
async fn test_scoring_parallelism_is_bounded_by_workers() {
    init_tracing();
    let universe: Vec<String> = (0..6).map(|i| format!("T{}", i)).collect();
    let source = Arc::new(MockMarketDataSource::synthetic(&universe, 300, 11));
    let factory = Arc::new(FixedFactory {
        scaled: 0.5,
        delay: Duration::from_millis(50),
        ..FixedFactory::default()
    });

    let mut cfg = config(&[]);
    cfg.universe = universe.clone();
    cfg.workers = 2;
    let report = ScanOrchestrator::new(cfg, source)
        .with_regressor_factory(factory.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.len(), 6);
    let peak = factory.peak.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= 2, "peak concurrency {}", peak);
}

#[tokio::test]
async fn test_panicking_task_only_drops_its_ticker() {
    init_tracing();
    let universe: Vec<String> = vec!["GOOD".to_string(), "BAD".to_string()];
    let source = Arc::new(MockMarketDataSource::synthetic(&universe, 300, 2));

    let cfg = config(&["GOOD", "BAD"]);
    let bad_seed = rustscan::application::scoring::PredictiveScorer::new(
        cfg.window,
        cfg.min_extra_bars,
        cfg.trainer.seed,
        cfg.policy.clone(),
        Arc::new(FixedFactory::new(0.5)),
    )
    .seed_for("BAD");
    let factory = Arc::new(PanicOnSeed {
        seed: bad_seed,
        inner: FixedFactory::new(0.5),
    });

    let report = ScanOrchestrator::new(cfg, source)
        .with_regressor_factory(factory)
        .run()
        .await
        .unwrap();

    assert!(report.get("GOOD").is_some());
    assert!(report.get("BAD").is_none());
    let reason = &report
        .excluded
        .iter()
        .find(|e| e.ticker == "BAD")
        .unwrap()
        .reason;
    assert!(reason.contains("numerical blow-up"));
}

#[tokio::test]
async fn test_deadline_drops_slow_tickers() {
    init_tracing();
    let universe: Vec<String> = vec!["SLOW".to_string()];
    let source = Arc::new(MockMarketDataSource::synthetic(&universe, 300, 4));
    let factory = Arc::new(FixedFactory {
        scaled: 0.5,
        delay: Duration::from_secs(3),
        ..FixedFactory::default()
    });

    let mut cfg = config(&["SLOW"]);
    cfg.score_deadline_secs = Some(1);
    let report = ScanOrchestrator::new(cfg, source)
        .with_regressor_factory(factory)
        .run()
        .await
        .unwrap();

    assert!(report.is_empty());
    let reason = &report.excluded[0].reason;
    assert!(reason.contains("1000ms"), "{}", reason);
}
