//! Universe-wide technical indicators.
//!
//! Every function here walks the time axis once and updates all tickers of a
//! row together, so the cost of a scan does not grow with per-ticker passes.

use ndarray::{Array1, Array2, ArrayView2, Axis, Zip, s};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub signal_period: usize,
    pub long_ma_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            signal_period: 14,
            long_ma_period: 200,
        }
    }
}

/// Indicator tables indexed exactly like the close table they came from
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub oscillator: Array2<f64>,
    pub oscillator_signal: Array2<f64>,
    pub long_ma: Array2<f64>,
}

impl IndicatorSet {
    pub fn n_bars(&self) -> usize {
        self.oscillator.nrows()
    }

    pub fn n_tickers(&self) -> usize {
        self.oscillator.ncols()
    }
}

pub struct IndicatorEngine {
    config: IndicatorConfig,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    /// Computes oscillator, oscillator signal and long MA for every column of `close`.
    pub fn compute(&self, close: ArrayView2<'_, f64>) -> IndicatorSet {
        let oscillator = wilder_rsi(close, self.config.rsi_period);
        let oscillator_signal = rolling_mean(oscillator.view(), self.config.signal_period);
        let long_ma = rolling_mean(close, self.config.long_ma_period);

        IndicatorSet {
            oscillator,
            oscillator_signal,
            long_ma,
        }
    }
}

/// RSI with Wilder smoothing (EMA, alpha = 1/period, no bias adjustment).
///
/// Undefined close differences contribute zero gain and zero loss. A cell is
/// `NaN` when its close is missing or the ticker has no prior difference yet.
pub fn wilder_rsi(close: ArrayView2<'_, f64>, period: usize) -> Array2<f64> {
    let (n_bars, n_tickers) = close.dim();
    let mut out = Array2::from_elem((n_bars, n_tickers), f64::NAN);
    if n_bars == 0 || period == 0 {
        return out;
    }

    let alpha = 1.0 / period as f64;
    let mut avg_gain = Array1::<f64>::zeros(n_tickers);
    let mut avg_loss = Array1::<f64>::zeros(n_tickers);
    let mut has_delta = Array1::from_elem(n_tickers, false);

    for t in 0..n_bars {
        let current = close.row(t);
        if t > 0 {
            let previous = close.row(t - 1);
            Zip::from(&mut avg_gain)
                .and(&mut avg_loss)
                .and(&mut has_delta)
                .and(&current)
                .and(&previous)
                .for_each(|gain_ema, loss_ema, seen, &c, &p| {
                    let delta = c - p;
                    let (gain, loss) = if delta.is_finite() {
                        (delta.max(0.0), (-delta).max(0.0))
                    } else {
                        (0.0, 0.0)
                    };
                    *gain_ema = (1.0 - alpha) * *gain_ema + alpha * gain;
                    *loss_ema = (1.0 - alpha) * *loss_ema + alpha * loss;
                    *seen = *seen || delta.is_finite();
                });
        }

        Zip::from(out.row_mut(t))
            .and(&avg_gain)
            .and(&avg_loss)
            .and(&has_delta)
            .and(&current)
            .for_each(|o, &gain_ema, &loss_ema, &seen, &c| {
                *o = if seen && c.is_finite() {
                    rsi_from_averages(gain_ema, loss_ema)
                } else {
                    f64::NAN
                };
            });
    }

    out
}

/// Maps smoothed gain/loss onto [0, 100].
///
/// No losses means 100; no movement at all means 50.
pub fn rsi_from_averages(gain_ema: f64, loss_ema: f64) -> f64 {
    if loss_ema <= 0.0 {
        if gain_ema <= 0.0 { 50.0 } else { 100.0 }
    } else {
        let ratio = gain_ema / loss_ema;
        (100.0 - 100.0 / (1.0 + ratio)).clamp(0.0, 100.0)
    }
}

/// Simple rolling mean along the time axis.
///
/// A cell is `NaN` until a full window is available, and whenever the window
/// contains a `NaN`.
pub fn rolling_mean(values: ArrayView2<'_, f64>, window: usize) -> Array2<f64> {
    let (n_bars, n_cols) = values.dim();
    let mut out = Array2::from_elem((n_bars, n_cols), f64::NAN);
    if window == 0 {
        return out;
    }

    for t in (window - 1)..n_bars {
        let slab = values.slice(s![t + 1 - window..=t, ..]);
        if let Some(mean) = slab.mean_axis(Axis(0)) {
            out.row_mut(t).assign(&mean);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};
    use ta::Next;
    use ta::indicators::SimpleMovingAverage;

    fn single_column(values: &[f64]) -> Array2<f64> {
        Array2::from_shape_vec((values.len(), 1), values.to_vec()).unwrap()
    }

    #[test]
    fn test_rsi_hand_computed_values() {
        // alpha = 0.5: +1 -> gain 0.5 / loss 0; -1 -> gain 0.25 / loss 0.5
        let close = single_column(&[1.0, 2.0, 1.0]);
        let rsi = wilder_rsi(close.view(), 2);

        assert!(rsi[[0, 0]].is_nan());
        assert_eq!(rsi[[1, 0]], 100.0);
        assert!((rsi[[2, 0]] - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_all_gain_is_100() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let rsi = wilder_rsi(single_column(&closes).view(), 14);

        assert!(rsi.column(0).iter().skip(1).all(|v| *v == 100.0));
    }

    #[test]
    fn test_rsi_all_loss_is_0() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 - i as f64).collect();
        let rsi = wilder_rsi(single_column(&closes).view(), 14);

        assert!(rsi.column(0).iter().skip(1).all(|v| *v == 0.0));
    }

    #[test]
    fn test_rsi_flat_price_is_50() {
        let rsi = wilder_rsi(single_column(&[42.0; 30]).view(), 14);

        assert!(rsi[[0, 0]].is_nan());
        assert!(rsi.column(0).iter().skip(1).all(|v| *v == 50.0));
    }

    #[test]
    fn test_rsi_columns_are_independent() {
        let nan = f64::NAN;
        let close = array![
            [10.0, nan],
            [11.0, nan],
            [12.0, 5.0],
            [11.0, 4.0],
            [13.0, 3.0]
        ];
        let rsi = wilder_rsi(close.view(), 14);

        // Late-listed ticker: undefined until it has a difference of its own
        assert!(rsi[[2, 1]].is_nan());
        assert_eq!(rsi[[3, 1]], 0.0);
        assert_eq!(rsi[[4, 1]], 0.0);

        let solo = wilder_rsi(close.slice(s![.., 0..1]), 14);
        for t in 0..5 {
            let a = rsi[[t, 0]];
            let b = solo[[t, 0]];
            assert!((a.is_nan() && b.is_nan()) || a == b);
        }
    }

    #[test]
    fn test_rolling_mean_warm_up() {
        let close = single_column(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let ma = rolling_mean(close.view(), 3);

        assert!(ma[[0, 0]].is_nan());
        assert!(ma[[1, 0]].is_nan());
        assert_eq!(ma[[2, 0]], 2.0);
        assert_eq!(ma[[4, 0]], 4.0);
    }

    #[test]
    fn test_rolling_mean_window_longer_than_series() {
        let ma = rolling_mean(single_column(&[1.0, 2.0]).view(), 200);
        assert!(ma.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_rolling_mean_propagates_gaps() {
        let close = single_column(&[1.0, f64::NAN, 3.0, 4.0, 5.0]);
        let ma = rolling_mean(close.view(), 2);

        assert!(ma[[1, 0]].is_nan());
        assert!(ma[[2, 0]].is_nan());
        assert_eq!(ma[[3, 0]], 3.5);
    }

    #[test]
    fn test_rolling_mean_matches_ta_sma() {
        let closes: Vec<f64> = (0..300)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 5.0 + i as f64 * 0.1)
            .collect();
        let ma = rolling_mean(single_column(&closes).view(), 20);

        let mut sma = SimpleMovingAverage::new(20).unwrap();
        for (i, close) in closes.iter().enumerate() {
            let expected = sma.next(*close);
            if i >= 19 {
                assert!((ma[[i, 0]] - expected).abs() < 1e-9, "bar {}", i);
            }
        }
    }

    #[test]
    fn test_engine_output_shapes_match_input() {
        let close = Array2::from_shape_fn((250, 3), |(t, c)| 50.0 + t as f64 * (c as f64 + 1.0));
        let set = IndicatorEngine::new(IndicatorConfig::default()).compute(close.view());

        assert_eq!(set.n_bars(), 250);
        assert_eq!(set.n_tickers(), 3);
        assert_eq!(set.long_ma.dim(), close.dim());

        // First defined MA sits at index W-1
        assert!(set.long_ma[[198, 0]].is_nan());
        assert!(set.long_ma[[199, 0]].is_finite());

        // Signal needs 14 defined oscillator values, the first bar has none
        assert!(set.oscillator_signal[[13, 0]].is_nan());
        assert!(set.oscillator_signal[[14, 0]].is_finite());
    }
}
