use crate::domain::errors::ScoreError;
use ndarray::{Array1, Array3, ArrayView2, s};

/// One `(window, features)` slice of scaled history
pub type FeatureWindow<'a> = ArrayView2<'a, f64>;

/// Supervised samples cut from one ticker's scaled history
#[derive(Debug, Clone)]
pub struct WindowedDataset {
    /// Shape `(samples, window, features)`
    pub inputs: Array3<f64>,
    pub targets: Array1<f64>,
}

impl WindowedDataset {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Cuts overlapping windows: rows `[i - window, i)` predict `target_col` at row `i`.
pub fn build_windows(
    scaled: ArrayView2<'_, f64>,
    window: usize,
    target_col: usize,
) -> Result<WindowedDataset, ScoreError> {
    let (n_rows, n_features) = scaled.dim();
    if window == 0 {
        return Err(ScoreError::Training {
            reason: "window length must be positive".to_string(),
        });
    }
    if target_col >= n_features {
        return Err(ScoreError::Training {
            reason: format!(
                "target column {} out of range for {} features",
                target_col, n_features
            ),
        });
    }
    if n_rows <= window {
        return Err(ScoreError::InsufficientHistory {
            available: n_rows,
            required: window + 1,
        });
    }

    let samples = n_rows - window;
    let inputs = Array3::from_shape_fn((samples, window, n_features), |(i, t, f)| {
        scaled[[i + t, f]]
    });
    let targets = scaled.slice(s![window.., target_col]).to_owned();

    Ok(WindowedDataset { inputs, targets })
}

/// The most recent `window` rows, the input for the next-step prediction
pub fn latest_window(
    scaled: ArrayView2<'_, f64>,
    window: usize,
) -> Result<FeatureWindow<'_>, ScoreError> {
    let n_rows = scaled.nrows();
    if window == 0 || n_rows < window {
        return Err(ScoreError::InsufficientHistory {
            available: n_rows,
            required: window.max(1),
        });
    }
    Ok(scaled.slice_move(s![n_rows - window.., ..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn ramp(rows: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, 3), |(r, c)| r as f64 * 10.0 + c as f64)
    }

    #[test]
    fn test_windows_align_inputs_and_targets() {
        let data = ramp(6);
        let ds = build_windows(data.view(), 4, 0).unwrap();

        assert_eq!(ds.inputs.dim(), (2, 4, 3));
        assert_eq!(ds.len(), 2);
        // Sample 0 covers rows 0..4 and predicts row 4
        assert_eq!(ds.inputs[[0, 0, 0]], 0.0);
        assert_eq!(ds.inputs[[0, 3, 2]], 32.0);
        assert_eq!(ds.targets[0], 40.0);
        assert_eq!(ds.inputs[[1, 0, 0]], 10.0);
        assert_eq!(ds.targets[1], 50.0);
    }

    #[test]
    fn test_windows_need_at_least_one_target() {
        let data = ramp(4);
        let err = build_windows(data.view(), 4, 0).unwrap_err();
        assert!(matches!(err, ScoreError::InsufficientHistory { available: 4, required: 5 }));
    }

    #[test]
    fn test_latest_window_is_tail() {
        let data = ramp(10);
        let last = latest_window(data.view(), 3).unwrap();

        assert_eq!(last.dim(), (3, 3));
        assert_eq!(last[[0, 0]], 70.0);
        assert_eq!(last[[2, 0]], 90.0);
    }
}
