use crate::domain::errors::ScoreError;
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Per-column min/max scaling onto [0, 1].
///
/// A constant column maps to 0 and inverts back to its constant.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    min: Array1<f64>,
    max: Array1<f64>,
}

impl MinMaxScaler {
    pub fn fit(data: ArrayView2<'_, f64>) -> Result<Self, ScoreError> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(ScoreError::Scaling {
                reason: format!("cannot fit on empty matrix {:?}", data.dim()),
            });
        }
        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            return Err(ScoreError::Scaling {
                reason: format!(
                    "non-finite value at row {}, column {}",
                    pos / data.ncols(),
                    pos % data.ncols()
                ),
            });
        }

        let min = data.fold_axis(Axis(0), f64::INFINITY, |acc, v| acc.min(*v));
        let max = data.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, v| acc.max(*v));
        Ok(Self { min, max })
    }

    pub fn n_features(&self) -> usize {
        self.min.len()
    }

    fn range(&self, col: usize) -> f64 {
        let range = self.max[col] - self.min[col];
        if range > 0.0 { range } else { 1.0 }
    }

    pub fn transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>, ScoreError> {
        if data.ncols() != self.n_features() {
            return Err(ScoreError::Scaling {
                reason: format!(
                    "expected {} columns, got {}",
                    self.n_features(),
                    data.ncols()
                ),
            });
        }

        let mut out = data.to_owned();
        for (col, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let min = self.min[col];
            let range = self.range(col);
            column.mapv_inplace(|v| (v - min) / range);
        }
        Ok(out)
    }

    pub fn fit_transform(data: ArrayView2<'_, f64>) -> Result<(Self, Array2<f64>), ScoreError> {
        let scaler = Self::fit(data)?;
        let scaled = scaler.transform(data)?;
        Ok((scaler, scaled))
    }

    /// Maps a scaled value of column `col` back to the original units
    pub fn inverse(&self, col: usize, scaled: f64) -> f64 {
        let span = self.max[col] - self.min[col];
        scaled * span + self.min[col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_scales_each_column_independently() {
        let data = array![[10.0, 1000.0], [20.0, 3000.0], [15.0, 2000.0]];
        let (scaler, scaled) = MinMaxScaler::fit_transform(data.view()).unwrap();

        assert_eq!(scaled, array![[0.0, 0.0], [1.0, 1.0], [0.5, 0.5]]);
        assert_eq!(scaler.inverse(0, 0.5), 15.0);
        assert_eq!(scaler.inverse(1, 1.0), 3000.0);
    }

    #[test]
    fn test_constant_column_maps_to_zero_and_back() {
        let data = array![[7.0, 1.0], [7.0, 2.0]];
        let (scaler, scaled) = MinMaxScaler::fit_transform(data.view()).unwrap();

        assert_eq!(scaled.column(0).to_vec(), vec![0.0, 0.0]);
        assert_eq!(scaler.inverse(0, 0.37), 7.0);
    }

    #[test]
    fn test_rejects_non_finite_input() {
        let data = array![[1.0, 2.0], [f64::NAN, 3.0]];
        let err = MinMaxScaler::fit(data.view()).unwrap_err();

        assert!(matches!(err, ScoreError::Scaling { .. }));
        assert!(err.to_string().contains("row 1, column 0"));
    }

    #[test]
    fn test_rejects_column_mismatch() {
        let scaler = MinMaxScaler::fit(array![[1.0, 2.0]].view()).unwrap();
        assert!(scaler.transform(array![[1.0]].view()).is_err());
    }
}
