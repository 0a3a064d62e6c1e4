use crate::domain::errors::ScoreError;
use ndarray::{ArrayView1, ArrayView2, ArrayView3};
use serde::{Deserialize, Serialize};

/// Optimisation settings shared by every per-ticker model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub hidden_units: usize,
    pub dropout: f64,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub max_epochs: usize,
    /// Epochs without improvement of the training loss before stopping
    pub patience: usize,
    pub min_delta: f64,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            hidden_units: 32,
            dropout: 0.1,
            learning_rate: 0.001,
            batch_size: 64,
            max_epochs: 30,
            patience: 3,
            min_delta: 0.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub epochs_run: usize,
    pub best_epoch: usize,
    pub best_loss: f64,
    pub stopped_early: bool,
}

/// Interface for next-step regressors over feature windows
pub trait SequenceRegressor: Send {
    /// Fits on `inputs` of shape `(samples, window, features)` against `targets`.
    ///
    /// Must leave the model holding its best-seen weights.
    fn fit(
        &mut self,
        inputs: ArrayView3<'_, f64>,
        targets: ArrayView1<'_, f64>,
    ) -> Result<TrainingSummary, ScoreError>;

    /// Predicts the target that follows one `(window, features)` slice
    fn predict(&self, window: ArrayView2<'_, f64>) -> Result<f64, ScoreError>;

    /// Get model name/type
    fn name(&self) -> &str;
}

/// Builds a fresh, untrained regressor for one scoring task
pub trait RegressorFactory: Send + Sync {
    fn build(&self, window: usize, n_features: usize, seed: u64) -> Box<dyn SequenceRegressor>;
}
