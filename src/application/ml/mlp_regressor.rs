use super::regressor::{RegressorFactory, SequenceRegressor, TrainerConfig, TrainingSummary};
use crate::domain::errors::ScoreError;
use ndarray::{Array, Array1, Array2, ArrayView1, ArrayView2, ArrayView3, Axis, Dimension, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-7;

/// Trainable parameters: flattened window -> tanh hidden layer -> scalar
#[derive(Debug, Clone)]
struct Weights {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array1<f64>,
    b2: Array1<f64>,
}

struct Gradients {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array1<f64>,
    b2: Array1<f64>,
}

impl Weights {
    /// Xavier-uniform weights, zero biases
    fn init(n_inputs: usize, hidden: usize, rng: &mut StdRng) -> Self {
        let limit1 = (6.0 / (n_inputs + hidden) as f64).sqrt();
        let limit2 = (6.0 / (hidden + 1) as f64).sqrt();
        Self {
            w1: Array2::from_shape_fn((hidden, n_inputs), |_| rng.random_range(-limit1..limit1)),
            b1: Array1::zeros(hidden),
            w2: Array1::from_shape_fn(hidden, |_| rng.random_range(-limit2..limit2)),
            b2: Array1::zeros(1),
        }
    }

    fn hidden(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut z = x.dot(&self.w1.t());
        z += &self.b1;
        z.mapv_inplace(f64::tanh);
        z
    }

    fn forward(&self, x: &Array2<f64>) -> Array1<f64> {
        let b2 = self.b2[0];
        self.hidden(x).dot(&self.w2).mapv(|v| v + b2)
    }

    /// Mean squared error of one mini-batch and its gradients.
    ///
    /// `mask` holds the (already rescaled) dropout multipliers of the hidden layer.
    fn loss_and_gradients(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        mask: &Array2<f64>,
    ) -> (f64, Gradients) {
        let batch = x.nrows() as f64;
        let activation = self.hidden(x);
        let dropped = &activation * mask;
        let b2 = self.b2[0];
        let prediction = dropped.dot(&self.w2).mapv(|v| v + b2);

        let error = &prediction - y;
        let loss = error.mapv(|e| e * e).sum() / batch;

        let d_pred = error.mapv(|e| 2.0 * e / batch);
        let w2 = dropped.t().dot(&d_pred);
        let b2 = Array1::from_elem(1, d_pred.sum());

        let d_dropped = d_pred
            .view()
            .insert_axis(Axis(1))
            .dot(&self.w2.view().insert_axis(Axis(0)));
        let d_hidden = Zip::from(&d_dropped)
            .and(mask)
            .and(&activation)
            .map_collect(|&g, &m, &a| g * m * (1.0 - a * a));
        let w1 = d_hidden.t().dot(x);
        let b1 = d_hidden.sum_axis(Axis(0));

        (loss, Gradients { w1, b1, w2, b2 })
    }

    fn is_finite(&self) -> bool {
        self.w1.iter().all(|v| v.is_finite())
            && self.w2.iter().all(|v| v.is_finite())
            && self.b1.iter().all(|v| v.is_finite())
            && self.b2[0].is_finite()
    }
}

/// Adam first/second moment estimates of one parameter tensor
struct Moments<D: Dimension> {
    m: Array<f64, D>,
    v: Array<f64, D>,
}

impl<D: Dimension> Moments<D> {
    fn like(param: &Array<f64, D>) -> Self {
        Self {
            m: Array::zeros(param.raw_dim()),
            v: Array::zeros(param.raw_dim()),
        }
    }

    fn step(&mut self, param: &mut Array<f64, D>, grad: &Array<f64, D>, lr: f64, t: i32) {
        let bias1 = 1.0 - ADAM_BETA1.powi(t);
        let bias2 = 1.0 - ADAM_BETA2.powi(t);
        Zip::from(param)
            .and(&mut self.m)
            .and(&mut self.v)
            .and(grad)
            .for_each(|p, m, v, &g| {
                *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
                *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
                let m_hat = *m / bias1;
                let v_hat = *v / bias2;
                *p -= lr * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
            });
    }
}

struct Adam {
    lr: f64,
    t: i32,
    w1: Moments<ndarray::Ix2>,
    b1: Moments<ndarray::Ix1>,
    w2: Moments<ndarray::Ix1>,
    b2: Moments<ndarray::Ix1>,
}

impl Adam {
    fn new(weights: &Weights, lr: f64) -> Self {
        Self {
            lr,
            t: 0,
            w1: Moments::like(&weights.w1),
            b1: Moments::like(&weights.b1),
            w2: Moments::like(&weights.w2),
            b2: Moments::like(&weights.b2),
        }
    }

    fn apply(&mut self, weights: &mut Weights, grads: &Gradients) {
        self.t = self.t.saturating_add(1);
        self.w1.step(&mut weights.w1, &grads.w1, self.lr, self.t);
        self.b1.step(&mut weights.b1, &grads.b1, self.lr, self.t);
        self.w2.step(&mut weights.w2, &grads.w2, self.lr, self.t);
        self.b2.step(&mut weights.b2, &grads.b2, self.lr, self.t);
    }
}

/// Feed-forward regressor over a flattened feature window.
///
/// Trained with Adam on mini-batches of shuffled samples, with dropout on the
/// hidden layer and early stopping on the epoch training loss.
pub struct MlpRegressor {
    config: TrainerConfig,
    window: usize,
    n_features: usize,
    weights: Weights,
    rng: StdRng,
    trained: bool,
}

impl MlpRegressor {
    pub fn new(window: usize, n_features: usize, config: TrainerConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let hidden = config.hidden_units.max(1);
        let weights = Weights::init(window * n_features, hidden, &mut rng);
        Self {
            config,
            window,
            n_features,
            weights,
            rng,
            trained: false,
        }
    }

    fn dropout_mask(&mut self, rows: usize) -> Array2<f64> {
        let hidden = self.weights.b1.len();
        let p = self.config.dropout;
        if p <= 0.0 {
            return Array2::ones((rows, hidden));
        }
        let keep = 1.0 / (1.0 - p);
        let rng = &mut self.rng;
        Array2::from_shape_fn((rows, hidden), |_| {
            if rng.random::<f64>() < p { 0.0 } else { keep }
        })
    }
}

impl SequenceRegressor for MlpRegressor {
    fn fit(
        &mut self,
        inputs: ArrayView3<'_, f64>,
        targets: ArrayView1<'_, f64>,
    ) -> Result<TrainingSummary, ScoreError> {
        let (samples, window, n_features) = inputs.dim();
        if (window, n_features) != (self.window, self.n_features) {
            return Err(ScoreError::Training {
                reason: format!(
                    "input windows are {}x{}, model expects {}x{}",
                    window, n_features, self.window, self.n_features
                ),
            });
        }
        if samples == 0 || samples != targets.len() {
            return Err(ScoreError::Training {
                reason: format!("{} samples for {} targets", samples, targets.len()),
            });
        }
        if !(0.0..1.0).contains(&self.config.dropout) {
            return Err(ScoreError::Training {
                reason: format!("dropout {} outside [0, 1)", self.config.dropout),
            });
        }

        let width = window * n_features;
        let x = Array2::from_shape_fn((samples, width), |(i, j)| {
            inputs[[i, j / n_features, j % n_features]]
        });
        let y = targets.to_owned();

        let batch_size = self.config.batch_size.max(1);
        let patience = self.config.patience.max(1);
        let mut adam = Adam::new(&self.weights, self.config.learning_rate);
        let mut order: Vec<usize> = (0..samples).collect();

        let mut best_loss = f64::INFINITY;
        let mut best_weights = self.weights.clone();
        let mut best_epoch = 0;
        let mut epochs_run = 0;
        let mut stale_epochs = 0;
        let mut stopped_early = false;

        for epoch in 1..=self.config.max_epochs.max(1) {
            order.shuffle(&mut self.rng);

            let mut loss_sum = 0.0;
            for batch in order.chunks(batch_size) {
                let xb = x.select(Axis(0), batch);
                let yb = y.select(Axis(0), batch);
                let mask = self.dropout_mask(batch.len());
                let (loss, grads) = self.weights.loss_and_gradients(&xb, &yb, &mask);
                adam.apply(&mut self.weights, &grads);
                loss_sum += loss * batch.len() as f64;
            }
            let epoch_loss = loss_sum / samples as f64;
            epochs_run = epoch;

            if !epoch_loss.is_finite() || !self.weights.is_finite() {
                return Err(ScoreError::Training {
                    reason: format!("loss diverged at epoch {}", epoch),
                });
            }
            debug!("epoch {}: loss {:.6}", epoch, epoch_loss);

            if epoch_loss < best_loss - self.config.min_delta {
                best_loss = epoch_loss;
                best_weights = self.weights.clone();
                best_epoch = epoch;
                stale_epochs = 0;
            } else {
                stale_epochs += 1;
                if stale_epochs >= patience {
                    stopped_early = true;
                    break;
                }
            }
        }

        self.weights = best_weights;
        self.trained = true;

        Ok(TrainingSummary {
            epochs_run,
            best_epoch,
            best_loss,
            stopped_early,
        })
    }

    fn predict(&self, window: ArrayView2<'_, f64>) -> Result<f64, ScoreError> {
        if !self.trained {
            return Err(ScoreError::Prediction {
                reason: "model has not been trained".to_string(),
            });
        }
        if window.dim() != (self.window, self.n_features) {
            return Err(ScoreError::Prediction {
                reason: format!(
                    "window is {:?}, model expects ({}, {})",
                    window.dim(),
                    self.window,
                    self.n_features
                ),
            });
        }

        let flat = Array1::from_iter(window.iter().copied()).insert_axis(Axis(0));
        let output = self
            .weights
            .forward(&flat)
            .get(0)
            .copied()
            .ok_or_else(|| ScoreError::Prediction {
                reason: "no output".to_string(),
            })?;

        if output.is_finite() {
            Ok(output)
        } else {
            Err(ScoreError::Prediction {
                reason: format!("non-finite output {}", output),
            })
        }
    }

    fn name(&self) -> &str {
        "MLP window regressor"
    }
}

/// Builds an [`MlpRegressor`] per scoring task from shared settings
#[derive(Debug, Clone, Default)]
pub struct MlpRegressorFactory {
    config: TrainerConfig,
}

impl MlpRegressorFactory {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }
}

impl RegressorFactory for MlpRegressorFactory {
    fn build(&self, window: usize, n_features: usize, seed: u64) -> Box<dyn SequenceRegressor> {
        Box::new(MlpRegressor::new(
            window,
            n_features,
            self.config.clone(),
            seed,
        ))
    }
}
