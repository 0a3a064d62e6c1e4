pub mod mlp_regressor;
pub mod regressor;
pub mod scaler;
pub mod windows;

pub use mlp_regressor::{MlpRegressor, MlpRegressorFactory};
pub use regressor::{RegressorFactory, SequenceRegressor, TrainerConfig, TrainingSummary};
pub use scaler::MinMaxScaler;
pub use windows::{FeatureWindow, WindowedDataset, build_windows, latest_window};
