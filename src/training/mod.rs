//! Model training module
//!
//! - [`xgboost`] - gradient-boosted regression trees (squared error, depthwise)
//! - [`cross_validation`] - k-fold splits used by the grid search
//! - [`metrics`] - regression error metrics
//! - [`trainer`] - the training run orchestrator

mod config;
mod models;
pub mod cross_validation;
pub mod metrics;
pub mod trainer;
pub mod xgboost;

pub use config::{default_grid, TrainerConfig};
pub use cross_validation::{CVSplit, CrossValidator};
pub use metrics::{mean_squared_error, neg_mean_squared_error, RegressionMetrics};
pub use models::Regressor;
pub use trainer::{ModelTrainer, TrainingOutcome, TrainingStage};
pub use xgboost::{XGBoostConfig, XGBoostRegressor};
