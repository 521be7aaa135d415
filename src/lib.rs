//! Congestion forecast - traffic congestion prediction pipeline
//!
//! Predicts roadway congestion from a timestamp, a grid location and a
//! direction of travel.
//!
//! # Modules
//!
//! ## Pipeline stages
//! - [`ingestion`] - raw data download and seeded train/test split
//! - [`feature_engineering`] - cyclical hour, AM/PM, weekend and location key
//! - [`preprocessing`] - one-hot and target-mean encoding
//! - [`feature_store`] - transformed splits on disk
//! - [`training`] - XGBoost-style regressor and the training orchestrator
//! - [`optimizer`] - grid search with k-fold cross-validation
//! - [`inference`] - predictions from the latest registered model
//!
//! ## Infrastructure
//! - [`tracking`] - model registry and run params
//! - [`config`] - pipeline configuration and artifact layout
//! - [`utils`] - data loading and frame conversions
//!
//! ## Services
//! - [`server`] - HTTP server with web form and JSON API
//! - [`cli`] - command-line interface

pub mod error;
pub mod config;

pub mod ingestion;
pub mod feature_engineering;
pub mod preprocessing;
pub mod feature_store;
pub mod training;
pub mod optimizer;
pub mod inference;

pub mod tracking;
pub mod utils;

pub mod server;
pub mod cli;

pub use error::{CongestionError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ArtifactPaths, PipelineConfig};
    pub use crate::error::{CongestionError, Result, ResultExt};
    pub use crate::feature_engineering::{generate_features, RawRecord};
    pub use crate::feature_store::{DataTransformation, FeatureStore};
    pub use crate::inference::{CongestionPredictor, CustomData, InferenceConfig, PredictionOutput};
    pub use crate::ingestion::DataIngestion;
    pub use crate::optimizer::{GridSearchCV, ParamGrid, ParamMap, ParamValue, SearchConfig};
    pub use crate::preprocessing::{DataPreprocessor, PreprocessingConfig};
    pub use crate::tracking::{ModelRegistry, RunParams, RunStore};
    pub use crate::training::{ModelTrainer, Regressor, TrainerConfig, TrainingOutcome, XGBoostConfig, XGBoostRegressor};
}
