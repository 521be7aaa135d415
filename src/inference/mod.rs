//! Inference module
//!
//! Builds a raw record from a submitted reading, runs feature engineering
//! and the saved preprocessor, and predicts with the latest registered model.

mod config;
mod custom_data;
mod engine;

pub use config::InferenceConfig;
pub use custom_data::CustomData;
pub use engine::{CongestionPredictor, PredictionOutput};
