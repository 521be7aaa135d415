//! Prediction engine
//!
//! Holds the fitted preprocessor and the registered model behind `Arc`s and
//! applies them to raw records. Nothing here fits or searches.

use super::config::InferenceConfig;
use super::custom_data::CustomData;
use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::feature_engineering::generate_features;
use crate::preprocessing::DataPreprocessor;
use crate::tracking::{ModelRegistry, RunStore};
use crate::training::{Regressor, XGBoostRegressor};
use ndarray::Array1;
use polars::prelude::DataFrame;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// What a prediction call returns
#[derive(Debug, Clone)]
pub enum PredictionOutput {
    /// One prediction per input row
    Prediction(Array1<f64>),
    /// Preprocessed features, for checking what the model would see
    Transformed(DataFrame),
}

impl PredictionOutput {
    pub fn predictions(&self) -> Option<&Array1<f64>> {
        match self {
            PredictionOutput::Prediction(values) => Some(values),
            PredictionOutput::Transformed(_) => None,
        }
    }
}

/// Fitted preprocessor and model, shared read-only
#[derive(Debug, Clone)]
pub struct CongestionPredictor {
    preprocessor: Arc<DataPreprocessor>,
    model: Arc<XGBoostRegressor>,
    model_uri: Option<String>,
    config: InferenceConfig,
}

impl CongestionPredictor {
    /// Load the saved preprocessor and the model named by the newest run
    pub fn load(pipeline: &PipelineConfig, config: InferenceConfig) -> Result<Self> {
        let start = Instant::now();
        let preprocessor = DataPreprocessor::load(&pipeline.paths.preprocessor)
            .context("load preprocessor")?;

        let run = RunStore::new(&pipeline.paths.run_params_dir)
            .latest()
            .context("read latest run params")?;
        let registry = ModelRegistry::open(&pipeline.paths.registry_dir)?;
        let model: XGBoostRegressor = registry.load(&run.model_uri).context("load model")?;

        info!(
            uri = %run.model_uri,
            run_id = %run.run_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Predictor loaded"
        );
        let mut predictor = Self::from_parts(preprocessor, model, config);
        predictor.model_uri = Some(run.model_uri);
        Ok(predictor)
    }

    pub fn from_parts(preprocessor: DataPreprocessor, model: XGBoostRegressor, config: InferenceConfig) -> Self {
        Self {
            preprocessor: Arc::new(preprocessor),
            model: Arc::new(model),
            model_uri: None,
            config,
        }
    }

    /// Same preprocessor and model under a different output mode
    pub fn with_config(&self, config: InferenceConfig) -> Self {
        Self {
            config,
            ..self.clone()
        }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Registry URI the model was loaded from
    pub fn model_uri(&self) -> Option<&str> {
        self.model_uri.as_deref()
    }

    /// Predict for raw rows holding `{time, x, y, direction}`
    pub fn predict(&self, raw: &DataFrame) -> Result<PredictionOutput> {
        let features = generate_features(raw).context("engineer features")?;
        if self.config.return_transformed {
            let transformed = self.preprocessor.transform(&features).context("preprocess")?;
            return Ok(PredictionOutput::Transformed(transformed));
        }

        let x = self.preprocessor.transform_to_array(&features).context("preprocess")?;
        let predictions = self.model.predict(&x).context("predict")?;
        debug!(rows = predictions.len(), "Predictions computed");
        Ok(PredictionOutput::Prediction(predictions))
    }

    /// Predict for one submitted reading
    pub fn predict_one(&self, data: &CustomData) -> Result<PredictionOutput> {
        self.predict(&data.to_dataframe()?)
    }
}
