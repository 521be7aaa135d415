//! Training orchestrator
//!
//! Runs the grid search over the XGBoost template on the feature-store
//! splits, optionally scores the winner on the test split, and optionally
//! registers it together with the run params inference reads.

use super::config::TrainerConfig;
use super::metrics::RegressionMetrics;
use super::models::Regressor;
use super::xgboost::{XGBoostConfig, XGBoostRegressor};
use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::feature_store::FeatureStore;
use crate::optimizer::{GridSearchCV, ParamMap};
use crate::tracking::{ModelRegistry, RegistryEntry, RunParams, RunStore};
use crate::utils::frame::{column_to_array1, columns_to_array2, split_features_target};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::info;

/// Where a training run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingStage {
    Loaded,
    Searching,
    Trained,
    Evaluated,
    Persisted,
}

impl fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrainingStage::Loaded => "loaded",
            TrainingStage::Searching => "searching",
            TrainingStage::Trained => "trained",
            TrainingStage::Evaluated => "evaluated",
            TrainingStage::Persisted => "persisted",
        };
        f.write_str(s)
    }
}

/// Result of a training run
#[derive(Debug, Clone)]
pub enum TrainingOutcome {
    Evaluated {
        model: XGBoostRegressor,
        params: ParamMap,
        rmse: f64,
    },
    Unevaluated {
        model: XGBoostRegressor,
        params: ParamMap,
    },
}

impl TrainingOutcome {
    pub fn model(&self) -> &XGBoostRegressor {
        match self {
            TrainingOutcome::Evaluated { model, .. } | TrainingOutcome::Unevaluated { model, .. } => model,
        }
    }

    pub fn params(&self) -> &ParamMap {
        match self {
            TrainingOutcome::Evaluated { params, .. } | TrainingOutcome::Unevaluated { params, .. } => params,
        }
    }

    pub fn rmse(&self) -> Option<f64> {
        match self {
            TrainingOutcome::Evaluated { rmse, .. } => Some(*rmse),
            TrainingOutcome::Unevaluated { .. } => None,
        }
    }
}

/// Orchestrates search, evaluation and persistence
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    pipeline: PipelineConfig,
    config: TrainerConfig,
    template: XGBoostRegressor,
    stage: Option<TrainingStage>,
    registered: Option<RegistryEntry>,
}

impl ModelTrainer {
    pub fn new(pipeline: PipelineConfig, config: TrainerConfig) -> Self {
        Self {
            pipeline,
            config,
            template: XGBoostRegressor::new(XGBoostConfig::default()),
            stage: None,
            registered: None,
        }
    }

    /// Replace the estimator template searched over
    pub fn with_template(mut self, template: XGBoostRegressor) -> Self {
        self.template = template;
        self
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Last stage reached, `None` before any run
    pub fn stage(&self) -> Option<TrainingStage> {
        self.stage
    }

    /// Registry entry written by the last persisted run
    pub fn registered(&self) -> Option<&RegistryEntry> {
        self.registered.as_ref()
    }

    /// Train on the splits in the feature store
    pub fn initiate(&mut self) -> Result<TrainingOutcome> {
        let (train, test) = FeatureStore::new(&self.pipeline.paths)
            .load()
            .context("load feature store")?;
        self.train(&train, &test)
    }

    /// Train on already transformed frames holding the target column
    pub fn train(&mut self, train: &DataFrame, test: &DataFrame) -> Result<TrainingOutcome> {
        self.config.validate()?;
        self.stage = None;
        self.registered = None;
        let start = Instant::now();
        let target = self.pipeline.target.clone();

        let (x_train, y_train, feature_names) =
            split_features_target(train, &target).context("prepare training matrix")?;
        self.advance(TrainingStage::Loaded);

        self.advance(TrainingStage::Searching);
        let search = GridSearchCV::with_config(
            self.template.clone(),
            self.config.grid.clone(),
            self.config.search.clone(),
        );
        let result = search.fit(&x_train, &y_train).context("grid search")?;
        let model = result.best_estimator;
        let params = result.best_params;
        self.advance(TrainingStage::Trained);

        let metrics = if self.config.evaluate {
            let x_test = columns_to_array2(test, &feature_names).context("prepare test matrix")?;
            let y_test = column_to_array1(test, &target).context("prepare test target")?;
            let predictions = model.predict(&x_test).context("predict test split")?;
            let metrics = RegressionMetrics::compute(&y_test, &predictions).context("score test split")?;
            info!(
                rmse = metrics.rmse,
                mae = metrics.mae,
                r2 = metrics.r2,
                test_rows = metrics.n_samples,
                "Model evaluated"
            );
            self.advance(TrainingStage::Evaluated);
            Some(metrics)
        } else {
            None
        };

        if self.config.persist {
            self.persist(&model, &params, metrics.as_ref(), result.best_score)
                .context("persist model")?;
            self.advance(TrainingStage::Persisted);
        }

        info!(elapsed_secs = start.elapsed().as_secs_f64(), "Training run completed");
        Ok(match metrics {
            Some(metrics) => TrainingOutcome::Evaluated {
                model,
                params,
                rmse: metrics.rmse,
            },
            None => TrainingOutcome::Unevaluated { model, params },
        })
    }

    fn persist(
        &mut self,
        model: &XGBoostRegressor,
        params: &ParamMap,
        metrics: Option<&RegressionMetrics>,
        cv_score: f64,
    ) -> Result<()> {
        let mut registry = ModelRegistry::open(&self.pipeline.paths.registry_dir)?;
        let entry = registry.register(&self.pipeline.model_name, model)?;

        let mut run = RunParams::new(&entry.name, entry.version, &entry.uri, params.clone())
            .with_metric("cv_neg_mse", cv_score);
        if let Some(m) = metrics {
            run = run
                .with_metric("rmse", m.rmse)
                .with_metric("mae", m.mae)
                .with_metric("r2", m.r2);
        }
        let path = RunStore::new(&self.pipeline.paths.run_params_dir).save(&run)?;
        info!(uri = %entry.uri, run_id = %run.run_id, path = %path.display(), "Run params saved");

        self.registered = Some(entry);
        Ok(())
    }

    fn advance(&mut self, stage: TrainingStage) {
        info!(stage = %stage, "Training stage");
        self.stage = Some(stage);
    }
}
