//! Training run configuration

use crate::error::Result;
use crate::optimizer::{ParamGrid, SearchConfig};
use serde::{Deserialize, Serialize};

/// Settings for one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Hyperparameter grid searched over the regressor template
    pub grid: ParamGrid,
    pub search: SearchConfig,
    /// Compute test RMSE after the search
    pub evaluate: bool,
    /// Register the model and write run params
    pub persist: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            grid: default_grid(),
            search: SearchConfig::default(),
            evaluate: true,
            persist: true,
        }
    }
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.search = self.search.with_cv_folds(folds);
        self
    }

    pub fn with_evaluate(mut self, evaluate: bool) -> Self {
        self.evaluate = evaluate;
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.search.validate()
    }
}

/// learning_rate × n_estimators × max_depth, 27 candidates
pub fn default_grid() -> ParamGrid {
    ParamGrid::new()
        .add("learning_rate", [0.001, 0.01, 0.1])
        .add("n_estimators", [100i64, 200, 300])
        .add("max_depth", [3i64, 5, 7])
}
