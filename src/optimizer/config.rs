//! Search configuration

use crate::error::{CongestionError, Result};
use serde::{Deserialize, Serialize};

/// Score maximised by the search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Scoring {
    /// Negative mean squared error on the held-out fold
    #[default]
    NegMeanSquaredError,
}

/// Configuration for exhaustive grid search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of cross-validation folds
    pub cv_folds: usize,

    /// Worker threads for (candidate, fold) fits; `None` uses every core
    pub n_jobs: Option<usize>,

    pub scoring: Scoring,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cv_folds: 3,
            n_jobs: None,
            scoring: Scoring::NegMeanSquaredError,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.cv_folds < 2 {
            return Err(CongestionError::InvalidParameter {
                name: "cv_folds".to_string(),
                value: self.cv_folds.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if self.n_jobs == Some(0) {
            return Err(CongestionError::InvalidParameter {
                name: "n_jobs".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1 (or unset for all cores)".to_string(),
            });
        }
        Ok(())
    }
}
