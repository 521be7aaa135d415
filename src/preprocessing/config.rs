//! Preprocessing configuration

use crate::error::{CongestionError, Result};
use crate::feature_engineering::{AM_PM, IS_WEEKEND, X_Y_DIRECTION};
use serde::{Deserialize, Serialize};

/// What to do with a category that was not seen during fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UnknownCategoryPolicy {
    /// One-hot rows become all zeros, mean encoding falls back to the global mean
    #[default]
    Ignore,
    /// Fail the transform with `UnknownCategory`
    Error,
}

/// Configuration for the preprocessing pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Low-cardinality columns expanded into indicator columns
    pub onehot_columns: Vec<String>,

    /// High-cardinality columns replaced by their training-target mean
    pub mean_columns: Vec<String>,

    pub unknown_categories: UnknownCategoryPolicy,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            onehot_columns: vec![AM_PM.to_string(), IS_WEEKEND.to_string()],
            mean_columns: vec![X_Y_DIRECTION.to_string()],
            unknown_categories: UnknownCategoryPolicy::Ignore,
        }
    }
}

impl PreprocessingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_onehot_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.onehot_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_mean_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.mean_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_unknown_categories(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.unknown_categories = policy;
        self
    }

    /// A column may belong to at most one encoder
    pub fn validate(&self) -> Result<()> {
        if let Some(dup) = self
            .onehot_columns
            .iter()
            .find(|c| self.mean_columns.contains(c))
        {
            return Err(CongestionError::ConfigError(format!(
                "column '{dup}' is configured for both one-hot and mean encoding"
            )));
        }
        Ok(())
    }

    pub(crate) fn is_encoded(&self, column: &str) -> bool {
        self.onehot_columns.iter().any(|c| c == column) || self.mean_columns.iter().any(|c| c == column)
    }
}
