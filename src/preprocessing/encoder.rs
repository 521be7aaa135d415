//! Categorical encoders
//!
//! Both encoders follow the same contract: learn from a training frame and
//! target once, then map any number of frames onto fixed output columns.

use super::config::UnknownCategoryPolicy;
use crate::error::{CongestionError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Prefix of one-hot indicator columns
pub const ONEHOT_PREFIX: &str = "onehot__";
/// Prefix of mean-encoded columns
pub const MEAN_PREFIX: &str = "mean__";

/// Fit/transform contract shared by the categorical encoders
pub trait CategoricalEncoder {
    /// Learn the encoding from `df` and the aligned training target
    fn fit(&mut self, df: &DataFrame, target: &[f64]) -> Result<()>;

    /// Encoded columns in the order fixed at fit time
    fn transform(&self, df: &DataFrame) -> Result<Vec<Column>>;

    /// Output column names in transform order
    fn output_names(&self) -> Vec<String>;

    fn input_columns(&self) -> &[String];

    fn is_fitted(&self) -> bool;
}

/// Read a categorical column as strings; booleans render as `"True"`/`"False"`
pub(crate) fn category_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(column)
        .map_err(|_| CongestionError::FeatureNotFound(column.to_string()))?
        .as_materialized_series();

    match series.dtype() {
        DataType::String => Ok(series
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()),
        DataType::Boolean => Ok(series
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| if b { "True" } else { "False" }.to_string()))
            .collect()),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let cast = series.cast(&DataType::Int64)?;
            Ok(cast.i64()?.into_iter().map(|v| v.map(|i| i.to_string())).collect())
        }
        other => Err(CongestionError::DataError(format!(
            "column '{column}' cannot be treated as categorical ({other})"
        ))),
    }
}

fn unknown(column: &str, category: Option<&str>) -> CongestionError {
    CongestionError::UnknownCategory {
        column: column.to_string(),
        category: category.unwrap_or("<null>").to_string(),
    }
}

/// One indicator column per learned category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    policy: UnknownCategoryPolicy,
    /// Sorted vocabulary per input column, in column order
    vocabularies: Vec<Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new(columns: Vec<String>, policy: UnknownCategoryPolicy) -> Self {
        Self {
            columns,
            policy,
            vocabularies: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learned categories of `column`, sorted
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.vocabularies.get(i))
            .map(Vec::as_slice)
    }
}

impl CategoricalEncoder for OneHotEncoder {
    fn fit(&mut self, df: &DataFrame, _target: &[f64]) -> Result<()> {
        let mut vocabularies = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let values = category_values(df, column)?;
            let vocabulary: BTreeSet<String> = values.into_iter().flatten().collect();
            vocabularies.push(vocabulary.into_iter().collect());
        }
        self.vocabularies = vocabularies;
        self.is_fitted = true;
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<Vec<Column>> {
        if !self.is_fitted {
            return Err(CongestionError::ModelNotFitted);
        }

        let mut out = Vec::new();
        for (column, vocabulary) in self.columns.iter().zip(&self.vocabularies) {
            let values = category_values(df, column)?;
            let mut indicators = vec![vec![0.0f64; values.len()]; vocabulary.len()];

            for (row, value) in values.iter().enumerate() {
                let hit = value
                    .as_deref()
                    .and_then(|v| vocabulary.binary_search_by(|c| c.as_str().cmp(v)).ok());
                match (hit, self.policy) {
                    (Some(k), _) => indicators[k][row] = 1.0,
                    (None, UnknownCategoryPolicy::Ignore) => {}
                    (None, UnknownCategoryPolicy::Error) => {
                        return Err(unknown(column, value.as_deref()))
                    }
                }
            }

            for (category, values) in vocabulary.iter().zip(indicators) {
                let name = format!("{ONEHOT_PREFIX}{column}_{category}");
                out.push(Column::new(name.into(), values));
            }
        }
        Ok(out)
    }

    fn output_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.vocabularies)
            .flat_map(|(column, vocabulary)| {
                vocabulary
                    .iter()
                    .map(move |category| format!("{ONEHOT_PREFIX}{column}_{category}"))
            })
            .collect()
    }

    fn input_columns(&self) -> &[String] {
        &self.columns
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

/// Per-category training-target mean
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanEncoder {
    columns: Vec<String>,
    policy: UnknownCategoryPolicy,
    /// Category means per input column, in column order
    means: Vec<BTreeMap<String, f64>>,
    /// Fallback for unseen and null categories
    global_mean: f64,
    is_fitted: bool,
}

impl MeanEncoder {
    pub fn new(columns: Vec<String>, policy: UnknownCategoryPolicy) -> Self {
        Self {
            columns,
            policy,
            means: Vec::new(),
            global_mean: 0.0,
            is_fitted: false,
        }
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    /// Learned mean for `category` of `column`
    pub fn mean_of(&self, column: &str, category: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.means.get(i))
            .and_then(|m| m.get(category).copied())
    }
}

impl CategoricalEncoder for MeanEncoder {
    fn fit(&mut self, df: &DataFrame, target: &[f64]) -> Result<()> {
        if target.is_empty() {
            return Err(CongestionError::DataError(
                "mean encoding needs at least one training row".to_string(),
            ));
        }
        if target.len() != df.height() {
            return Err(CongestionError::ShapeError {
                expected: format!("{} target values", df.height()),
                actual: target.len().to_string(),
            });
        }

        let mut means = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let values = category_values(df, column)?;
            let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
            for (value, &y) in values.into_iter().zip(target) {
                if let Some(category) = value {
                    let entry = sums.entry(category).or_insert((0.0, 0));
                    entry.0 += y;
                    entry.1 += 1;
                }
            }
            means.push(
                sums.into_iter()
                    .map(|(category, (sum, count))| (category, sum / count as f64))
                    .collect(),
            );
        }

        self.global_mean = target.iter().sum::<f64>() / target.len() as f64;
        self.means = means;
        self.is_fitted = true;
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<Vec<Column>> {
        if !self.is_fitted {
            return Err(CongestionError::ModelNotFitted);
        }

        let mut out = Vec::with_capacity(self.columns.len());
        for (column, means) in self.columns.iter().zip(&self.means) {
            let values = category_values(df, column)?;
            let encoded = values
                .iter()
                .map(|value| match value.as_deref().and_then(|v| means.get(v)) {
                    Some(&mean) => Ok(mean),
                    None => match self.policy {
                        UnknownCategoryPolicy::Ignore => Ok(self.global_mean),
                        UnknownCategoryPolicy::Error => Err(unknown(column, value.as_deref())),
                    },
                })
                .collect::<Result<Vec<f64>>>()?;
            out.push(Column::new(format!("{MEAN_PREFIX}{column}").into(), encoded));
        }
        Ok(out)
    }

    fn output_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| format!("{MEAN_PREFIX}{c}")).collect()
    }

    fn input_columns(&self) -> &[String] {
        &self.columns
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
