//! Data preprocessing pipeline

use super::config::PreprocessingConfig;
use super::encoder::{CategoricalEncoder, MeanEncoder, OneHotEncoder};
use crate::error::{CongestionError, Result};
use crate::utils::frame::{column_values, columns_to_array2, is_numeric};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Prefix of numeric columns passed through untouched
pub const REMAINDER_PREFIX: &str = "remainder__";

/// Version of the on-disk preprocessor layout
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct StoredRef<'a> {
    format_version: u32,
    preprocessor: &'a DataPreprocessor,
}

#[derive(Deserialize)]
struct Stored {
    format_version: u32,
    preprocessor: DataPreprocessor,
}

/// One-hot + mean encoding + numeric passthrough, fitted once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPreprocessor {
    config: PreprocessingConfig,
    onehot: OneHotEncoder,
    mean: MeanEncoder,
    /// Numeric input columns kept as-is, in input order
    passthrough: Vec<String>,
    /// Output names fixed at fit time
    feature_names: Vec<String>,
    is_fitted: bool,
    /// Seconds spent in the fit call
    fit_time: Option<f64>,
}

impl Default for DataPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DataPreprocessor {
    pub fn new() -> Self {
        Self::with_config(PreprocessingConfig::default())
    }

    pub fn with_config(config: PreprocessingConfig) -> Self {
        let onehot = OneHotEncoder::new(config.onehot_columns.clone(), config.unknown_categories);
        let mean = MeanEncoder::new(config.mean_columns.clone(), config.unknown_categories);
        Self {
            config,
            onehot,
            mean,
            passthrough: Vec::new(),
            feature_names: Vec::new(),
            is_fitted: false,
            fit_time: None,
        }
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Output column names, in transform order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn onehot_encoder(&self) -> &OneHotEncoder {
        &self.onehot
    }

    pub fn mean_encoder(&self) -> &MeanEncoder {
        &self.mean
    }

    pub fn fit_time(&self) -> Option<f64> {
        self.fit_time
    }

    /// Learn encodings from the training features and target.
    ///
    /// A fitted preprocessor is immutable; fitting it again is an error.
    pub fn fit(&mut self, features: &DataFrame, target: &Series) -> Result<&mut Self> {
        if self.is_fitted {
            return Err(CongestionError::AlreadyFitted("preprocessor".to_string()));
        }
        self.config.validate()?;
        let start = Instant::now();

        if target.len() != features.height() {
            return Err(CongestionError::ShapeError {
                expected: format!("{} target values", features.height()),
                actual: target.len().to_string(),
            });
        }
        let target_frame = DataFrame::new(vec![target.clone().into_column()])?;
        let y = column_values(&target_frame, target.name().as_str())?;

        let mut passthrough = Vec::new();
        for column in features.get_columns() {
            let name = column.name().as_str();
            if self.config.is_encoded(name) {
                continue;
            }
            if !is_numeric(column.dtype()) {
                return Err(CongestionError::DataError(format!(
                    "column '{name}' is neither encoded nor numeric ({})",
                    column.dtype()
                )));
            }
            passthrough.push(name.to_string());
        }

        let mut onehot = self.onehot.clone();
        let mut mean = self.mean.clone();
        onehot.fit(features, &y)?;
        mean.fit(features, &y)?;

        let mut feature_names = onehot.output_names();
        feature_names.extend(mean.output_names());
        feature_names.extend(passthrough.iter().map(|c| format!("{REMAINDER_PREFIX}{c}")));

        self.onehot = onehot;
        self.mean = mean;
        self.passthrough = passthrough;
        self.feature_names = feature_names;
        self.is_fitted = true;
        self.fit_time = Some(start.elapsed().as_secs_f64());

        info!(
            rows = features.height(),
            outputs = self.feature_names.len(),
            elapsed_secs = self.fit_time.unwrap_or_default(),
            "Preprocessor fitted"
        );
        Ok(self)
    }

    /// Encode `features` onto the columns fixed at fit time
    pub fn transform(&self, features: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(CongestionError::ModelNotFitted);
        }

        let mut columns = self.onehot.transform(features)?;
        columns.extend(self.mean.transform(features)?);
        for name in &self.passthrough {
            let values = column_values(features, name)?;
            columns.push(Column::new(format!("{REMAINDER_PREFIX}{name}").into(), values));
        }

        let out = DataFrame::new(columns)?;
        debug!(rows = out.height(), columns = out.width(), "Preprocessor transform");
        Ok(out)
    }

    pub fn fit_transform(&mut self, features: &DataFrame, target: &Series) -> Result<DataFrame> {
        self.fit(features, target)?;
        self.transform(features)
    }

    /// Transform straight into a model-ready matrix
    pub fn transform_to_array(&self, features: &DataFrame) -> Result<Array2<f64>> {
        let out = self.transform(features)?;
        columns_to_array2(&out, &self.feature_names)
    }

    /// Write the fitted preprocessor as versioned JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        if !self.is_fitted {
            return Err(CongestionError::ModelNotFitted);
        }
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&StoredRef {
            format_version: FORMAT_VERSION,
            preprocessor: self,
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CongestionError::ArtifactNotFound(path.display().to_string()));
        }
        let json = std::fs::read_to_string(path)?;
        let stored: Stored = serde_json::from_str(&json)?;
        if stored.format_version != FORMAT_VERSION {
            return Err(CongestionError::SerializationError(format!(
                "preprocessor format version {} is not supported (expected {FORMAT_VERSION})",
                stored.format_version
            )));
        }
        if !stored.preprocessor.is_fitted {
            return Err(CongestionError::ModelNotFitted);
        }
        Ok(stored.preprocessor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> DataFrame {
        df!(
            "hour_sin" => &[0.0, 0.5, -0.5, 1.0],
            "hour_cos" => &[1.0, 0.8, -0.8, 0.0],
            "am_pm" => &["AM", "PM", "PM", "AM"],
            "is_weekend" => &[false, false, true, false],
            "x_y_direction" => &["0_0_N", "1_2_S", "0_0_N", "2_2_E"]
        )
        .unwrap()
    }

    fn target() -> Series {
        Series::new("congestion".into(), &[10.0, 20.0, 30.0, 40.0])
    }

    #[test]
    fn test_output_layout() {
        let mut pre = DataPreprocessor::new();
        let out = pre.fit_transform(&features(), &target()).unwrap();
        let names: Vec<&str> = out.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "onehot__am_pm_AM",
                "onehot__am_pm_PM",
                "onehot__is_weekend_False",
                "onehot__is_weekend_True",
                "mean__x_y_direction",
                "remainder__hour_sin",
                "remainder__hour_cos",
            ]
        );
        assert_eq!(pre.feature_names().len(), 7);
    }

    #[test]
    fn test_refit_rejected() {
        let mut pre = DataPreprocessor::new();
        pre.fit(&features(), &target()).unwrap();
        assert!(matches!(
            pre.fit(&features(), &target()),
            Err(CongestionError::AlreadyFitted(_))
        ));
    }

    #[test]
    fn test_non_numeric_target_rejected() {
        let mut pre = DataPreprocessor::new();
        let bad = Series::new("congestion".into(), &["a", "b", "c", "d"]);
        assert!(pre.fit(&features(), &bad).is_err());
        assert!(!pre.is_fitted());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preprocessor.json");
        let mut pre = DataPreprocessor::new();
        pre.fit(&features(), &target()).unwrap();
        pre.save(&path).unwrap();

        let loaded = DataPreprocessor::load(&path).unwrap();
        let a = pre.transform(&features()).unwrap();
        let b = loaded.transform(&features()).unwrap();
        assert!(a.equals(&b));
    }

    #[test]
    fn test_load_rejects_other_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preprocessor.json");
        let mut pre = DataPreprocessor::new();
        pre.fit(&features(), &target()).unwrap();
        pre.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        value["format_version"] = serde_json::json!(99);
        std::fs::write(&path, value.to_string()).unwrap();

        assert!(matches!(
            DataPreprocessor::load(&path),
            Err(CongestionError::SerializationError(_))
        ));
    }
}
