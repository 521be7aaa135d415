//! Data transformation and feature store
//!
//! Turns the ingested splits into model-ready frames: feature engineering,
//! preprocessing fitted on the training split only, and the target column
//! re-attached at the end. The transformed frames are persisted as gzip
//! parquet so training can run without repeating this stage.

use crate::config::{ArtifactPaths, PipelineConfig};
use crate::error::{CongestionError, Result, ResultExt};
use crate::feature_engineering::generate_features;
use crate::preprocessing::DataPreprocessor;
use crate::utils::{DataLoader, DataSaver};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Feature engineering plus preprocessing over both splits
#[derive(Debug, Clone)]
pub struct DataTransformation {
    config: PipelineConfig,
    loader: DataLoader,
}

impl DataTransformation {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            loader: DataLoader::new(),
        }
    }

    /// Transform the splits stored at `train_path` and `test_path`.
    ///
    /// The fitted preprocessor is written to the configured path when
    /// `save_preprocessor` is set.
    pub fn initiate(
        &self,
        train_path: impl AsRef<Path>,
        test_path: impl AsRef<Path>,
        save_preprocessor: bool,
    ) -> Result<(DataFrame, DataFrame)> {
        let start = Instant::now();
        let train = self.loader.load_auto(train_path).context("load train split")?;
        let test = self.loader.load_auto(test_path).context("load test split")?;

        let (train, test, preprocessor) = self.transform_frames(&train, &test)?;

        if save_preprocessor {
            preprocessor
                .save(&self.config.paths.preprocessor)
                .context("save preprocessor")?;
        }

        info!(
            train_rows = train.height(),
            test_rows = test.height(),
            features = preprocessor.feature_names().len(),
            saved = save_preprocessor,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Data transformation completed"
        );
        Ok((train, test))
    }

    /// In-memory variant of [`initiate`](Self::initiate) that also returns the
    /// fitted preprocessor
    pub fn transform_frames(
        &self,
        train: &DataFrame,
        test: &DataFrame,
    ) -> Result<(DataFrame, DataFrame, DataPreprocessor)> {
        let target = self.config.target.as_str();
        let (train_features, train_target) = split_target(train, target).context("prepare train split")?;
        let (test_features, test_target) = split_target(test, target).context("prepare test split")?;

        let mut preprocessor = DataPreprocessor::new();
        let train_x = preprocessor
            .fit_transform(&train_features, &train_target)
            .context("fit preprocessor")?;
        let test_x = preprocessor.transform(&test_features).context("transform test split")?;

        let train_out = attach_target(train_x, train_target)?;
        let test_out = attach_target(test_x, test_target)?;
        Ok((train_out, test_out, preprocessor))
    }
}

/// Engineered features and the target series of one split
fn split_target(df: &DataFrame, target: &str) -> Result<(DataFrame, Series)> {
    let target_series = df
        .column(target)
        .map_err(|_| CongestionError::FeatureNotFound(target.to_string()))?
        .as_materialized_series()
        .clone();
    let features = generate_features(&df.drop(target)?)?;
    Ok((features, target_series))
}

fn attach_target(mut features: DataFrame, target: Series) -> Result<DataFrame> {
    features.with_column(target)?;
    Ok(features)
}

/// Persisted transformed splits
#[derive(Debug, Clone)]
pub struct FeatureStore {
    train_path: PathBuf,
    test_path: PathBuf,
}

impl FeatureStore {
    pub fn new(paths: &ArtifactPaths) -> Self {
        Self {
            train_path: paths.xform_train.clone(),
            test_path: paths.xform_test.clone(),
        }
    }

    /// Write both frames; returns their paths
    pub fn store(&self, train: &mut DataFrame, test: &mut DataFrame) -> Result<(PathBuf, PathBuf)> {
        DataSaver::save_parquet(train, &self.train_path).context("store transformed train")?;
        DataSaver::save_parquet(test, &self.test_path).context("store transformed test")?;
        info!(
            train_path = %self.train_path.display(),
            test_path = %self.test_path.display(),
            "Feature store updated"
        );
        Ok((self.train_path.clone(), self.test_path.clone()))
    }

    /// Read both frames back
    pub fn load(&self) -> Result<(DataFrame, DataFrame)> {
        let loader = DataLoader::new();
        let train = loader.load_parquet(&self.train_path).context("load transformed train")?;
        let test = loader.load_parquet(&self.test_path).context("load transformed test")?;
        Ok((train, test))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::REMAINDER_PREFIX;

    fn split(n: usize, offset: usize) -> DataFrame {
        let dirs = ["N", "S", "EB"];
        df!(
            "time" => (0..n).map(|i| format!("2024-01-{:02} {:02}:00:00", 10 + i % 7, (i * 5) % 24)).collect::<Vec<_>>(),
            "x" => (0..n).map(|i| (i % 2) as i64).collect::<Vec<_>>(),
            "y" => (0..n).map(|i| ((i + offset) % 3) as i64).collect::<Vec<_>>(),
            "direction" => (0..n).map(|i| dirs[i % 3]).collect::<Vec<_>>(),
            "congestion" => (0..n).map(|i| (i * 7 % 50) as f64).collect::<Vec<_>>()
        )
        .unwrap()
    }

    #[test]
    fn test_transform_frames_layout() {
        let transformation = DataTransformation::new(PipelineConfig::default());
        let (train, test, preprocessor) = transformation
            .transform_frames(&split(30, 0), &split(12, 1))
            .unwrap();

        assert_eq!(train.height(), 30);
        assert_eq!(test.height(), 12);
        assert_eq!(train.width(), preprocessor.feature_names().len() + 1);
        assert_eq!(train.get_column_names(), test.get_column_names());

        let names = train.get_column_names();
        assert_eq!(names.last().unwrap().as_str(), "congestion");
        assert!(names.iter().any(|n| n.as_str() == format!("{REMAINDER_PREFIX}hour_sin")));
        assert!(!names.iter().any(|n| n.as_str() == "time" || n.as_str() == "direction"));
    }

    #[test]
    fn test_missing_target() {
        let transformation = DataTransformation::new(PipelineConfig::default());
        let train = split(10, 0).drop("congestion").unwrap();
        let err = transformation.transform_frames(&train, &split(5, 0)).unwrap_err();
        assert!(matches!(err.root_cause(), CongestionError::FeatureNotFound(_)));
    }

    #[test]
    fn test_initiate_and_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default().with_root(dir.path());
        let train_path = dir.path().join("train.parquet");
        let test_path = dir.path().join("test.parquet");
        DataSaver::save_parquet(&mut split(30, 0), &train_path).unwrap();
        DataSaver::save_parquet(&mut split(12, 1), &test_path).unwrap();

        let (mut train, mut test) = DataTransformation::new(config.clone())
            .initiate(&train_path, &test_path, true)
            .unwrap();
        assert!(config.paths.preprocessor.exists());

        let store = FeatureStore::new(&config.paths);
        store.store(&mut train, &mut test).unwrap();
        let (loaded_train, loaded_test) = store.load().unwrap();
        assert!(loaded_train.equals(&train));
        assert!(loaded_test.equals(&test));
    }
}
