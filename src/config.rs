//! Pipeline configuration
//!
//! Paths and run-wide settings shared by ingestion, transformation, training
//! and inference. Values come from `Default`, a JSON file, or `CONGESTION_*`
//! environment overrides.

use crate::error::{CongestionError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raw training data published with the original project
pub const DEFAULT_SOURCE: &str =
    "https://github.com/abbeymaj80/my-ml-datasets/raw/refs/heads/master/project_datasets/congestion/train.parquet";

/// Where every artifact of a run lives on disk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactPaths {
    pub train_data: PathBuf,
    pub test_data: PathBuf,
    pub preprocessor: PathBuf,
    pub xform_train: PathBuf,
    pub xform_test: PathBuf,
    pub registry_dir: PathBuf,
    pub run_params_dir: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::under(Path::new("."))
    }
}

impl ArtifactPaths {
    /// Standard layout rooted at `root`
    pub fn under(root: &Path) -> Self {
        Self {
            train_data: root.join("artifacts").join("train_data.parquet"),
            test_data: root.join("artifacts").join("test_data.parquet"),
            preprocessor: root.join("artifacts").join("preprocessor.json"),
            xform_train: root.join("feature_store").join("xform_train.parquet"),
            xform_test: root.join("feature_store").join("xform_test.parquet"),
            registry_dir: root.join("models"),
            run_params_dir: root.join("run_params"),
        }
    }
}

/// Configuration for a full pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Raw data location: local parquet/CSV path or http(s) URL
    pub source: String,
    /// Target column name
    pub target: String,
    /// Fraction of rows held out for testing
    pub test_size: f64,
    /// Seed for the train/test shuffle
    pub random_state: u64,
    /// Name the trained model is registered under
    pub model_name: String,
    pub paths: ArtifactPaths,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            target: "congestion".to_string(),
            test_size: 0.3,
            random_state: 42,
            model_name: "congestion_xgb".to_string(),
            paths: ArtifactPaths::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with `CONGESTION_*` environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("CONGESTION_ROOT") {
            Ok(root) => Self::default().with_root(root),
            Err(_) => Self::default(),
        };

        if let Ok(source) = std::env::var("CONGESTION_SOURCE") {
            config.source = source;
        }
        if let Ok(target) = std::env::var("CONGESTION_TARGET") {
            config.target = target;
        }
        if let Ok(name) = std::env::var("CONGESTION_MODEL_NAME") {
            config.model_name = name;
        }
        if let Ok(raw) = std::env::var("CONGESTION_TEST_SIZE") {
            config.test_size = raw.parse().map_err(|_| {
                CongestionError::ConfigError(format!("CONGESTION_TEST_SIZE is not a number: {raw}"))
            })?;
        }
        if let Ok(raw) = std::env::var("CONGESTION_RANDOM_STATE") {
            config.random_state = raw.parse().map_err(|_| {
                CongestionError::ConfigError(format!("CONGESTION_RANDOM_STATE is not an integer: {raw}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CongestionError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Relocate every artifact under `root`
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.paths = ArtifactPaths::under(root.as_ref());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(CongestionError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "must be strictly between 0 and 1".to_string(),
            });
        }
        if self.target.is_empty() {
            return Err(CongestionError::ConfigError("target column name is empty".to_string()));
        }
        if self.model_name.is_empty() {
            return Err(CongestionError::ConfigError("model name is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.target, "congestion");
        assert_eq!(config.test_size, 0.3);
        assert_eq!(config.random_state, 42);
        assert_eq!(
            config.paths.train_data,
            Path::new(".").join("artifacts").join("train_data.parquet")
        );
    }

    #[test]
    fn test_with_root_relocates_everything() {
        let config = PipelineConfig::default().with_root("/tmp/run");
        let p = &config.paths;
        for path in [
            &p.train_data,
            &p.test_data,
            &p.preprocessor,
            &p.xform_train,
            &p.xform_test,
            &p.registry_dir,
            &p.run_params_dir,
        ] {
            assert!(path.starts_with("/tmp/run"), "{} not relocated", path.display());
        }
    }

    #[test]
    fn test_invalid_test_size() {
        let config = PipelineConfig::default().with_test_size(1.5);
        assert!(matches!(
            config.validate(),
            Err(CongestionError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let config = PipelineConfig::default()
            .with_model_name("custom")
            .with_root(dir.path());
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.model_name, "custom");
        assert_eq!(loaded.paths, config.paths);
    }
}
