//! Raw data ingestion
//!
//! Reads the raw congestion table from a local file or an http(s) URL, drops
//! the row identifier, and writes a seeded train/test split as gzip parquet.

use crate::config::PipelineConfig;
use crate::error::{CongestionError, Result, ResultExt};
use crate::feature_engineering::RAW_COLUMNS;
use crate::utils::{DataLoader, DataSaver, FileFormat};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Identifier column removed before splitting
pub const ROW_ID: &str = "row_id";

/// Ingests the raw source into train/test parquet files
#[derive(Debug, Clone)]
pub struct DataIngestion {
    config: PipelineConfig,
    loader: DataLoader,
}

impl DataIngestion {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            loader: DataLoader::new(),
        }
    }

    /// Read, split and persist; returns the train and test paths
    pub async fn initiate(&self) -> Result<(PathBuf, PathBuf)> {
        info!(source = %self.config.source, "Starting data ingestion");
        let start = Instant::now();

        let raw = self.read_source().await.context("read raw source")?;
        let (mut train, mut test) = self.split(raw)?;

        let paths = &self.config.paths;
        DataSaver::save_parquet(&mut train, &paths.train_data).context("write train split")?;
        DataSaver::save_parquet(&mut test, &paths.test_data).context("write test split")?;

        info!(
            train_rows = train.height(),
            test_rows = test.height(),
            train_path = %paths.train_data.display(),
            test_path = %paths.test_data.display(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Data ingestion completed"
        );
        Ok((paths.train_data.clone(), paths.test_data.clone()))
    }

    async fn read_source(&self) -> Result<DataFrame> {
        let source = self.config.source.as_str();
        if source.starts_with("http://") || source.starts_with("https://") {
            debug!(url = %source, "Downloading raw data");
            let response = reqwest::get(source)
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| CongestionError::DataError(format!("download failed: {e}")))?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| CongestionError::DataError(format!("download failed: {e}")))?;
            self.loader.load_bytes(bytes.to_vec(), FileFormat::detect(source))
        } else {
            self.loader.load_auto(source)
        }
    }

    /// Drop `row_id`, check the schema, and split with the configured seed
    pub fn split(&self, raw: DataFrame) -> Result<(DataFrame, DataFrame)> {
        let df = if raw.column(ROW_ID).is_ok() {
            raw.drop(ROW_ID)?
        } else {
            raw
        };

        for name in RAW_COLUMNS.iter().copied().chain([self.config.target.as_str()]) {
            if df.column(name).is_err() {
                return Err(CongestionError::FeatureNotFound(name.to_string()));
            }
        }

        train_test_split(&df, self.config.test_size, self.config.random_state)
    }
}

/// Seeded shuffle split; the test side gets `ceil(n * test_size)` rows
pub fn train_test_split(df: &DataFrame, test_size: f64, seed: u64) -> Result<(DataFrame, DataFrame)> {
    let n = df.height();
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(CongestionError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must be strictly between 0 and 1".to_string(),
        });
    }
    let n_test = ((n as f64) * test_size).ceil() as usize;
    if n < 2 || n_test == 0 || n_test >= n {
        return Err(CongestionError::DataError(format!(
            "cannot split {n} rows with test_size {test_size}"
        )));
    }

    let mut indices: Vec<IdxSize> = (0..n as IdxSize).collect();
    indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let (test_idx, train_idx) = indices.split_at(n_test);

    let train = df.take(&IdxCa::from_vec("idx".into(), train_idx.to_vec()))?;
    let test = df.take(&IdxCa::from_vec("idx".into(), test_idx.to_vec()))?;
    Ok((train, test))
}
