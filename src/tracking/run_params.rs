//! Run metadata written after each persisted training run

use crate::error::{CongestionError, Result, ResultExt};
use crate::optimizer::ParamMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// File name layout, one file per run
const FILE_STAMP: &str = "%Y_%m_%d_%H_%M_%S";

/// What a training run produced and where its model lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    pub run_id: String,
    pub model_name: String,
    pub version: u32,
    /// `models:/<name>/<version>`
    pub model_uri: String,
    pub params: ParamMap,
    pub metrics: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
}

impl RunParams {
    pub fn new(model_name: impl Into<String>, version: u32, model_uri: impl Into<String>, params: ParamMap) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            model_name: model_name.into(),
            version,
            model_uri: model_uri.into(),
            params,
            metrics: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }
}

/// Directory of run metadata files keyed by creation time
#[derive(Debug, Clone)]
pub struct RunStore {
    dir: PathBuf,
}

impl RunStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `run` as `<created_at>.json`, suffixing on same-second collisions
    pub fn save(&self, run: &RunParams) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let stamp = run.created_at.format(FILE_STAMP).to_string();
        let mut path = self.dir.join(format!("{stamp}.json"));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{stamp}_{n}.json"));
            n += 1;
        }
        fs::write(&path, serde_json::to_string_pretty(run)?)?;
        debug!(path = %path.display(), run_id = %run.run_id, "Run params saved");
        Ok(path)
    }

    /// Every run, oldest first; an unreadable file fails the listing
    pub fn list(&self) -> Result<Vec<RunParams>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            let run = serde_json::from_str::<RunParams>(&content)
                .context(format!("read run params {}", path.display()))?;
            runs.push(run);
        }
        runs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(runs)
    }

    /// Most recently created run
    pub fn latest(&self) -> Result<RunParams> {
        self.list()?.pop().ok_or_else(|| {
            CongestionError::ArtifactNotFound(format!("no run params in {}", self.dir.display()))
        })
    }
}
