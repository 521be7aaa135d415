//! Local model registry
//!
//! Models are stored as one bincode blob per version under
//! `<root>/<name>/v<version>.bin`, with an `index.json` listing every entry.
//! Registered models are addressed by `models:/<name>/<version>` URIs.

use crate::error::{CongestionError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

const URI_SCHEME: &str = "models:/";
const INDEX_FILE: &str = "index.json";

/// Version selector inside a model URI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionRef {
    Number(u32),
    Latest,
}

/// Parsed `models:/<name>/<version>` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelUri {
    pub name: String,
    pub version: VersionRef,
}

impl ModelUri {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version: VersionRef::Number(version),
        }
    }

    pub fn latest(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: VersionRef::Latest,
        }
    }
}

impl fmt::Display for ModelUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            VersionRef::Number(v) => write!(f, "{URI_SCHEME}{}/{v}", self.name),
            VersionRef::Latest => write!(f, "{URI_SCHEME}{}/latest", self.name),
        }
    }
}

impl FromStr for ModelUri {
    type Err = CongestionError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CongestionError::RegistryError(format!("invalid model URI '{s}'"));
        let rest = s.strip_prefix(URI_SCHEME).ok_or_else(invalid)?;
        let (name, version) = rest.rsplit_once('/').ok_or_else(invalid)?;
        if name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        let version = match version {
            "latest" => VersionRef::Latest,
            v => VersionRef::Number(v.parse().map_err(|_| invalid())?),
        };
        Ok(Self {
            name: name.to_string(),
            version,
        })
    }
}

/// Registry entry (metadata only, without model data)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    pub version: u32,
    pub uri: String,
    /// Blob path relative to the registry root
    pub path: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryIndex {
    models: BTreeMap<String, Vec<RegistryEntry>>,
}

/// Model registry for managing versioned models
#[derive(Debug)]
pub struct ModelRegistry {
    root: PathBuf,
    index: RegistryIndex,
}

impl ModelRegistry {
    /// Create or open the registry at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            CongestionError::RegistryError(format!("cannot create {}: {e}", root.display()))
        })?;

        let index_path = root.join(INDEX_FILE);
        let index = if index_path.exists() {
            let file = File::open(&index_path)?;
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                CongestionError::RegistryError(format!("corrupt registry index: {e}"))
            })?
        } else {
            RegistryIndex::default()
        };

        Ok(Self { root, index })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn save_index(&self) -> Result<()> {
        let file = File::create(self.root.join(INDEX_FILE))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.index)?;
        Ok(())
    }

    /// Store `model` as the next version of `name`
    pub fn register<M: Serialize>(&mut self, name: &str, model: &M) -> Result<RegistryEntry> {
        if name.is_empty() || name.contains('/') {
            return Err(CongestionError::RegistryError(format!("invalid model name '{name}'")));
        }

        let version = self
            .index
            .models
            .get(name)
            .and_then(|entries| entries.iter().map(|e| e.version).max())
            .unwrap_or(0)
            + 1;

        let model_dir = self.root.join(name);
        fs::create_dir_all(&model_dir)?;
        let file_name = format!("v{version}.bin");
        let bytes = bincode::serialize(model)?;
        fs::write(model_dir.join(&file_name), bytes)?;

        let entry = RegistryEntry {
            name: name.to_string(),
            version,
            uri: ModelUri::new(name, version).to_string(),
            path: format!("{name}/{file_name}"),
            registered_at: Utc::now(),
        };
        self.index
            .models
            .entry(name.to_string())
            .or_default()
            .push(entry.clone());
        self.save_index()?;

        info!(name = %name, version, uri = %entry.uri, "Model registered");
        Ok(entry)
    }

    /// Entry addressed by `uri`
    pub fn resolve(&self, uri: &ModelUri) -> Result<&RegistryEntry> {
        let entries = self
            .index
            .models
            .get(&uri.name)
            .ok_or_else(|| CongestionError::ArtifactNotFound(format!("model '{}'", uri.name)))?;

        let entry = match uri.version {
            VersionRef::Latest => entries.iter().max_by_key(|e| e.version),
            VersionRef::Number(v) => entries.iter().find(|e| e.version == v),
        };
        entry.ok_or_else(|| CongestionError::ArtifactNotFound(uri.to_string()))
    }

    /// Deserialize the model addressed by a `models:/` URI string
    pub fn load<M: DeserializeOwned>(&self, uri: &str) -> Result<M> {
        let uri: ModelUri = uri.parse()?;
        let entry = self.resolve(&uri)?;
        let path = self.root.join(&entry.path);
        let bytes = fs::read(&path).map_err(|e| {
            CongestionError::ArtifactNotFound(format!("{} ({e})", path.display()))
        })?;
        Ok(bincode::deserialize(&bytes)?)
    }

    pub fn latest(&self, name: &str) -> Result<&RegistryEntry> {
        self.resolve(&ModelUri::latest(name))
    }

    pub fn list_models(&self) -> Vec<String> {
        self.index.models.keys().cloned().collect()
    }

    pub fn list_versions(&self, name: &str) -> Vec<u32> {
        self.index
            .models
            .get(name)
            .map(|entries| entries.iter().map(|e| e.version).collect())
            .unwrap_or_default()
    }

    /// Remove one version and its blob
    pub fn delete(&mut self, name: &str, version: u32) -> Result<()> {
        let uri = ModelUri::new(name, version);
        let entries = self
            .index
            .models
            .get_mut(name)
            .ok_or_else(|| CongestionError::ArtifactNotFound(uri.to_string()))?;
        let idx = entries
            .iter()
            .position(|e| e.version == version)
            .ok_or_else(|| CongestionError::ArtifactNotFound(uri.to_string()))?;

        let entry = entries.remove(idx);
        if entries.is_empty() {
            self.index.models.remove(name);
        }

        let path = self.root.join(&entry.path);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        self.save_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_roundtrip() {
        let uri: ModelUri = "models:/congestion_xgb/3".parse().unwrap();
        assert_eq!(uri, ModelUri::new("congestion_xgb", 3));
        assert_eq!(uri.to_string(), "models:/congestion_xgb/3");

        let latest: ModelUri = "models:/m/latest".parse().unwrap();
        assert_eq!(latest.version, VersionRef::Latest);

        assert!("runs:/abc/model".parse::<ModelUri>().is_err());
        assert!("models:/m/one".parse::<ModelUri>().is_err());
        assert!("models://1".parse::<ModelUri>().is_err());
    }

    #[test]
    fn test_register_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ModelRegistry::open(dir.path()).unwrap();

        let first = registry.register("m", &vec![1.0f64, 2.0]).unwrap();
        let second = registry.register("m", &vec![3.0f64]).unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_eq!(second.uri, "models:/m/2");

        let loaded: Vec<f64> = registry.load("models:/m/1").unwrap();
        assert_eq!(loaded, vec![1.0, 2.0]);
        let latest: Vec<f64> = registry.load("models:/m/latest").unwrap();
        assert_eq!(latest, vec![3.0]);
        assert_eq!(registry.list_versions("m"), vec![1, 2]);
    }

    #[test]
    fn test_index_persists() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut registry = ModelRegistry::open(dir.path()).unwrap();
            registry.register("m", &42u32).unwrap();
        }
        let reopened = ModelRegistry::open(dir.path()).unwrap();
        assert_eq!(reopened.latest("m").unwrap().version, 1);
        let value: u32 = reopened.load("models:/m/1").unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_unknown_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ModelRegistry::open(dir.path()).unwrap();
        assert!(matches!(
            registry.load::<u32>("models:/missing/1"),
            Err(CongestionError::ArtifactNotFound(_))
        ));
        registry.register("m", &1u32).unwrap();
        assert!(matches!(
            registry.load::<u32>("models:/m/7"),
            Err(CongestionError::ArtifactNotFound(_))
        ));
    }

    #[test]
    fn test_delete_version() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ModelRegistry::open(dir.path()).unwrap();
        registry.register("m", &1u32).unwrap();
        registry.register("m", &2u32).unwrap();
        registry.delete("m", 2).unwrap();
        assert_eq!(registry.list_versions("m"), vec![1]);
        assert!(!dir.path().join("m").join("v2.bin").exists());
    }
}
