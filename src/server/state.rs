//! Application state management

use super::ServerConfig;
use crate::error::{CongestionError, Result, ResultExt};
use crate::inference::{CongestionPredictor, InferenceConfig};
use crate::tracking::RunStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    /// Predictor for the latest registered run, swapped when a newer run appears
    predictor: RwLock<Option<Arc<CongestionPredictor>>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            predictor: RwLock::new(None),
        }
    }

    /// State with a predictor already in place.
    ///
    /// A predictor built from parts has no registry URI and is served as is.
    pub fn with_predictor(config: ServerConfig, predictor: CongestionPredictor) -> Self {
        Self {
            config,
            predictor: RwLock::new(Some(Arc::new(predictor))),
        }
    }

    /// Predictor for the model of the latest run params.
    ///
    /// The cached predictor is reused while its URI matches the latest run;
    /// otherwise the preprocessor and model are reloaded from the artifact store.
    pub async fn predictor(&self) -> Result<Arc<CongestionPredictor>> {
        if let Some(predictor) = self.predictor.read().await.as_ref() {
            if predictor.model_uri().is_none() {
                return Ok(Arc::clone(predictor));
            }
        }

        let latest = self.latest_model_uri().await?;
        if let Some(predictor) = self.current(&latest).await {
            return Ok(predictor);
        }

        let mut slot = self.predictor.write().await;
        if let Some(predictor) = slot.as_ref().filter(|p| p.model_uri() == Some(latest.as_str())) {
            return Ok(Arc::clone(predictor));
        }

        let pipeline = self.config.pipeline.clone();
        let predictor = tokio::task::spawn_blocking(move || {
            CongestionPredictor::load(&pipeline, InferenceConfig::default())
        })
        .await
        .map_err(|e| CongestionError::DataError(format!("predictor load task failed: {e}")))??;

        info!(
            previous = slot.as_ref().and_then(|p| p.model_uri()).unwrap_or("-"),
            uri = predictor.model_uri().unwrap_or("-"),
            "Predictor loaded for latest run"
        );
        let predictor = Arc::new(predictor);
        *slot = Some(Arc::clone(&predictor));
        Ok(predictor)
    }

    /// URI of the model currently cached, if any
    pub async fn served_model_uri(&self) -> Option<String> {
        self.predictor
            .read()
            .await
            .as_ref()
            .and_then(|p| p.model_uri().map(str::to_string))
    }

    async fn current(&self, uri: &str) -> Option<Arc<CongestionPredictor>> {
        self.predictor
            .read()
            .await
            .as_ref()
            .filter(|p| p.model_uri() == Some(uri))
            .map(Arc::clone)
    }

    async fn latest_model_uri(&self) -> Result<String> {
        let dir = self.config.pipeline.paths.run_params_dir.clone();
        tokio::task::spawn_blocking(move || RunStore::new(dir).latest().map(|run| run.model_uri))
            .await
            .map_err(|e| CongestionError::DataError(format!("run params task failed: {e}")))?
            .context("read latest run params")
    }
}
