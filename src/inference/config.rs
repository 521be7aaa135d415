//! Inference configuration

use serde::{Deserialize, Serialize};

/// Configuration for model inference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Return the preprocessed frame instead of predictions
    pub return_transformed: bool,
}

impl InferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_return_transformed(mut self, enabled: bool) -> Self {
        self.return_transformed = enabled;
        self
    }
}
