//! Error types for the congestion forecasting pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, CongestionError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum CongestionError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Already fitted: {0} cannot be refit")]
    AlreadyFitted(String),

    #[error("Unknown category '{category}' in column '{column}'")]
    UnknownCategory { column: String, category: String },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Search error: {0}")]
    SearchError(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Registry error: {0}")]
    RegistryError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{operation} failed: {source}")]
    Context {
        operation: String,
        #[source]
        source: Box<CongestionError>,
    },
}

impl CongestionError {
    /// Innermost error, skipping any `Context` wrappers
    pub fn root_cause(&self) -> &CongestionError {
        match self {
            CongestionError::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Operations recorded on the way up, outermost first
    pub fn operations(&self) -> Vec<&str> {
        let mut ops = Vec::new();
        let mut current = self;
        while let CongestionError::Context { operation, source } = current {
            ops.push(operation.as_str());
            current = source;
        }
        ops
    }
}

/// Attach the name of the failing operation to an error
pub trait ResultExt<T> {
    fn context(self, operation: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<CongestionError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, operation: impl Into<String>) -> Result<T> {
        self.map_err(|e| CongestionError::Context {
            operation: operation.into(),
            source: Box::new(e.into()),
        })
    }
}

impl From<polars::error::PolarsError> for CongestionError {
    fn from(err: polars::error::PolarsError) -> Self {
        CongestionError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for CongestionError {
    fn from(err: serde_json::Error) -> Self {
        CongestionError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for CongestionError {
    fn from(err: bincode::Error) -> Self {
        CongestionError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for CongestionError {
    fn from(err: ndarray::ShapeError) -> Self {
        CongestionError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
