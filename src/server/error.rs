//! Error types for the server

use crate::error::CongestionError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Pipeline(#[from] CongestionError),
}

impl ServerError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            }
            ServerError::Pipeline(e) => match e.root_cause() {
                CongestionError::ArtifactNotFound(_) | CongestionError::ModelNotFitted => {
                    tracing::warn!(error = %e, "Predictor unavailable");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "No trained model is available. Run the training pipeline first.".to_string(),
                    )
                }
                CongestionError::DataError(_)
                | CongestionError::FeatureNotFound(_)
                | CongestionError::UnknownCategory { .. }
                | CongestionError::ShapeError { .. } => (StatusCode::BAD_REQUEST, e.to_string()),
                _ => {
                    tracing::error!(error = %e, "Prediction failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed. Check server logs for details.".to_string())
                }
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = Json(json!({
            "error": true,
            "message": message,
        }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
