//! Integration test: server routes

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use congestion_forecast::config::PipelineConfig;
use congestion_forecast::feature_store::{DataTransformation, FeatureStore};
use congestion_forecast::inference::{CongestionPredictor, InferenceConfig};
use congestion_forecast::server::{create_router, AppState, PredictResponse, ServerConfig};
use congestion_forecast::optimizer::ParamGrid;
use congestion_forecast::training::{ModelTrainer, Regressor, TrainerConfig, XGBoostConfig, XGBoostRegressor};
use congestion_forecast::utils::split_features_target;
use polars::prelude::*;
use std::sync::Arc;
use tower::ServiceExt;

fn readings(n: usize) -> DataFrame {
    let directions = ["EB", "NB", "SB", "WB"];
    df!(
        "time" => (0..n).map(|i| format!("2024-03-{:02} {:02}:00:00", 1 + i % 28, i % 24)).collect::<Vec<_>>(),
        "x" => (0..n).map(|i| (i % 3) as i64).collect::<Vec<_>>(),
        "y" => (0..n).map(|i| (i % 2) as i64).collect::<Vec<_>>(),
        "direction" => (0..n).map(|i| directions[i % 4]).collect::<Vec<_>>(),
        "congestion" => (0..n).map(|i| 25.0 + (i % 5) as f64 * 4.0).collect::<Vec<_>>()
    )
    .unwrap()
}

fn predictor() -> CongestionPredictor {
    let train = readings(40);
    let (train_x, _, preprocessor) = DataTransformation::new(PipelineConfig::default())
        .transform_frames(&train, &train)
        .unwrap();
    let (x, y, _) = split_features_target(&train_x, "congestion").unwrap();
    let mut model = XGBoostRegressor::new(XGBoostConfig::default().with_n_estimators(5).with_max_depth(2));
    model.fit(&x, &y).unwrap();
    CongestionPredictor::from_parts(preprocessor, model, InferenceConfig::default())
}

fn app_with_model() -> axum::Router {
    let config = ServerConfig::default().with_host("127.0.0.1").with_port(0);
    create_router(Arc::new(AppState::with_predictor(config, predictor())))
}

fn app_without_model(root: &std::path::Path) -> axum::Router {
    let config = ServerConfig::default().with_pipeline(PipelineConfig::default().with_root(root));
    create_router(Arc::new(AppState::new(config)))
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 64).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = app_with_model()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("\"ok\""));
}

#[tokio::test]
async fn test_root_serves_html() {
    let response = app_with_model()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("/predict.html"));
}

#[tokio::test]
async fn test_predict_form_page() {
    let response = app_with_model()
        .oneshot(Request::builder().uri("/predict.html").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("<form"));
}

#[tokio::test]
async fn test_predict_form_submit() {
    let response = app_with_model()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict.html")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("x=1&y=0&direction=NB"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("Predicted congestion"));
}

#[tokio::test]
async fn test_api_predict() {
    let response = app_with_model()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"x": 2, "y": 1, "direction": "EB"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: PredictResponse = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(body.prediction.is_finite());
}

#[tokio::test]
async fn test_api_predict_empty_direction() {
    let response = app_with_model()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"x": 2, "y": 1, "direction": " "}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_predict_without_model() {
    let dir = tempfile::tempdir().unwrap();
    let response = app_without_model(dir.path())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"x": 0, "y": 0, "direction": "NB"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_string(response).await.contains("\"error\":true"));
}

#[tokio::test]
async fn test_unknown_route() {
    let response = app_with_model()
        .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_newer_run_is_served_after_retraining() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = PipelineConfig::default().with_root(dir.path());
    let (mut train, mut test, preprocessor) = DataTransformation::new(pipeline.clone())
        .transform_frames(&readings(40), &readings(12))
        .unwrap();
    preprocessor.save(&pipeline.paths.preprocessor).unwrap();
    FeatureStore::new(&pipeline.paths).store(&mut train, &mut test).unwrap();

    let grid = ParamGrid::new().add("n_estimators", [5i64]).add("max_depth", [2i64]);
    let train_once = || {
        ModelTrainer::new(pipeline.clone(), TrainerConfig::default().with_grid(grid.clone()))
            .initiate()
            .unwrap();
    };
    let state = AppState::new(ServerConfig::default().with_pipeline(pipeline.clone()));

    train_once();
    let first = state.predictor().await.unwrap();
    assert_eq!(first.model_uri(), Some(format!("models:/{}/1", pipeline.model_name).as_str()));
    // unchanged registry reuses the cached predictor
    assert!(Arc::ptr_eq(&first, &state.predictor().await.unwrap()));

    train_once();
    let second = state.predictor().await.unwrap();
    let expected = format!("models:/{}/2", pipeline.model_name);
    assert_eq!(second.model_uri(), Some(expected.as_str()));
    assert_eq!(state.served_model_uri().await, Some(expected));
}
