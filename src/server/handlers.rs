//! Request handlers

use std::sync::Arc;
use axum::{extract::State, response::Html, Form, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{Result, ServerError};
use super::state::AppState;
use crate::inference::{CustomData, PredictionOutput};

/// JSON body of `POST /api/predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub x: i64,
    pub y: i64,
    pub direction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: f64,
}

/// Fields of the prediction form
#[derive(Debug, Clone, Deserialize)]
pub struct PredictForm {
    pub x: i64,
    pub y: i64,
    pub direction: String,
}

async fn predict_reading(state: &AppState, x: i64, y: i64, direction: &str) -> Result<f64> {
    let direction = direction.trim();
    if direction.is_empty() {
        return Err(ServerError::BadRequest("direction must not be empty".to_string()));
    }

    let predictor = state.predictor().await?;
    let data = CustomData::new(x, y, direction);
    let value = match predictor.predict_one(&data)? {
        PredictionOutput::Prediction(values) => values.first().copied(),
        PredictionOutput::Transformed(_) => None,
    };
    let value = value.ok_or_else(|| ServerError::Internal("predictor returned no value".to_string()))?;

    info!(x, y, direction = %direction, prediction = value, "Prediction served");
    Ok(value)
}

// ============================================================================
// API Handlers
// ============================================================================

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>> {
    let prediction = predict_reading(&state, request.x, request.y, &request.direction).await?;
    Ok(Json(PredictResponse { prediction }))
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ============================================================================
// UI Handlers
// ============================================================================

pub async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn serve_predict_form() -> Html<String> {
    Html(render_predict_page(None))
}

pub async fn predict_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<PredictForm>,
) -> Result<Html<String>> {
    let prediction = predict_reading(&state, form.x, form.y, &form.direction).await?;
    let result = format!(
        "Predicted congestion at ({}, {}) heading {}: <strong>{:.2}</strong>",
        form.x,
        form.y,
        escape_html(form.direction.trim()),
        prediction
    );
    Ok(Html(render_predict_page(Some(&result))))
}

fn render_predict_page(result: Option<&str>) -> String {
    let result = result
        .map(|r| format!(r#"<p class="result">{r}</p>"#))
        .unwrap_or_default();
    PREDICT_HTML.replace("{{result}}", &result)
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Congestion Forecast</title>
    <style>body{font-family:sans-serif;max-width:40rem;margin:3rem auto;padding:0 1rem}</style>
</head>
<body>
    <h1>Traffic Congestion Forecast</h1>
    <p>Predict congestion for a roadway location and direction of travel at the current time.</p>
    <p><a href="/predict.html">Make a prediction</a></p>
</body>
</html>
"#;

const PREDICT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Congestion Forecast - Predict</title>
    <style>body{font-family:sans-serif;max-width:40rem;margin:3rem auto;padding:0 1rem}label{display:block;margin-top:1rem}.result{margin-top:2rem;font-size:1.2rem}</style>
</head>
<body>
    <h1>Predict Congestion</h1>
    <form method="post" action="/predict.html">
        <label>X coordinate <input type="number" name="x" required></label>
        <label>Y coordinate <input type="number" name="y" required></label>
        <label>Direction
            <select name="direction">
                <option>EB</option><option>NB</option><option>SB</option><option>WB</option>
                <option>NE</option><option>SW</option><option>NW</option><option>SE</option>
            </select>
        </label>
        <p><button type="submit">Predict</button></p>
    </form>
    {{result}}
    <p><a href="/">Home</a></p>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"N\"</b>"), "&lt;b&gt;&quot;N&quot;&lt;/b&gt;");
    }

    #[test]
    fn test_render_predict_page() {
        assert!(!render_predict_page(None).contains("{{result}}"));
        assert!(render_predict_page(Some("42")).contains(r#"<p class="result">42</p>"#));
    }
}
