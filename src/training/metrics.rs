//! Regression metrics

use crate::error::{CongestionError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(CongestionError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: y_pred.len().to_string(),
        });
    }
    if y_true.is_empty() {
        return Err(CongestionError::DataError("cannot score an empty sample".to_string()));
    }
    Ok(())
}

pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let sse: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    Ok(sse / y_true.len() as f64)
}

/// Search score: higher is better
pub fn neg_mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    Ok(-mean_squared_error(y_true, y_pred)?)
}

/// Held-out evaluation of a trained regressor
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        let mse = mean_squared_error(y_true, y_pred)?;
        let n = y_true.len() as f64;
        let mae = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum::<f64>() / n;

        let mean = y_true.sum() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - mean).powi(2)).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - mse * n / ss_tot } else { 0.0 };

        Ok(Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r2,
            n_samples: y_true.len(),
        })
    }
}
