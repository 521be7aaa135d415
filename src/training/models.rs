//! Estimator trait used by the model search

use crate::error::Result;
use crate::optimizer::{ParamMap, ParamValue};
use ndarray::{Array1, Array2};

/// A regressor whose hyperparameters can be set by name.
///
/// Grid search clones a template per (candidate, fold), so implementors must
/// be cheap to clone before fitting and safe to move across threads.
pub trait Regressor: Clone + Send + Sync {
    /// Fit the model to training data, replacing any previous fit
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Set one hyperparameter; unknown names and bad values are errors
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()>;

    /// Current hyperparameters
    fn params(&self) -> ParamMap;

    fn is_fitted(&self) -> bool;

    /// Apply every entry of `params`
    fn set_params(&mut self, params: &ParamMap) -> Result<()> {
        for (name, value) in params {
            self.set_param(name, value)?;
        }
        Ok(())
    }
}
