//! Exhaustive grid search with k-fold cross-validation

use super::config::{Scoring, SearchConfig};
use super::search_space::{ParamGrid, ParamMap};
use crate::error::{CongestionError, Result, ResultExt};
use crate::training::cross_validation::CrossValidator;
use crate::training::metrics::neg_mean_squared_error;
use crate::training::Regressor;
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Cross-validated score of one grid combination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub params: ParamMap,
    /// Held-out score per fold, in fold order
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    /// 1 for the best mean score; equal means share a rank
    pub rank: usize,
}

/// Outcome of a grid search
#[derive(Debug, Clone)]
pub struct SearchResult<R> {
    /// Winning configuration refit on the full training set
    pub best_estimator: R,
    pub best_params: ParamMap,
    pub best_score: f64,
    pub best_index: usize,
    /// One entry per combination, in canonical grid order
    pub cv_results: Vec<CandidateResult>,
    /// Number of fold-averaged evaluations (one per combination)
    pub n_evaluations: usize,
    /// Fits performed, including the final refit
    pub n_fits: usize,
    pub elapsed_secs: f64,
}

struct Fold {
    x_train: Array2<f64>,
    y_train: Array1<f64>,
    x_test: Array2<f64>,
    y_test: Array1<f64>,
}

/// Grid search over clones of an estimator template
#[derive(Debug, Clone)]
pub struct GridSearchCV<R: Regressor> {
    estimator: R,
    grid: ParamGrid,
    config: SearchConfig,
}

impl<R: Regressor> GridSearchCV<R> {
    pub fn new(estimator: R, grid: ParamGrid) -> Self {
        Self::with_config(estimator, grid, SearchConfig::default())
    }

    pub fn with_config(estimator: R, grid: ParamGrid, config: SearchConfig) -> Self {
        Self { estimator, grid, config }
    }

    pub fn grid(&self) -> &ParamGrid {
        &self.grid
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Evaluate every combination on every fold and refit the winner.
    ///
    /// Any failed fit aborts the whole search.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<SearchResult<R>> {
        self.config.validate()?;
        self.grid.validate()?;
        if x.nrows() != y.len() {
            return Err(CongestionError::ShapeError {
                expected: format!("{} target values", x.nrows()),
                actual: y.len().to_string(),
            });
        }

        let start = Instant::now();
        let candidates = self.grid.combinations();
        let templates = candidates
            .iter()
            .map(|params| {
                let mut estimator = self.estimator.clone();
                estimator.set_params(params)?;
                Ok(estimator)
            })
            .collect::<Result<Vec<R>>>()?;

        let splits = CrossValidator::k_fold(self.config.cv_folds).split(x.nrows())?;
        let folds: Vec<Fold> = splits
            .iter()
            .map(|s| Fold {
                x_train: x.select(Axis(0), &s.train_indices),
                y_train: y.select(Axis(0), &s.train_indices),
                x_test: x.select(Axis(0), &s.test_indices),
                y_test: y.select(Axis(0), &s.test_indices),
            })
            .collect();

        let n_folds = folds.len();
        let tasks: Vec<(usize, usize)> = (0..templates.len())
            .flat_map(|c| (0..n_folds).map(move |f| (c, f)))
            .collect();

        info!(
            candidates = templates.len(),
            folds = n_folds,
            fits = tasks.len() + 1,
            "Starting grid search"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.n_jobs.unwrap_or(0))
            .build()
            .map_err(|e| CongestionError::SearchError(format!("cannot build worker pool: {e}")))?;

        let scoring = self.config.scoring;
        let scores: Vec<f64> = pool.install(|| {
            tasks
                .par_iter()
                .map(|&(c, f)| {
                    evaluate(&templates[c], &folds[f], scoring)
                        .context(format!("candidate {c} fold {f}"))
                })
                .collect::<Result<Vec<f64>>>()
        })?;

        let mut cv_results: Vec<CandidateResult> = candidates
            .into_iter()
            .zip(scores.chunks(n_folds))
            .map(|(params, fold_scores)| {
                let mean = fold_scores.iter().sum::<f64>() / n_folds as f64;
                let var = fold_scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n_folds as f64;
                CandidateResult {
                    params,
                    fold_scores: fold_scores.to_vec(),
                    mean_score: mean,
                    std_score: var.sqrt(),
                    rank: 0,
                }
            })
            .collect();

        let best_index = select_best(&cv_results)?;
        assign_ranks(&mut cv_results);
        for (i, r) in cv_results.iter().enumerate() {
            debug!(candidate = i, params = ?r.params, mean_score = r.mean_score, rank = r.rank, "Candidate scored");
        }

        let mut best_estimator = templates[best_index].clone();
        best_estimator.fit(x, y).context("refit best candidate")?;

        let best_params = cv_results[best_index].params.clone();
        let best_score = cv_results[best_index].mean_score;
        let result = SearchResult {
            best_params,
            best_score,
            best_index,
            n_evaluations: cv_results.len(),
            n_fits: tasks.len() + 1,
            elapsed_secs: start.elapsed().as_secs_f64(),
            best_estimator,
            cv_results,
        };

        info!(
            best_params = ?result.best_params,
            best_score = result.best_score,
            elapsed_secs = result.elapsed_secs,
            "Grid search finished"
        );
        Ok(result)
    }
}

fn evaluate<R: Regressor>(template: &R, fold: &Fold, scoring: Scoring) -> Result<f64> {
    let mut estimator = template.clone();
    estimator.fit(&fold.x_train, &fold.y_train)?;
    let pred = estimator.predict(&fold.x_test)?;
    let score = match scoring {
        Scoring::NegMeanSquaredError => neg_mean_squared_error(&fold.y_test, &pred)?,
    };
    if !score.is_finite() {
        return Err(CongestionError::SearchError(format!("non-finite fold score {score}")));
    }
    Ok(score)
}

/// Highest mean score; the earliest candidate wins ties
fn select_best(results: &[CandidateResult]) -> Result<usize> {
    let mut best: Option<usize> = None;
    for (i, r) in results.iter().enumerate() {
        if best.map_or(true, |b| r.mean_score > results[b].mean_score) {
            best = Some(i);
        }
    }
    best.ok_or_else(|| CongestionError::SearchError("no candidates were evaluated".to_string()))
}

fn assign_ranks(results: &mut [CandidateResult]) {
    let means: Vec<f64> = results.iter().map(|r| r.mean_score).collect();
    for r in results.iter_mut() {
        r.rank = 1 + means.iter().filter(|&&m| m > r.mean_score).count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::ParamValue;
    use crate::training::xgboost::{XGBoostConfig, XGBoostRegressor};

    /// Predicts a constant; its error depends only on `offset`
    #[derive(Debug, Clone)]
    struct ConstantRegressor {
        offset: f64,
        mean: Option<f64>,
    }

    impl Regressor for ConstantRegressor {
        fn fit(&mut self, _x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
            self.mean = y.mean();
            Ok(())
        }

        fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            let m = self.mean.ok_or(CongestionError::ModelNotFitted)?;
            Ok(Array1::from_elem(x.nrows(), m + self.offset))
        }

        fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
            match name {
                "offset" => self.offset = value.as_float(name)?,
                "fail" if value.as_bool(name)? => self.offset = f64::NAN,
                "fail" => {}
                _ => {
                    return Err(CongestionError::InvalidParameter {
                        name: name.into(),
                        value: value.to_string(),
                        reason: "unknown".into(),
                    })
                }
            }
            Ok(())
        }

        fn params(&self) -> ParamMap {
            ParamMap::from([("offset".to_string(), ParamValue::Float(self.offset))])
        }

        fn is_fitted(&self) -> bool {
            self.mean.is_some()
        }
    }

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| (i * (j + 1)) as f64);
        let y = Array1::from_shape_fn(30, |i| (i % 7) as f64);
        (x, y)
    }

    fn constant() -> ConstantRegressor {
        ConstantRegressor { offset: 0.0, mean: None }
    }

    #[test]
    fn test_picks_lowest_error() {
        let (x, y) = data();
        let grid = ParamGrid::new().add("offset", [3.0, 0.0, -2.0]);
        let result = GridSearchCV::new(constant(), grid).fit(&x, &y).unwrap();
        assert_eq!(result.best_params["offset"], ParamValue::Float(0.0));
        assert_eq!(result.best_index, 1);
        assert_eq!(result.cv_results[1].rank, 1);
        assert_eq!(result.n_evaluations, 3);
        assert_eq!(result.n_fits, 10);
    }

    #[test]
    fn test_ties_go_to_first_candidate() {
        let (x, _) = data();
        let y = Array1::from_elem(30, 2.0);
        // +1 and -1 offsets give identical squared error on a constant target
        let grid = ParamGrid::new().add("offset", [1.0, -1.0]);
        let result = GridSearchCV::new(constant(), grid).fit(&x, &y).unwrap();
        assert_eq!(result.best_index, 0);
        assert_eq!(result.cv_results[0].rank, 1);
        assert_eq!(result.cv_results[1].rank, 1);
    }

    #[test]
    fn test_failure_aborts_search() {
        let (x, y) = data();
        let grid = ParamGrid::new().add("fail", [false, true]);
        let err = GridSearchCV::new(constant(), grid).fit(&x, &y).unwrap_err();
        assert!(matches!(err.root_cause(), CongestionError::SearchError(_)));
    }

    #[test]
    fn test_unknown_param_rejected_before_fitting() {
        let (x, y) = data();
        let grid = ParamGrid::new().add("nope", [1i64]);
        assert!(matches!(
            GridSearchCV::new(constant(), grid).fit(&x, &y),
            Err(CongestionError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_parallelism_does_not_change_result() {
        let (x, y) = data();
        let grid = ParamGrid::new()
            .add("learning_rate", [0.1, 0.3])
            .add("max_depth", [1i64, 2]);
        let template = XGBoostRegressor::new(XGBoostConfig::default().with_n_estimators(5));

        let serial = GridSearchCV::with_config(template.clone(), grid.clone(), SearchConfig::default().with_n_jobs(1))
            .fit(&x, &y)
            .unwrap();
        let parallel = GridSearchCV::with_config(template, grid, SearchConfig::default().with_n_jobs(4))
            .fit(&x, &y)
            .unwrap();

        assert_eq!(serial.best_index, parallel.best_index);
        for (a, b) in serial.cv_results.iter().zip(&parallel.cv_results) {
            assert_eq!(a.fold_scores, b.fold_scores);
        }
    }
}
