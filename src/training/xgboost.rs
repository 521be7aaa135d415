//! XGBoost-style gradient boosting with second-order approximation
//!
//! - Uses both gradient (first derivative) and hessian (second derivative) of loss
//! - Regularized leaf weights: w* = -G / (H + lambda)
//! - Gain-based split scoring: Gain = 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)] - γ
//! - L1 (alpha) and L2 (lambda) regularization, minimum child weight
//!
//! Trees are grown depth-first to `max_depth` (depthwise policy) with the exact
//! greedy split finder.

use super::models::Regressor;
use crate::error::{CongestionError, Result};
use crate::optimizer::{ParamMap, ParamValue};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Training loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Objective {
    /// `reg:squarederror`
    #[default]
    SquaredError,
}

/// Base learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Booster {
    #[default]
    GbTree,
}

/// Order in which tree nodes are expanded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GrowPolicy {
    /// Split every node level by level up to `max_depth`
    #[default]
    Depthwise,
}

/// XGBoost configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XGBoostConfig {
    pub objective: Objective,
    pub booster: Booster,
    pub grow_policy: GrowPolicy,
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: Option<u64>,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            objective: Objective::SquaredError,
            booster: Booster::GbTree,
            grow_policy: GrowPolicy::Depthwise,
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: Some(42),
        }
    }
}

impl XGBoostConfig {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let check = |name: &str, value: f64, ok: bool, reason: &str| {
            if ok {
                Ok(())
            } else {
                Err(CongestionError::InvalidParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                    reason: reason.to_string(),
                })
            }
        };
        check("n_estimators", self.n_estimators as f64, self.n_estimators >= 1, "must be at least 1")?;
        check("learning_rate", self.learning_rate, self.learning_rate > 0.0, "must be positive")?;
        check("max_depth", self.max_depth as f64, self.max_depth >= 1, "must be at least 1")?;
        check("min_child_weight", self.min_child_weight, self.min_child_weight >= 0.0, "must be non-negative")?;
        check("reg_lambda", self.reg_lambda, self.reg_lambda >= 0.0, "must be non-negative")?;
        check("reg_alpha", self.reg_alpha, self.reg_alpha >= 0.0, "must be non-negative")?;
        check("gamma", self.gamma, self.gamma >= 0.0, "must be non-negative")?;
        check("subsample", self.subsample, self.subsample > 0.0 && self.subsample <= 1.0, "must be in (0, 1]")?;
        check(
            "colsample_bytree",
            self.colsample_bytree,
            self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0,
            "must be in (0, 1]",
        )
    }
}

/// A single node in the XGBoost tree
#[derive(Debug, Clone, Serialize, Deserialize)]
enum XGBNode {
    Leaf { weight: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<XGBNode>,
        right: Box<XGBNode>,
    },
}

impl XGBNode {
    fn predict(&self, sample: &ArrayView1<f64>) -> f64 {
        match self {
            XGBNode::Leaf { weight } => *weight,
            XGBNode::Split { feature, threshold, left, right } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Build an XGBoost tree using exact greedy split finding
fn build_xgb_tree(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature_indices: &[usize],
    depth: usize,
    config: &XGBoostConfig,
) -> XGBNode {
    let g_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| hess[i]).sum();
    let leaf_weight = compute_leaf_weight(g_sum, h_sum, config.reg_lambda, config.reg_alpha);

    if depth >= config.max_depth || indices.len() < 2 || h_sum < config.min_child_weight {
        return XGBNode::Leaf { weight: leaf_weight };
    }

    let best = feature_indices
        .par_iter()
        .filter_map(|&f| find_best_split_for_feature(x, grad, hess, indices, f, config))
        .max_by(|a, b| a.gain.partial_cmp(&b.gain).unwrap_or(Ordering::Equal));

    match best {
        Some(split) if split.gain > config.gamma => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, split.feature]] <= split.threshold);

            if left_idx.is_empty() || right_idx.is_empty() {
                return XGBNode::Leaf { weight: leaf_weight };
            }

            let left = build_xgb_tree(x, grad, hess, &left_idx, feature_indices, depth + 1, config);
            let right = build_xgb_tree(x, grad, hess, &right_idx, feature_indices, depth + 1, config);

            XGBNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => XGBNode::Leaf { weight: leaf_weight },
    }
}

/// Optimal leaf weight with L1 (alpha) and L2 (lambda) regularization
fn compute_leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    let g_adj = if g_sum > alpha {
        g_sum - alpha
    } else if g_sum < -alpha {
        g_sum + alpha
    } else {
        return 0.0;
    };
    -g_adj / (h_sum + lambda)
}

/// Find best split for a single feature using exact greedy method
fn find_best_split_for_feature(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature: usize,
    config: &XGBoostConfig,
) -> Option<SplitCandidate> {
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_by(|&a, &b| {
        x[[a, feature]]
            .partial_cmp(&x[[b, feature]])
            .unwrap_or(Ordering::Equal)
    });

    let g_total: f64 = sorted.iter().map(|&i| grad[i]).sum();
    let h_total: f64 = sorted.iter().map(|&i| hess[i]).sum();
    let lambda = config.reg_lambda;
    let parent_score = (g_total * g_total) / (h_total + lambda);

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<SplitCandidate> = None;

    for pos in 0..sorted.len() - 1 {
        let idx = sorted[pos];
        let next = sorted[pos + 1];
        g_left += grad[idx];
        h_left += hess[idx];

        // No threshold separates identical values
        if (x[[idx, feature]] - x[[next, feature]]).abs() < 1e-12 {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;
        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5
            * ((g_left * g_left) / (h_left + lambda) + (g_right * g_right) / (h_right + lambda)
                - parent_score);

        if best.map_or(true, |b| gain > b.gain) {
            best = Some(SplitCandidate {
                feature,
                threshold: (x[[idx, feature]] + x[[next, feature]]) / 2.0,
                gain,
            });
        }
    }

    best
}

/// XGBoost Regressor (squared error loss)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostRegressor {
    config: XGBoostConfig,
    trees: Vec<XGBNode>,
    base_score: f64,
    n_features: usize,
    is_fitted: bool,
}

impl Default for XGBoostRegressor {
    fn default() -> Self {
        Self::new(XGBoostConfig::default())
    }
}

impl XGBoostRegressor {
    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &XGBoostConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn raw_prediction(&self, sample: &ArrayView1<f64>) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + self.config.learning_rate * tree.predict(sample))
    }
}

impl Regressor for XGBoostRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(CongestionError::ShapeError {
                expected: format!("{n_samples} target values"),
                actual: y.len().to_string(),
            });
        }
        if n_samples == 0 || n_features == 0 {
            return Err(CongestionError::TrainingError(format!(
                "cannot fit on a {n_samples}x{n_features} matrix"
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(CongestionError::TrainingError(
                "training data contains non-finite values".to_string(),
            ));
        }

        let base_score = y.mean().unwrap_or(0.0);
        let mut preds = Array1::from_elem(n_samples, base_score);
        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut trees = Vec::with_capacity(self.config.n_estimators);
        for _ in 0..self.config.n_estimators {
            // Squared error: grad = pred - y, hess = 1
            let grad: Array1<f64> = &preds - y;
            let hess = Array1::from_elem(n_samples, 1.0);

            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_indices = subsample(&mut rng, n_features, self.config.colsample_bytree);

            let tree = build_xgb_tree(x, &grad, &hess, &row_indices, &col_indices, 0, &self.config);
            for (i, row) in x.rows().into_iter().enumerate() {
                preds[i] += self.config.learning_rate * tree.predict(&row);
            }
            trees.push(tree);
        }

        self.trees = trees;
        self.base_score = base_score;
        self.n_features = n_features;
        self.is_fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(CongestionError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(CongestionError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: x.ncols().to_string(),
            });
        }
        Ok(x.rows().into_iter().map(|row| self.raw_prediction(&row)).collect())
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        let c = &mut self.config;
        match name {
            "n_estimators" => c.n_estimators = value.as_usize(name)?,
            "learning_rate" => c.learning_rate = value.as_float(name)?,
            "max_depth" => c.max_depth = value.as_usize(name)?,
            "min_child_weight" => c.min_child_weight = value.as_float(name)?,
            "reg_lambda" => c.reg_lambda = value.as_float(name)?,
            "reg_alpha" => c.reg_alpha = value.as_float(name)?,
            "gamma" => c.gamma = value.as_float(name)?,
            "subsample" => c.subsample = value.as_float(name)?,
            "colsample_bytree" => c.colsample_bytree = value.as_float(name)?,
            "random_state" => c.random_state = Some(value.as_usize(name)? as u64),
            _ => {
                return Err(CongestionError::InvalidParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                    reason: "not a hyperparameter of XGBoostRegressor".to_string(),
                })
            }
        }
        Ok(())
    }

    fn params(&self) -> ParamMap {
        let c = &self.config;
        let mut params = ParamMap::new();
        params.insert("n_estimators".into(), ParamValue::Int(c.n_estimators as i64));
        params.insert("learning_rate".into(), ParamValue::Float(c.learning_rate));
        params.insert("max_depth".into(), ParamValue::Int(c.max_depth as i64));
        params.insert("min_child_weight".into(), ParamValue::Float(c.min_child_weight));
        params.insert("reg_lambda".into(), ParamValue::Float(c.reg_lambda));
        params.insert("reg_alpha".into(), ParamValue::Float(c.reg_alpha));
        params.insert("gamma".into(), ParamValue::Float(c.gamma));
        params.insert("subsample".into(), ParamValue::Float(c.subsample));
        params.insert("colsample_bytree".into(), ParamValue::Float(c.colsample_bytree));
        if let Some(seed) = c.random_state {
            params.insert("random_state".into(), ParamValue::Int(seed as i64));
        }
        params
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil().max(1.0) as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}
