//! Hyperparameter search
//!
//! Exhaustive grid search with k-fold cross-validation. Every (combination,
//! fold) fit runs on a rayon pool; results are gathered in canonical grid
//! order, so the winner never depends on scheduling.

mod config;
mod search;
mod search_space;

pub use config::{Scoring, SearchConfig};
pub use search::{CandidateResult, GridSearchCV, SearchResult};
pub use search_space::{ParamGrid, ParamMap, ParamValue};
