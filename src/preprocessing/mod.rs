//! Data preprocessing module
//!
//! Encodes engineered features into a numeric design matrix:
//! - One-hot encoding of low-cardinality categoricals (`am_pm`, `is_weekend`)
//! - Target-mean encoding of the high-cardinality location key
//! - Passthrough of the remaining numeric columns

mod config;
mod encoder;
mod pipeline;

pub use config::{PreprocessingConfig, UnknownCategoryPolicy};
pub use encoder::{CategoricalEncoder, MeanEncoder, OneHotEncoder, MEAN_PREFIX, ONEHOT_PREFIX};
pub use pipeline::{DataPreprocessor, FORMAT_VERSION, REMAINDER_PREFIX};
