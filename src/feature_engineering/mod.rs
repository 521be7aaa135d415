//! Feature engineering for congestion records
//!
//! Turns raw `{time, x, y, direction}` observations into the model's
//! engineered features. Batch frames and single records run through the same
//! per-value functions, so training and inference cannot drift apart.
//!
//! - [`temporal`] - hour extraction, cyclical hour encoding, AM/PM, weekend flag
//! - [`spatial`] - the `x_y_direction` composite key
//! - [`generator`] - typed records and the DataFrame entry point

pub mod generator;
pub mod spatial;
pub mod temporal;

pub use generator::{generate_features, EngineeredRecord, RawRecord};
pub use spatial::{x_y_direction, COMPOSITE_KEY_DELIMITER};
pub use temporal::{am_pm, hour_cyclical, is_weekend, parse_timestamp, AmPm};

/// Raw input columns
pub const TIME: &str = "time";
pub const X: &str = "x";
pub const Y: &str = "y";
pub const DIRECTION: &str = "direction";
/// Intermediate column, never present in output
pub const HOUR: &str = "hour";

/// Engineered output columns
pub const HOUR_SIN: &str = "hour_sin";
pub const HOUR_COS: &str = "hour_cos";
pub const AM_PM: &str = "am_pm";
pub const IS_WEEKEND: &str = "is_weekend";
pub const X_Y_DIRECTION: &str = "x_y_direction";

pub const RAW_COLUMNS: [&str; 4] = [TIME, X, Y, DIRECTION];
pub const DROPPED_COLUMNS: [&str; 5] = [TIME, HOUR, X, Y, DIRECTION];
pub const ENGINEERED_COLUMNS: [&str; 5] = [HOUR_SIN, HOUR_COS, AM_PM, IS_WEEKEND, X_Y_DIRECTION];
