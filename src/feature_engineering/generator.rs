//! Record- and frame-level feature generation

use super::spatial::x_y_direction;
use super::temporal::{am_pm, hour_cyclical, is_weekend, parse_timestamp, AmPm};
use super::{
    AM_PM, DIRECTION, DROPPED_COLUMNS, ENGINEERED_COLUMNS, HOUR, HOUR_COS, HOUR_SIN, IS_WEEKEND,
    TIME, X, X_Y_DIRECTION, Y,
};
use crate::error::{CongestionError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Days between 0001-01-01 and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// One raw observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub time: NaiveDateTime,
    pub x: i64,
    pub y: i64,
    pub direction: String,
}

/// Model-facing features of one observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeredRecord {
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub am_pm: AmPm,
    pub is_weekend: bool,
    pub x_y_direction: String,
}

impl RawRecord {
    pub fn new(time: NaiveDateTime, x: i64, y: i64, direction: impl Into<String>) -> Self {
        Self {
            time,
            x,
            y,
            direction: direction.into(),
        }
    }

    pub fn engineer(&self) -> EngineeredRecord {
        engineer_parts(self.time, self.x, self.y, &self.direction)
    }

    /// Frame with the raw columns; `time` is stored as microsecond datetimes
    pub fn to_dataframe(records: &[RawRecord]) -> Result<DataFrame> {
        let micros: Vec<i64> = records
            .iter()
            .map(|r| r.time.and_utc().timestamp_micros())
            .collect();
        let time = Series::new(TIME.into(), micros)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;

        let df = DataFrame::new(vec![
            time.into_column(),
            Column::new(X.into(), records.iter().map(|r| r.x).collect::<Vec<i64>>()),
            Column::new(Y.into(), records.iter().map(|r| r.y).collect::<Vec<i64>>()),
            Column::new(
                DIRECTION.into(),
                records.iter().map(|r| r.direction.as_str()).collect::<Vec<&str>>(),
            ),
        ])?;
        Ok(df)
    }
}

fn engineer_parts(time: NaiveDateTime, x: i64, y: i64, direction: &str) -> EngineeredRecord {
    let hour = time.hour();
    let (hour_sin, hour_cos) = hour_cyclical(hour);
    EngineeredRecord {
        hour_sin,
        hour_cos,
        am_pm: am_pm(hour),
        is_weekend: is_weekend(&time),
        x_y_direction: x_y_direction(x, y, direction),
    }
}

/// Replace the raw columns of `df` with the engineered ones.
///
/// Columns other than `{time, x, y, direction}` pass through first, in input
/// order, followed by `hour_sin`, `hour_cos`, `am_pm`, `is_weekend` and
/// `x_y_direction`. Every input value is validated before any output is built.
pub fn generate_features(df: &DataFrame) -> Result<DataFrame> {
    for name in ENGINEERED_COLUMNS.iter().chain(std::iter::once(&HOUR)) {
        if df.column(name).is_ok() {
            return Err(CongestionError::DataError(format!(
                "input already contains engineered column '{name}'"
            )));
        }
    }

    let times = timestamps(column_series(df, TIME)?)?;
    let xs = integers(column_series(df, X)?, X)?;
    let ys = integers(column_series(df, Y)?, Y)?;
    let directions = column_series(df, DIRECTION)?;
    let directions = match directions.dtype() {
        DataType::String => directions.str()?,
        other => {
            return Err(CongestionError::DataError(format!(
                "column '{DIRECTION}' must hold strings, found {other}"
            )))
        }
    };

    let n = df.height();
    let mut hour_sin = Vec::with_capacity(n);
    let mut hour_cos = Vec::with_capacity(n);
    let mut halves = Vec::with_capacity(n);
    let mut weekend = Vec::with_capacity(n);
    let mut keys = Vec::with_capacity(n);

    for (i, direction) in directions.into_iter().enumerate() {
        let direction = direction.ok_or_else(|| null_value(DIRECTION, i))?;
        let record = engineer_parts(times[i], xs[i], ys[i], direction);
        hour_sin.push(record.hour_sin);
        hour_cos.push(record.hour_cos);
        halves.push(record.am_pm.as_str());
        weekend.push(record.is_weekend);
        keys.push(record.x_y_direction);
    }

    let mut columns: Vec<Column> = df
        .get_columns()
        .iter()
        .filter(|c| !DROPPED_COLUMNS.contains(&c.name().as_str()))
        .cloned()
        .collect();
    columns.push(Column::new(HOUR_SIN.into(), hour_sin));
    columns.push(Column::new(HOUR_COS.into(), hour_cos));
    columns.push(Column::new(AM_PM.into(), halves));
    columns.push(Column::new(IS_WEEKEND.into(), weekend));
    columns.push(Column::new(X_Y_DIRECTION.into(), keys));

    let out = DataFrame::new(columns)?;
    debug!(rows = out.height(), columns = out.width(), "Generated features");
    Ok(out)
}

fn column_series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| CongestionError::FeatureNotFound(name.to_string()))
}

fn null_value(column: &str, row: usize) -> CongestionError {
    CongestionError::DataError(format!("column '{column}' has a null value at row {row}"))
}

fn timestamps(series: &Series) -> Result<Vec<NaiveDateTime>> {
    match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .enumerate()
            .map(|(i, v)| parse_timestamp(v.ok_or_else(|| null_value(TIME, i))?))
            .collect(),
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let physical = series.cast(&DataType::Int64)?;
            physical
                .i64()?
                .into_iter()
                .enumerate()
                .map(|(i, v)| from_epoch(v.ok_or_else(|| null_value(TIME, i))?, unit))
                .collect()
        }
        DataType::Date => {
            let physical = series.cast(&DataType::Int32)?;
            physical
                .i32()?
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    let days = v.ok_or_else(|| null_value(TIME, i))?;
                    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                        .and_then(NaiveDate::from_num_days_from_ce_opt)
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .ok_or_else(|| CongestionError::DataError(format!("date out of range at row {i}")))
                })
                .collect()
        }
        other => Err(CongestionError::DataError(format!(
            "column '{TIME}' must be a timestamp or string, found {other}"
        ))),
    }
}

fn from_epoch(value: i64, unit: TimeUnit) -> Result<NaiveDateTime> {
    let per_second: i64 = match unit {
        TimeUnit::Nanoseconds => 1_000_000_000,
        TimeUnit::Microseconds => 1_000_000,
        TimeUnit::Milliseconds => 1_000,
    };
    let secs = value.div_euclid(per_second);
    let nanos = (value.rem_euclid(per_second) * (1_000_000_000 / per_second)) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| CongestionError::DataError(format!("timestamp {value} out of range")))
}

fn integers(series: &Series, name: &str) -> Result<Vec<i64>> {
    match series.dtype() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let cast = series.strict_cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .enumerate()
                .map(|(i, v)| v.ok_or_else(|| null_value(name, i)))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = series.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    let v = v.ok_or_else(|| null_value(name, i))?;
                    if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 {
                        Ok(v as i64)
                    } else {
                        Err(CongestionError::DataError(format!(
                            "column '{name}' has non-integer value {v} at row {i}"
                        )))
                    }
                })
                .collect()
        }
        other => Err(CongestionError::DataError(format!(
            "column '{name}' must hold integers, found {other}"
        ))),
    }
}
