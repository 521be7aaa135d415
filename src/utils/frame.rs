//! DataFrame to ndarray conversion

use crate::error::{CongestionError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// True for dtypes that convert losslessly enough to `f64` for modelling
pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Boolean
    )
}

/// Values of a numeric column as `f64`; nulls are rejected
pub fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| CongestionError::FeatureNotFound(name.to_string()))?;
    if !is_numeric(column.dtype()) {
        return Err(CongestionError::DataError(format!(
            "column '{name}' is not numeric ({})",
            column.dtype()
        )));
    }

    let cast = column.cast(&DataType::Float64)?;
    cast.as_materialized_series().f64()?
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.ok_or_else(|| {
                CongestionError::DataError(format!("column '{name}' has a null value at row {i}"))
            })
        })
        .collect()
}

pub fn column_to_array1(df: &DataFrame, name: &str) -> Result<Array1<f64>> {
    Ok(Array1::from_vec(column_values(df, name)?))
}

/// Row-major matrix of the named columns, in the given order
pub fn columns_to_array2(df: &DataFrame, names: &[String]) -> Result<Array2<f64>> {
    let data = names
        .iter()
        .map(|name| column_values(df, name))
        .collect::<Result<Vec<Vec<f64>>>>()?;

    Ok(Array2::from_shape_fn((df.height(), names.len()), |(r, c)| data[c][r]))
}

/// Split a frame into a feature matrix and the target vector
pub fn split_features_target(
    df: &DataFrame,
    target: &str,
) -> Result<(Array2<f64>, Array1<f64>, Vec<String>)> {
    let y = column_to_array1(df, target)?;
    let feature_names: Vec<String> = df
        .get_column_names()
        .iter()
        .filter(|n| n.as_str() != target)
        .map(|n| n.to_string())
        .collect();
    if feature_names.is_empty() {
        return Err(CongestionError::DataError(
            "frame has no feature columns besides the target".to_string(),
        ));
    }
    let x = columns_to_array2(df, &feature_names)?;
    Ok((x, y, feature_names))
}
