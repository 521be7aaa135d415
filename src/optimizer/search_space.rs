//! Hyperparameter values and grids

use crate::error::{CongestionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl ParamValue {
    fn mismatch(&self, name: &str, expected: &str) -> CongestionError {
        CongestionError::InvalidParameter {
            name: name.to_string(),
            value: self.to_string(),
            reason: format!("expected {expected}"),
        }
    }

    pub fn as_float(&self, name: &str) -> Result<f64> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            _ => Err(self.mismatch(name, "a number")),
        }
    }

    /// Non-negative integer; integral floats are accepted
    pub fn as_usize(&self, name: &str) -> Result<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Ok(*v as usize),
            ParamValue::Float(v) if *v >= 0.0 && v.fract() == 0.0 => Ok(*v as usize),
            _ => Err(self.mismatch(name, "a non-negative integer")),
        }
    }

    pub fn as_bool(&self, name: &str) -> Result<bool> {
        match self {
            ParamValue::Bool(v) => Ok(*v),
            _ => Err(self.mismatch(name, "a boolean")),
        }
    }

    pub fn as_str(&self, name: &str) -> Result<&str> {
        match self {
            ParamValue::String(v) => Ok(v),
            _ => Err(self.mismatch(name, "a string")),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::String(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

/// Named hyperparameter assignment, ordered by name
pub type ParamMap = BTreeMap<String, ParamValue>;

/// Exhaustive search space: name -> ordered candidate values.
///
/// Enumeration order is canonical: names in lexicographic order, the first
/// name varying slowest, candidates in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    params: BTreeMap<String, Vec<ParamValue>>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the candidates of one hyperparameter
    pub fn add<V: Into<ParamValue>>(mut self, name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        self.params
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn candidates(&self, name: &str) -> Option<&[ParamValue]> {
        self.params.get(name).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Size of the Cartesian product
    pub fn n_candidates(&self) -> usize {
        if self.params.is_empty() {
            return 0;
        }
        self.params.values().map(Vec::len).product()
    }

    pub fn validate(&self) -> Result<()> {
        if self.params.is_empty() {
            return Err(CongestionError::SearchError("parameter grid is empty".to_string()));
        }
        if let Some((name, _)) = self.params.iter().find(|(_, v)| v.is_empty()) {
            return Err(CongestionError::SearchError(format!(
                "parameter '{name}' has no candidate values"
            )));
        }
        Ok(())
    }

    /// Every combination in canonical order
    pub fn combinations(&self) -> Vec<ParamMap> {
        if self.n_candidates() == 0 {
            return Vec::new();
        }
        let mut combos = vec![ParamMap::new()];
        for (name, values) in &self.params {
            combos = combos
                .into_iter()
                .flat_map(|base| {
                    values.iter().map(move |v| {
                        let mut next = base.clone();
                        next.insert(name.clone(), v.clone());
                        next
                    })
                })
                .collect();
        }
        combos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let grid = ParamGrid::new()
            .add("max_depth", [3i64, 5])
            .add("learning_rate", [0.1, 0.01]);
        let combos = grid.combinations();
        assert_eq!(combos.len(), 4);
        // learning_rate sorts first and varies slowest
        assert_eq!(combos[0]["learning_rate"], ParamValue::Float(0.1));
        assert_eq!(combos[0]["max_depth"], ParamValue::Int(3));
        assert_eq!(combos[1]["learning_rate"], ParamValue::Float(0.1));
        assert_eq!(combos[1]["max_depth"], ParamValue::Int(5));
        assert_eq!(combos[2]["learning_rate"], ParamValue::Float(0.01));
    }

    #[test]
    fn test_product_size() {
        let grid = ParamGrid::new()
            .add("a", [1i64, 2, 3])
            .add("b", [1i64, 2, 3])
            .add("c", [1i64, 2, 3]);
        assert_eq!(grid.n_candidates(), 27);
        assert_eq!(grid.combinations().len(), 27);
    }

    #[test]
    fn test_empty_candidates_rejected() {
        let grid = ParamGrid::new().add("a", Vec::<i64>::new());
        assert!(grid.validate().is_err());
        assert!(ParamGrid::new().validate().is_err());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(ParamValue::Int(3).as_float("x").unwrap(), 3.0);
        assert_eq!(ParamValue::Float(4.0).as_usize("x").unwrap(), 4);
        assert!(ParamValue::Float(4.5).as_usize("x").is_err());
        assert!(ParamValue::Int(-1).as_usize("x").is_err());
        assert!(ParamValue::from("gbtree").as_float("x").is_err());
    }

    #[test]
    fn test_untagged_json() {
        let map: ParamMap = serde_json::from_str(r#"{"learning_rate":0.1,"max_depth":3}"#).unwrap();
        assert_eq!(map["learning_rate"], ParamValue::Float(0.1));
        assert_eq!(map["max_depth"], ParamValue::Int(3));
    }
}
