//! Single observation submitted for prediction

use crate::error::Result;
use crate::feature_engineering::RawRecord;
use chrono::{Local, NaiveDateTime};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// One location/direction reading; the timestamp is captured when the
/// record is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomData {
    pub x: i64,
    pub y: i64,
    pub direction: String,
    pub time: NaiveDateTime,
}

impl CustomData {
    /// Stamp the reading with the current local time
    pub fn new(x: i64, y: i64, direction: impl Into<String>) -> Self {
        Self::at(Local::now().naive_local(), x, y, direction)
    }

    pub fn at(time: NaiveDateTime, x: i64, y: i64, direction: impl Into<String>) -> Self {
        Self {
            x,
            y,
            direction: direction.into(),
            time,
        }
    }

    pub fn to_record(&self) -> RawRecord {
        RawRecord::new(self.time, self.x, self.y, self.direction.clone())
    }

    /// One-row frame with the raw columns
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        RawRecord::to_dataframe(&[self.to_record()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_single_row_frame() {
        let time = NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(14, 30, 0))
            .unwrap();
        let df = CustomData::at(time, 1, 2, "N").to_dataframe().unwrap();
        assert_eq!(df.shape(), (1, 4));
        assert_eq!(df.column("direction").unwrap().str().unwrap().get(0), Some("N"));
    }

    #[test]
    fn test_new_captures_now() {
        let before = Local::now().naive_local();
        let data = CustomData::new(0, 0, "EB");
        assert!(data.time >= before);
    }
}
