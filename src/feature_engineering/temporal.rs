//! Time-derived features

use crate::error::{CongestionError, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Accepted layouts for string timestamps, tried in order before RFC 3339
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Date-only strings are read as midnight
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Half of the day an hour falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmPm {
    AM,
    PM,
}

impl AmPm {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmPm::AM => "AM",
            AmPm::PM => "PM",
        }
    }
}

impl fmt::Display for AmPm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(sin(2π·hour/24), cos(2π·hour/24))`; hour 23 and hour 0 end up adjacent
pub fn hour_cyclical(hour: u32) -> (f64, f64) {
    let angle = 2.0 * PI * f64::from(hour) / 24.0;
    (angle.sin(), angle.cos())
}

/// PM for hours 12 through 23
pub fn am_pm(hour: u32) -> AmPm {
    if (12..=23).contains(&hour) {
        AmPm::PM
    } else {
        AmPm::AM
    }
}

/// Saturday or Sunday (weekday index above 4 with Monday = 0)
pub fn is_weekend<D: Datelike>(date: &D) -> bool {
    date.weekday().num_days_from_monday() > 4
}

/// Parse a string timestamp into a naive wall-clock time.
///
/// RFC 3339 inputs keep the wall-clock hour of their own offset.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .map_err(|_| CongestionError::DataError(format!("unparsable timestamp '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_cyclical_unit_circle() {
        for hour in 0..24 {
            let (s, c) = hour_cyclical(hour);
            assert!((s * s + c * c - 1.0).abs() < 1e-12, "hour {hour}");
        }
    }

    #[test]
    fn test_cyclical_known_values() {
        let (s, c) = hour_cyclical(6);
        assert!((s - 1.0).abs() < 1e-12);
        assert!(c.abs() < 1e-12);
        let (s, c) = hour_cyclical(0);
        assert!(s.abs() < 1e-12);
        assert!((c - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_am_pm_boundaries() {
        assert_eq!(am_pm(0), AmPm::AM);
        assert_eq!(am_pm(11), AmPm::AM);
        assert_eq!(am_pm(12), AmPm::PM);
        assert_eq!(am_pm(23), AmPm::PM);
    }

    #[test]
    fn test_is_weekend() {
        // 2024-01-13 is a Saturday
        let sat = NaiveDate::from_ymd_opt(2024, 1, 13).unwrap();
        let sun = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        let mon = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let fri = NaiveDate::from_ymd_opt(2024, 1, 19).unwrap();
        assert!(is_weekend(&sat));
        assert!(is_weekend(&sun));
        assert!(!is_weekend(&mon));
        assert!(!is_weekend(&fri));
    }

    #[test]
    fn test_parse_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-01-15 14:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-15T14:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-15T14:30:00+02:00").unwrap(), expected);

        let frac = parse_timestamp("2024-01-15 14:30:00.250").unwrap();
        assert_eq!(frac.hour(), 14);
    }

    #[test]
    fn test_parse_date_only_as_midnight() {
        let ts = parse_timestamp("2024-01-15").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(ts.hour(), 0);
        assert_eq!(am_pm(ts.hour()), AmPm::AM);
        assert!(parse_timestamp("2024-13-40").is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(CongestionError::DataError(_))
        ));
    }
}
