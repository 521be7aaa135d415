//! Integration test: feature engineering on raw congestion frames

use chrono::{Duration, NaiveDate};
use congestion_forecast::feature_engineering::{
    generate_features, parse_timestamp, RawRecord, DROPPED_COLUMNS, ENGINEERED_COLUMNS,
};
use congestion_forecast::CongestionError;
use polars::prelude::*;

fn raw(times: &[&str], directions: &[&str]) -> DataFrame {
    let n = times.len();
    df!(
        "time" => times,
        "x" => (0..n as i64).collect::<Vec<_>>(),
        "y" => (0..n as i64).map(|i| i * 2).collect::<Vec<_>>(),
        "direction" => directions
    )
    .unwrap()
}

#[test]
fn test_reference_scenario() {
    let df = df!(
        "time" => &["2024-01-15 14:30:00"],
        "x" => &[1i64],
        "y" => &[2i64],
        "direction" => &["N"]
    )
    .unwrap();
    let out = generate_features(&df).unwrap();
    assert_eq!(out.height(), 1);

    let sin = out.column("hour_sin").unwrap().f64().unwrap().get(0).unwrap();
    let cos = out.column("hour_cos").unwrap().f64().unwrap().get(0).unwrap();
    assert!((sin - (-0.5)).abs() < 1e-9);
    assert!((cos - (-0.8660254037844386)).abs() < 1e-9);
    assert_eq!(out.column("am_pm").unwrap().str().unwrap().get(0), Some("PM"));
    assert_eq!(out.column("is_weekend").unwrap().bool().unwrap().get(0), Some(false));
    assert_eq!(out.column("x_y_direction").unwrap().str().unwrap().get(0), Some("1_2_N"));
}

#[test]
fn test_every_hour_of_the_day() {
    let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    let records: Vec<RawRecord> = (0..24)
        .map(|h| RawRecord::new(day.and_hms_opt(h, 0, 0).unwrap(), 3, 4, "EB"))
        .collect();
    let out = generate_features(&RawRecord::to_dataframe(&records).unwrap()).unwrap();

    let sin = out.column("hour_sin").unwrap().f64().unwrap();
    let cos = out.column("hour_cos").unwrap().f64().unwrap();
    let halves = out.column("am_pm").unwrap().str().unwrap();
    for hour in 0..24usize {
        let (s, c) = (sin.get(hour).unwrap(), cos.get(hour).unwrap());
        assert!((s * s + c * c - 1.0).abs() < 1e-12, "hour {hour}");
        let expected = if hour >= 12 { "PM" } else { "AM" };
        assert_eq!(halves.get(hour), Some(expected), "hour {hour}");
    }
}

#[test]
fn test_weekend_flag_over_a_week() {
    // 2024-01-15 is a Monday
    let monday = NaiveDate::from_ymd_opt(2024, 1, 15)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .unwrap();
    let records: Vec<RawRecord> = (0..7)
        .map(|d| RawRecord::new(monday + Duration::days(d), 0, 0, "NB"))
        .collect();
    let out = generate_features(&RawRecord::to_dataframe(&records).unwrap()).unwrap();
    let flags: Vec<bool> = out
        .column("is_weekend")
        .unwrap()
        .bool()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert_eq!(flags, vec![false, false, false, false, false, true, true]);
}

#[test]
fn test_composite_key_with_delimiter_in_direction() {
    let out = generate_features(&df!(
        "time" => &["2024-01-15 14:30:00", "2024-01-15 14:30:00"],
        "x" => &[1i64, 1],
        "y" => &[2i64, 2],
        "direction" => &["N_E", "NE"]
    )
    .unwrap())
    .unwrap();
    let keys = out.column("x_y_direction").unwrap().str().unwrap();
    assert_eq!(keys.get(0), Some("1_2_N_E"));
    assert_eq!(keys.get(1), Some("1_2_NE"));
}

#[test]
fn test_raw_columns_replaced() {
    let mut df = raw(&["2024-01-13 23:59:59", "2024-01-14T00:00:00"], &["SW", "WB"]);
    df.with_column(Series::new("congestion".into(), &[10.0, 20.0])).unwrap();
    let out = generate_features(&df).unwrap();

    for name in DROPPED_COLUMNS {
        assert!(out.column(name).is_err(), "{name} should be dropped");
    }
    for name in ENGINEERED_COLUMNS {
        assert!(out.column(name).is_ok(), "{name} should be present");
    }
    assert!(out.column("congestion").is_ok());
    assert_eq!(out.height(), 2);
}

#[test]
fn test_bad_inputs() {
    let missing = raw(&["2024-01-15 14:30:00"], &["N"]).drop("direction").unwrap();
    assert!(matches!(generate_features(&missing), Err(CongestionError::FeatureNotFound(_))));

    assert!(parse_timestamp("15/01/2024 14:30").is_err());
    let bad_time = raw(&["not a time"], &["N"]);
    assert!(generate_features(&bad_time).is_err());
}
