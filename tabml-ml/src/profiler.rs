use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tabml_core::{Column, ColumnProfile, ColumnType, Dataset, DatasetProfile, Result, Scalar};
use tabml_metrics::SummaryStatistics;

const SAMPLE_VALUES: usize = 5;
const TEXT_MIN_PRESENT: usize = 20;
const TEXT_MIN_DISTINCT_RATIO: f64 = 0.5;
const TEXT_MIN_AVG_LEN: f64 = 20.0;

/// Reports shape, inferred column types, missing counts and summary
/// statistics. Pure: the dataset is only read.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatasetProfiler;

impl DatasetProfiler {
    pub fn new() -> Self {
        Self
    }

    pub fn profile(&self, dataset: &Dataset) -> Result<DatasetProfile> {
        dataset.validate()?;

        let columns = dataset.columns.iter().map(profile_column).collect();

        Ok(DatasetProfile {
            row_count: dataset.row_count(),
            column_count: dataset.column_count(),
            columns,
        })
    }
}

fn profile_column(column: &Column) -> ColumnProfile {
    let present: Vec<&Scalar> = column.values.iter().filter(|v| !v.is_missing()).collect();
    let column_type = infer_type(&present);

    let mut distinct: HashSet<String> = HashSet::new();
    let mut sample_values = Vec::new();
    for value in &present {
        if let Some(label) = value.as_label() {
            if distinct.insert(label.clone()) && sample_values.len() < SAMPLE_VALUES {
                sample_values.push(label);
            }
        }
    }

    let numeric = match column_type {
        ColumnType::Numeric => {
            let values: Vec<f64> = present.iter().filter_map(|v| v.as_f64()).collect();
            SummaryStatistics::numeric(&values)
        }
        _ => None,
    };

    ColumnProfile {
        name: column.name.clone(),
        column_type,
        missing_count: column.values.len() - present.len(),
        distinct_count: distinct.len(),
        numeric,
        sample_values,
    }
}

/// A column with no present values is reported as categorical.
pub fn infer_type(present: &[&Scalar]) -> ColumnType {
    if present.is_empty() {
        return ColumnType::Categorical;
    }
    if present.iter().all(|v| matches!(v, Scalar::Number(_))) {
        return ColumnType::Numeric;
    }
    if present.iter().all(|v| match v {
        Scalar::Text(s) => parse_datetime(s).is_some(),
        _ => false,
    }) {
        return ColumnType::Datetime;
    }
    if looks_like_free_text(present) {
        return ColumnType::Text;
    }
    ColumnType::Categorical
}

fn looks_like_free_text(present: &[&Scalar]) -> bool {
    if present.len() < TEXT_MIN_PRESENT {
        return false;
    }
    let labels: Vec<String> = present.iter().filter_map(|v| v.as_label()).collect();
    let distinct: HashSet<&str> = labels.iter().map(String::as_str).collect();
    let avg_len = labels.iter().map(|l| l.chars().count()).sum::<usize>() as f64 / labels.len() as f64;

    distinct.len() as f64 / labels.len() as f64 > TEXT_MIN_DISTINCT_RATIO && avg_len > TEXT_MIN_AVG_LEN
}

/// Seconds since the Unix epoch for RFC 3339 or `YYYY-MM-DD[ HH:MM:SS]` text.
pub fn parse_datetime(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}
