use std::collections::BTreeSet;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tabml_core::{ColumnType, CoreError, Dataset, DatasetProfile, Record, Result, Scalar, TaskType};
use tabml_metrics::SummaryStatistics;

use crate::profiler::parse_datetime;

/// Fitted transform of one input column into model features.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureEncoder {
    /// Mean imputation followed by standardization.
    Numeric { mean: f64, scale: f64 },
    /// Parsed to Unix seconds, then treated like a numeric column.
    Datetime { mean: f64, scale: f64 },
    /// Mode imputation followed by one-hot encoding of the most frequent
    /// levels. With `other` set, every remaining level shares one trailing
    /// column; otherwise unseen categories encode as all zeros.
    Categorical {
        categories: Vec<String>,
        mode: String,
        #[serde(default)]
        other: bool,
    },
}

impl FeatureEncoder {
    pub fn width(&self) -> usize {
        match self {
            FeatureEncoder::Numeric { .. } | FeatureEncoder::Datetime { .. } => 1,
            FeatureEncoder::Categorical { categories, other, .. } => {
                categories.len() + usize::from(*other)
            }
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FeatureEncoder::Numeric { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureTransform {
    pub column: String,
    pub encoder: FeatureEncoder,
}

/// Preprocessing fit on the training partition and replayed verbatim at
/// prediction time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preprocessor {
    pub features: Vec<FeatureTransform>,
}

impl Preprocessor {
    /// Fit one encoder per feature column using only the `train` rows.
    /// Categorical columns keep at most `max_categories` levels of their own.
    pub fn fit(
        dataset: &Dataset,
        profile: &DatasetProfile,
        feature_columns: &[String],
        train: &[usize],
        max_categories: usize,
    ) -> Result<Self> {
        let mut features = Vec::with_capacity(feature_columns.len());

        for name in feature_columns {
            let column = dataset
                .column(name)
                .ok_or_else(|| CoreError::Validation(format!("unknown feature column '{}'", name)))?;
            let column_type = profile
                .column(name)
                .map(|c| c.column_type)
                .unwrap_or(ColumnType::Categorical);

            let train_cells = train.iter().map(|&row| &column.values[row]);
            let encoder = match column_type {
                ColumnType::Numeric => {
                    let values: Vec<Option<f64>> = train_cells
                        .map(|v| if v.is_missing() { None } else { v.as_f64() })
                        .collect();
                    let (mean, scale) = standardization(&values);
                    FeatureEncoder::Numeric { mean, scale }
                }
                ColumnType::Datetime => {
                    let values: Vec<Option<f64>> = train_cells.map(datetime_value).collect();
                    let (mean, scale) = standardization(&values);
                    FeatureEncoder::Datetime { mean, scale }
                }
                ColumnType::Categorical | ColumnType::Text => {
                    let labels: Vec<String> = train_cells.filter_map(Scalar::as_label).collect();
                    let ranked = SummaryStatistics::frequencies(labels.iter().map(String::as_str));
                    let mode = ranked.first().map(|&(v, _)| v.to_string()).unwrap_or_default();

                    let limit = max_categories.max(1);
                    let mut categories: Vec<String> =
                        ranked.iter().take(limit).map(|&(v, _)| v.to_string()).collect();
                    if categories.is_empty() {
                        categories.push(mode.clone());
                    }
                    categories.sort();
                    FeatureEncoder::Categorical {
                        categories,
                        mode,
                        other: ranked.len() > limit,
                    }
                }
            };

            features.push(FeatureTransform {
                column: name.clone(),
                encoder,
            });
        }

        Ok(Self { features })
    }

    pub fn feature_columns(&self) -> Vec<String> {
        self.features.iter().map(|f| f.column.clone()).collect()
    }

    /// Width of the encoded feature matrix.
    pub fn output_width(&self) -> usize {
        self.features.iter().map(|f| f.encoder.width()).sum()
    }

    pub fn transform_dataset(&self, dataset: &Dataset, rows: &[usize]) -> Result<Array2<f64>> {
        let columns = self
            .features
            .iter()
            .map(|f| {
                dataset.column(&f.column).ok_or_else(|| {
                    CoreError::SchemaMismatch(format!("dataset is missing column '{}'", f.column))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.transform_with(rows.len(), |row, feature| {
            &columns[feature].values[rows[row]]
        })
    }

    /// Encode prediction records. Each record must carry exactly the fitted
    /// feature columns.
    pub fn transform_records(&self, records: &[Record]) -> Result<Array2<f64>> {
        for (index, record) in records.iter().enumerate() {
            self.check_schema(index, record)?;
        }
        let missing = Scalar::Null;
        self.transform_with(records.len(), |row, feature| {
            records[row]
                .get(&self.features[feature].column)
                .unwrap_or(&missing)
        })
    }

    fn check_schema(&self, index: usize, record: &Record) -> Result<()> {
        let missing: Vec<&str> = self
            .features
            .iter()
            .map(|f| f.column.as_str())
            .filter(|c| !record.contains_key(*c))
            .collect();
        let extra: Vec<&str> = record
            .keys()
            .map(String::as_str)
            .filter(|k| !self.features.iter().any(|f| f.column == *k))
            .collect();

        if missing.is_empty() && extra.is_empty() {
            return Ok(());
        }
        let mut problems = Vec::new();
        if !missing.is_empty() {
            problems.push(format!("missing [{}]", missing.join(", ")));
        }
        if !extra.is_empty() {
            problems.push(format!("unexpected [{}]", extra.join(", ")));
        }
        Err(CoreError::SchemaMismatch(format!(
            "record {}: {}",
            index,
            problems.join("; ")
        )))
    }

    fn transform_with<'a, F>(&self, n_rows: usize, cell: F) -> Result<Array2<f64>>
    where
        F: Fn(usize, usize) -> &'a Scalar,
    {
        let width = self.output_width();
        let mut out = Array2::<f64>::zeros((n_rows, width));

        for row in 0..n_rows {
            let mut offset = 0;
            for (feature, transform) in self.features.iter().enumerate() {
                let value = cell(row, feature);
                match &transform.encoder {
                    FeatureEncoder::Numeric { mean, scale } => {
                        let raw = if value.is_missing() {
                            *mean
                        } else {
                            numeric_value(value).ok_or_else(|| invalid(&transform.column, value))?
                        };
                        out[[row, offset]] = (raw - mean) / scale;
                    }
                    FeatureEncoder::Datetime { mean, scale } => {
                        let raw = if value.is_missing() {
                            *mean
                        } else {
                            datetime_value(value).ok_or_else(|| invalid(&transform.column, value))?
                        };
                        out[[row, offset]] = (raw - mean) / scale;
                    }
                    FeatureEncoder::Categorical {
                        categories,
                        mode,
                        other,
                    } => {
                        let label = value.as_label().unwrap_or_else(|| mode.clone());
                        match categories.binary_search(&label) {
                            Ok(position) => out[[row, offset + position]] = 1.0,
                            Err(_) if *other => out[[row, offset + categories.len()]] = 1.0,
                            Err(_) => {}
                        }
                    }
                }
                offset += transform.encoder.width();
            }
        }
        Ok(out)
    }
}

fn invalid(column: &str, value: &Scalar) -> CoreError {
    CoreError::InvalidFeatureValue {
        key: column.to_string(),
        value: value.to_string(),
    }
}

/// Numbers and numeric text. Booleans are not numbers.
fn numeric_value(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Bool(_) => None,
        other => other.as_f64(),
    }
}

fn datetime_value(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Text(s) => parse_datetime(s).map(|t| t as f64),
        Scalar::Number(n) if n.is_finite() => Some(*n),
        _ => None,
    }
}

/// Mean of the present values, and the population standard deviation after
/// mean imputation. A constant column scales by 1.
fn standardization(values: &[Option<f64>]) -> (f64, f64) {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return (0.0, 1.0);
    }
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    let variance = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let std = variance.sqrt();
    let scale = if std > 1e-12 { std } else { 1.0 };
    (mean, scale)
}

// ===== Target encoding =====

/// Fitted encoding of the target column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetEncoder {
    /// Sorted class labels; a class is encoded as its index.
    Labels { classes: Vec<String> },
    Continuous,
}

impl TargetEncoder {
    /// Encode the target of `rows`, which must all have a present target.
    pub fn fit_transform(
        task: TaskType,
        dataset: &Dataset,
        target: &str,
        rows: &[usize],
    ) -> Result<(Self, Array1<f64>)> {
        let column = dataset
            .column(target)
            .ok_or_else(|| CoreError::Validation(format!("unknown target column '{}'", target)))?;
        let cells: Vec<&Scalar> = rows.iter().map(|&r| &column.values[r]).collect();

        match task {
            TaskType::Classification => {
                let labels: Vec<String> = cells
                    .iter()
                    .map(|v| {
                        v.as_label().ok_or_else(|| {
                            CoreError::MalformedDataset(format!("target '{}' has a missing value", target))
                        })
                    })
                    .collect::<Result<_>>()?;
                let classes: Vec<String> = labels
                    .iter()
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                if classes.len() < 2 {
                    return Err(CoreError::InsufficientClassSamples(format!(
                        "target '{}' has {} class(es); classification needs at least 2",
                        target,
                        classes.len()
                    )));
                }
                let encoded = labels
                    .iter()
                    .map(|l| classes.binary_search(l).map(|i| i as f64).unwrap_or(0.0))
                    .collect();
                Ok((TargetEncoder::Labels { classes }, encoded))
            }
            TaskType::Regression => {
                let values = cells
                    .iter()
                    .map(|v| {
                        v.as_f64().ok_or_else(|| {
                            CoreError::Validation(format!(
                                "regression target '{}' has non-numeric value {:?}",
                                target,
                                v.to_string()
                            ))
                        })
                    })
                    .collect::<Result<Vec<f64>>>()?;
                Ok((TargetEncoder::Continuous, Array1::from(values)))
            }
        }
    }

    pub fn n_classes(&self) -> Option<usize> {
        match self {
            TargetEncoder::Labels { classes } => Some(classes.len()),
            TargetEncoder::Continuous => None,
        }
    }

    pub fn classes(&self) -> &[String] {
        match self {
            TargetEncoder::Labels { classes } => classes,
            TargetEncoder::Continuous => &[],
        }
    }

    /// Render a raw estimator output as a prediction value.
    pub fn decode(&self, raw: f64) -> Scalar {
        match self {
            TargetEncoder::Labels { classes } => {
                let index = (raw.round().max(0.0) as usize).min(classes.len().saturating_sub(1));
                classes
                    .get(index)
                    .cloned()
                    .map(Scalar::Text)
                    .unwrap_or(Scalar::Null)
            }
            TargetEncoder::Continuous => Scalar::Number(raw),
        }
    }
}
