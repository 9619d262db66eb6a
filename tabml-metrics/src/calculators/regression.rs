use serde::{Deserialize, Serialize};
use smartcore::metrics::{self, mean_absolute_error, mean_squared_error};
use tabml_core::{CoreError, MetricCalculator, RegressionMetrics, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionInput {
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
}

impl RegressionInput {
    pub fn new(actual: Vec<f64>, predicted: Vec<f64>) -> Self {
        Self { actual, predicted }
    }
}

/// Mean squared error, mean absolute error and the coefficient of
/// determination.
///
/// When the actual values are constant R² is 1.0 for an exact fit and 0.0
/// otherwise, so the score stays finite.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegressionCalculator;

impl RegressionCalculator {
    pub fn new() -> Self {
        Self
    }
}

impl MetricCalculator for RegressionCalculator {
    type Input = RegressionInput;
    type Output = RegressionMetrics;

    fn calculate(&self, input: &Self::Input) -> Result<Self::Output> {
        if input.actual.len() != input.predicted.len() {
            return Err(CoreError::Validation(format!(
                "actual and predicted lengths differ ({} vs {})",
                input.actual.len(),
                input.predicted.len()
            )));
        }
        if input.actual.is_empty() {
            return Err(CoreError::Validation(
                "cannot evaluate an empty prediction set".to_string(),
            ));
        }
        if input
            .actual
            .iter()
            .chain(&input.predicted)
            .any(|v| !v.is_finite())
        {
            return Err(CoreError::Validation(
                "regression values must be finite".to_string(),
            ));
        }

        let mse = mean_squared_error(&input.actual, &input.predicted);
        let mae = mean_absolute_error(&input.actual, &input.predicted);

        let first = input.actual[0];
        let constant = input.actual.iter().all(|&y| (y - first).abs() <= f64::EPSILON);
        let r2 = if !constant {
            metrics::r2(&input.actual, &input.predicted)
        } else if mse <= f64::EPSILON {
            1.0
        } else {
            0.0
        };
        if !(mse.is_finite() && mae.is_finite() && r2.is_finite()) {
            return Err(CoreError::Validation(
                "regression metrics overflowed".to_string(),
            ));
        }

        Ok(RegressionMetrics {
            mse,
            mae,
            r2,
        })
    }
}
