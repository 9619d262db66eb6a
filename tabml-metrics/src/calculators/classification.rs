use serde::{Deserialize, Serialize};
use smartcore::metrics;
use tabml_core::{ClassificationMetrics, ConfusionMatrix, CoreError, MetricCalculator, Result};

/// Encoded labels for one evaluation. `actual` and `predicted` hold indices
/// into `labels`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationInput {
    pub labels: Vec<String>,
    pub actual: Vec<usize>,
    pub predicted: Vec<usize>,
}

impl ClassificationInput {
    pub fn new(labels: Vec<String>, actual: Vec<usize>, predicted: Vec<usize>) -> Self {
        Self {
            labels,
            actual,
            predicted,
        }
    }
}

/// Accuracy, macro-averaged precision/recall/F1 and the confusion matrix.
///
/// Macro averages run over the classes that occur in either the actual or the
/// predicted labels and are read off the confusion matrix; smartcore's
/// precision and recall only score a binary positive class. A class with no
/// predictions scores zero precision.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassificationCalculator;

impl ClassificationCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn confusion_matrix(&self, input: &ClassificationInput) -> Result<ConfusionMatrix> {
        validate(input)?;
        let k = input.labels.len();
        let mut matrix = vec![vec![0u64; k]; k];
        for (&a, &p) in input.actual.iter().zip(&input.predicted) {
            matrix[a][p] += 1;
        }
        Ok(ConfusionMatrix {
            labels: input.labels.clone(),
            matrix,
        })
    }
}

impl MetricCalculator for ClassificationCalculator {
    type Input = ClassificationInput;
    type Output = ClassificationMetrics;

    fn calculate(&self, input: &Self::Input) -> Result<Self::Output> {
        let confusion_matrix = self.confusion_matrix(input)?;
        let k = input.labels.len();

        let actual: Vec<u64> = input.actual.iter().map(|&c| c as u64).collect();
        let predicted: Vec<u64> = input.predicted.iter().map(|&c| c as u64).collect();
        let accuracy = metrics::accuracy(&actual, &predicted);

        let mut precision_sum = 0.0;
        let mut recall_sum = 0.0;
        let mut f1_sum = 0.0;
        let mut present = 0usize;

        for class in 0..k {
            let tp = confusion_matrix.matrix[class][class] as f64;
            let actual_count: u64 = confusion_matrix.matrix[class].iter().sum();
            let predicted_count: u64 = confusion_matrix.matrix.iter().map(|row| row[class]).sum();
            if actual_count == 0 && predicted_count == 0 {
                continue;
            }
            present += 1;

            let precision = ratio(tp, predicted_count as f64);
            let recall = ratio(tp, actual_count as f64);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            precision_sum += precision;
            recall_sum += recall;
            f1_sum += f1;
        }

        let n = present.max(1) as f64;
        Ok(ClassificationMetrics {
            accuracy,
            precision: precision_sum / n,
            recall: recall_sum / n,
            f1: f1_sum / n,
            confusion_matrix,
        })
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn validate(input: &ClassificationInput) -> Result<()> {
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
    let k = input.labels.len();
    if let Some(bad) = input
        .actual
        .iter()
        .chain(&input.predicted)
        .find(|&&idx| idx >= k)
    {
        return Err(CoreError::Validation(format!(
            "label index {} out of range for {} classes",
            bad, k
        )));
    }
    Ok(())
}
