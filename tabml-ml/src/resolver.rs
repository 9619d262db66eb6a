use serde::{Deserialize, Serialize};
use tabml_core::{ColumnProfile, ColumnType, TaskType};

/// Advisory task inferred from a target column's profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskAdvice {
    pub target_column: String,
    pub task: TaskType,
    pub reason: String,
}

/// Suggests classification for low-cardinality categorical or integer
/// targets and regression otherwise. The caller's explicit choice always
/// wins; the training engine never consults this.
#[derive(Debug, Clone, Copy)]
pub struct TaskResolver {
    cardinality_threshold: usize,
}

impl TaskResolver {
    pub fn new(cardinality_threshold: usize) -> Self {
        Self {
            cardinality_threshold,
        }
    }

    pub fn resolve(&self, target: &ColumnProfile) -> TaskAdvice {
        let distinct = target.distinct_count;
        let low_cardinality = distinct <= self.cardinality_threshold;

        let (task, reason) = match target.column_type {
            ColumnType::Categorical | ColumnType::Text if low_cardinality => (
                TaskType::Classification,
                format!("{} distinct categorical values", distinct),
            ),
            ColumnType::Categorical | ColumnType::Text => (
                TaskType::Classification,
                format!(
                    "non-numeric target with {} distinct values (above threshold {})",
                    distinct, self.cardinality_threshold
                ),
            ),
            ColumnType::Numeric
                if low_cardinality && target.numeric.as_ref().is_some_and(|n| n.integral) =>
            {
                (
                    TaskType::Classification,
                    format!("{} distinct integer values", distinct),
                )
            }
            ColumnType::Numeric => (
                TaskType::Regression,
                format!("continuous numeric target with {} distinct values", distinct),
            ),
            ColumnType::Datetime => (
                TaskType::Regression,
                "datetime target treated as a continuous timestamp".to_string(),
            ),
        };

        TaskAdvice {
            target_column: target.name.clone(),
            task,
            reason,
        }
    }
}

impl Default for TaskResolver {
    fn default() -> Self {
        Self::new(20)
    }
}
