use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Classification,
    Regression,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Classification => "classification",
            TaskType::Regression => "regression",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classification" => Ok(TaskType::Classification),
            "regression" => Ok(TaskType::Regression),
            other => Err(CoreError::Validation(format!("unknown task type '{}'", other))),
        }
    }
}

/// Every algorithm the training engine knows how to fit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    LogisticRegression,
    RandomForestClassifier,
    SupportVectorClassifier,
    GradientBoostingClassifier,
    LinearRegression,
    Ridge,
    Lasso,
    RandomForestRegressor,
    GradientBoostingRegressor,
}

impl Algorithm {
    pub const ALL: [Algorithm; 9] = [
        Algorithm::LogisticRegression,
        Algorithm::RandomForestClassifier,
        Algorithm::SupportVectorClassifier,
        Algorithm::GradientBoostingClassifier,
        Algorithm::LinearRegression,
        Algorithm::Ridge,
        Algorithm::Lasso,
        Algorithm::RandomForestRegressor,
        Algorithm::GradientBoostingRegressor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::LogisticRegression => "logistic_regression",
            Algorithm::RandomForestClassifier => "random_forest_classifier",
            Algorithm::SupportVectorClassifier => "support_vector_classifier",
            Algorithm::GradientBoostingClassifier => "gradient_boosting_classifier",
            Algorithm::LinearRegression => "linear_regression",
            Algorithm::Ridge => "ridge",
            Algorithm::Lasso => "lasso",
            Algorithm::RandomForestRegressor => "random_forest_regressor",
            Algorithm::GradientBoostingRegressor => "gradient_boosting_regressor",
        }
    }

    pub fn task(&self) -> TaskType {
        match self {
            Algorithm::LogisticRegression
            | Algorithm::RandomForestClassifier
            | Algorithm::SupportVectorClassifier
            | Algorithm::GradientBoostingClassifier => TaskType::Classification,
            _ => TaskType::Regression,
        }
    }

    /// The fixed candidate roster for a task, in fitting order.
    pub fn roster(task: TaskType) -> Vec<Algorithm> {
        Self::ALL.iter().copied().filter(|a| a.task() == task).collect()
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("unknown algorithm '{}'", s)))
    }
}
