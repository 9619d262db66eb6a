//! The candidate roster.
//!
//! Every [`Algorithm`] maps to one [`EstimatorSpec`] entry holding its fit
//! function; the fitted result is a variant of [`FittedEstimator`], which
//! serializes with its algorithm tag and dispatches prediction. Adding an
//! algorithm means adding a variant and a registry entry.
//!
//! Linear, logistic and random-forest models are smartcore estimators
//! behind thin wrappers. Gradient boosting and the linear SVC are fit here:
//! smartcore has no boosting, and its `SVC` borrows its parameters and
//! training data for its whole lifetime, so it cannot be persisted and
//! reloaded for prediction.

mod boosting;
mod forest;
mod linear;
mod logistic;
mod scores;
mod svm;
mod tree;

pub use boosting::{GradientBoostingClassifier, GradientBoostingRegressor};
pub use forest::RandomForest;
pub use linear::LinearModel;
pub use logistic::LogisticRegression;
pub use svm::LinearSvc;
pub use tree::{DecisionTree, TreeParams};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;
use tabml_core::{Algorithm, TrainingConfig};
use thiserror::Error;

/// Why a candidate could not be fit. Recorded on the candidate, never fatal
/// to the run on its own.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimatorError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("{0} requires a classification target")]
    NotAClassifier(Algorithm),

    #[error("need at least 2 classes, found {0}")]
    TooFewClasses(usize),

    #[error("{0}")]
    Backend(String),

    #[error("fit produced non-finite parameters")]
    NonFinite,

    #[error("feature width mismatch: fitted on {expected}, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },
}

impl From<Failed> for EstimatorError {
    fn from(err: Failed) -> Self {
        EstimatorError::Backend(err.to_string())
    }
}

pub type EstimatorResult<T> = std::result::Result<T, EstimatorError>;

/// Encoded training data. Classification targets hold class indices.
#[derive(Debug, Clone)]
pub struct TrainingSet<'a> {
    pub x: &'a Array2<f64>,
    pub y: &'a Array1<f64>,
    pub n_classes: Option<usize>,
}

impl<'a> TrainingSet<'a> {
    pub fn new(x: &'a Array2<f64>, y: &'a Array1<f64>, n_classes: Option<usize>) -> Self {
        Self { x, y, n_classes }
    }

    fn check(&self) -> EstimatorResult<()> {
        if self.x.nrows() == 0 || self.x.nrows() != self.y.len() {
            return Err(EstimatorError::EmptyTrainingSet);
        }
        if self.y.iter().any(|v| !v.is_finite()) {
            return Err(EstimatorError::NonFinite);
        }
        Ok(())
    }

    fn classes(&self, algorithm: Algorithm) -> EstimatorResult<usize> {
        let k = self.n_classes.ok_or(EstimatorError::NotAClassifier(algorithm))?;
        if k < 2 {
            return Err(EstimatorError::TooFewClasses(k));
        }
        Ok(k)
    }

    fn labels(&self) -> Vec<usize> {
        self.y.iter().map(|&v| v as usize).collect()
    }

    fn class_ids(&self) -> Vec<i32> {
        self.y.iter().map(|&v| v as i32).collect()
    }
}

/// Hyperparameters shared by the roster.
#[derive(Debug, Clone)]
pub struct FitParams {
    pub seed: u64,
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub boosting_rounds: usize,
    pub learning_rate: f64,
    pub max_iter: usize,
    pub ridge_alpha: f64,
    pub lasso_alpha: f64,
    pub svm_lambda: f64,
}

impl From<&TrainingConfig> for FitParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            seed: config.random_seed,
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            boosting_rounds: config.boosting_rounds,
            learning_rate: config.learning_rate,
            max_iter: config.max_iter,
            ridge_alpha: config.ridge_alpha,
            lasso_alpha: config.lasso_alpha,
            svm_lambda: config.svm_lambda,
        }
    }
}

impl Default for FitParams {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

/// Prediction over an encoded feature matrix. Classifiers return class
/// indices as `f64`.
pub trait Estimator {
    fn predict(&self, x: &Array2<f64>) -> EstimatorResult<Array1<f64>>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "algorithm", content = "state", rename_all = "snake_case")]
pub enum FittedEstimator {
    LogisticRegression(LogisticRegression),
    RandomForestClassifier(RandomForest),
    SupportVectorClassifier(LinearSvc),
    GradientBoostingClassifier(GradientBoostingClassifier),
    LinearRegression(LinearModel),
    Ridge(LinearModel),
    Lasso(LinearModel),
    RandomForestRegressor(RandomForest),
    GradientBoostingRegressor(GradientBoostingRegressor),
}

impl FittedEstimator {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            FittedEstimator::LogisticRegression(_) => Algorithm::LogisticRegression,
            FittedEstimator::RandomForestClassifier(_) => Algorithm::RandomForestClassifier,
            FittedEstimator::SupportVectorClassifier(_) => Algorithm::SupportVectorClassifier,
            FittedEstimator::GradientBoostingClassifier(_) => Algorithm::GradientBoostingClassifier,
            FittedEstimator::LinearRegression(_) => Algorithm::LinearRegression,
            FittedEstimator::Ridge(_) => Algorithm::Ridge,
            FittedEstimator::Lasso(_) => Algorithm::Lasso,
            FittedEstimator::RandomForestRegressor(_) => Algorithm::RandomForestRegressor,
            FittedEstimator::GradientBoostingRegressor(_) => Algorithm::GradientBoostingRegressor,
        }
    }

    fn as_estimator(&self) -> &dyn Estimator {
        match self {
            FittedEstimator::LogisticRegression(m) => m,
            FittedEstimator::RandomForestClassifier(m) => m,
            FittedEstimator::SupportVectorClassifier(m) => m,
            FittedEstimator::GradientBoostingClassifier(m) => m,
            FittedEstimator::LinearRegression(m) => m,
            FittedEstimator::Ridge(m) => m,
            FittedEstimator::Lasso(m) => m,
            FittedEstimator::RandomForestRegressor(m) => m,
            FittedEstimator::GradientBoostingRegressor(m) => m,
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> EstimatorResult<Array1<f64>> {
        let predictions = self.as_estimator().predict(x)?;
        if predictions.iter().any(|v| !v.is_finite()) {
            return Err(EstimatorError::NonFinite);
        }
        Ok(predictions)
    }
}

type FitFn = fn(&TrainingSet<'_>, &FitParams) -> EstimatorResult<FittedEstimator>;

/// Registry entry for one algorithm.
pub struct EstimatorSpec {
    pub algorithm: Algorithm,
    pub fit: FitFn,
}

/// Ordered like [`Algorithm::ALL`].
static REGISTRY: [EstimatorSpec; 9] = [
    EstimatorSpec {
        algorithm: Algorithm::LogisticRegression,
        fit: |data, params| {
            data.classes(Algorithm::LogisticRegression)?;
            LogisticRegression::fit(data.x, &data.class_ids()).map(FittedEstimator::LogisticRegression)
        },
    },
    EstimatorSpec {
        algorithm: Algorithm::RandomForestClassifier,
        fit: |data, params| {
            data.classes(Algorithm::RandomForestClassifier)?;
            RandomForest::fit_classifier(data.x, &data.class_ids(), params)
                .map(FittedEstimator::RandomForestClassifier)
        },
    },
    EstimatorSpec {
        algorithm: Algorithm::SupportVectorClassifier,
        fit: |data, params| {
            let k = data.classes(Algorithm::SupportVectorClassifier)?;
            LinearSvc::fit(data.x, &data.labels(), k, params.svm_lambda, params.max_iter)
                .map(FittedEstimator::SupportVectorClassifier)
        },
    },
    EstimatorSpec {
        algorithm: Algorithm::GradientBoostingClassifier,
        fit: |data, params| {
            let k = data.classes(Algorithm::GradientBoostingClassifier)?;
            GradientBoostingClassifier::fit(data.x, &data.labels(), k, params)
                .map(FittedEstimator::GradientBoostingClassifier)
        },
    },
    EstimatorSpec {
        algorithm: Algorithm::LinearRegression,
        fit: |data, _| LinearModel::fit_ols(data.x, data.y).map(FittedEstimator::LinearRegression),
    },
    EstimatorSpec {
        algorithm: Algorithm::Ridge,
        fit: |data, params| {
            LinearModel::fit_ridge(data.x, data.y, params.ridge_alpha).map(FittedEstimator::Ridge)
        },
    },
    EstimatorSpec {
        algorithm: Algorithm::Lasso,
        fit: |data, params| {
            LinearModel::fit_lasso(data.x, data.y, params.lasso_alpha, params.max_iter)
                .map(FittedEstimator::Lasso)
        },
    },
    EstimatorSpec {
        algorithm: Algorithm::RandomForestRegressor,
        fit: |data, params| {
            RandomForest::fit_regressor(data.x, data.y, params).map(FittedEstimator::RandomForestRegressor)
        },
    },
    EstimatorSpec {
        algorithm: Algorithm::GradientBoostingRegressor,
        fit: |data, params| {
            GradientBoostingRegressor::fit(data.x, data.y, params)
                .map(FittedEstimator::GradientBoostingRegressor)
        },
    },
];

pub fn spec(algorithm: Algorithm) -> &'static EstimatorSpec {
    &REGISTRY[algorithm as usize]
}

/// Fit `algorithm` on `data`.
pub fn fit(
    algorithm: Algorithm,
    data: &TrainingSet<'_>,
    params: &FitParams,
) -> EstimatorResult<FittedEstimator> {
    data.check()?;
    let fitted = (spec(algorithm).fit)(data, params)?;
    debug_assert_eq!(fitted.algorithm(), algorithm);
    Ok(fitted)
}

/// Row-major copy of `x` in smartcore's matrix type.
fn dense(x: &Array2<f64>) -> EstimatorResult<DenseMatrix<f64>> {
    let rows: Vec<Vec<f64>> = x.rows().into_iter().map(|r| r.to_vec()).collect();
    Ok(DenseMatrix::from_2d_vec(&rows)?)
}

fn check_width(expected: usize, x: &Array2<f64>) -> EstimatorResult<()> {
    if x.ncols() != expected {
        return Err(EstimatorError::WidthMismatch {
            expected,
            actual: x.ncols(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_aligned_with_algorithms() {
        for algorithm in Algorithm::ALL {
            assert_eq!(spec(algorithm).algorithm, algorithm);
        }
    }
}
