use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

use super::{check_width, dense, Estimator, EstimatorResult, FitParams};

type Classifier = RandomForestClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;
type Regressor = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Fitted {
    Classifier(Classifier),
    Regressor(Regressor),
}

/// Bagged CART trees. Classifiers take the majority vote, regressors the
/// mean of the tree outputs.
#[derive(Debug, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    model: Fitted,
}

impl RandomForest {
    /// Each split examines `floor(sqrt(p))` features.
    pub fn fit_classifier(x: &Array2<f64>, y: &[i32], params: &FitParams) -> EstimatorResult<Self> {
        let m = ((x.ncols() as f64).sqrt().floor() as usize).max(1);
        let parameters = RandomForestClassifierParameters::default()
            .with_n_trees(params.n_trees.max(1) as _)
            .with_max_depth(params.max_depth as _)
            .with_min_samples_split(params.min_samples_split)
            .with_m(m)
            .with_seed(params.seed);
        let model = Classifier::fit(&dense(x)?, &y.to_vec(), parameters)?;
        Ok(Self {
            n_features: x.ncols(),
            model: Fitted::Classifier(model),
        })
    }

    /// Each split examines every feature.
    pub fn fit_regressor(x: &Array2<f64>, y: &Array1<f64>, params: &FitParams) -> EstimatorResult<Self> {
        let parameters = RandomForestRegressorParameters::default()
            .with_n_trees(params.n_trees.max(1) as _)
            .with_max_depth(params.max_depth as _)
            .with_min_samples_split(params.min_samples_split)
            .with_m(x.ncols())
            .with_seed(params.seed);
        let model = Regressor::fit(&dense(x)?, &y.to_vec(), parameters)?;
        Ok(Self {
            n_features: x.ncols(),
            model: Fitted::Regressor(model),
        })
    }
}

impl Estimator for RandomForest {
    fn predict(&self, x: &Array2<f64>) -> EstimatorResult<Array1<f64>> {
        check_width(self.n_features, x)?;
        let x = dense(x)?;
        Ok(match &self.model {
            Fitted::Classifier(m) => m.predict(&x)?.into_iter().map(f64::from).collect(),
            Fitted::Regressor(m) => Array1::from(m.predict(&x)?),
        })
    }
}
