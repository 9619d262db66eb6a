use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{
    LogisticRegression as Model, LogisticRegressionParameters,
};

use super::{check_width, dense, Estimator, EstimatorResult};

/// L2 penalty on the coefficients.
const ALPHA: f64 = 1e-3;

/// Multinomial logistic regression over class indices, fit with L-BFGS.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub n_features: usize,
    model: Model<f64, i32, DenseMatrix<f64>, Vec<i32>>,
}

impl LogisticRegression {
    pub fn fit(x: &Array2<f64>, y: &[i32]) -> EstimatorResult<Self> {
        let mut params = LogisticRegressionParameters::default();
        params.alpha = ALPHA;
        let model = Model::fit(&dense(x)?, &y.to_vec(), params)?;
        Ok(Self {
            n_features: x.ncols(),
            model,
        })
    }
}

impl Estimator for LogisticRegression {
    fn predict(&self, x: &Array2<f64>) -> EstimatorResult<Array1<f64>> {
        check_width(self.n_features, x)?;
        let classes = self.model.predict(&dense(x)?)?;
        Ok(classes.into_iter().map(f64::from).collect())
    }
}
