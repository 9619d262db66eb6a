use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::lasso::{Lasso, LassoParameters};
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use smartcore::linear::ridge_regression::{
    RidgeRegression, RidgeRegressionParameters, RidgeRegressionSolverName,
};

use super::{check_width, dense, Estimator, EstimatorResult};

type Ols = LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;
type Ridge = RidgeRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;
type LassoModel = Lasso<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// The three fitted linear regressors.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Fitted {
    Ols(Ols),
    Ridge(Ridge),
    Lasso(LassoModel),
}

/// `y = x · w + b`, fit by ordinary least squares, ridge or lasso.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinearModel {
    pub n_features: usize,
    model: Fitted,
}

impl LinearModel {
    /// SVD solver, so collinear one-hot columns stay solvable.
    pub fn fit_ols(x: &Array2<f64>, y: &Array1<f64>) -> EstimatorResult<Self> {
        let mut params = LinearRegressionParameters::default();
        params.solver = LinearRegressionSolverName::SVD;
        let model = Ols::fit(&dense(x)?, &y.to_vec(), params)?;
        Ok(Self::new(x, Fitted::Ols(model)))
    }

    pub fn fit_ridge(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> EstimatorResult<Self> {
        let params = RidgeRegressionParameters {
            alpha,
            normalize: false,
            solver: RidgeRegressionSolverName::SVD,
        };
        let model = Ridge::fit(&dense(x)?, &y.to_vec(), params)?;
        Ok(Self::new(x, Fitted::Ridge(model)))
    }

    /// Coordinate descent on `(1 / 2n) ||y - Xw - b||² + alpha ||w||₁`.
    pub fn fit_lasso(
        x: &Array2<f64>,
        y: &Array1<f64>,
        alpha: f64,
        max_iter: usize,
    ) -> EstimatorResult<Self> {
        let params = LassoParameters::default()
            .with_alpha(alpha)
            .with_normalize(false)
            .with_max_iter(max_iter);
        let model = LassoModel::fit(&dense(x)?, &y.to_vec(), params)?;
        Ok(Self::new(x, Fitted::Lasso(model)))
    }

    fn new(x: &Array2<f64>, model: Fitted) -> Self {
        Self {
            n_features: x.ncols(),
            model,
        }
    }
}

impl Estimator for LinearModel {
    fn predict(&self, x: &Array2<f64>) -> EstimatorResult<Array1<f64>> {
        check_width(self.n_features, x)?;
        let x = dense(x)?;
        let predicted = match &self.model {
            Fitted::Ols(m) => m.predict(&x)?,
            Fitted::Ridge(m) => m.predict(&x)?,
            Fitted::Lasso(m) => m.predict(&x)?,
        };
        Ok(Array1::from(predicted))
    }
}
