use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::scores::argmax;
use super::{check_width, Estimator, EstimatorError, EstimatorResult};

const GRADIENT_TOL: f64 = 1e-6;

/// Linear support-vector classifier: one-vs-rest, squared hinge loss with an
/// L2 penalty, fit by full-batch gradient descent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearSvc {
    /// `n_features × n_classes`; a binary problem keeps a single column
    /// scoring class 1.
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

impl LinearSvc {
    pub fn fit(
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        lambda: f64,
        max_iter: usize,
    ) -> EstimatorResult<Self> {
        let p = x.ncols();
        let mean_sq_norm = x.map_axis(Axis(1), |r| r.dot(&r)).mean().unwrap_or(0.0);
        let step = 1.0 / (lambda + 2.0 * (mean_sq_norm + 1.0));

        let columns: Vec<usize> = if n_classes == 2 { vec![1] } else { (0..n_classes).collect() };
        let mut weights = Array2::<f64>::zeros((p, columns.len()));
        let mut bias = Array1::<f64>::zeros(columns.len());

        for (slot, &positive) in columns.iter().enumerate() {
            let signs: Array1<f64> = y
                .iter()
                .map(|&c| if c == positive { 1.0 } else { -1.0 })
                .collect();
            let (w, b) = fit_binary(x, &signs, lambda, step, max_iter)?;
            weights.column_mut(slot).assign(&w);
            bias[slot] = b;
        }

        Ok(Self { weights, bias })
    }

    pub fn decision_function(&self, x: &Array2<f64>) -> EstimatorResult<Array2<f64>> {
        check_width(self.weights.nrows(), x)?;
        Ok(x.dot(&self.weights) + &self.bias)
    }
}

fn fit_binary(
    x: &Array2<f64>,
    signs: &Array1<f64>,
    lambda: f64,
    step: f64,
    max_iter: usize,
) -> EstimatorResult<(Array1<f64>, f64)> {
    let n = x.nrows() as f64;
    let mut w = Array1::<f64>::zeros(x.ncols());
    let mut b = 0.0;

    for _ in 0..max_iter {
        let margins = (x.dot(&w) + b) * signs;
        // d/dm of max(0, 1 - m)² is -2(1 - m) inside the margin.
        let slack: Array1<f64> = margins.mapv(|m| if m < 1.0 { 1.0 - m } else { 0.0 });
        let coeff = &slack * signs * (-2.0 / n);

        let grad_w = x.t().dot(&coeff) + &(&w * lambda);
        let grad_b = coeff.sum();

        w.scaled_add(-step, &grad_w);
        b -= step * grad_b;

        let grad_norm = grad_w.iter().fold(grad_b.abs(), |acc, g| acc.max(g.abs()));
        if !grad_norm.is_finite() {
            return Err(EstimatorError::NonFinite);
        }
        if grad_norm < GRADIENT_TOL {
            break;
        }
    }
    Ok((w, b))
}

impl Estimator for LinearSvc {
    fn predict(&self, x: &Array2<f64>) -> EstimatorResult<Array1<f64>> {
        let scores = self.decision_function(x)?;
        if scores.ncols() == 1 {
            return Ok(scores.column(0).mapv(|s| if s > 0.0 { 1.0 } else { 0.0 }));
        }
        Ok(scores.rows().into_iter().map(|r| argmax(r.iter()) as f64).collect())
    }
}
