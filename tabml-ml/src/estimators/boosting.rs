use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::scores::{argmax, softmax_rows};
use super::tree::{DecisionTree, TreeParams};
use super::{check_width, Estimator, EstimatorResult, FitParams};

/// Depth of every boosting stage.
const STAGE_DEPTH: usize = 3;

fn stage_params(params: &FitParams) -> TreeParams {
    TreeParams {
        max_depth: STAGE_DEPTH,
        min_samples_split: params.min_samples_split,
    }
}

/// Least-squares gradient boosting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradientBoostingRegressor {
    pub n_features: usize,
    pub init: f64,
    pub learning_rate: f64,
    pub stages: Vec<DecisionTree>,
}

impl GradientBoostingRegressor {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, params: &FitParams) -> EstimatorResult<Self> {
        let rows: Vec<usize> = (0..x.nrows()).collect();
        let init = y.mean().unwrap_or(0.0);
        let mut raw = Array1::from_elem(x.nrows(), init);
        let mut stages = Vec::with_capacity(params.boosting_rounds);

        for _ in 0..params.boosting_rounds {
            let residual: Vec<f64> = (y - &raw).to_vec();
            let tree = DecisionTree::fit(x, &residual, &rows, stage_params(params));
            raw.scaled_add(params.learning_rate, &tree.predict_values(x)?);
            stages.push(tree);
        }

        Ok(Self {
            n_features: x.ncols(),
            init,
            learning_rate: params.learning_rate,
            stages,
        })
    }
}

impl Estimator for GradientBoostingRegressor {
    fn predict(&self, x: &Array2<f64>) -> EstimatorResult<Array1<f64>> {
        check_width(self.n_features, x)?;
        let mut raw = Array1::from_elem(x.nrows(), self.init);
        for tree in &self.stages {
            raw.scaled_add(self.learning_rate, &tree.predict_values(x)?);
        }
        Ok(raw)
    }
}

/// Multinomial log-loss gradient boosting: one regression tree per class per
/// round, leaves set by a single Newton step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradientBoostingClassifier {
    pub n_features: usize,
    /// Log class priors.
    pub init: Vec<f64>,
    pub learning_rate: f64,
    /// `stages[round][class]`.
    pub stages: Vec<Vec<DecisionTree>>,
}

impl GradientBoostingClassifier {
    pub fn fit(
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        params: &FitParams,
    ) -> EstimatorResult<Self> {
        let n = x.nrows();
        let rows: Vec<usize> = (0..n).collect();
        let k = n_classes as f64;

        let mut targets = Array2::<f64>::zeros((n, n_classes));
        for (row, &class) in y.iter().enumerate() {
            targets[[row, class]] = 1.0;
        }
        let init: Vec<f64> = targets
            .mean_axis(Axis(0))
            .map(|p| p.iter().map(|&q| q.max(1e-12).ln()).collect())
            .unwrap_or_else(|| vec![0.0; n_classes]);

        let mut raw = Array2::<f64>::zeros((n, n_classes));
        for mut row in raw.rows_mut() {
            row.assign(&Array1::from(init.clone()));
        }

        let mut stages = Vec::with_capacity(params.boosting_rounds);

        for _ in 0..params.boosting_rounds {
            let mut probs = raw.clone();
            softmax_rows(&mut probs);
            let residuals = &targets - &probs;

            let mut round = Vec::with_capacity(n_classes);
            for class in 0..n_classes {
                let residual: Vec<f64> = residuals.column(class).to_vec();
                let mut tree = DecisionTree::fit(x, &residual, &rows, stage_params(params));
                newton_leaves(&mut tree, x, &residual, k);

                raw.column_mut(class)
                    .scaled_add(params.learning_rate, &tree.predict_values(x)?);
                round.push(tree);
            }
            stages.push(round);
        }

        Ok(Self {
            n_features: x.ncols(),
            init,
            learning_rate: params.learning_rate,
            stages,
        })
    }

    pub fn decision_function(&self, x: &Array2<f64>) -> EstimatorResult<Array2<f64>> {
        check_width(self.n_features, x)?;
        let mut raw = Array2::<f64>::zeros((x.nrows(), self.init.len()));
        for mut row in raw.rows_mut() {
            row.assign(&Array1::from(self.init.clone()));
        }
        for round in &self.stages {
            for (class, tree) in round.iter().enumerate() {
                raw.column_mut(class)
                    .scaled_add(self.learning_rate, &tree.predict_values(x)?);
            }
        }
        Ok(raw)
    }
}

/// Replace each leaf with `(k - 1) / k · Σr / Σ|r|(1 - |r|)` over its rows.
fn newton_leaves(tree: &mut DecisionTree, x: &Array2<f64>, residual: &[f64], k: f64) {
    let mut sums: std::collections::HashMap<usize, (f64, f64)> = std::collections::HashMap::new();
    for (row, &r) in x.rows().into_iter().zip(residual) {
        let entry = sums.entry(tree.apply(row)).or_insert((0.0, 0.0));
        entry.0 += r;
        entry.1 += r.abs() * (1.0 - r.abs());
    }
    for (leaf, (numerator, denominator)) in sums {
        let value = if denominator.abs() < 1e-150 {
            0.0
        } else {
            (k - 1.0) / k * numerator / denominator
        };
        tree.set_leaf_value(leaf, value);
    }
}

impl Estimator for GradientBoostingClassifier {
    fn predict(&self, x: &Array2<f64>) -> EstimatorResult<Array1<f64>> {
        let raw = self.decision_function(x)?;
        Ok(raw.rows().into_iter().map(|r| argmax(r.iter()) as f64).collect())
    }
}
