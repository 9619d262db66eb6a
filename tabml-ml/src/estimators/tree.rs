use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{check_width, EstimatorResult};

const MIN_IMPROVEMENT: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Leaf { value: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Least-squares regression tree stored as a flat node arena; node 0 is the
/// root. The stage learner of gradient boosting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionTree {
    pub n_features: usize,
    pub nodes: Vec<Node>,
}

struct Builder<'a> {
    x: &'a Array2<f64>,
    values: &'a [f64],
    params: TreeParams,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl DecisionTree {
    /// Grow a tree on `rows` of `x` against `values`.
    pub fn fit(x: &Array2<f64>, values: &[f64], rows: &[usize], params: TreeParams) -> Self {
        let mut builder = Builder {
            x,
            values,
            params,
            nodes: Vec::new(),
        };
        builder.build(rows.to_vec(), 0);
        Self {
            n_features: x.ncols(),
            nodes: builder.nodes,
        }
    }

    /// Index of the leaf `row` falls into.
    pub fn apply(&self, row: ArrayView1<'_, f64>) -> usize {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { .. } => return index,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    fn leaf_value(&self, row: ArrayView1<'_, f64>) -> f64 {
        match &self.nodes[self.apply(row)] {
            Node::Leaf { value } => *value,
            Node::Split { .. } => 0.0,
        }
    }

    /// Overwrite the value of a leaf. Ignored for split nodes.
    pub fn set_leaf_value(&mut self, index: usize, new_value: f64) {
        if let Some(Node::Leaf { value }) = self.nodes.get_mut(index) {
            *value = new_value;
        }
    }

    pub fn predict_values(&self, x: &Array2<f64>) -> EstimatorResult<Array1<f64>> {
        check_width(self.n_features, x)?;
        Ok(x.rows().into_iter().map(|row| self.leaf_value(row)).collect())
    }
}

impl Builder<'_> {
    fn build(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let index = self.nodes.len();
        let n = rows.len().max(1) as f64;
        let value = rows.iter().map(|&r| self.values[r]).sum::<f64>() / n;
        self.nodes.push(Node::Leaf { value });

        if depth >= self.params.max_depth
            || rows.len() < self.params.min_samples_split
            || rows.iter().all(|&r| self.values[r] == self.values[rows[0]])
        {
            return index;
        }

        let Some(split) = self.best_split(&rows) else {
            return index;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| self.x[[r, split.feature]] <= split.threshold);
        if left_rows.is_empty() || right_rows.is_empty() {
            return index;
        }

        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    /// Best split by squared-error decrease, i.e. the largest
    /// `sum_left² / n_left + sum_right² / n_right`.
    fn best_split(&self, rows: &[usize]) -> Option<BestSplit> {
        let n = rows.len();
        if n < 2 {
            return None;
        }
        let total: f64 = rows.iter().map(|&r| self.values[r]).sum();
        let parent_score = total * total / n as f64;
        let mut best: Option<BestSplit> = None;
        let mut sorted = rows.to_vec();

        for feature in 0..self.x.ncols() {
            sorted.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

            let mut left_sum = 0.0;
            for i in 0..n - 1 {
                left_sum += self.values[sorted[i]];
                let here = self.x[[sorted[i], feature]];
                let next = self.x[[sorted[i + 1], feature]];
                if here == next {
                    continue;
                }
                let (n_left, n_right) = ((i + 1) as f64, (n - i - 1) as f64);
                let right_sum = total - left_sum;
                let score = left_sum * left_sum / n_left + right_sum * right_sum / n_right;
                if score - parent_score > MIN_IMPROVEMENT
                    && best.as_ref().map_or(true, |b| score > b.score)
                {
                    let mid = here + (next - here) / 2.0;
                    let threshold = if mid < next { mid } else { here };
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        score,
                    });
                }
            }
        }
        best
    }
}
