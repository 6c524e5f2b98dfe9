//! The forest (sum of trees) and the append-only sequence of retained
//! forest snapshots.

use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};
use rayon::ThreadPool;

use crate::split_rules::SplitRuleType;
use crate::tree::DecisionTree;

/// An ordered collection of decision trees whose predictions sum into the
/// forest prediction.
#[derive(Debug, Clone)]
pub struct Forest {
    /// The member trees.
    pub trees: Vec<DecisionTree>,
}

impl Forest {
    /// Creates a forest of `n_trees` root-only trees, each holding
    /// `init_value` at its root.
    pub fn new(n_trees: usize, init_value: f64, num_samples: usize) -> Self {
        let trees = (0..n_trees)
            .map(|_| DecisionTree::new(init_value, num_samples))
            .collect();

        Self { trees }
    }

    /// Prediction for a single observation: the sum of the routed leaf
    /// values over all member trees.
    pub fn predict_row(&self, row: ArrayView1<f64>, rules: &[SplitRuleType]) -> f64 {
        self.trees
            .iter()
            .map(|tree| tree.predict_row(row, rules))
            .sum()
    }

    /// Predictions for every row of `X`. Rows are independent, so the pass
    /// runs on `pool` when one is supplied; each output slot is written by
    /// exactly one task.
    pub fn predict(
        &self,
        X: &Array2<f64>,
        rules: &[SplitRuleType],
        pool: Option<&ThreadPool>,
    ) -> Array1<f64> {
        let mut predictions = Array1::zeros(X.nrows());

        match pool {
            Some(pool) => pool.install(|| {
                Zip::from(&mut predictions)
                    .and(X.rows())
                    .par_for_each(|pred, row| *pred = self.predict_row(row, rules));
            }),
            None => {
                Zip::from(&mut predictions)
                    .and(X.rows())
                    .for_each(|pred, row| *pred = self.predict_row(row, rules));
            }
        }

        predictions
    }

    /// Structural copy of the forest with training bookkeeping dropped.
    pub fn snapshot(&self) -> Forest {
        Forest {
            trees: self.trees.iter().map(DecisionTree::snapshot).collect(),
        }
    }
}

/// Append-only history of retained forests, one entry per kept MCMC
/// iteration. Entries are immutable once appended and queryable for
/// prediction on arbitrary covariate rows.
#[derive(Debug, Clone, Default)]
pub struct ForestSamples {
    /// The retained forest snapshots, in retention order.
    pub forests: Vec<Forest>,
}

impl ForestSamples {
    /// Creates an empty snapshot sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a structural snapshot of `forest`.
    pub fn append(&mut self, forest: &Forest) {
        self.forests.push(forest.snapshot());
    }

    /// Number of retained snapshots.
    pub fn len(&self) -> usize {
        self.forests.len()
    }

    /// Whether any snapshot has been retained yet.
    pub fn is_empty(&self) -> bool {
        self.forests.is_empty()
    }

    /// Predictions of every retained snapshot for every row of `X`,
    /// arranged as `[n_rows, n_snapshots]`.
    pub fn predict(
        &self,
        X: &Array2<f64>,
        rules: &[SplitRuleType],
        pool: Option<&ThreadPool>,
    ) -> Array2<f64> {
        let mut predictions = Array2::zeros((X.nrows(), self.forests.len()));

        for (draw, forest) in self.forests.iter().enumerate() {
            predictions
                .index_axis_mut(Axis(1), draw)
                .assign(&forest.predict(X, rules, pool));
        }

        predictions
    }
}
