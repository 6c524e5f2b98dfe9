//! The ensemble sampler: backfitting updates of the tree structures and leaf
//! values against the current augmented regression target.
//!
//! Two mutually exclusive structural algorithms share the residual
//! computation and marginal-likelihood criterion, selected once per
//! iteration by the driver:
//! - warm-start mode rebuilds each tree from an empty root by a greedy
//!   cutpoint-grid search, and
//! - standard mode proposes a single grow, prune, or change edit per tree,
//!   accepted through a Metropolis-Hastings ratio with leaf values
//!   integrated out under a Gaussian conjugate prior.
#![allow(non_snake_case)]

use std::collections::VecDeque;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::auxiliary::AuxiliaryData;
use crate::data::OrdinalData;
use crate::forest::{Forest, ForestSamples};
use crate::math::{cutpoint_grid, normalized_cumsum, unique_sorted};
use crate::model::CloglogBartSettings;
use crate::split_rules::SplitRuleType;
use crate::tree::DecisionTree;

const P_GROW: f64 = 0.5;
const P_PRUNE: f64 = 0.25;
// remaining proposal mass goes to change moves

/// Holds parameters and distributions used for sampling-related operations
/// on the tree structures.
pub struct TreeSamplingOps {
    /// Normal distribution to sample Gaussian distributed leaf values.
    pub normal: Normal<f64>,
    /// Prior weight of each feature being used as a splitting variable.
    pub alpha_vec: Vec<f64>,
    /// Cumulative probability table over split features.
    pub splitting_probs: Vec<f64>,
    /// Parameter contained within [0, 1] used to control node depth.
    pub alpha: f64,
    /// Parameter contained within [0, infinity] used to control node depth.
    pub beta: f64,
}

impl TreeSamplingOps {
    /// Prior probability that a node at `depth` is a split node.
    pub fn split_prob(&self, depth: usize) -> f64 {
        self.alpha * (1.0 + depth as f64).powf(-self.beta)
    }

    /// Sample the index of a feature to split on.
    ///
    /// Sampling of splitting variables is proportional to `alpha_vec`.
    pub fn sample_split_feature(&self, rng: &mut StdRng) -> usize {
        let p = rng.gen::<f64>();
        for (idx, value) in self.splitting_probs.iter().enumerate() {
            if p <= *value {
                return idx;
            }
        }

        self.splitting_probs.len() - 1
    }
}

/// Mutates one active forest toward higher posterior density given the
/// current regression target and the tree-structure prior.
pub struct ForestSampler {
    /// Sampling operations shared by all structural moves.
    pub tree_ops: TreeSamplingOps,
    /// Per-feature split rule strategies.
    pub split_rules: Vec<SplitRuleType>,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Minimum number of training rows per leaf.
    pub min_samples_leaf: usize,
    /// Maximum number of candidate thresholds per feature in the warm-start
    /// grid search.
    pub cutpoint_grid_size: usize,
    /// Standard deviation of the Gaussian prior on leaf values.
    pub leaf_scale: f64,
}

impl ForestSampler {
    /// Creates a `ForestSampler` for the given data and settings.
    pub fn new(data: &OrdinalData, settings: &CloglogBartSettings) -> Self {
        let alpha_vec = data.variable_weights().to_vec();
        let splitting_probs = normalized_cumsum(&alpha_vec);

        let tree_ops = TreeSamplingOps {
            normal: Normal::new(0.0, 1.0).unwrap(),
            alpha_vec,
            splitting_probs,
            alpha: settings.alpha,
            beta: settings.beta,
        };

        Self {
            tree_ops,
            split_rules: data.split_rules(),
            max_depth: settings.max_depth,
            min_samples_leaf: settings.min_samples_leaf,
            cutpoint_grid_size: settings.cutpoint_grid_size,
            leaf_scale: settings
                .leaf_scale
                .unwrap_or(2.0 / (settings.n_trees as f64).sqrt()),
        }
    }

    /// Runs one backfitting pass over every tree in `forest`.
    ///
    /// The regression target is the working response of the augmented
    /// likelihood, `target_i = lambda_i + 1 - z_i`, formed once from the
    /// auxiliary store and held fixed for the whole pass. Each tree sees the
    /// partial residual `target - (sum of the other trees)`, gets one
    /// structural update (grid-grown in warm-start mode, a single
    /// Metropolis-Hastings edit otherwise), and has all its leaf values
    /// redrawn from their conjugate posterior. When `persist` is set, an
    /// immutable snapshot of the updated forest is appended to `snapshots`.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &self,
        forest: &mut Forest,
        snapshots: &mut ForestSamples,
        data: &OrdinalData,
        aux: &AuxiliaryData,
        warm_start: bool,
        persist: bool,
        rng: &mut StdRng,
    ) {
        let X = data.X();
        let n = data.n_rows();
        let target = &aux.forest_pred + 1.0 - &aux.latent;
        let mut predictions = aux.forest_pred.clone();

        for tree_id in 0..forest.trees.len() {
            let old_predictions = forest.trees[tree_id].training_predictions(n);
            let residual = &target - &predictions + &old_predictions;

            let tree = &mut forest.trees[tree_id];
            if warm_start {
                *tree = self.grow_from_root(data, &residual);
            } else {
                self.mh_step(tree, X, &residual, rng);
            }
            self.draw_leaf_values(tree, &residual, rng);

            let new_predictions = tree.training_predictions(n);
            predictions = predictions - old_predictions + new_predictions;
        }

        if persist {
            snapshots.append(forest);
        }
    }

    /// Log marginal likelihood of a node holding `n` rows with residual sum
    /// `s`, leaf value integrated out under its `N(0, leaf_scale^2)` prior
    /// and unit error variance. Terms shared by every partition of the same
    /// rows are dropped.
    fn log_marginal(&self, n: usize, s: f64) -> f64 {
        let t2 = self.leaf_scale * self.leaf_scale;
        let denom = 1.0 + n as f64 * t2;
        -0.5 * denom.ln() + t2 * s * s / (2.0 * denom)
    }

    /// Redraws every leaf value of `tree` from its conjugate Gaussian
    /// posterior given the partial residuals.
    fn draw_leaf_values(&self, tree: &mut DecisionTree, residual: &Array1<f64>, rng: &mut StdRng) {
        let t2 = self.leaf_scale * self.leaf_scale;
        for leaf in tree.leaf_nodes() {
            let rows = &tree.node_samples[leaf];
            let s = residual_sum(residual, rows);
            let denom = 1.0 + rows.len() as f64 * t2;
            let mean = t2 * s / denom;
            let sd = (t2 / denom).sqrt();
            tree.value[leaf] = mean + sd * self.tree_ops.normal.sample(rng);
        }
    }

    fn partition_rows(
        &self,
        X: &Array2<f64>,
        feature: usize,
        rows: &[usize],
        split_value: f64,
    ) -> (Vec<usize>, Vec<usize>) {
        let rule = &self.split_rules[feature];
        rows.iter()
            .copied()
            .partition(|&i| rule.goes_left(X[[i, feature]], split_value))
    }

    /// Rebuilds a tree from an empty root by greedy growth: every leaf is
    /// expanded with the feature/threshold pair maximizing the split
    /// marginal likelihood plus the depth prior, as long as that criterion
    /// beats not splitting and the depth and leaf-size bounds allow it.
    fn grow_from_root(&self, data: &OrdinalData, residual: &Array1<f64>) -> DecisionTree {
        let X = data.X();
        let mut tree = DecisionTree::new(0.0, data.n_rows());
        let mut expansion_nodes = VecDeque::from([0usize]);

        while let Some(node) = expansion_nodes.pop_front() {
            let depth = tree.node_depth(node);
            if depth >= self.max_depth {
                continue;
            }
            let rows = tree.node_samples[node].clone();
            if rows.len() < 2 * self.min_samples_leaf {
                continue;
            }

            let node_sum = residual_sum(residual, &rows);
            let p_split = self.tree_ops.split_prob(depth);
            let p_child = self.tree_ops.split_prob(depth + 1);
            let no_split = self.log_marginal(rows.len(), node_sum) + (1.0 - p_split).ln();
            let split_bonus = p_split.ln() + 2.0 * (1.0 - p_child).ln();

            let mut best: Option<(usize, f64, f64)> = None;
            for feature in 0..data.n_features() {
                if self.tree_ops.alpha_vec[feature] <= 0.0 {
                    continue;
                }
                let rule = &self.split_rules[feature];
                let values: Vec<f64> = rows.iter().map(|&i| X[[i, feature]]).collect();
                let candidates = match rule {
                    SplitRuleType::Continuous(_) => {
                        cutpoint_grid(&values, self.cutpoint_grid_size)
                    }
                    SplitRuleType::Categorical(_) => unique_sorted(&values),
                };

                for &threshold in &candidates {
                    let mut n_left = 0usize;
                    let mut s_left = 0.0;
                    for &i in &rows {
                        if rule.goes_left(X[[i, feature]], threshold) {
                            n_left += 1;
                            s_left += residual[i];
                        }
                    }
                    let n_right = rows.len() - n_left;
                    if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                        continue;
                    }

                    let criterion = self.log_marginal(n_left, s_left)
                        + self.log_marginal(n_right, node_sum - s_left)
                        + split_bonus;
                    if best.map_or(true, |(_, _, c)| criterion > c) {
                        best = Some((feature, threshold, criterion));
                    }
                }
            }

            if let Some((feature, threshold, criterion)) = best {
                if criterion > no_split {
                    let (left_rows, right_rows) =
                        self.partition_rows(X, feature, &rows, threshold);
                    if let Ok((left, right)) =
                        tree.split_node(node, feature, threshold, left_rows, right_rows)
                    {
                        expansion_nodes.push_back(left);
                        expansion_nodes.push_back(right);
                    }
                }
            }
        }

        tree
    }

    /// One Metropolis-Hastings structural edit: grow, prune, or change.
    /// Rejected proposals leave the tree untouched; that is a normal
    /// sampling outcome, not an error.
    fn mh_step(&self, tree: &mut DecisionTree, X: &Array2<f64>, residual: &Array1<f64>, rng: &mut StdRng) {
        let u = rng.gen::<f64>();
        if u < P_GROW {
            self.grow_move(tree, X, residual, rng);
        } else if u < P_GROW + P_PRUNE {
            self.prune_move(tree, residual, rng);
        } else {
            self.change_move(tree, X, residual, rng);
        }
    }

    fn grow_move(&self, tree: &mut DecisionTree, X: &Array2<f64>, residual: &Array1<f64>, rng: &mut StdRng) {
        let leaves = tree.leaf_nodes();
        let leaf = leaves[rng.gen_range(0..leaves.len())];
        let depth = tree.node_depth(leaf);
        if depth >= self.max_depth {
            return;
        }
        let rows = &tree.node_samples[leaf];
        if rows.len() < 2 * self.min_samples_leaf {
            return;
        }

        let feature = self.tree_ops.sample_split_feature(rng);
        let values: Vec<f64> = rows
            .iter()
            .map(|&i| X[[i, feature]])
            .filter(|x| x.is_finite())
            .collect();
        let split_value = match self.split_rules[feature].sample_split_value(&values, rng) {
            Some(value) => value,
            None => return,
        };

        let (left_rows, right_rows) = self.partition_rows(X, feature, rows, split_value);
        if left_rows.len() < self.min_samples_leaf || right_rows.len() < self.min_samples_leaf {
            return;
        }

        let s_left = residual_sum(residual, &left_rows);
        let s_right = residual_sum(residual, &right_rows);
        let p_split = self.tree_ops.split_prob(depth);
        let p_child = self.tree_ops.split_prob(depth + 1);
        // Growing this leaf turns it into a no-grandchildren node and can
        // only strip that status from its parent.
        let parent_was_nog = tree.parent[leaf].map_or(false, |p| tree.is_nog(p));
        let n_nog_after = tree.nog_nodes().len() + 1 - usize::from(parent_was_nog);

        let log_likelihood = self.log_marginal(left_rows.len(), s_left)
            + self.log_marginal(right_rows.len(), s_right)
            - self.log_marginal(left_rows.len() + right_rows.len(), s_left + s_right);
        let log_prior = p_split.ln() + 2.0 * (1.0 - p_child).ln() - (1.0 - p_split).ln();
        let log_proposal =
            (P_PRUNE / P_GROW).ln() + (leaves.len() as f64 / n_nog_after as f64).ln();

        if rng.gen::<f64>().ln() < log_likelihood + log_prior + log_proposal {
            let _ = tree.split_node(leaf, feature, split_value, left_rows, right_rows);
        }
    }

    fn prune_move(&self, tree: &mut DecisionTree, residual: &Array1<f64>, rng: &mut StdRng) {
        let nogs = tree.nog_nodes();
        if nogs.is_empty() {
            return;
        }
        let node = nogs[rng.gen_range(0..nogs.len())];
        let (left, right) = match (tree.left[node], tree.right[node]) {
            (Some(left), Some(right)) => (left, right),
            _ => return,
        };
        let depth = tree.node_depth(node);

        let n_left = tree.node_samples[left].len();
        let n_right = tree.node_samples[right].len();
        let s_left = residual_sum(residual, &tree.node_samples[left]);
        let s_right = residual_sum(residual, &tree.node_samples[right]);
        let p_split = self.tree_ops.split_prob(depth);
        let p_child = self.tree_ops.split_prob(depth + 1);
        let n_leaves_after = tree.leaf_nodes().len() - 1;

        let log_likelihood = self.log_marginal(n_left + n_right, s_left + s_right)
            - self.log_marginal(n_left, s_left)
            - self.log_marginal(n_right, s_right);
        let log_prior = (1.0 - p_split).ln() - p_split.ln() - 2.0 * (1.0 - p_child).ln();
        let log_proposal =
            (P_GROW / P_PRUNE).ln() + (nogs.len() as f64 / n_leaves_after as f64).ln();

        if rng.gen::<f64>().ln() < log_likelihood + log_prior + log_proposal {
            let _ = tree.prune_node(node);
        }
    }

    fn change_move(&self, tree: &mut DecisionTree, X: &Array2<f64>, residual: &Array1<f64>, rng: &mut StdRng) {
        let nogs = tree.nog_nodes();
        if nogs.is_empty() {
            return;
        }
        let node = nogs[rng.gen_range(0..nogs.len())];
        let (left, right) = match (tree.left[node], tree.right[node]) {
            (Some(left), Some(right)) => (left, right),
            _ => return,
        };
        let rows = &tree.node_samples[node];

        let feature = self.tree_ops.sample_split_feature(rng);
        let values: Vec<f64> = rows
            .iter()
            .map(|&i| X[[i, feature]])
            .filter(|x| x.is_finite())
            .collect();
        let split_value = match self.split_rules[feature].sample_split_value(&values, rng) {
            Some(value) => value,
            None => return,
        };

        let (left_rows, right_rows) = self.partition_rows(X, feature, rows, split_value);
        if left_rows.len() < self.min_samples_leaf || right_rows.len() < self.min_samples_leaf {
            return;
        }

        let log_likelihood = self.log_marginal(left_rows.len(), residual_sum(residual, &left_rows))
            + self.log_marginal(right_rows.len(), residual_sum(residual, &right_rows))
            - self.log_marginal(
                tree.node_samples[left].len(),
                residual_sum(residual, &tree.node_samples[left]),
            )
            - self.log_marginal(
                tree.node_samples[right].len(),
                residual_sum(residual, &tree.node_samples[right]),
            );

        if rng.gen::<f64>().ln() < log_likelihood {
            let _ = tree.change_split(node, feature, split_value, left_rows, right_rows);
        }
    }
}

fn residual_sum(residual: &Array1<f64>, rows: &[usize]) -> f64 {
    rows.iter().map(|&i| residual[i]).sum()
}
