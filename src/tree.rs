//! A binary decision tree is the core data structure of the BART ensemble.
//! The tree is implemented using an array (vector) representation with
//! explicit parent/child links so nodes can be grown and pruned in place.

use core::fmt;

use ndarray::{Array1, ArrayView1};

use crate::split_rules::SplitRuleType;

/// A `DecisionTree` is an array-based implementation of the binary decision tree.
///
/// The `i-th` element of each vector holds information about node `i`. Node 0
/// is the tree's root. Some of the vectors only apply to either leaves or
/// split nodes. In this case, the values of the nodes of the other vectors is
/// arbitrary. For example, `feature` and `threshold` only apply to split
/// nodes, and `value` only to leaves. Slots released by pruning are recycled
/// through a free list, so node indices stay stable for the nodes that
/// remain.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    /// Stores the feature index for splitting at the i'th node.
    pub feature: Vec<usize>,
    /// Stores the threshold value for the i'th node split.
    pub threshold: Vec<f64>,
    /// Stores the output value for the i'th node.
    pub value: Vec<f64>,
    /// Parent link of the i'th node; `None` for the root.
    pub parent: Vec<Option<usize>>,
    /// Left child link of the i'th node; `None` for leaves.
    pub left: Vec<Option<usize>>,
    /// Right child link of the i'th node; `None` for leaves.
    pub right: Vec<Option<usize>>,
    /// Indices of the training rows routed through the i'th node.
    pub node_samples: Vec<Vec<usize>>,
    free_slots: Vec<usize>,
}

/// Represents errors related to binary decision tree operations.
#[derive(Debug)]
pub enum TreeError {
    /// When attempting to split a leaf node, if the node is not a leaf.
    NonLeafSplit,
    /// When attempting to prune or change a node whose children are not leaves.
    NonLeafChildren,
    /// When the passed node index does not exist.
    InvalidNodeIndex,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TreeError::NonLeafSplit => write!(f, "Cannot split a non-leaf node"),
            TreeError::NonLeafChildren => write!(f, "Node children must be leaves"),
            TreeError::InvalidNodeIndex => write!(f, "Node index does not exist"),
        }
    }
}

impl DecisionTree {
    /// Creates a new `DecisionTree` with an initial value set as the root
    /// node. The root starts out holding every training row.
    pub fn new(init_value: f64, num_samples: usize) -> Self {
        Self {
            feature: vec![0],
            threshold: vec![0.0],
            value: vec![init_value],
            parent: vec![None],
            left: vec![None],
            right: vec![None],
            node_samples: vec![Vec::from_iter(0..num_samples)],
            free_slots: Vec::new(),
        }
    }

    /// Number of allocated node slots (including recycled ones).
    pub fn num_slots(&self) -> usize {
        self.feature.len()
    }

    fn add_node(&mut self, value: f64, parent: usize) -> usize {
        if let Some(idx) = self.free_slots.pop() {
            self.feature[idx] = 0;
            self.threshold[idx] = 0.0;
            self.value[idx] = value;
            self.parent[idx] = Some(parent);
            self.left[idx] = None;
            self.right[idx] = None;
            idx
        } else {
            self.feature.push(0);
            self.threshold.push(0.0);
            self.value.push(value);
            self.parent.push(Some(parent));
            self.left.push(None);
            self.right.push(None);
            self.node_samples.push(Vec::new());
            self.feature.len() - 1
        }
    }

    /// Checks whether the passed index is a leaf node.
    pub fn is_leaf(&self, index: usize) -> bool {
        self.left[index].is_none()
    }

    /// Checks whether the passed index is an internal node whose children are
    /// both leaves ("no grandchildren").
    pub fn is_nog(&self, index: usize) -> bool {
        match (self.left[index], self.right[index]) {
            (Some(l), Some(r)) => self.is_leaf(l) && self.is_leaf(r),
            _ => false,
        }
    }

    /// Computes the depth of _this_ node by walking its parent links.
    #[inline]
    pub fn node_depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = index;

        while let Some(parent) = self.parent[current] {
            depth += 1;
            current = parent;
        }

        depth
    }

    /// Indices of the current leaf nodes, in depth-first order.
    pub fn leaf_nodes(&self) -> Vec<usize> {
        let mut leaves = Vec::new();
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            match (self.left[index], self.right[index]) {
                (Some(l), Some(r)) => {
                    stack.push(r);
                    stack.push(l);
                }
                _ => leaves.push(index),
            }
        }
        leaves
    }

    /// Indices of the current no-grandchildren nodes, in depth-first order.
    pub fn nog_nodes(&self) -> Vec<usize> {
        let mut nogs = Vec::new();
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            if let (Some(l), Some(r)) = (self.left[index], self.right[index]) {
                if self.is_leaf(l) && self.is_leaf(r) {
                    nogs.push(index);
                } else {
                    stack.push(r);
                    stack.push(l);
                }
            }
        }
        nogs
    }

    /// Splits a leaf node into an internal node with two leaf children
    /// holding the given training-row partitions.
    pub fn split_node(
        &mut self,
        node_index: usize,
        feature: usize,
        threshold: f64,
        left_rows: Vec<usize>,
        right_rows: Vec<usize>,
    ) -> Result<(usize, usize), TreeError> {
        if node_index >= self.value.len() {
            return Err(TreeError::InvalidNodeIndex);
        }

        if !self.is_leaf(node_index) {
            return Err(TreeError::NonLeafSplit);
        }

        // Update the current node
        self.feature[node_index] = feature;
        self.threshold[node_index] = threshold;

        // Add new left and right leaf nodes
        let left_index = self.add_node(0.0, node_index);
        let right_index = self.add_node(0.0, node_index);
        self.left[node_index] = Some(left_index);
        self.right[node_index] = Some(right_index);
        self.node_samples[left_index] = left_rows;
        self.node_samples[right_index] = right_rows;

        Ok((left_index, right_index))
    }

    /// Collapses an internal node with two leaf children back into a leaf,
    /// releasing the child slots for reuse.
    pub fn prune_node(&mut self, node_index: usize) -> Result<(), TreeError> {
        if node_index >= self.value.len() {
            return Err(TreeError::InvalidNodeIndex);
        }

        let (left_index, right_index) = match (self.left[node_index], self.right[node_index]) {
            (Some(l), Some(r)) => (l, r),
            _ => return Err(TreeError::NonLeafChildren),
        };
        if !self.is_leaf(left_index) || !self.is_leaf(right_index) {
            return Err(TreeError::NonLeafChildren);
        }

        self.node_samples[left_index].clear();
        self.node_samples[right_index].clear();
        self.left[node_index] = None;
        self.right[node_index] = None;
        self.free_slots.push(left_index);
        self.free_slots.push(right_index);

        Ok(())
    }

    /// Replaces the split rule of a no-grandchildren node, re-routing its
    /// training rows into the existing leaf children.
    pub fn change_split(
        &mut self,
        node_index: usize,
        feature: usize,
        threshold: f64,
        left_rows: Vec<usize>,
        right_rows: Vec<usize>,
    ) -> Result<(), TreeError> {
        if node_index >= self.value.len() {
            return Err(TreeError::InvalidNodeIndex);
        }

        if !self.is_nog(node_index) {
            return Err(TreeError::NonLeafChildren);
        }

        self.feature[node_index] = feature;
        self.threshold[node_index] = threshold;
        let (left_index, right_index) = (self.left[node_index], self.right[node_index]);
        if let (Some(l), Some(r)) = (left_index, right_index) {
            self.node_samples[l] = left_rows;
            self.node_samples[r] = right_rows;
        }

        Ok(())
    }

    /// Routes a single observation down the tree and returns its leaf value.
    pub fn predict_row(&self, row: ArrayView1<f64>, rules: &[SplitRuleType]) -> f64 {
        let mut node = 0;
        loop {
            match (self.left[node], self.right[node]) {
                (Some(l), Some(r)) => {
                    let feature = self.feature[node];
                    node = if rules[feature].goes_left(row[feature], self.threshold[node]) {
                        l
                    } else {
                        r
                    };
                }
                _ => return self.value[node],
            }
        }
    }

    /// Predictions for the full training set using the cached per-leaf row
    /// lists instead of routing every row from the root.
    pub fn training_predictions(&self, num_samples: usize) -> Array1<f64> {
        let mut predictions = Array1::zeros(num_samples);

        for leaf in self.leaf_nodes() {
            let leaf_value = self.value[leaf];
            for &row in &self.node_samples[leaf] {
                predictions[row] = leaf_value;
            }
        }

        predictions
    }

    /// Structural copy of this tree with the training bookkeeping dropped.
    pub fn snapshot(&self) -> DecisionTree {
        DecisionTree {
            feature: self.feature.clone(),
            threshold: self.threshold.clone(),
            value: self.value.clone(),
            parent: self.parent.clone(),
            left: self.left.clone(),
            right: self.right.clone(),
            node_samples: vec![Vec::new(); self.node_samples.len()],
            free_slots: self.free_slots.clone(),
        }
    }
}
