use ndarray::array;

use cloglog_bart::split_rules::{ContinuousSplit, SplitRuleType};
use cloglog_bart::tree::DecisionTree;

#[test]
fn test_tree_primitives() {
    let mut tree = DecisionTree::new(0.5, 4);
    assert!(tree.is_leaf(0));
    assert_eq!(tree.leaf_nodes(), vec![0]);
    assert_eq!(tree.node_samples[0], vec![0, 1, 2, 3]);

    let (left, right) = tree
        .split_node(0, 0, 1500.0, vec![0, 1], vec![2, 3])
        .unwrap();

    // Test threshold value a node was split on
    assert_eq!(tree.threshold[0], 1500.0);

    // Test index of left and right children of split node
    assert_eq!(tree.left[0], Some(left));
    assert_eq!(tree.right[0], Some(right));

    // Test is leaf value
    assert!(!tree.is_leaf(0));
    assert!(tree.is_leaf(left));
    assert!(tree.is_leaf(right));
    assert!(tree.is_nog(0));

    // Test depth and sample bookkeeping
    assert_eq!(tree.node_depth(0), 0);
    assert_eq!(tree.node_depth(right), 1);
    assert_eq!(tree.node_samples[left], vec![0, 1]);
    assert_eq!(tree.node_samples[right], vec![2, 3]);
}

#[test]
fn test_split_non_leaf_fails() {
    let mut tree = DecisionTree::new(0.0, 4);
    tree.split_node(0, 0, 1.0, vec![0, 1], vec![2, 3]).unwrap();

    assert!(tree.split_node(0, 0, 2.0, vec![0], vec![1]).is_err());
}

#[test]
fn test_prune_restores_leaf_and_recycles_slots() {
    let mut tree = DecisionTree::new(0.0, 4);
    tree.split_node(0, 0, 1.0, vec![0, 1], vec![2, 3]).unwrap();
    let slots_before = tree.num_slots();

    tree.prune_node(0).unwrap();
    assert!(tree.is_leaf(0));
    assert_eq!(tree.leaf_nodes(), vec![0]);
    // The collapsed node keeps the union of its children's rows
    assert_eq!(tree.node_samples[0], vec![0, 1, 2, 3]);

    // Child slots released by the prune are reused by the next split
    tree.split_node(0, 1, 2.0, vec![0], vec![1, 2, 3]).unwrap();
    assert_eq!(tree.num_slots(), slots_before);
}

#[test]
fn test_prune_requires_leaf_children() {
    let mut tree = DecisionTree::new(0.0, 4);
    let (left, _) = tree.split_node(0, 0, 1.0, vec![0, 1], vec![2, 3]).unwrap();
    tree.split_node(left, 0, 0.5, vec![0], vec![1]).unwrap();

    assert!(tree.prune_node(0).is_err());
    assert!(tree.prune_node(left).is_ok());
}

#[test]
fn test_change_split_reroutes_rows() {
    let mut tree = DecisionTree::new(0.0, 4);
    let (left, right) = tree.split_node(0, 0, 1.0, vec![0, 1], vec![2, 3]).unwrap();

    tree.change_split(0, 1, 7.0, vec![0], vec![1, 2, 3]).unwrap();

    assert_eq!(tree.feature[0], 1);
    assert_eq!(tree.threshold[0], 7.0);
    assert_eq!(tree.node_samples[left], vec![0]);
    assert_eq!(tree.node_samples[right], vec![1, 2, 3]);
}

#[test]
fn test_predict_row_routes_by_threshold() {
    let mut tree = DecisionTree::new(0.0, 5);
    let (left, right) = tree
        .split_node(0, 0, 2.5, vec![0, 1, 2], vec![3, 4])
        .unwrap();
    tree.value[left] = -1.0;
    tree.value[right] = 3.0;

    let rules = vec![SplitRuleType::Continuous(ContinuousSplit)];
    let X = array![[2.0], [2.5], [4.0]];

    assert_eq!(tree.predict_row(X.row(0), &rules), -1.0);
    // Values equal to the threshold are routed left
    assert_eq!(tree.predict_row(X.row(1), &rules), -1.0);
    assert_eq!(tree.predict_row(X.row(2), &rules), 3.0);
}

#[test]
fn test_training_predictions_use_cached_rows() {
    let mut tree = DecisionTree::new(0.0, 5);
    let (left, right) = tree
        .split_node(0, 0, 2.5, vec![0, 1, 2], vec![3, 4])
        .unwrap();
    tree.value[left] = -1.0;
    tree.value[right] = 3.0;

    let predictions = tree.training_predictions(5);
    assert_eq!(predictions, array![-1.0, -1.0, -1.0, 3.0, 3.0]);
}

#[test]
fn test_snapshot_drops_training_bookkeeping() {
    let mut tree = DecisionTree::new(0.0, 4);
    let (left, right) = tree.split_node(0, 0, 1.0, vec![0, 1], vec![2, 3]).unwrap();
    tree.value[left] = 1.0;
    tree.value[right] = 2.0;

    let snapshot = tree.snapshot();
    assert!(snapshot.node_samples.iter().all(Vec::is_empty));

    let rules = vec![SplitRuleType::Continuous(ContinuousSplit)];
    let X = array![[0.0], [5.0]];
    assert_eq!(snapshot.predict_row(X.row(0), &rules), 1.0);
    assert_eq!(snapshot.predict_row(X.row(1), &rules), 2.0);
}
