use rand::rngs::StdRng;
use rand::SeedableRng;

use cloglog_bart::split_rules::{CategoricalSplit, ContinuousSplit, SplitRule};

#[test]
fn test_continuous_split_rule() {
    let rule = ContinuousSplit;
    let mut rng = StdRng::seed_from_u64(0);

    let feature_values: Vec<f64> = (0..10).map(f64::from).collect();
    let split_value = rule.sample_split_value(&feature_values, &mut rng);

    assert!(split_value.is_some());
    assert!(feature_values.contains(&split_value.unwrap()));

    // Values smaller-or-equal to the split value are routed left
    assert!(rule.goes_left(3.0, 4.0));
    assert!(rule.goes_left(4.0, 4.0));
    assert!(!rule.goes_left(5.0, 4.0));
}

#[test]
fn test_continuous_split_rule_degenerate_candidates() {
    let rule = ContinuousSplit;
    let mut rng = StdRng::seed_from_u64(0);

    assert_eq!(rule.sample_split_value(&[1.0], &mut rng), None);
    assert_eq!(rule.sample_split_value(&[2.0, 2.0, 2.0], &mut rng), None);
    assert_eq!(rule.sample_split_value(&[], &mut rng), None);
}

#[test]
fn test_categorical_split_rule() {
    let rule = CategoricalSplit;
    let mut rng = StdRng::seed_from_u64(1);

    let feature_values: Vec<f64> = vec![1.0, 2.0, 3.0, 2.0];
    let split_value = rule.sample_split_value(&feature_values, &mut rng);

    assert!(split_value.is_some());
    assert!(feature_values.contains(&split_value.unwrap()));

    // Only the matching code is routed left
    assert!(rule.goes_left(2.0, 2.0));
    assert!(!rule.goes_left(3.0, 2.0));
    assert!(!rule.goes_left(1.0, 2.0));
}

#[test]
fn test_categorical_split_rule_homogeneous_candidates() {
    let rule = CategoricalSplit;
    let mut rng = StdRng::seed_from_u64(1);

    assert_eq!(rule.sample_split_value(&[1.0, 1.0, 1.0, 1.0], &mut rng), None);
}
