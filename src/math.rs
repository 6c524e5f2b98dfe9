//! Small numeric helpers shared by the samplers.

/// Cumulative sum of `v` normalized by its total, used as an inverse-CDF
/// table for sampling split features proportional to their weights.
pub fn normalized_cumsum(v: &[f64]) -> Vec<f64> {
    let total: f64 = v.iter().sum();
    v.iter()
        .scan(0f64, |state, item| {
            *state += *item;
            Some(*state / total)
        })
        .collect()
}

/// Sorted, deduplicated copy of `values` with non-finite entries dropped.
pub fn unique_sorted(values: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out.dedup();
    out
}

/// Candidate split thresholds for a set of observed feature values.
///
/// Returns every distinct value when there are at most `grid_size` of them,
/// otherwise `grid_size` evenly spaced order statistics.
pub fn cutpoint_grid(values: &[f64], grid_size: usize) -> Vec<f64> {
    let unique = unique_sorted(values);
    if unique.len() <= grid_size || grid_size < 2 {
        return unique;
    }

    (0..grid_size)
        .map(|i| unique[i * (unique.len() - 1) / (grid_size - 1)])
        .collect()
}
