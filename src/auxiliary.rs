//! Shared per-observation scratch state for the augmented ordinal model.
//!
//! The auxiliary store is the single piece of mutable state touched by both
//! the ensemble sampler (which reads the latent variables and forest
//! predictions to form its regression target) and the ordinal augmentation
//! sampler (which reads and writes all four arrays). It performs no ordering
//! or synchronization of its own; the MCMC driver owns the step-order
//! contract of one iteration.

use ndarray::Array1;

/// Parallel scratch arrays shared by the samplers, zero-initialized at the
/// start of a fit.
#[derive(Debug, Clone)]
pub struct AuxiliaryData {
    /// Latent exponential variable `z_i`, one slot per training observation.
    pub latent: Array1<f64>,
    /// Current forest prediction `lambda_i` for the training set.
    pub forest_pred: Array1<f64>,
    /// Current forest prediction for the held-out set; empty when no
    /// held-out covariates are configured.
    pub forest_pred_test: Array1<f64>,
    /// Log-scale cutpoints `gamma_0..gamma_{K-2}`; index 0 is pinned to zero
    /// for identifiability and never redrawn.
    pub gamma: Array1<f64>,
    /// Cumulative exponentiated cutpoints: slot `k` holds
    /// `sum_{j < k} exp(gamma_j)`, so the array has `K` entries and is
    /// non-decreasing. Recomputed from `gamma`, never mutated on its own.
    pub cum_exp_gamma: Array1<f64>,
}

impl AuxiliaryData {
    /// Creates a zero-initialized store for `n_train` observations,
    /// `n_test` held-out rows, and `n_levels` ordinal categories.
    pub fn new(n_train: usize, n_test: usize, n_levels: usize) -> Self {
        Self {
            latent: Array1::zeros(n_train),
            forest_pred: Array1::zeros(n_train),
            forest_pred_test: Array1::zeros(n_test),
            gamma: Array1::zeros(n_levels - 1),
            cum_exp_gamma: Array1::zeros(n_levels),
        }
    }
}
