//! The ordinal augmentation sampler: exact conditional draws of the latent
//! exponential variables and the log-scale cutpoints, plus the cumulative
//! refresh of the derived boundary sums.
//!
//! One iteration runs three steps in a fixed order, each depending on the
//! previous having completed: latent update, cutpoint update, cumulative
//! refresh. The driver enforces the ordering; this module only performs the
//! draws.
//!
//! The model is the proportional-hazards representation of the cloglog link:
//! with boundaries `c_k = sum_{j<k} exp(gamma_j)` and forest prediction
//! `lambda_i`, the outcome satisfies
//! `P(Y_i <= k) = 1 - exp(-c_{k+1} * exp(lambda_i))`, which the latent
//! `z_i ~ Exp(1)` realizes through `Y_i = k  <=>  z_i in
//! (c_k e^{lambda_i}, c_{k+1} e^{lambda_i}]`.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::Exp1;
use statrs::distribution::{ContinuousCDF, Gamma};
use thiserror::Error;

use crate::auxiliary::AuxiliaryData;

/// Numerical and state errors raised by the augmentation steps. All are
/// fatal: substituting a default and continuing would corrupt the
/// stationary distribution of the chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrdinalError {
    /// An outcome category lies outside the configured level range.
    #[error("outcome category {category} is outside the valid range [0, {n_levels})")]
    CategoryOutOfRange {
        /// Offending category value.
        category: usize,
        /// Configured number of ordinal levels.
        n_levels: usize,
    },
    /// A latent truncation interval collapsed or overflowed; the forest
    /// predictions or cutpoints have degenerated numerically.
    #[error("latent truncation interval is empty; forest predictions or cutpoints are degenerate")]
    EmptyTruncationInterval,
    /// A cutpoint draw produced a non-finite or non-positive value.
    #[error("cutpoint draw produced a non-finite value")]
    NonFiniteCutpoint,
}

/// Gibbs sampler for the latent variables and cutpoints of the augmented
/// ordinal model.
#[derive(Debug, Clone, Copy)]
pub struct OrdinalSampler {
    /// Shape of the Gamma prior on each exponentiated free cutpoint.
    pub alpha_gamma: f64,
    /// Rate of the Gamma prior on each exponentiated free cutpoint.
    pub beta_gamma: f64,
}

impl OrdinalSampler {
    /// Creates a sampler with the given Gamma prior on `exp(gamma_k)`.
    pub fn new(alpha_gamma: f64, beta_gamma: f64) -> Self {
        Self {
            alpha_gamma,
            beta_gamma,
        }
    }

    /// Draws every latent variable from a unit-rate exponential truncated to
    /// the interval selected by its outcome category.
    ///
    /// For `y_i = k` the interval is `(c_k e^{lambda_i}, c_{k+1} e^{lambda_i}]`
    /// with `c_K = +infinity`. The draw inverts the truncated-exponential CDF
    /// directly, so it is exact and O(1) per observation.
    pub fn update_latent(
        &self,
        aux: &mut AuxiliaryData,
        y: &Array1<usize>,
        rng: &mut StdRng,
    ) -> Result<(), OrdinalError> {
        let n_levels = aux.cum_exp_gamma.len();

        for (i, &category) in y.iter().enumerate() {
            if category >= n_levels {
                return Err(OrdinalError::CategoryOutOfRange {
                    category,
                    n_levels,
                });
            }

            let scale = aux.forest_pred[i].exp();
            let lower = aux.cum_exp_gamma[category] * scale;
            if !lower.is_finite() {
                return Err(OrdinalError::EmptyTruncationInterval);
            }

            let z = if category + 1 < n_levels {
                let upper = aux.cum_exp_gamma[category + 1] * scale;
                let width = upper - lower;
                if !(width > 0.0) || !width.is_finite() {
                    return Err(OrdinalError::EmptyTruncationInterval);
                }
                // Inverse CDF of Exp(1) on (lower, upper]; u in (0, 1] maps
                // the endpoints onto the half-open interval.
                let u = 1.0 - rng.gen::<f64>();
                let delta = -(-width).exp_m1();
                lower - (-u * delta).ln_1p()
            } else {
                // Top category: unbounded above, memoryless tail draw.
                lower + rng.sample::<f64, _>(Exp1)
            };

            if !z.is_finite() || !(z > 0.0) {
                return Err(OrdinalError::EmptyTruncationInterval);
            }
            aux.latent[i] = z;
        }

        Ok(())
    }

    /// Draws every free cutpoint from its exact conditional posterior.
    ///
    /// Holding fixed the rescaled excesses `r_i = z_i e^{-lambda_i} - c_{y_i}`,
    /// the augmented likelihood factorizes over the exponentiated cutpoints,
    /// and `exp(gamma_k)` is conditionally
    /// `Gamma(alpha_gamma, beta_gamma + sum_{y_i > k} e^{lambda_i})`
    /// truncated below at `max_{y_i = k} r_i`: observations beyond boundary
    /// `k` contribute rate mass, observations failing at boundary `k`
    /// contribute the truncation bound. Any positive draw keeps the
    /// cumulative transform monotone, so no ordering repair is needed.
    ///
    /// Index 0 is the identifiability constraint `gamma_0 = 0` and is never
    /// redrawn.
    pub fn update_gamma(
        &self,
        aux: &mut AuxiliaryData,
        y: &Array1<usize>,
        rng: &mut StdRng,
    ) -> Result<(), OrdinalError> {
        let n_levels = aux.cum_exp_gamma.len();
        let n_gamma = aux.gamma.len();

        // Per-category hazard mass and largest rescaled excess.
        let mut exp_pred = vec![0.0_f64; n_levels];
        let mut max_excess = vec![0.0_f64; n_levels];
        for (i, &category) in y.iter().enumerate() {
            if category >= n_levels {
                return Err(OrdinalError::CategoryOutOfRange {
                    category,
                    n_levels,
                });
            }
            let lambda = aux.forest_pred[i];
            exp_pred[category] += lambda.exp();
            let excess = aux.latent[i] * (-lambda).exp() - aux.cum_exp_gamma[category];
            if excess > max_excess[category] {
                max_excess[category] = excess;
            }
        }

        // tail[k] = sum of e^{lambda_i} over observations with y_i > k
        let mut tail = vec![0.0_f64; n_levels];
        for k in (0..n_levels - 1).rev() {
            tail[k] = tail[k + 1] + exp_pred[k + 1];
        }

        for k in 1..n_gamma {
            let rate = self.beta_gamma + tail[k];
            let dist = Gamma::new(self.alpha_gamma, rate)
                .map_err(|_| OrdinalError::NonFiniteCutpoint)?;
            let floor = if max_excess[k] > 0.0 {
                dist.cdf(max_excess[k])
            } else {
                0.0
            };
            let u = floor + rng.gen::<f64>() * (1.0 - floor);
            let eta = dist.inverse_cdf(u);
            if !eta.is_finite() || !(eta > 0.0) {
                return Err(OrdinalError::NonFiniteCutpoint);
            }
            aux.gamma[k] = eta.ln();
        }

        Ok(())
    }

    /// Recomputes the cumulative exponentiated cutpoints from the current
    /// `gamma` vector: slot `k` receives `sum_{j<k} exp(gamma_j)`.
    ///
    /// Must run after every cutpoint update and before the latent update of
    /// the following iteration.
    pub fn update_cumulative_exp_sums(&self, aux: &mut AuxiliaryData) {
        let mut acc = 0.0;
        for k in 0..aux.cum_exp_gamma.len() {
            aux.cum_exp_gamma[k] = acc;
            if k < aux.gamma.len() {
                acc += aux.gamma[k].exp();
            }
        }
    }
}

/// Closed-form category probabilities implied by the cloglog link for one
/// observation: `P(Y = k) = exp(-c_k e^lambda) - exp(-c_{k+1} e^lambda)`,
/// with the top category taking the remaining tail mass.
///
/// `gamma` is the log-scale cutpoint vector of length `K - 1`; the returned
/// vector has length `K` and sums to one.
pub fn ordinal_probabilities(gamma: &[f64], lambda: f64) -> Vec<f64> {
    let n_levels = gamma.len() + 1;
    let scale = lambda.exp();

    let mut probabilities = Vec::with_capacity(n_levels);
    let mut cum = 0.0;
    let mut survival = 1.0;
    for &g in gamma {
        cum += g.exp();
        let next_survival = (-cum * scale).exp();
        probabilities.push(survival - next_survival);
        survival = next_survival;
    }
    probabilities.push(survival);

    probabilities
}
