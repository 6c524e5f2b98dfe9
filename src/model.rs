//! The MCMC driver for cloglog ordinal BART: owns the iteration loop, the
//! warm-start/burn-in/retained phase logic, sample retention and thinning,
//! and the output sample containers.
#![allow(non_snake_case)]

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::{ThreadPool, ThreadPoolBuilder};
use thiserror::Error;

use crate::auxiliary::AuxiliaryData;
use crate::data::{DataError, FeatureType, OrdinalData};
use crate::forest::{Forest, ForestSamples};
use crate::ordinal::{OrdinalError, OrdinalSampler};
use crate::sampler::ForestSampler;
use crate::split_rules::SplitRuleType;

/// Settings for one cloglog ordinal BART fit. All fields are defaulted and
/// overridable.
#[derive(Debug, Clone)]
pub struct CloglogBartSettings {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Number of warm-start iterations using grow-from-root rebuilds.
    pub num_warmstart: usize,
    /// Number of burn-in iterations of the Metropolis-Hastings sampler.
    pub num_burnin: usize,
    /// Number of retained iterations (before thinning).
    pub num_mcmc: usize,
    /// Thinning interval for retained iterations.
    pub thin: usize,
    /// Depth-prior base parameter, contained within [0, 1].
    pub alpha: f64,
    /// Depth-prior decay parameter, contained within [0, infinity].
    pub beta: f64,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Minimum number of training rows per leaf.
    pub min_samples_leaf: usize,
    /// Standard deviation of the Gaussian prior on leaf values;
    /// `None` resolves to `2 / sqrt(n_trees)`.
    pub leaf_scale: Option<f64>,
    /// Maximum number of candidate thresholds per feature in the warm-start
    /// grid search.
    pub cutpoint_grid_size: usize,
    /// Shape of the Gamma prior on exponentiated free cutpoints.
    pub alpha_gamma: f64,
    /// Rate of the Gamma prior on exponentiated free cutpoints.
    pub beta_gamma: f64,
    /// Random seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Number of worker threads for the prediction passes.
    pub num_threads: usize,
}

impl Default for CloglogBartSettings {
    fn default() -> Self {
        Self {
            n_trees: 50,
            num_warmstart: 0,
            num_burnin: 1000,
            num_mcmc: 500,
            thin: 1,
            alpha: 0.95,
            beta: 2.0,
            max_depth: 10,
            min_samples_leaf: 5,
            leaf_scale: None,
            cutpoint_grid_size: 100,
            alpha_gamma: 2.0,
            beta_gamma: 2.0,
            seed: None,
            num_threads: 1,
        }
    }
}

impl CloglogBartSettings {
    /// Validates the iteration schedule and ensemble shape.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_trees == 0 {
            return Err(ConfigError::InvalidTreeCount);
        }
        if self.num_mcmc == 0 {
            return Err(ConfigError::NoRetainedSamples);
        }
        if self.thin == 0 {
            return Err(ConfigError::InvalidThinning);
        }
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth);
        }
        Ok(())
    }
}

/// Errors in the sampler configuration, raised at setup before any
/// iteration runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The ensemble must contain at least one tree.
    #[error("number of trees must be positive")]
    InvalidTreeCount,
    /// Nothing would be retained.
    #[error("number of retained MCMC iterations must be positive")]
    NoRetainedSamples,
    /// The thinning interval must be positive.
    #[error("thinning interval must be positive")]
    InvalidThinning,
    /// Trees must be allowed at least one level of depth.
    #[error("maximum tree depth must be positive")]
    InvalidMaxDepth,
    /// The worker thread pool could not be constructed.
    #[error("failed to build the sampling thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Umbrella error for fitting and prediction.
#[derive(Debug, Error)]
pub enum BartError {
    /// Input validation failed before sampling started.
    #[error(transparent)]
    Data(#[from] DataError),
    /// The sampler configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The chain hit a numerical degeneracy mid-run.
    #[error(transparent)]
    Ordinal(#[from] OrdinalError),
    /// Predictions were requested before any iteration was retained.
    #[error("model has not been sampled yet; call sample before predicting")]
    NotSampled,
}

/// Handles sampling and storage of BART models with a cloglog link for
/// ordinal outcomes, following the model of Alam and Linero (2025) in which
/// `y` is an ordinal outcome with `K` categories ordered from `0` to `K-1`.
pub struct CloglogOrdinalBart {
    settings: CloglogBartSettings,
    forest_samples: ForestSamples,
    split_rules: Vec<SplitRuleType>,
    feature_types: Vec<FeatureType>,
    gamma_samples: Array2<f64>,
    forest_pred_train: Array2<f64>,
    forest_pred_test: Option<Array2<f64>>,
    latent_samples: Array2<f64>,
    n_levels: usize,
    sampled: bool,
}

impl CloglogOrdinalBart {
    /// Creates an unfitted model with the given settings.
    pub fn new(settings: CloglogBartSettings) -> Self {
        Self {
            settings,
            forest_samples: ForestSamples::new(),
            split_rules: Vec::new(),
            feature_types: Vec::new(),
            gamma_samples: Array2::zeros((0, 0)),
            forest_pred_train: Array2::zeros((0, 0)),
            forest_pred_test: None,
            latent_samples: Array2::zeros((0, 0)),
            n_levels: 0,
            sampled: false,
        }
    }

    /// Runs the full sampler on `data`, caching per-draw predictions for the
    /// training set and, when provided, for the held-out covariates
    /// `X_test`.
    ///
    /// Runs exactly `num_warmstart + num_burnin + num_mcmc` iterations; an
    /// iteration either completes fully or the fit aborts with no
    /// mid-iteration checkpoint.
    pub fn sample(
        &mut self,
        data: &OrdinalData,
        X_test: Option<&Array2<f64>>,
    ) -> Result<(), BartError> {
        self.settings.validate()?;
        if let Some(X_test) = X_test {
            if X_test.ncols() != data.n_features() {
                return Err(DataError::TestColumnMismatch {
                    expected: data.n_features(),
                    found: X_test.ncols(),
                }
                .into());
            }
        }

        let n_train = data.n_rows();
        let n_test = X_test.map_or(0, |x| x.nrows());
        let n_levels = data.n_levels();
        let num_warmstart = self.settings.num_warmstart;
        let num_burnin = self.settings.num_burnin;
        let total = num_warmstart + num_burnin + self.settings.num_mcmc;
        let thin = self.settings.thin;
        let n_keep = (num_warmstart + num_burnin..total).step_by(thin).count();

        self.split_rules = data.split_rules();
        self.feature_types = data.feature_types().to_vec();
        self.n_levels = n_levels;
        self.forest_samples = ForestSamples::new();
        self.gamma_samples = Array2::zeros((n_levels - 1, n_keep));
        self.forest_pred_train = Array2::zeros((n_train, n_keep));
        self.forest_pred_test = X_test.map(|_| Array2::zeros((n_test, n_keep)));
        self.latent_samples = Array2::zeros((n_train, n_keep));

        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let pool = build_pool(self.settings.num_threads).map_err(ConfigError::ThreadPool)?;

        let mut aux = AuxiliaryData::new(n_train, n_test, n_levels);
        let ordinal_sampler =
            OrdinalSampler::new(self.settings.alpha_gamma, self.settings.beta_gamma);
        ordinal_sampler.update_cumulative_exp_sums(&mut aux);

        let mut forest = Forest::new(self.settings.n_trees, 0.0, n_train);
        let forest_sampler = ForestSampler::new(data, &self.settings);

        let mut sample_counter = 0;
        for iteration in 0..total {
            let keep = iteration >= num_warmstart + num_burnin
                && (iteration - num_warmstart - num_burnin) % thin == 0;
            let warm_start = iteration < num_warmstart;

            // 1. Update the tree structures and leaf values against the
            //    current augmented target.
            forest_sampler.update(
                &mut forest,
                &mut self.forest_samples,
                data,
                &aux,
                warm_start,
                keep,
                &mut rng,
            );

            // 2. Refresh the forest predictions used by the augmentation
            //    steps of this same iteration.
            aux.forest_pred = forest.predict(data.X(), &self.split_rules, pool.as_ref());
            if let Some(X_test) = X_test {
                aux.forest_pred_test = forest.predict(X_test, &self.split_rules, pool.as_ref());
            }

            // 3. Latent variables, cutpoints, cumulative sums, in that order.
            ordinal_sampler.update_latent(&mut aux, data.y(), &mut rng)?;
            ordinal_sampler.update_gamma(&mut aux, data.y(), &mut rng)?;
            ordinal_sampler.update_cumulative_exp_sums(&mut aux);

            if keep {
                self.forest_pred_train
                    .index_axis_mut(Axis(1), sample_counter)
                    .assign(&aux.forest_pred);
                if let Some(pred_test) = self.forest_pred_test.as_mut() {
                    pred_test
                        .index_axis_mut(Axis(1), sample_counter)
                        .assign(&aux.forest_pred_test);
                }
                self.gamma_samples
                    .index_axis_mut(Axis(1), sample_counter)
                    .assign(&aux.gamma);
                self.latent_samples
                    .index_axis_mut(Axis(1), sample_counter)
                    .assign(&aux.latent);
                sample_counter += 1;
            }
        }

        self.sampled = true;
        Ok(())
    }

    /// Forest predictions for arbitrary covariate rows: each row is routed
    /// through every retained snapshot, giving `[n_rows, n_keep]`.
    pub fn predict(&self, X: &Array2<f64>) -> Result<Array2<f64>, BartError> {
        if !self.sampled {
            return Err(BartError::NotSampled);
        }
        if X.ncols() != self.split_rules.len() {
            return Err(DataError::TestColumnMismatch {
                expected: self.split_rules.len(),
                found: X.ncols(),
            }
            .into());
        }

        let pool = build_pool(self.settings.num_threads).map_err(ConfigError::ThreadPool)?;
        Ok(self
            .forest_samples
            .predict(X, &self.split_rules, pool.as_ref()))
    }

    /// Whether `sample` has completed on this model.
    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    /// Number of retained draws.
    pub fn n_retained(&self) -> usize {
        self.forest_samples.len()
    }

    /// Number of ordinal outcome levels seen at fit time.
    pub fn n_levels(&self) -> usize {
        self.n_levels
    }

    /// Retained log-scale cutpoint draws, `[K-1, n_keep]`.
    pub fn gamma_samples(&self) -> &Array2<f64> {
        &self.gamma_samples
    }

    /// Retained training-set forest predictions, `[n_train, n_keep]`.
    pub fn forest_pred_train(&self) -> &Array2<f64> {
        &self.forest_pred_train
    }

    /// Retained held-out forest predictions, `[n_test, n_keep]`, when a
    /// held-out set was supplied to `sample`.
    pub fn forest_pred_test(&self) -> Option<&Array2<f64>> {
        self.forest_pred_test.as_ref()
    }

    /// Retained latent-variable draws, `[n_train, n_keep]`.
    pub fn latent_samples(&self) -> &Array2<f64> {
        &self.latent_samples
    }

    /// The retained forest snapshot sequence.
    pub fn forest_samples(&self) -> &ForestSamples {
        &self.forest_samples
    }

    /// Feature-type tags recorded at fit time.
    pub fn feature_types(&self) -> &[FeatureType] {
        &self.feature_types
    }
}

fn build_pool(num_threads: usize) -> Result<Option<ThreadPool>, rayon::ThreadPoolBuildError> {
    if num_threads <= 1 {
        return Ok(None);
    }
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map(Some)
}
