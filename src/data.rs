//! Processed training data for the ordinal sampler: an immutable covariate
//! matrix, the integer outcome vector, and per-column metadata used when
//! sampling split rules.

use ndarray::{Array1, Array2};
use thiserror::Error;

use crate::split_rules::{CategoricalSplit, ContinuousSplit, SplitRuleType};

/// Per-column tag describing how a processed covariate may be split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureType {
    /// Numeric column split by thresholding.
    Continuous,
    /// Integer-coded categorical column split by code equality.
    Categorical,
}

impl From<FeatureType> for SplitRuleType {
    fn from(feature_type: FeatureType) -> Self {
        match feature_type {
            FeatureType::Continuous => SplitRuleType::Continuous(ContinuousSplit),
            FeatureType::Categorical => SplitRuleType::Categorical(CategoricalSplit),
        }
    }
}

/// Errors raised while validating covariates and outcomes, before any
/// sampling starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    /// The covariate matrix has no rows or no columns.
    #[error("covariate matrix must have at least one row and one column")]
    EmptyCovariates,
    /// Outcome and covariate row counts disagree.
    #[error("outcome has {outcome} values but the covariate matrix has {rows} rows")]
    OutcomeLength {
        /// Number of outcome values.
        outcome: usize,
        /// Number of covariate rows.
        rows: usize,
    },
    /// An outcome category falls outside the declared level count.
    #[error("outcome category {category} is outside the valid range [0, {n_levels})")]
    CategoryOutOfRange {
        /// Offending category value.
        category: usize,
        /// Declared number of ordinal levels.
        n_levels: usize,
    },
    /// The outcome must contain at least two distinct ordinal levels.
    #[error("outcome must have at least 2 ordinal categories")]
    TooFewCategories,
    /// The feature-type vector length does not match the column count.
    #[error("feature types were given for {found} columns but the covariate matrix has {expected}")]
    FeatureTypesLength {
        /// Number of covariate columns.
        expected: usize,
        /// Number of feature-type tags supplied.
        found: usize,
    },
    /// The variable-weight vector length does not match the column count.
    #[error("variable weights were given for {found} columns but the covariate matrix has {expected}")]
    VariableWeightsLength {
        /// Number of covariate columns.
        expected: usize,
        /// Number of weights supplied.
        found: usize,
    },
    /// Variable weights cannot be negative.
    #[error("variable weights cannot have any negative weights")]
    NegativeVariableWeight,
    /// Variable weights cannot all be zero.
    #[error("variable weights must have a positive sum")]
    ZeroVariableWeights,
    /// Held-out covariates must match the training column count.
    #[error("held-out covariates have {found} columns but training covariates have {expected}")]
    TestColumnMismatch {
        /// Number of training columns.
        expected: usize,
        /// Number of held-out columns.
        found: usize,
    },
}

/// Container for the processed covariates and ordinal outcome of one fit.
///
/// All input validation happens at construction; a successfully built
/// `OrdinalData` is immutable for the life of the fit.
#[derive(Debug, Clone)]
pub struct OrdinalData {
    X: Array2<f64>,
    y: Array1<usize>,
    n_levels: usize,
    feature_types: Vec<FeatureType>,
    variable_weights: Vec<f64>,
}

impl OrdinalData {
    /// Creates an `OrdinalData` with the level count derived from the
    /// outcome, all columns treated as continuous, and uniform variable
    /// weights.
    pub fn new(X: Array2<f64>, y: Array1<usize>) -> Result<Self, DataError> {
        Self::with_options(X, y, None, None, None)
    }

    /// Creates an `OrdinalData` with an explicitly declared level count,
    /// validating every outcome value against it.
    pub fn with_levels(X: Array2<f64>, y: Array1<usize>, n_levels: usize) -> Result<Self, DataError> {
        Self::with_options(X, y, Some(n_levels), None, None)
    }

    /// Creates an `OrdinalData`, overriding any of the derived defaults.
    pub fn with_options(
        X: Array2<f64>,
        y: Array1<usize>,
        n_levels: Option<usize>,
        feature_types: Option<Vec<FeatureType>>,
        variable_weights: Option<Vec<f64>>,
    ) -> Result<Self, DataError> {
        if X.nrows() == 0 || X.ncols() == 0 {
            return Err(DataError::EmptyCovariates);
        }
        if y.len() != X.nrows() {
            return Err(DataError::OutcomeLength {
                outcome: y.len(),
                rows: X.nrows(),
            });
        }

        let observed_levels = y.iter().max().map_or(0, |&max| max + 1);
        let n_levels = match n_levels {
            Some(declared) => {
                if observed_levels > declared {
                    let category = y
                        .iter()
                        .copied()
                        .max()
                        .unwrap_or_default();
                    return Err(DataError::CategoryOutOfRange {
                        category,
                        n_levels: declared,
                    });
                }
                declared
            }
            None => observed_levels,
        };
        if n_levels < 2 {
            return Err(DataError::TooFewCategories);
        }

        let feature_types =
            feature_types.unwrap_or_else(|| vec![FeatureType::Continuous; X.ncols()]);
        if feature_types.len() != X.ncols() {
            return Err(DataError::FeatureTypesLength {
                expected: X.ncols(),
                found: feature_types.len(),
            });
        }

        let variable_weights =
            variable_weights.unwrap_or_else(|| vec![1.0 / X.ncols() as f64; X.ncols()]);
        if variable_weights.len() != X.ncols() {
            return Err(DataError::VariableWeightsLength {
                expected: X.ncols(),
                found: variable_weights.len(),
            });
        }
        if variable_weights.iter().any(|&w| w < 0.0) {
            return Err(DataError::NegativeVariableWeight);
        }
        if variable_weights.iter().sum::<f64>() <= 0.0 {
            return Err(DataError::ZeroVariableWeights);
        }

        Ok(Self {
            X,
            y,
            n_levels,
            feature_types,
            variable_weights,
        })
    }

    /// Covariate matrix, rows are observations.
    pub fn X(&self) -> &Array2<f64> {
        &self.X
    }

    /// Ordinal outcome vector with values in `[0, n_levels)`.
    pub fn y(&self) -> &Array1<usize> {
        &self.y
    }

    /// Number of training observations.
    pub fn n_rows(&self) -> usize {
        self.X.nrows()
    }

    /// Number of covariate columns.
    pub fn n_features(&self) -> usize {
        self.X.ncols()
    }

    /// Number of ordinal outcome levels `K`.
    pub fn n_levels(&self) -> usize {
        self.n_levels
    }

    /// Per-column feature-type tags.
    pub fn feature_types(&self) -> &[FeatureType] {
        &self.feature_types
    }

    /// Per-column split-feature selection weights.
    pub fn variable_weights(&self) -> &[f64] {
        &self.variable_weights
    }

    /// Split rules implied by the feature-type tags.
    pub fn split_rules(&self) -> Vec<SplitRuleType> {
        self.feature_types.iter().map(|&t| t.into()).collect()
    }
}
