//! Error types for the OMEA differential evolution optimizer.
//!
//! Two families live here. [`DEError`] covers configuration problems, which
//! are fatal and always reported before the first evaluator call.
//! [`EvalError`] covers a single failed evaluation; the optimizer recovers
//! from those by retrying and, failing that, scoring the candidate as
//! negative infinity.

use std::time::Duration;
use thiserror::Error;

/// Configuration errors raised before any evaluation takes place.
#[derive(Debug, Error)]
pub enum DEError {
    /// No dimensions were supplied.
    #[error("bounds are empty: at least one dimension is required")]
    EmptyBounds,

    /// Lower and upper bounds have different lengths.
    #[error("bounds mismatch: lower has {lower_len} elements, upper has {upper_len}")]
    BoundsMismatch {
        /// Length of the lower bounds array
        lower_len: usize,
        /// Length of the upper bounds array
        upper_len: usize,
    },

    /// A lower bound exceeds its corresponding upper bound, or a bound is not finite.
    #[error("invalid bounds at index {index}: lower ({lower}) > upper ({upper})")]
    InvalidBounds {
        /// Index of the invalid bound pair
        index: usize,
        /// The lower bound value
        lower: f64,
        /// The upper bound value
        upper: f64,
    },

    /// Population cannot supply the distinct helper indices the strategy needs.
    #[error(
        "population size ({pop_size}) too small for {strategy}: needs at least {required} individuals"
    )]
    PopulationTooSmall {
        /// The invalid population size
        pop_size: usize,
        /// Name of the mutation strategy
        strategy: &'static str,
        /// Minimum population size for that strategy
        required: usize,
    },

    /// Mutation factor is negative or not finite.
    #[error("invalid mutation factor: {factor} (must be finite and non-negative)")]
    InvalidMutationFactor {
        /// The invalid mutation factor
        factor: f64,
    },

    /// Crossover rate is out of valid range [0, 1].
    #[error("invalid crossover rate: {rate} (must be in [0, 1])")]
    InvalidCrossoverRate {
        /// The invalid crossover rate
        rate: f64,
    },

    /// Maximum generation count must be positive.
    #[error("max_generations must be >= 1")]
    ZeroGenerations,

    /// A driver link refers to a dimension that does not exist.
    #[error("driver link for optic '{optic}' uses dimension {index}, but only {dims} exist")]
    DriverIndexOutOfRange {
        /// Optic the link pushes to
        optic: String,
        /// Offending driver index
        index: usize,
        /// Number of dimensions
        dims: usize,
    },

    /// Initial guess (x0) has wrong dimension.
    #[error("x0 dimension mismatch: expected {expected}, got {got}")]
    X0DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        got: usize,
    },

    /// Unknown mutation strategy name.
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
}

/// A specialized `Result` type for optimizer configuration.
pub type Result<T> = std::result::Result<T, DEError>;

impl DEError {
    /// Returns `true` if this is a bounds-related error.
    pub fn is_bounds_error(&self) -> bool {
        matches!(
            self,
            DEError::EmptyBounds | DEError::BoundsMismatch { .. } | DEError::InvalidBounds { .. }
        )
    }

    /// Returns `true` if this is a configuration-related error.
    ///
    /// This includes population size, mutation factor, crossover rate,
    /// generation limit, and strategy errors.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DEError::PopulationTooSmall { .. }
                | DEError::InvalidMutationFactor { .. }
                | DEError::InvalidCrossoverRate { .. }
                | DEError::ZeroGenerations
                | DEError::UnknownStrategy(_)
        )
    }

    /// Returns `true` if this is a dimension mismatch error.
    pub fn is_dimension_error(&self) -> bool {
        matches!(
            self,
            DEError::X0DimensionMismatch { .. } | DEError::DriverIndexOutOfRange { .. }
        )
    }
}

/// Failure of a single evaluator call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    /// The simulator reported an error.
    #[error("evaluation failed: {0}")]
    Failed(String),

    /// The call did not return before the deadline.
    #[error("evaluation timed out after {0:?}")]
    Timeout(Duration),

    /// The worker running the evaluation went away without answering.
    #[error("evaluator disconnected")]
    Disconnected,

    /// The evaluator returned NaN.
    #[error("evaluator returned a non-finite value: {0}")]
    NonFinite(f64),
}
