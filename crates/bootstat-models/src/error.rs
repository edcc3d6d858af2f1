//! Model-related error types

use thiserror::Error;

use bootstat_core::data::DataError;
use bootstat_core::spec::SpecError;

/// Model-related errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// Model specification or design matrix error
    #[error("Specification error: {0}")]
    Spec(#[from] SpecError),

    /// Data-related error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// An argument is out of range or contradicts another
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The design matrix is rank-deficient; the named terms are not estimable
    #[error("Degenerate fit: {} cannot be estimated (rank-deficient design)", .terms.join(", "))]
    DegenerateFit {
        /// Design columns that are aliased or all zero
        terms: Vec<String>,
    },

    /// Numerical computation error
    #[error("Numerical error: {message} (operation: {operation})")]
    NumericalError {
        /// Error message
        message: String,
        /// Operation that failed
        operation: String,
    },

    /// Insufficient data for model fitting
    #[error("Not enough data: {n_samples} samples for {n_predictors} predictors")]
    InsufficientData {
        /// Number of samples
        n_samples: usize,
        /// Number of predictors
        n_predictors: usize,
    },

    /// Model fitting failed to converge
    #[error("Failed to converge after {max_iter} iterations")]
    NotConverged {
        /// Maximum number of iterations attempted
        max_iter: usize,
    },

    /// Singular matrix encountered
    #[error("Singular matrix encountered in {0}")]
    SingularMatrix(&'static str),

    /// Model not fitted yet
    #[error("Model not fitted yet")]
    NotFitted,
}

impl ModelError {
    /// Create an invalid-argument error
    pub fn invalid(message: impl Into<String>) -> Self {
        ModelError::InvalidArgument(message.into())
    }

    /// Create a numerical error
    pub fn numerical(operation: &str, message: impl Into<String>) -> Self {
        ModelError::NumericalError {
            message: message.into(),
            operation: operation.to_string(),
        }
    }

    /// Whether this error is an invalid argument, raised either here or
    /// while validating the model specification
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            ModelError::InvalidArgument(_) | ModelError::Spec(SpecError::InvalidArgument(_))
        )
    }

    /// Whether this error only concerns one fitting attempt, so a
    /// resampling run can record it and carry on
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ModelError::DegenerateFit { .. }
                | ModelError::SingularMatrix(_)
                | ModelError::NotConverged { .. }
        )
    }
}
