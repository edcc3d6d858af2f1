//! Model specification error types

use crate::data::{ColumnType, DataError};
use thiserror::Error;

/// Errors raised while validating a model specification or building
/// its design matrix
#[derive(Debug, Error)]
pub enum SpecError {
    /// The specification is empty or contradicts itself
    #[error("Invalid model specification: {0}")]
    InvalidArgument(String),

    /// A named field is not a column of the dataset
    #[error("Field '{field}' not found in dataset. Available fields: {available:?}")]
    FieldNotFound {
        field: String,
        available: Vec<String>,
    },

    /// A field has a type the model cannot use
    #[error("Field '{field}' has type {actual}, but {expected} was expected")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: ColumnType,
    },

    /// A categorical predictor without any level
    #[error("Categorical field '{0}' has no levels")]
    EmptyLevels(String),

    /// New data carries a level the model was not built with
    #[error("Field '{field}' has level '{level}' that the model was not built with")]
    UnknownLevel { field: String, level: String },

    /// Data-related errors that bubble up from the data layer
    #[error("Data error in design matrix construction: {0}")]
    Data(#[from] DataError),
}

impl SpecError {
    /// Create an invalid-argument error
    pub fn invalid(message: impl Into<String>) -> Self {
        SpecError::InvalidArgument(message.into())
    }

    /// Create a field-not-found error
    pub fn field_not_found(field: &str, available: &[&str]) -> Self {
        SpecError::FieldNotFound {
            field: field.to_string(),
            available: available.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Result type alias for specification operations
pub type SpecResult<T> = std::result::Result<T, SpecError>;
