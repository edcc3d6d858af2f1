//! Core data structures for bootstat
//!
//! This module provides the tabular containers the models are fitted on:
//! typed columns ([`Series`]), an ordered collection of equally sized
//! columns ([`DataFrame`]), delimited-file loading and a few cleaning steps.

mod builder;
mod clean;
mod io;
mod dataframe;
mod series;
mod utils;

#[cfg(test)]
mod tests;

// Re-exports
pub use io::{read_csv, read_csv_from, write_csv, write_csv_to, CsvOptions};
pub use builder::DataFrameBuilder;
pub use clean::CleaningReport;
pub use dataframe::DataFrame;
pub use series::{Series, SeriesStats, SeriesValue};
pub use utils::{ColumnType, Field};

// Type aliases for common use cases
pub type FloatArray = ndarray::Array1<f64>;
pub type IntArray = ndarray::Array1<i64>;
pub type BoolArray = ndarray::Array1<bool>;
pub type StringArray = Vec<String>;
pub type Matrix = ndarray::Array2<f64>;

/// Error types specific to data operations
#[derive(thiserror::Error, Debug)]
pub enum DataError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Index out of bounds: index {index}, length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Invalid column type: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Operation requires numeric data, got {0}")]
    NonNumericData(&'static str),

    #[error("Missing data in column: {0}")]
    MissingData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for data operations
pub type Result<T> = std::result::Result<T, DataError>;
