//! Core types shared by the model families
//!
//! Every fitted model reports its estimates as [`Coefficient`] rows, its
//! goodness of fit as [`ModelStatistics`] and renders a printable
//! [`ModelSummary`].

pub use coefficient::Coefficient;
pub use statistics::{ModelStatistics, ResidualStatistics};
pub use summary::{ModelSummary, ModelType};

pub use crate::error::ModelError;

pub mod coefficient;
pub mod statistics;
pub mod summary;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;
