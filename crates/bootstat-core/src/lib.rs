//! Core data structures for bootstat
//!
//! - [`data`]: typed columns, data frames, CSV input/output and cleaning
//! - [`spec`]: model specifications and design matrix construction

pub mod data;
pub mod spec;

pub use data::{DataError, DataFrame, Series};
pub use spec::{DesignLayout, ModelSpec, SpecError};
