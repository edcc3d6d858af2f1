//! Utility types for data operations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Column type information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Float,
    Int,
    Bool,
    String,
    Categorical,
}

impl ColumnType {
    /// Check if type is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Float | ColumnType::Int | ColumnType::Bool)
    }

    /// Check if type is categorical
    pub fn is_categorical(&self) -> bool {
        matches!(self, ColumnType::Categorical)
    }

    /// Check if type is string
    pub fn is_string(&self) -> bool {
        matches!(self, ColumnType::String)
    }

    /// Type name as shown in schemas
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Float => "float64",
            ColumnType::Int => "int64",
            ColumnType::Bool => "bool",
            ColumnType::String => "string",
            ColumnType::Categorical => "categorical",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name and type of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub column_type: ColumnType,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.column_type)
    }
}
