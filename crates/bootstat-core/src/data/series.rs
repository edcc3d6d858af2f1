//! Series data structure for holding homogeneous data
//!
//! A Series is a one-dimensional array that can hold data of a specific type.
//! It's the building block of DataFrames.

use super::*;

use ndarray::Array1;
use std::collections::{BTreeSet, HashMap, HashSet};

/// A Series is a typed, one-dimensional array of data
#[derive(Clone, Debug, PartialEq)]
pub enum Series {
    /// Floating point numbers (f64), `NaN` marks a missing value
    Float(FloatArray),
    /// Integer numbers (i64)
    Int(IntArray),
    /// Boolean values
    Bool(BoolArray),
    /// String values, the empty string marks a missing value
    String(StringArray),
    /// Categorical data (encoded as u32), `Series::MISSING_CODE` marks a
    /// missing value
    Categorical(Array1<u32>, Vec<String>), // values, levels
}

impl Series {
    /// Code of a missing value in a categorical series
    pub const MISSING_CODE: u32 = u32::MAX;

    /// Create a new Float series
    pub fn float(data: impl Into<FloatArray>) -> Self {
        Series::Float(data.into())
    }

    /// Create a new Int series
    pub fn int(data: impl Into<IntArray>) -> Self {
        Series::Int(data.into())
    }

    /// Create a new Bool series
    pub fn bool(data: impl Into<BoolArray>) -> Self {
        Series::Bool(data.into())
    }

    /// Create a new String series
    pub fn string(data: impl Into<StringArray>) -> Self {
        Series::String(data.into())
    }

    /// Create a new Categorical series.
    ///
    /// Levels are the sorted distinct values, so the first level in
    /// lexical order is the reference level under treatment coding.
    /// Empty strings are missing values and never become a level.
    pub fn categorical<T: AsRef<str>>(data: &[T]) -> Self {
        let levels: Vec<String> = data
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let level_map: HashMap<&str, u32> = levels
            .iter()
            .enumerate()
            .map(|(i, level)| (level.as_str(), i as u32))
            .collect();

        let encoded: Array1<u32> = data
            .iter()
            .map(|s| level_map.get(s.as_ref()).copied().unwrap_or(Self::MISSING_CODE))
            .collect();

        Series::Categorical(encoded, levels)
    }

    /// Create a Categorical series with an explicit level set.
    ///
    /// Fails if a non-empty value is not one of `levels`.
    pub fn categorical_with_levels<T: AsRef<str>>(data: &[T], levels: Vec<String>) -> Result<Self> {
        let level_map: HashMap<&str, u32> = levels
            .iter()
            .enumerate()
            .map(|(i, level)| (level.as_str(), i as u32))
            .collect();

        let encoded = data
            .iter()
            .map(|s| {
                if s.as_ref().is_empty() {
                    return Ok(Self::MISSING_CODE);
                }
                level_map.get(s.as_ref()).copied().ok_or_else(|| {
                    DataError::InvalidParameter(format!(
                        "value '{}' is not one of the levels {:?}",
                        s.as_ref(),
                        levels
                    ))
                })
            })
            .collect::<Result<Array1<u32>>>()?;

        Ok(Series::Categorical(encoded, levels))
    }

    /// Get the length of the series
    pub fn len(&self) -> usize {
        match self {
            Series::Float(arr) => arr.len(),
            Series::Int(arr) => arr.len(),
            Series::Bool(arr) => arr.len(),
            Series::String(arr) => arr.len(),
            Series::Categorical(arr, _) => arr.len(),
        }
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the type name of the series
    pub fn dtype(&self) -> &'static str {
        self.column_type().name()
    }

    /// Get the column type of the series
    pub fn column_type(&self) -> ColumnType {
        match self {
            Series::Float(_) => ColumnType::Float,
            Series::Int(_) => ColumnType::Int,
            Series::Bool(_) => ColumnType::Bool,
            Series::String(_) => ColumnType::String,
            Series::Categorical(_, _) => ColumnType::Categorical,
        }
    }

    /// Whether the series holds numbers (floats, ints or bools)
    pub fn is_numeric(&self) -> bool {
        self.column_type().is_numeric()
    }

    /// Get a value at index
    pub fn get(&self, idx: usize) -> Option<SeriesValue> {
        if idx >= self.len() {
            return None;
        }

        match self {
            Series::Float(arr) => arr.get(idx).map(|&v| SeriesValue::Float(v)),
            Series::Int(arr) => arr.get(idx).map(|&v| SeriesValue::Int(v)),
            Series::Bool(arr) => arr.get(idx).map(|&v| SeriesValue::Bool(v)),
            Series::String(arr) => arr.get(idx).map(|v| SeriesValue::String(v.clone())),
            Series::Categorical(arr, levels) => arr
                .get(idx)
                .and_then(|&code| levels.get(code as usize))
                .map(|level| SeriesValue::String(level.clone())),
        }
    }

    /// Whether the value at `idx` is missing
    pub fn is_missing(&self, idx: usize) -> bool {
        match self {
            Series::Float(arr) => arr.get(idx).is_some_and(|v| v.is_nan()),
            Series::String(arr) => arr.get(idx).is_some_and(|v| v.is_empty()),
            Series::Categorical(arr, levels) => {
                arr.get(idx).is_some_and(|&code| code as usize >= levels.len())
            }
            _ => false,
        }
    }

    /// Number of missing values
    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_missing(i)).count()
    }

    /// Get a slice of the series
    pub fn slice(&self, range: std::ops::Range<usize>) -> Result<Self> {
        if range.end > self.len() {
            return Err(DataError::IndexOutOfBounds {
                index: range.end,
                len: self.len(),
            });
        }

        match self {
            Series::Float(arr) => Ok(Series::Float(
                arr.slice(ndarray::s![range.start..range.end]).to_owned(),
            )),
            Series::Int(arr) => Ok(Series::Int(
                arr.slice(ndarray::s![range.start..range.end]).to_owned(),
            )),
            Series::Bool(arr) => Ok(Series::Bool(
                arr.slice(ndarray::s![range.start..range.end]).to_owned(),
            )),
            Series::String(arr) => Ok(Series::String(arr[range.start..range.end].to_vec())),
            Series::Categorical(arr, levels) => {
                let sliced = arr.slice(ndarray::s![range.start..range.end]).to_owned();
                Ok(Series::Categorical(sliced, levels.clone()))
            }
        }
    }

    /// Filter the series with a boolean mask
    pub fn filter(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.len() {
            return Err(DataError::DimensionMismatch {
                expected: format!("mask length {}", self.len()),
                actual: format!("mask length {}", mask.len()),
            });
        }

        let kept: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter(|(_, keep)| **keep)
            .map(|(i, _)| i)
            .collect();

        self.take(&kept)
    }

    /// Gather values at `indices`, in order, allowing repeats.
    ///
    /// Categorical series keep their full level set even when some
    /// levels no longer occur.
    pub fn take(&self, indices: &[usize]) -> Result<Self> {
        let len = self.len();
        if let Some(&bad) = indices.iter().find(|&&idx| idx >= len) {
            return Err(DataError::IndexOutOfBounds { index: bad, len });
        }

        Ok(match self {
            Series::Float(arr) => Series::Float(indices.iter().map(|&i| arr[i]).collect()),
            Series::Int(arr) => Series::Int(indices.iter().map(|&i| arr[i]).collect()),
            Series::Bool(arr) => Series::Bool(indices.iter().map(|&i| arr[i]).collect()),
            Series::String(vec) => Series::String(indices.iter().map(|&i| vec[i].clone()).collect()),
            Series::Categorical(arr, levels) => {
                Series::Categorical(indices.iter().map(|&i| arr[i]).collect(), levels.clone())
            }
        })
    }

    /// Levels of a categorical series
    pub fn levels(&self) -> Option<&[String]> {
        match self {
            Series::Categorical(_, levels) => Some(levels),
            _ => None,
        }
    }

    /// Row count per level of a categorical series, in level order
    pub fn level_counts(&self) -> Option<Vec<usize>> {
        match self {
            Series::Categorical(codes, levels) => {
                let mut counts = vec![0usize; levels.len()];
                for &code in codes {
                    if let Some(count) = counts.get_mut(code as usize) {
                        *count += 1;
                    }
                }
                Some(counts)
            }
            _ => None,
        }
    }

    /// Convert to a categorical series.
    ///
    /// Strings, ints and bools are converted through their textual form.
    /// Float series are rejected since their levels are rarely meaningful.
    pub fn to_categorical(&self) -> Result<Series> {
        let labels: Vec<String> = match self {
            Series::Categorical(_, _) => return Ok(self.clone()),
            Series::String(values) => values.clone(),
            Series::Int(arr) => arr.iter().map(|v| v.to_string()).collect(),
            Series::Bool(arr) => arr.iter().map(|v| v.to_string()).collect(),
            Series::Float(_) => {
                return Err(DataError::TypeMismatch {
                    expected: "string, int or bool",
                    actual: "float64",
                })
            }
        };

        Ok(Series::categorical(&labels))
    }

    /// Convert to float series if possible
    pub fn to_float(&self) -> Result<Series> {
        self.to_f64_array().map(Series::Float)
    }

    /// Numeric values as an `f64` array
    pub fn to_f64_array(&self) -> Result<FloatArray> {
        match self {
            Series::Float(arr) => Ok(arr.clone()),
            Series::Int(arr) => Ok(arr.mapv(|v| v as f64)),
            Series::Bool(arr) => Ok(arr.mapv(|v| if v { 1.0 } else { 0.0 })),
            Series::Categorical(arr, levels) => Ok(arr.mapv(|v| {
                if (v as usize) < levels.len() {
                    v as f64
                } else {
                    f64::NAN
                }
            })),
            Series::String(_) => Err(DataError::NonNumericData("string")),
        }
    }

    /// Compute basic statistics for numeric series
    pub fn describe(&self) -> Result<SeriesStats> {
        match self {
            Series::Float(arr) => {
                let present: FloatArray = arr.iter().copied().filter(|v| !v.is_nan()).collect();
                if present.is_empty() {
                    return Ok(SeriesStats::empty());
                }

                Ok(SeriesStats {
                    count: present.len(),
                    mean: present.mean().unwrap_or(f64::NAN),
                    std: present.std(1.0),
                    min: present.iter().fold(f64::INFINITY, |a, &b| a.min(b)),
                    q25: quantile(&present, 0.25).unwrap_or(f64::NAN),
                    q50: quantile(&present, 0.5).unwrap_or(f64::NAN),
                    q75: quantile(&present, 0.75).unwrap_or(f64::NAN),
                    max: present.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
                    unique_count: None,
                })
            }
            Series::Int(_) | Series::Bool(_) => Series::Float(self.to_f64_array()?).describe(),
            Series::Categorical(codes, levels) => Ok(SeriesStats {
                count: codes.iter().filter(|&&c| (c as usize) < levels.len()).count(),
                unique_count: Some(levels.len()),
                ..SeriesStats::empty()
            }),
            Series::String(arr) => {
                let unique_count = arr.iter().collect::<HashSet<_>>().len();
                Ok(SeriesStats {
                    count: arr.len(),
                    unique_count: Some(unique_count),
                    ..SeriesStats::empty()
                })
            }
        }
    }

    /// Compute mean of numeric series
    pub fn mean(&self) -> Result<f64> {
        match self {
            Series::String(_) => Err(DataError::NonNumericData("string")),
            Series::Categorical(_, _) => Err(DataError::NonNumericData("categorical")),
            _ => Ok(self.to_f64_array()?.mean().unwrap_or(f64::NAN)),
        }
    }

    /// Compute standard deviation
    pub fn std(&self, ddof: usize) -> Result<f64> {
        match self {
            Series::String(_) => Err(DataError::NonNumericData("string")),
            Series::Categorical(_, _) => Err(DataError::NonNumericData("categorical")),
            _ => Ok(self.to_f64_array()?.std(ddof as f64)),
        }
    }

    /// Compute sum
    pub fn sum(&self) -> Result<f64> {
        match self {
            Series::String(_) => Err(DataError::NonNumericData("string")),
            Series::Categorical(_, _) => Err(DataError::NonNumericData("categorical")),
            _ => Ok(self.to_f64_array()?.sum()),
        }
    }
}

/// Helper function to compute quantile
fn quantile(arr: &FloatArray, q: f64) -> Option<f64> {
    if arr.is_empty() {
        return None;
    }

    let mut sorted: Vec<f64> = arr.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let index = (n as f64 - 1.0) * q;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        Some(sorted[lower])
    } else {
        let weight = index - lower as f64;
        Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
    }
}

/// Statistical summary of a series
#[derive(Debug, Clone)]
pub struct SeriesStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
    pub unique_count: Option<usize>,
}

impl SeriesStats {
    pub(crate) fn empty() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            q25: f64::NAN,
            q50: f64::NAN,
            q75: f64::NAN,
            max: f64::NAN,
            unique_count: None,
        }
    }
}

/// Enum for type-safe value access
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    String(String),
}

impl std::fmt::Display for SeriesValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesValue::Float(v) if v.is_nan() => Ok(()),
            SeriesValue::Float(v) => write!(f, "{}", v),
            SeriesValue::Int(v) => write!(f, "{}", v),
            SeriesValue::Bool(v) => write!(f, "{}", v),
            SeriesValue::String(v) => write!(f, "{}", v),
        }
    }
}
