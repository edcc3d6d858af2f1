//! Delimited text input and output
//!
//! Column types are inferred from the cells: Int if every present cell
//! parses as `i64`, Float if every present cell parses as `f64`, Bool if
//! every present cell is `true`/`false`, otherwise String. Empty cells and
//! the usual missing markers become `NaN` (numeric), `""` (string) or the
//! missing code (categorical).

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::*;

const MISSING_MARKERS: [&str; 5] = ["", "NA", "NaN", "nan", "null"];

/// Options for reading and writing delimited files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field delimiter
    pub delimiter: u8,
    /// Whether the first record holds column names
    pub has_headers: bool,
    /// Columns to load as categorical regardless of inferred type
    pub categorical: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
            categorical: Vec::new(),
        }
    }
}

impl CsvOptions {
    /// Use a different delimiter
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load the named columns as categorical
    pub fn categorical<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categorical.extend(columns.into_iter().map(Into::into));
        self
    }
}

/// Read a delimited file into a DataFrame
pub fn read_csv(path: impl AsRef<Path>, options: &CsvOptions) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let df = read_csv_from(file, options)?;
    debug!(path = %path.display(), rows = df.nrows(), cols = df.ncols(), "loaded dataset");
    Ok(df)
}

/// Read delimited text from any reader into a DataFrame
pub fn read_csv_from<R: Read>(reader: R, options: &CsvOptions) -> Result<DataFrame> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.has_headers)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut cells: Vec<Vec<String>> = Vec::new();
    let mut names: Vec<String> = if options.has_headers {
        rdr.headers()?.iter().map(|h| h.to_string()).collect()
    } else {
        Vec::new()
    };

    for record in rdr.records() {
        let record = record?;
        if names.is_empty() {
            names = (0..record.len()).map(|i| format!("column_{}", i + 1)).collect();
        }
        if cells.is_empty() {
            cells = vec![Vec::new(); names.len()];
        }
        if record.len() != names.len() {
            return Err(DataError::DimensionMismatch {
                expected: format!("{} fields", names.len()),
                actual: format!("{} fields", record.len()),
            });
        }
        for (column, value) in cells.iter_mut().zip(record.iter()) {
            column.push(value.to_string());
        }
    }

    if cells.is_empty() {
        cells = vec![Vec::new(); names.len()];
    }

    for wanted in &options.categorical {
        if !names.contains(wanted) {
            return Err(DataError::ColumnNotFound(wanted.clone()));
        }
    }

    let mut builder = DataFrameBuilder::new();
    for (name, raw) in names.into_iter().zip(cells) {
        let series = if options.categorical.contains(&name) {
            let labels: Vec<&str> = raw
                .iter()
                .map(|s| if is_missing(s) { "" } else { s.as_str() })
                .collect();
            Series::categorical(&labels)
        } else {
            infer_series(&raw)
        };
        builder = builder.with_column(name, series)?;
    }

    builder.build()
}

/// Write a DataFrame as delimited text to a file
pub fn write_csv(df: &DataFrame, path: impl AsRef<Path>, options: &CsvOptions) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_csv_to(df, file, options)
}

/// Write a DataFrame as delimited text to any writer
pub fn write_csv_to<W: Write>(df: &DataFrame, writer: W, options: &CsvOptions) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(writer);

    if options.has_headers {
        wtr.write_record(df.column_names())?;
    }

    let columns: Vec<&Series> = df.iter().map(|(_, series)| series).collect();
    for row in 0..df.nrows() {
        let record: Vec<String> = columns
            .iter()
            .map(|series| series.get(row).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(|source| DataError::Io {
        path: "<writer>".to_string(),
        source,
    })
}

fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell)
}

fn infer_series(raw: &[String]) -> Series {
    let present: Vec<&str> = raw.iter().map(|s| s.as_str()).filter(|s| !is_missing(s)).collect();
    let has_missing = present.len() != raw.len();

    if present.is_empty() {
        return Series::float(vec![f64::NAN; raw.len()]);
    }

    if present.iter().all(|s| s.parse::<i64>().is_ok()) {
        if !has_missing {
            return Series::int(raw.iter().map(|s| s.parse::<i64>().unwrap_or_default()).collect::<Vec<_>>());
        }
        return Series::float(parse_floats(raw));
    }

    if present.iter().all(|s| s.parse::<f64>().is_ok()) {
        return Series::float(parse_floats(raw));
    }

    if !has_missing && present.iter().all(|s| parse_bool(s).is_some()) {
        return Series::bool(raw.iter().map(|s| parse_bool(s).unwrap_or(false)).collect::<Vec<_>>());
    }

    Series::string(
        raw.iter()
            .map(|s| if is_missing(s) { String::new() } else { s.clone() })
            .collect::<Vec<_>>(),
    )
}

fn parse_floats(raw: &[String]) -> Vec<f64> {
    raw.iter()
        .map(|s| {
            if is_missing(s) {
                f64::NAN
            } else {
                s.parse::<f64>().unwrap_or(f64::NAN)
            }
        })
        .collect()
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
