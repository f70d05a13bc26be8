//! Error types shared by the parsing, time and geometry layers.
//!
//! Storage, hardware and loop failures have their own enums next to the code
//! that raises them (`db::repository::error`, `hardware::error`,
//! `scheduler::error`).

/// A timestamp or numeric field could not be interpreted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Malformed timestamp '{input}': {reason}")]
    Timestamp { input: String, reason: String },

    #[error("Invalid {field} value '{value}'")]
    Field { field: &'static str, value: String },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Malformed CSV row: {0}")]
    Malformed(String),

    #[error("Expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("Window starts after it ends (start JD {start_jd:.5} > end JD {end_jd:.5})")]
    InvertedWindow { start_jd: f64, end_jd: f64 },
}

impl ParseError {
    pub fn timestamp(input: impl Into<String>, reason: impl ToString) -> Self {
        Self::Timestamp {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    pub fn field(field: &'static str, value: impl Into<String>) -> Self {
        Self::Field {
            field,
            value: value.into(),
        }
    }
}

/// One row of the request table is unusable.
///
/// The row is skipped for the current load; the rest of the table is still
/// scheduled.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Row {row} ({label}) rejected: {source}")]
pub struct RowParseError {
    /// 0-based data row index (header excluded).
    pub row: usize,
    /// Directory name of the row, or `<unnamed>` when it could not be read.
    pub label: String,
    #[source]
    pub source: ParseError,
}

impl RowParseError {
    pub fn new(row: usize, label: impl Into<String>, source: ParseError) -> Self {
        Self {
            row,
            label: label.into(),
            source,
        }
    }
}

/// Moving a timestamp forward by one calendar day failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Cannot roll '{input}' over to the next day: {source}")]
pub struct DateRolloverError {
    pub input: String,
    #[source]
    pub source: ParseError,
}

/// Coordinates or solar geometry that cannot be evaluated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("Non-finite {0} in coordinate computation")]
    NonFinite(&'static str),

    #[error("Declination {0:.4} deg outside [-90, 90]")]
    DeclinationOutOfRange(f64),

    #[error("Sun never reaches {altitude} deg on JD {jd:.1} at latitude {latitude:.4} deg")]
    NoTwilight { jd: f64, latitude: f64, altitude: f64 },
}

pub type GeometryResult<T> = Result<T, GeometryError>;
