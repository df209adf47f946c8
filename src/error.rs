use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Identifies the source record a failure or warning refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RecordLocation {
    /// Name of the source the record was read from.
    pub source: String,
    /// 1-based row of the source file as a spreadsheet or editor shows it;
    /// the header is row 1.
    pub row: usize,
}

impl RecordLocation {
    pub fn new(source: impl Into<String>, row: usize) -> Self {
        Self {
            source: source.into(),
            row,
        }
    }
}

impl fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} row {}", self.source, self.row)
    }
}

/// Pipeline stage that received no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Consolidation,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Consolidation => write!(f, "consolidation"),
            Stage::Report => write!(f, "report"),
        }
    }
}

/// Error type covering the failures that can occur while records are read,
/// normalized, consolidated, or exported.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A required canonical field has no usable source column.
    #[error("schema error in source '{source_name}': field '{field}' {detail}")]
    Schema {
        source_name: String,
        field: String,
        detail: String,
    },

    /// A mapped cell could not be coerced into its canonical type.
    #[error("invalid value '{value}' in column '{column}' at {location}: {reason}")]
    Value {
        location: RecordLocation,
        column: String,
        value: String,
        reason: String,
    },

    /// A stage was handed zero records.
    #[error("empty input: the {stage} stage received no records")]
    EmptyInput { stage: Stage },

    /// A total or ratio left the representable decimal range.
    #[error("arithmetic overflow in {quantity} while adding {location}")]
    Overflow {
        location: RecordLocation,
        quantity: &'static str,
    },

    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when the run configuration cannot be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Errors bubbled up from the CSV reader.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a workbook does not follow the expected layout.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when the run configuration is semantically invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Raised when a source file has an extension no reader handles.
    #[error("unsupported source format: {0}")]
    UnsupportedFormat(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ReportError {
    pub(crate) fn value(
        location: &RecordLocation,
        column: &str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ReportError::Value {
            location: location.clone(),
            column: column.to_string(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for failures scoped to a single record.
    pub fn is_record_level(&self) -> bool {
        matches!(self, ReportError::Value { .. })
    }

    /// Returns `true` for failures to open or parse a source file.
    pub fn is_source_read(&self) -> bool {
        matches!(
            self,
            ReportError::Io(_)
                | ReportError::Csv(_)
                | ReportError::ExcelRead(_)
                | ReportError::InvalidWorkbook(_)
                | ReportError::MissingInput(_)
        )
    }
}
