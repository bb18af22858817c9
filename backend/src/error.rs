//! Error types for the txmart pipeline.
//!
//! One enum per stage, wrapped by the top-level [`PipelineError`]:
//!
//! - [`CsvError`] - raw byte decoding and CSV parsing
//! - [`LoadError`] - fetching sources and unpacking archives
//! - [`CleanError`] - malformed values found while cleaning
//! - [`DimensionError`] - inconsistent explicit date assignments
//! - [`SchemaError`] - output frames that break their column contract
//! - [`ExportError`] - persisting output frames
//!
//! Conversion is via `From`, so `?` works across stage boundaries.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while turning raw bytes into a table.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Bytes could not be decoded with the detected encoding.
    #[error("Failed to decode content as {encoding}: {message}")]
    EncodingError { encoding: String, message: String },

    /// Invalid CSV format.
    #[error("Invalid CSV at line {line}: {message}")]
    ParseError { line: u64, message: String },

    /// No header row.
    #[error("CSV content is empty")]
    EmptyFile,

    /// Header row present but blank.
    #[error("No headers found in CSV")]
    NoHeaders,
}

// =============================================================================
// Loader Errors
// =============================================================================

/// Errors while fetching a source.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The HTTP client could not be configured.
    #[error("Cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// HTTP transport failure.
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status.
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    /// Local file could not be read.
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The archive itself is unreadable.
    #[error("Invalid zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The archive must hold exactly one data file.
    #[error("Expected exactly one file in archive, found {found}: {names:?}")]
    ArchiveLayout { found: usize, names: Vec<String> },

    /// The source was fetched but could not be parsed.
    #[error("Cannot parse {table} source: {source}")]
    Parse {
        table: &'static str,
        #[source]
        source: CsvError,
    },
}

// =============================================================================
// Cleaning Errors
// =============================================================================

/// Malformed input found while cleaning a table.
#[derive(Debug, Error)]
pub enum CleanError {
    /// A column the table must carry is absent.
    #[error("Table '{table}' is missing required column '{column}'")]
    MissingColumn { table: &'static str, column: String },

    /// Timestamp not accepted under the table's parsing policy.
    #[error("Table '{table}', row {row}: cannot parse timestamp '{value}': {message}")]
    Timestamp {
        table: &'static str,
        row: usize,
        value: String,
        message: String,
    },

    /// A cell holds text that does not fit the column type.
    #[error("Table '{table}', row {row}, column '{column}': invalid value '{value}'")]
    InvalidValue {
        table: &'static str,
        row: usize,
        column: &'static str,
        value: String,
    },

    /// A cell that cannot be tolerated as missing is empty.
    #[error("Table '{table}', row {row}: missing value in column '{column}'")]
    MissingValue {
        table: &'static str,
        row: usize,
        column: &'static str,
    },
}

// =============================================================================
// Dimension Errors
// =============================================================================

/// Errors building a date dimension from explicit assignments.
#[derive(Debug, Error)]
pub enum DimensionError {
    #[error("Date {0} is assigned more than once")]
    DuplicateDate(chrono::NaiveDate),

    #[error("DateID {0} is assigned more than once")]
    DuplicateId(u32),

    #[error("DateID must start at 1, got 0")]
    ZeroId,
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Output frame that does not honour its column contract.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Table '{table}' expects columns {expected:?}, got {actual:?}")]
    ColumnMismatch {
        table: &'static str,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Table '{table}', row {row}: expected {expected} cells, got {actual}")]
    RowWidth {
        table: &'static str,
        row: usize,
        expected: usize,
        actual: usize,
    },
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while persisting frames.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level run error. Every fatal condition surfaces through this type
/// unmodified, so nothing is written once one is raised.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Clean error: {0}")]
    Clean(#[from] CleanError),

    #[error("Dimension error: {0}")]
    Dimension(#[from] DimensionError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// A worker thread panicked while cleaning.
    #[error("Cleaning worker for '{0}' panicked")]
    WorkerPanicked(&'static str),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for loader operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for cleaning operations.
pub type CleanResult<T> = Result<T, CleanError>;

/// Result type for schema checks.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> PipelineError
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // CleanError -> PipelineError
        let clean_err = CleanError::MissingColumn {
            table: "deposits",
            column: "amount".into(),
        };
        let pipeline_err: PipelineError = clean_err.into();
        assert!(pipeline_err.to_string().contains("amount"));
    }

    #[test]
    fn test_timestamp_error_format() {
        let err = CleanError::Timestamp {
            table: "events",
            row: 4,
            value: "yesterday".into(),
            message: "unrecognised format".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("events"));
        assert!(msg.contains("row 4"));
        assert!(msg.contains("'yesterday'"));
    }

    #[test]
    fn test_archive_layout_lists_names() {
        let err = LoadError::ArchiveLayout {
            found: 2,
            names: vec!["a.csv".into(), "b.csv".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("found 2"));
        assert!(msg.contains("b.csv"));
    }
}
