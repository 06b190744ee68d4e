//! I/O error types for grove-io.

use std::path::PathBuf;

use grove_rf::RfError;

/// Errors from reading a dataset table from disk.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than expected.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns.
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a cell value is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Zero-based column index.
        col_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when explicit dimensions ask for more rows than the file holds.
    #[error("{path} holds {found} data rows, {requested} requested")]
    TooFewRows {
        /// Path to the CSV file.
        path: PathBuf,
        /// Rows requested via explicit dimensions.
        requested: usize,
        /// Data rows present in the file.
        found: usize,
    },

    /// Returned when the parsed values do not form a valid table.
    #[error("invalid table in {path}")]
    InvalidTable {
        /// Path to the CSV file.
        path: PathBuf,
        /// The table validation failure.
        source: RfError,
    },
}
