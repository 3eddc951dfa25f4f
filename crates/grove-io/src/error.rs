//! I/O error types for grove-io.

use std::path::PathBuf;

use grove_forest::ForestError;

/// Errors from feature matrix parsing and prediction report I/O.
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

    /// Returned when the tab-separated parser encounters a malformed record.
    #[error("parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a feature matrix has no header or no cases.
    #[error("empty feature matrix (no cases) in {path}")]
    EmptyMatrix {
        /// Path to the file.
        path: PathBuf,
    },

    /// Returned when a feature row has a different number of cells than the header.
    #[error("inconsistent row length in {path}: row {row_index} (feature {feature}) has {got} values, expected {expected}")]
    InconsistentRowLength {
        /// Path to the file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Name of the offending feature.
        feature: String,
        /// Expected number of values (one per case).
        expected: usize,
        /// Actual number of values in this row.
        got: usize,
    },

    /// Returned when a feature name lacks a known `N:`, `C:` or `B:` prefix.
    #[error("unknown feature type for \"{name}\" in {path}: expected an N:, C: or B: prefix")]
    UnknownFeaturePrefix {
        /// Path to the file.
        path: PathBuf,
        /// The feature name as written.
        name: String,
    },

    /// Returned when a numeric feature holds a value that is neither a number nor missing.
    #[error("invalid numeric value in {path}: feature {feature}, case {case}, raw value \"{raw}\"")]
    InvalidNumber {
        /// Path to the file.
        path: PathBuf,
        /// Name of the numeric feature.
        feature: String,
        /// Zero-based case index.
        case: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when the parsed rows do not form a valid feature matrix.
    #[error("invalid feature matrix in {path}")]
    Matrix {
        /// Path to the file.
        path: PathBuf,
        /// Underlying matrix validation error.
        source: ForestError,
    },

    /// Returned when a report file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
