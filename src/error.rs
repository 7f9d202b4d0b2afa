//! Error types for the sms-backup-merge library.
//!
//! Per-record problems during ingestion are not errors: they surface as
//! [`crate::db::InsertOutcome`] values and only bump counters. Everything in
//! [`MergeError`] aborts the run before an output file is written.

use thiserror::Error;

/// Errors that can occur while merging backup exports.
#[derive(Error, Debug)]
pub enum MergeError {
    /// Staging store errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Low-level XML reader/writer errors
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An input document could not be read as an XML tree
    #[error("Failed to parse {source_name} at byte {position}: {message}")]
    Parse {
        /// File path or other label of the document
        source_name: String,
        /// Byte offset where the reader gave up
        position: u64,
        /// Reader diagnostic
        message: String,
    },

    /// An element carried an attribute its table has no column for
    #[error("Unknown attribute '{attribute}' for table {table}")]
    UnknownAttribute {
        /// Staging table name
        table: &'static str,
        /// Offending attribute name
        attribute: String,
    },

    /// None of the input arguments resolved to a file
    #[error("No input files found: {0}")]
    NoInputFiles(String),

    /// The output path cannot be written
    #[error("Invalid output path: {0}")]
    InvalidOutput(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Bad glob pattern in an input argument
    #[error("Invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Regex compilation failure
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Convenience type alias for Result with MergeError
pub type Result<T> = std::result::Result<T, MergeError>;
