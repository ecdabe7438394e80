//! Error types for the tradedoc-core library.

use thiserror::Error;

use crate::models::table::SourceId;

/// Main error type for the tradedoc library.
#[derive(Error, Debug)]
pub enum TradeDocError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Invoice line extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Merge error.
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    /// CSV read/write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet read error.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed or serialized.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors related to line-item extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A vocabulary entry could not be compiled into a pattern.
    #[error("invalid pattern {pattern}: {reason}")]
    Pattern { pattern: String, reason: String },

    /// Unknown document kind requested.
    #[error("unknown document kind: {0}")]
    UnknownKind(String),
}

/// Errors that abort a merge invocation.
#[derive(Error, Debug)]
pub enum MergeError {
    /// A numeric cell could not be parsed after sentinel checks.
    #[error("failed to parse number in {table} column {column}, row {row}: {value:?}")]
    NumericParse {
        table: SourceId,
        column: usize,
        row: usize,
        value: String,
    },

    /// A layout rule references a column the source does not have.
    #[error("{table} has no column {column}")]
    MissingColumn { table: SourceId, column: usize },

    /// A required source table is absent.
    #[error("missing required source: {0}")]
    MissingSource(String),

    /// The layout itself is unusable.
    #[error("invalid merge layout: {0}")]
    Layout(String),
}

/// Errors of external lookups. Callers degrade these to a default value.
#[derive(Error, Debug)]
pub enum LookupError {
    /// Reading candidate files failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A candidate image could not be decoded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The remote service failed or answered unexpectedly.
    #[error("service error: {0}")]
    Service(String),
}

/// Result type for the tradedoc library.
pub type Result<T> = std::result::Result<T, TradeDocError>;
