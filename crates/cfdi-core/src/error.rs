//! Error types for the cfdi-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the cfdi library.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Document parsing error.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Reference data error.
    #[error("reference data error: {0}")]
    Reference(#[from] ReferenceError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The batch contained no documents at all.
    #[error("no documents to audit")]
    EmptyBatch,

    /// Every document in the batch failed to parse.
    #[error("none of the {} documents could be parsed", failures.len())]
    NoValidDocuments {
        /// Per-document failures, in input order.
        failures: Vec<crate::audit::FailedDocument>,
    },
}

/// Errors raised while parsing a single CFDI document.
///
/// These never abort a batch; the orchestrator records them per document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The bytes are not well-formed XML.
    #[error("malformed XML: {0}")]
    Malformed(String),

    /// The root element is not a `Comprobante`.
    #[error("not a CFDI document (root element `{0}`)")]
    NotCfdi(String),

    /// Neither `Emisor` nor `Receptor` is present.
    #[error("document has neither issuer nor receiver")]
    MissingParties,

    /// A mandatory amount is not a valid non-negative decimal.
    #[error("invalid amount in {field}: {value:?}")]
    InvalidAmount { field: String, value: String },
}

/// Errors raised while loading the reference blacklist.
///
/// The loader degrades these into an unusable [`crate::reference::Blacklist`]
/// carrying the message, so callers rarely see them directly.
#[derive(Error, Debug)]
pub enum ReferenceError {
    /// The reference file does not exist.
    #[error("reference file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Failed to read the reference file.
    #[error("failed to read reference file: {0}")]
    Io(#[from] std::io::Error),

    /// CSV structure could not be read.
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The tax ID or status column could not be found.
    #[error("columns not found (expected headers containing {tax_id:?} and {status:?})")]
    ColumnsNotFound { tax_id: String, status: String },
}

/// Result type for the cfdi library.
pub type Result<T> = std::result::Result<T, AuditError>;
