//! Error types for the cdset-core library.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Main error type for the cdset library.
#[derive(Error, Debug)]
pub enum CdsError {
    /// Document loading error.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by the text/table extraction boundary.
#[derive(Error, Debug)]
pub enum DocumentError {
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

    /// No loader handles this file extension.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// I/O error while reading the document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Non-fatal problems collected during a run.
///
/// None of these abort the batch; they are reported in the run summary.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExtractionIssue {
    /// No rule matched the field.
    #[error("missing field {field}")]
    MissingField { field: String },

    /// Rules of the same rank produced different values.
    #[error("ambiguous match for {field}: {candidates:?}, kept {kept}")]
    AmbiguousMatch {
        field: String,
        candidates: Vec<String>,
        kept: String,
    },

    /// The assembled record failed a consistency check.
    #[error("invariant violated ({rule}): {detail}")]
    InvariantViolation { rule: String, detail: String },

    /// The document could not be turned into a record.
    #[error("document {} unreadable: {reason}", path.display())]
    DocumentUnreadable { path: PathBuf, reason: String },

    /// Two documents mapped to the same academic year.
    #[error("document {} duplicates year {year}", path.display())]
    DuplicateYear { path: PathBuf, year: String },

    /// An override could not be applied to the record.
    #[error("override for {field} skipped: {reason}")]
    OverrideSkipped { field: String, reason: String },
}

impl ExtractionIssue {
    /// Short label used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionIssue::MissingField { .. } => "missing",
            ExtractionIssue::AmbiguousMatch { .. } => "ambiguous",
            ExtractionIssue::InvariantViolation { .. } => "invariant",
            ExtractionIssue::DocumentUnreadable { .. } => "unreadable",
            ExtractionIssue::DuplicateYear { .. } => "duplicate",
            ExtractionIssue::OverrideSkipped { .. } => "override",
        }
    }

    pub(crate) fn missing(field: impl Into<String>) -> Self {
        ExtractionIssue::MissingField {
            field: field.into(),
        }
    }

    pub(crate) fn invariant(rule: impl Into<String>, detail: impl Into<String>) -> Self {
        ExtractionIssue::InvariantViolation {
            rule: rule.into(),
            detail: detail.into(),
        }
    }
}

/// Result type for the cdset library.
pub type Result<T> = std::result::Result<T, CdsError>;
