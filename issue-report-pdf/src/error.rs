//! Error types for issue report rendering
//!
//! Font and glyph problems are recovered inside the renderer and never show up here.
//! Everything in this enum aborts the render; no partial document is returned.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportGenerationError {
    #[error("Malformed report input: {0}")]
    MalformedInput(String),

    #[error("Invalid report options: {0}")]
    InvalidOptions(String),

    #[error("Font resource missing and built-in fallback disabled: {0}")]
    FontResourceMissing(String),

    #[error("Invalid page flow state: {0}")]
    InvalidState(&'static str),

    #[error("PDF encoding error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Failed to write report output: {0}")]
    OutputWriteFailure(#[from] std::io::Error),
}

/// Result type alias for report rendering
pub type ReportResult<T> = Result<T, ReportGenerationError>;

impl From<serde_json::Error> for ReportGenerationError {
    fn from(err: serde_json::Error) -> Self {
        ReportGenerationError::MalformedInput(err.to_string())
    }
}
