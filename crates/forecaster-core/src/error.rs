//! Error types for the forecaster

use thiserror::Error;

use crate::models::SectionId;

/// Bad or missing input at one of the core boundaries
///
/// Every variant is recoverable: the caller surfaces the message and lets the
/// user retry with corrected input. The workspace is unchanged when one of
/// these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Organization name is required")]
    EmptyOrganizationName,

    #[error("Organization name is already set to '{0}'")]
    OrganizationAlreadySet(String),

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Unknown field '{field}' for {section}")]
    UnknownField { section: SectionId, field: String },

    #[error("{field} must be a whole number")]
    ExpectedInteger { field: &'static str },

    #[error("{field} must be one of: {} (got '{value}')", .allowed.join(", "))]
    InvalidChoice {
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("{section} is missing required field '{field}'")]
    MissingField {
        section: SectionId,
        field: &'static str,
    },

    #[error("Unsupported history file '{0}' (expected .csv or .xlsx)")]
    UnsupportedUpload(String),

    #[error("History file '{0}' is empty")]
    EmptyUpload(String),

    #[error("History file '{name}' is too large ({size} bytes, max {max})")]
    UploadTooLarge { name: String, size: usize, max: usize },
}

/// Failure while encoding a report into its output format
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("{context} contains {ch:?}, which the report encoding cannot represent")]
    UnencodableCharacter { context: String, ch: char },

    #[error("Failed to compress report content: {0}")]
    Compression(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
