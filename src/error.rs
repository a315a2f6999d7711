use std::path::PathBuf;

use thiserror::Error;

/// Main error type for FlowDoc operations
///
/// Only fatal conditions surface here. Everything recoverable (syntax errors
/// in a single file, unresolved calls, ambiguous names) is collected as a
/// [`crate::core::Diagnostic`] instead.
#[derive(Error, Debug)]
pub enum FlowdocError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Duplicate step identifier: {qualified_id} (from {file})")]
    DuplicateStep { qualified_id: String, file: PathBuf },

    #[error("Render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlowdocError>;
