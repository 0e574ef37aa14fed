//! Error types for the hunter

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Hunter error type
#[derive(Error, Debug)]
pub enum HunterError {
    #[error("Cannot open repository '{}': {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Captured {field} is not valid UTF-8 (window {window}): {source}")]
    DecodeFailure {
        field: &'static str,
        window: u64,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rendered report is not UTF-8: {0}")]
    Render(#[from] std::string::FromUtf8Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, HunterError>;
