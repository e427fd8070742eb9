use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NoduleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown algorithm: {0} (valid: danforth, fleischner)")]
    UnknownAlgorithm(String),

    #[error("Unknown phrase search method: {0} (valid: string, tokens)")]
    UnknownSearchMethod(String),

    #[error("Unknown character encoding: {0}")]
    UnknownEncoding(String),

    #[error("Invalid rule {rule}: {reason}")]
    InvalidRule { rule: u32, reason: String },

    #[error("Cannot decode {file} as {encoding}")]
    Decode { file: String, encoding: String },

    #[error("Input directory not found: {0}")]
    InputNotFound(PathBuf),
}

impl NoduleError {
    /// True for errors that must stop a batch before any document is read.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            NoduleError::Config(_)
                | NoduleError::UnknownAlgorithm(_)
                | NoduleError::UnknownSearchMethod(_)
                | NoduleError::UnknownEncoding(_)
                | NoduleError::InvalidRule { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, NoduleError>;
