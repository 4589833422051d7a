//! Error types for namesake.

use thiserror::Error;

/// Result type for namesake operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for namesake operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Catalog record violates the upstream extraction contract.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Configuration file is missing or malformed.
    #[error("Config error: {0}")]
    Config(String),

    /// Template lookup or substitution failed.
    #[error("Template error: {0}")]
    Template(String),

    /// Evaluation error.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a catalog contract error.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Error::Catalog(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a template error.
    pub fn template(msg: impl Into<String>) -> Self {
        Error::Template(msg.into())
    }

    /// Create an evaluation error.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Error::Evaluation(msg.into())
    }
}
