//! Error Handling Module
//!
//! Defines the error type shared by the dataset, model, training and
//! inference layers. Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for iris lifecycle operations
#[derive(Error, Debug)]
pub enum IrisError {
    /// Error with dataset loading or validation
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error with model construction, fitting or prediction
    #[error("Model error: {0}")]
    Model(String),

    /// Error reading or writing the local run store
    #[error("Tracking error: {0}")]
    Tracking(String),

    /// Error with inference
    #[error("Inference error: {0}")]
    Inference(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

impl From<serde_json::Error> for IrisError {
    fn from(err: serde_json::Error) -> Self {
        IrisError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for IrisError {
    fn from(err: csv::Error) -> Self {
        IrisError::Dataset(err.to_string())
    }
}

impl From<toml::de::Error> for IrisError {
    fn from(err: toml::de::Error) -> Self {
        IrisError::Config(err.to_string())
    }
}

/// Convenience Result type for iris lifecycle operations
pub type Result<T> = std::result::Result<T, IrisError>;
