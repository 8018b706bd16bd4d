//! Error types for the Vista captioning pipeline.
//!
//! Per-item errors ([`CaptionError`]) carry enough context to be shown next to
//! the source they belong to. Only [`CaptionError::TooManyConsecutiveFailures`]
//! ever escapes a batch run; everything else is recorded as a failed item.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Vista operations.
#[derive(Error, Debug)]
pub enum VistaError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Captioning errors
    #[error("Caption error: {0}")]
    Caption(#[from] CaptionError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors produced while captioning a single source, plus the batch breaker.
#[derive(Error, Debug)]
pub enum CaptionError {
    /// Local source does not exist
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Decoding, resizing, or re-encoding the image failed
    #[error("Failed to process image {path}: {message}")]
    ImageProcessing { path: PathBuf, message: String },

    /// The request never produced an HTTP response (refused, reset, DNS, timed out)
    #[error("Connection failed: {message}")]
    Connection { message: String },

    /// HTTP error status, malformed body, or error-shaped API response
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code, when the failure came from an HTTP response.
        status_code: Option<u16>,
    },

    /// The captioning call exceeded its deadline
    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Writing the caption to disk failed
    #[error("Failed to write caption to {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// The consecutive-failure breaker tripped
    #[error("Aborted after {threshold} consecutive failures")]
    TooManyConsecutiveFailures { threshold: u32 },
}

impl CaptionError {
    /// Build an `Api` error without an HTTP status.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            status_code: None,
        }
    }
}

/// Convenience type alias for Vista results.
pub type Result<T> = std::result::Result<T, VistaError>;
