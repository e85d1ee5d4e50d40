//! Error type definitions for the harvester

use thiserror::Error;

/// Top-level application error type
///
/// Anything that reaches this type at the pipeline boundary fails the run.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A pipeline stage failed unexpectedly
    #[error("Pipeline stage '{stage}' failed: {message}")]
    Pipeline { stage: String, message: String },

    /// File system errors (output, cache)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised while reading a single source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Network request exceeded its timeout
    #[error("Connection timeout: {url}")]
    Timeout { url: String },

    /// Remote answered with a non-success status
    #[error("HTTP error: {status} - {url}")]
    Http { status: u16, url: String },

    /// Connection refused, DNS failure, TLS failure and similar
    #[error("Network error: {url} - {message}")]
    Network { url: String, message: String },

    /// Body could not be decoded or decompressed
    #[error("Decode error: {url} - {message}")]
    Decode { url: String, message: String },

    /// URL is not well formed
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Local file could not be read
    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A setting is outside its accepted range or format
    #[error("Invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },

    /// The configuration sources could not be merged or deserialized
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl AppError {
    /// Create a pipeline failure for the given stage
    pub fn pipeline<S: Into<String>, M: Into<String>>(stage: S, message: M) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Classify a reqwest error for the given URL
    pub fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                url: url.to_string(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Whether the failure was a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl ConfigError {
    pub fn invalid<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}
