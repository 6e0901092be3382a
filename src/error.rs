use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the collegium backend
#[derive(Error, Debug)]
pub enum CollegiumError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Malformed or missing request input
    #[error("Bad input: {0}")]
    BadInput(String),

    /// Token does not resolve to an active college
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request rejected by the rate limiter
    #[error("Rate limit exceeded ({0})")]
    RateLimited(String),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool / storage plumbing errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// API-level classification used by the thin transport layer to pick a
/// response status for an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    BadInput,
    Unauthorized,
    RateLimited,
    ServerError,
}

impl CollegiumError {
    /// Classify this error for the external contract.
    pub fn status(&self) -> ErrorStatus {
        match self {
            CollegiumError::BadInput(_) => ErrorStatus::BadInput,
            CollegiumError::Unauthorized(_) => ErrorStatus::Unauthorized,
            CollegiumError::RateLimited(_) => ErrorStatus::RateLimited,
            _ => ErrorStatus::ServerError,
        }
    }

    /// Message safe to show to an end user. Server-side failures are
    /// reduced to a generic message; details stay in the logs.
    pub fn public_message(&self) -> String {
        match self.status() {
            ErrorStatus::ServerError => "server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for collegium operations
pub type Result<T> = std::result::Result<T, CollegiumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            CollegiumError::BadInput("x".into()).status(),
            ErrorStatus::BadInput
        );
        assert_eq!(
            CollegiumError::Unauthorized("x".into()).status(),
            ErrorStatus::Unauthorized
        );
        assert_eq!(
            CollegiumError::RateLimited("x".into()).status(),
            ErrorStatus::RateLimited
        );
        assert_eq!(
            CollegiumError::Storage("pool".into()).status(),
            ErrorStatus::ServerError
        );
    }

    #[test]
    fn test_public_message_hides_internals() {
        let err = CollegiumError::Storage("connection pool exhausted".into());
        assert_eq!(err.public_message(), "server error");

        let err = CollegiumError::BadInput("limit out of range".into());
        assert!(err.public_message().contains("limit out of range"));
    }
}
