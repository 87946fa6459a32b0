//! Error types and handling for gridlog
//!
//! This module defines the error types used throughout the collector,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for gridlog operations
pub type Result<T> = std::result::Result<T, GridlogError>;

/// Main error type for gridlog
#[derive(Debug, Error)]
pub enum GridlogError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Gateway login errors
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// State file publication errors
    #[error("Publish error: {message}")]
    Publish { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl GridlogError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        GridlogError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        GridlogError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        GridlogError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        GridlogError::Network {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        GridlogError::Auth {
            message: message.into(),
        }
    }

    /// Create a new publish error
    pub fn publish<S: Into<String>>(message: S) -> Self {
        GridlogError::Publish {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        GridlogError::Generic {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for GridlogError {
    fn from(err: std::io::Error) -> Self {
        GridlogError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for GridlogError {
    fn from(err: serde_yaml::Error) -> Self {
        GridlogError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for GridlogError {
    fn from(err: serde_json::Error) -> Self {
        GridlogError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for GridlogError {
    fn from(err: reqwest::Error) -> Self {
        GridlogError::network(err.to_string())
    }
}
