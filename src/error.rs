// src/error.rs

//! Unified error handling for the relay.

use std::fmt;

use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A configured URL is malformed
    #[error("Invalid URL '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Regex compilation failed
    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// Feed document could not be parsed
    #[error("Feed parse error: {0}")]
    Feed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a pattern compilation error.
    pub fn pattern(pattern: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: message.to_string(),
        }
    }

    /// Create a URL error naming the offending value.
    pub fn url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::Url {
            url: url.into(),
            source,
        }
    }

    /// Create a feed parse error.
    pub fn feed(message: impl fmt::Display) -> Self {
        Self::Feed(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
