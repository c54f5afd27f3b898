//! Error types for AgentMap.
//!
//! Library crates use [`AgentMapError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all AgentMap operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentMapError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the Dataverse Web API.
    #[error("network error: {0}")]
    Network(String),

    /// Response or snapshot parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A knowledge source's `knowledgeconfig` is not a valid JSON document.
    #[error("malformed knowledge config for {source_id}: {message}")]
    MalformedConfig { source_id: String, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (missing fields, invalid values, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AgentMapError>;

impl AgentMapError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a malformed-config error for one knowledge source.
    pub fn malformed_config(source_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedConfig {
            source_id: source_id.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
