//! Error types for graphgate
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// Underlying cause carried by backend errors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for graphgate
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported data source type: {tag}")]
    UnsupportedDataSource { tag: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Connectivity Errors
    // ============================================================================
    #[error("SSH tunnel error: {message}")]
    Tunnel {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("No free local port available: {0}")]
    NoFreePort(#[source] std::io::Error),

    // ============================================================================
    // Backend Errors
    // ============================================================================
    #[error("Backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Invalid element id '{id}' for data source {data_source_id}")]
    InvalidId { id: String, data_source_id: i64 },

    // ============================================================================
    // Record Errors
    // ============================================================================
    #[error("No such field or value: {field}")]
    NoSuchField { field: String },

    #[error("Value of field '{field}' is not a {expected}")]
    ValueType { field: String, expected: &'static str },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an unsupported data source error
    pub fn unsupported(tag: impl Into<String>) -> Self {
        Self::UnsupportedDataSource { tag: tag.into() }
    }

    /// Create a tunnel error without an underlying I/O cause
    pub fn tunnel(message: impl Into<String>) -> Self {
        Self::Tunnel {
            message: message.into(),
            source: None,
        }
    }

    /// Create a tunnel error wrapping an I/O cause
    pub fn tunnel_io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Tunnel {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Create a backend error wrapping the driver's cause
    pub fn backend_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Backend {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a missing field error
    pub fn no_such_field(field: impl Into<String>) -> Self {
        Self::NoSuchField {
            field: field.into(),
        }
    }

    /// Whether the caller misconfigured something (as opposed to a runtime failure)
    pub fn is_configuration(&self) -> bool {
        match self {
            Error::Config { .. }
            | Error::UnsupportedDataSource { .. }
            | Error::YamlParse(_)
            | Error::JsonParse(_) => true,
            Error::Context { source, .. } => source.is_configuration(),
            _ => false,
        }
    }

    /// Whether the failure came from reaching the data source
    pub fn is_connectivity(&self) -> bool {
        match self {
            Error::Tunnel { .. } | Error::NoFreePort(_) => true,
            Error::Context { source, .. } => source.is_connectivity(),
            _ => false,
        }
    }
}

/// Result type alias for graphgate
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Context {
            message: message.into(),
            source: Box::new(e.into()),
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| Error::Context {
            message: f(),
            source: Box::new(e.into()),
        })
    }
}
