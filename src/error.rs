// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for the Mustekala exerciser
//!
//! Driver failures carry the operation and URL that produced them so a
//! report reader can tell a dead page from a flaky element.

use thiserror::Error;

/// Result type alias for Mustekala operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the exerciser
#[derive(Error, Debug)]
pub enum Error {
    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Browser driver failure (launch, page handle, protocol)
    #[error("Driver error: {0}")]
    Driver(String),

    /// Navigation to a page failed
    #[error("Navigation failed to {url}: {reason}")]
    Navigation { url: String, reason: String },

    /// An operation exceeded its deadline
    #[error("Operation timed out after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        url: Option<String>,
    },

    /// Element interaction failure (click, focus, attribute read)
    #[error("Element error: {0}")]
    Element(String),

    /// Route table file could not be read
    #[error("Route file error for {path}: {source}")]
    RouteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Report generation failure
    #[error("Report error: {0}")]
    Report(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a driver error from any displayable cause
    pub fn driver(cause: impl std::fmt::Display) -> Self {
        Error::Driver(cause.to_string())
    }

    /// Shorthand for an element error from any displayable cause
    pub fn element(cause: impl std::fmt::Display) -> Self {
        Error::Element(cause.to_string())
    }

    /// Build a timeout error for a named operation
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration_ms,
            url: None,
        }
    }

    /// Attach a URL to a timeout error
    pub fn timeout_at(
        operation: impl Into<String>,
        duration_ms: u64,
        url: impl Into<String>,
    ) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration_ms,
            url: Some(url.into()),
        }
    }

    /// Whether this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = Error::timeout("click", 5000);
        assert_eq!(err.to_string(), "Operation timed out after 5000ms: click");
        assert!(err.is_timeout());
    }

    #[test]
    fn test_navigation_display() {
        let err = Error::Navigation {
            url: "https://example.com/broken".to_string(),
            reason: "net::ERR_CONNECTION_REFUSED".to_string(),
        };
        assert!(err.to_string().contains("https://example.com/broken"));
        assert!(!err.is_timeout());
    }
}
