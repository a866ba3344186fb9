//! Unified error handling for netsnoop.
//!
//! Modeled as a small set of struct variants carrying a human-readable
//! message plus an optional boxed source. Most runtime failures in the
//! monitor are absorbed locally with sentinels; the variants here cover
//! the cases that are worth surfacing (bad configuration, a log sink that
//! cannot be reached at all, signal installation).

use std::io;
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum NetsnoopError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Process table access errors
    #[error("Process error: {message}")]
    Process {
        message: String,
        pid: Option<u32>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Log sink errors
    #[error("Log sink error: {message} (path: {path})")]
    Sink {
        message: String,
        path: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Runtime errors (signal handling, timer setup)
    #[error("Runtime error: {message}")]
    Runtime {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl NetsnoopError {
    /// Whether the monitor loop can keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            NetsnoopError::Config { .. } => false,
            NetsnoopError::Process { .. } => true,
            NetsnoopError::Sink { .. } => true,
            NetsnoopError::Runtime { .. } => false,
        }
    }
}

impl From<io::Error> for NetsnoopError {
    fn from(err: io::Error) -> Self {
        NetsnoopError::Runtime {
            message: format!("I/O error: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

/// Result type alias for convenience
pub type NetsnoopResult<T> = Result<T, NetsnoopError>;

/// Convenience functions for creating common errors
pub mod errors {
    use super::*;

    pub fn config_error(message: impl Into<String>) -> NetsnoopError {
        NetsnoopError::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> NetsnoopError {
        NetsnoopError::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn process_error(message: impl Into<String>, pid: Option<u32>) -> NetsnoopError {
        NetsnoopError::Process {
            message: message.into(),
            pid,
            source: None,
        }
    }

    pub fn sink_error(
        message: impl Into<String>,
        path: impl Into<String>,
        source: io::Error,
    ) -> NetsnoopError {
        NetsnoopError::Sink {
            message: message.into(),
            path: path.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(!errors::config_error("bad toml").is_recoverable());
        assert!(errors::process_error("vanished", Some(42)).is_recoverable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = errors::sink_error(
            "write failed",
            "/tmp/netsnoop.log",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("write failed"));
        assert!(rendered.contains("/tmp/netsnoop.log"));
    }
}
