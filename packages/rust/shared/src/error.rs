//! Error types for aptsheet.
//!
//! Library crates use [`AptSheetError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all aptsheet operations.
#[derive(Debug, thiserror::Error)]
pub enum AptSheetError {
    /// Configuration loading or validation error. Fatal before any row is written.
    #[error("config error: {message}")]
    Config { message: String },

    /// A numeric column held a value that could not be coerced.
    #[error("record {record}: column '{column}' expects a number, got {value:?}")]
    NumericCoercion {
        record: String,
        column: String,
        value: String,
    },

    /// The output destination could not be opened or finalized.
    #[error("sink unavailable at {path:?}: {source}")]
    SinkUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A write to an already-open sink failed.
    #[error("sink error: {message}")]
    Sink { message: String },

    /// The exporter was driven out of order (row before header, write after close).
    #[error("invalid use: {message}")]
    InvalidState { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Listing input could not be decoded.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Schema or data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AptSheetError>;

impl AptSheetError {
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

    /// Create an invalid-use error from any displayable message.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState {
            message: msg.into(),
        }
    }

    /// Create a sink write error from any displayable message.
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink {
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

    /// Wrap a failure to open or finalize the output destination.
    pub fn sink_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SinkUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only spoils the current row.
    ///
    /// Row-level errors are logged and the run continues with the next record.
    pub fn is_row_level(&self) -> bool {
        matches!(self, Self::NumericCoercion { .. })
    }
}
