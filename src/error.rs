// src/error.rs

//! Crate-wide error and result types.
//!
//! Every fallible operation in the crate returns [`Result`]. I/O errors
//! keep their `std::io::ErrorKind` so callers can distinguish "does not
//! exist" (and opt into treat-missing-as-empty) from real failures.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the profile model, diff engine, and persistence codec
#[derive(Debug, Error)]
pub enum Error {
    /// A name or value failed a type or grammar rule
    #[error("invalid {field}: '{value}'")]
    Validation { field: &'static str, value: String },

    /// Malformed expression, status line, or key
    #[error("parse error: {0}")]
    Parse(String),

    /// Malformed input with a known source location
    #[error("{file}:{line}: {msg}")]
    ParseAt {
        file: String,
        line: usize,
        msg: String,
    },

    /// File or store open/read/write/rename failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key-value store failure
    #[error("store error: {0}")]
    Db(#[from] rusqlite::Error),

    /// A merge rule was violated (e.g. Replace with no existing target)
    #[error("merge conflict: {0}")]
    MergeConflict(String),

    /// The directory lock could not be acquired, even after force-breaking
    #[error("timed out acquiring lock at {0}")]
    LockTimeout(PathBuf),
}

impl Error {
    /// Build a validation error for a named field
    pub fn validation(field: &'static str, value: impl Into<String>) -> Self {
        Error::Validation {
            field,
            value: value.into(),
        }
    }

    /// True if this wraps an I/O "not found" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err: Error = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert!(err.is_not_found());

        let err: Error = std::io::Error::from(std::io::ErrorKind::PermissionDenied).into();
        assert!(!err.is_not_found());

        assert!(!Error::Parse("x".into()).is_not_found());
    }

    #[test]
    fn test_validation_message() {
        let err = Error::validation("resource name", "9bad");
        assert_eq!(err.to_string(), "invalid resource name: '9bad'");
    }
}
