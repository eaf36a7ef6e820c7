//! Error types for the datastore
//!
//! This module defines all error kinds used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.

use crate::key::Key;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for datastore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds for the datastore
#[derive(Debug, Error)]
pub enum Error {
    /// Key absent in the consulted view; expected in normal control flow
    #[error("key not found: {0:?}")]
    NotFound(Key),

    /// Operation attempted on a committed or discarded transaction
    #[error("transaction is closed")]
    TransactionClosed,

    /// Operation attempted on a datastore that has begun or finished closing
    #[error("datastore is closed")]
    Closed,

    /// Write attempted through a read-only transaction
    #[error("transaction is read-only")]
    ReadOnly,

    /// Malformed query specification
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Underlying engine I/O or corruption failure; not retried
    #[error("engine error: {0}")]
    Engine(String),

    /// Filesystem error (storage accounting)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Wrap an engine-level failure.
    pub fn engine(err: impl fmt::Display) -> Self {
        Error::Engine(err.to_string())
    }

    /// Build an `InvalidQuery` error.
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Error::InvalidQuery(reason.into())
    }

    /// Whether this error is the recoverable not-found case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_not_found() {
        let err = Error::NotFound(Key::new("/missing"));
        assert!(err.to_string().contains("key not found"));
        assert!(err.to_string().contains("/missing"));
    }

    #[test]
    fn test_display_engine() {
        let err = Error::engine("write failed");
        assert!(err.to_string().contains("engine error"));
        assert!(err.to_string().contains("write failed"));
    }

    #[test]
    fn test_display_invalid_query() {
        let err = Error::invalid_query("bad filter");
        assert!(err.to_string().contains("invalid query"));
        assert!(err.to_string().contains("bad filter"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::NotFound(Key::new("/k")).is_not_found());
        assert!(!Error::Closed.is_not_found());
        assert!(!Error::TransactionClosed.is_not_found());
    }

    #[test]
    fn test_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_result_alias() {
        fn ok() -> Result<u32> {
            Ok(7)
        }
        fn fails() -> Result<u32> {
            Err(Error::Closed)
        }
        assert_eq!(ok().unwrap(), 7);
        assert!(fails().is_err());
    }
}
