//! Error types for fixture operations.

use std::time::Duration;

use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

/// Server error code reported when a write violates a unique index.
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// Primary error type for fixture operations.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The connection string or client options were rejected before any I/O.
    #[error("invalid mongodb configuration")]
    Configuration {
        /// Source driver error.
        source: MongoError,
    },
    /// No server answered within the configured timeout.
    #[error("failed to reach mongodb")]
    Connection {
        /// Source driver error.
        source: MongoError,
    },
    /// An operation that needs a connection ran before `connect`.
    #[error("test database is not connected; call connect first")]
    NotConnected,
    /// `connect` was called on a fixture that already holds a client.
    #[error("test database is already connected")]
    AlreadyConnected,
    /// A collection or index operation failed on the server.
    #[error("database operation failed")]
    Database {
        /// Operation identifier.
        operation: &'static str,
        /// Source driver error.
        source: MongoError,
    },
    /// An operation did not finish before its client-side deadline.
    #[error("database operation timed out")]
    Timeout {
        /// Operation identifier.
        operation: &'static str,
        /// Deadline that elapsed.
        timeout: Duration,
    },
}

impl FixtureError {
    /// Returns `true` when the wrapped driver error is a duplicate-key error.
    #[must_use]
    pub fn is_duplicate_key(&self) -> bool {
        self.driver_error().is_some_and(is_duplicate_key_error)
    }

    /// The driver error behind this failure, when there is one.
    #[must_use]
    pub const fn driver_error(&self) -> Option<&MongoError> {
        match self {
            Self::Configuration { source }
            | Self::Connection { source }
            | Self::Database { source, .. } => Some(source),
            Self::NotConnected | Self::AlreadyConnected | Self::Timeout { .. } => None,
        }
    }
}

/// Convenience alias for fixture results.
pub type FixtureResult<T> = Result<T, FixtureError>;

/// Returns `true` if the driver error reports a duplicate key (code `11000`).
///
/// Covers single-document writes, any write error of an `insert_many` batch,
/// and command errors such as those raised by `createIndexes` on existing
/// duplicates.
#[must_use]
pub fn is_duplicate_key_error(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::InsertMany(insert_error) => insert_error
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY_CODE)),
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}
