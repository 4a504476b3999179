//! Crate-level error type (C9), unifying transport, protocol, and database
//! failures behind one `Result`.
use crate::common::BoxError;
use crate::postgres::{DatabaseError, ErrorKind, ProtocolError};
use crate::row::RowError;
use crate::statement::StatementError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport closed, TLS failure, or other I/O failure.
    #[error("connection error: {0}")]
    ConnectionError(#[from] std::io::Error),

    /// Malformed message or unexpected tag.
    #[error(transparent)]
    ProtocolViolation(#[from] ProtocolError),

    /// A server-reported error, classified by SQLSTATE (spec.md §4.9).
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Application-side type/column mismatch.
    #[error(transparent)]
    Row(#[from] RowError),

    /// Statement-cache invariant violation: duplicate name, unknown name.
    #[error(transparent)]
    Statement(#[from] StatementError),

    /// A savepoint created outside an active transaction, or similar.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Connection configuration could not be resolved (bad URL, etc).
    #[error("configuration error: {0}")]
    Configuration(#[source] BoxError),
}

impl Error {
    /// The classified kind, for errors that carry one. Connection-level and
    /// application-side errors don't map onto a SQLSTATE class.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Database(e) => Some(e.kind),
            Error::ConnectionError(_) => Some(ErrorKind::ConnectionError),
            _ => None,
        }
    }
}
