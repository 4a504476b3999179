//! Protocol and database error decoding (C9 — error classifier).
use bytes::{Buf, Bytes};

use crate::{common::BoxError, ext::BytesExt};

/// An error translating bytes from the backend into a typed message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unexpected message: expected {expect:?}, found {found:?}{}", phase.map(|p| format!(" during {p}")).unwrap_or_default())]
    Unexpected {
        expect: Option<u8>,
        found: u8,
        phase: Option<&'static str>,
    },
    #[error("unknown authentication request type: {auth}")]
    UnknownAuth { auth: u32 },
    #[error("malformed message: {0}")]
    Malformed(#[source] BoxError),
}

impl ProtocolError {
    pub(crate) fn unknown(found: u8) -> ProtocolError {
        Self::Unexpected { expect: None, found, phase: None }
    }

    pub(crate) fn unexpected(expect: u8, found: u8) -> ProtocolError {
        Self::Unexpected { expect: Some(expect), found, phase: None }
    }

    pub(crate) fn unexpected_phase(found: u8, phase: &'static str) -> ProtocolError {
        Self::Unexpected { expect: None, found, phase: Some(phase) }
    }

    pub(crate) fn unknown_auth(auth: u32) -> ProtocolError {
        Self::UnknownAuth { auth }
    }

    pub(crate) fn malformed(source: impl Into<BoxError>) -> ProtocolError {
        Self::Malformed(source.into())
    }
}

/// The kind of database error, classified from the SQLSTATE class
/// (first two characters of the 5-character code).
///
/// <https://www.postgresql.org/docs/current/errcodes-appendix.html>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Class `08` — connection exception.
    ConnectionError,
    /// Class `28`/`0P` — invalid authorization / invalid role specification.
    AuthenticationFailed,
    /// Class `23` — integrity constraint violation.
    ConstraintViolation,
    /// Class `42` — syntax error or access rule violation.
    SqlSyntaxOrBindingError,
    /// Class `40` — transaction rollback (serialization failure, deadlock).
    TransactionSerializationFailure,
    /// Class `57` — operator intervention (admin shutdown, query canceled).
    ServerShutdownOrTimeout,
    /// Any other class.
    QueryError,
}

impl ErrorKind {
    pub fn from_sqlstate(code: &str) -> Self {
        match code.get(..2) {
            Some("08") => Self::ConnectionError,
            Some("28") | Some("0P") => Self::AuthenticationFailed,
            Some("23") => Self::ConstraintViolation,
            Some("42") => Self::SqlSyntaxOrBindingError,
            Some("40") => Self::TransactionSerializationFailure,
            Some("57") => Self::ServerShutdownOrTimeout,
            _ => Self::QueryError,
        }
    }
}

/// A decoded `ErrorResponse`/`NoticeResponse` field set.
///
/// <https://www.postgresql.org/docs/current/protocol-error-fields.html>
#[derive(Debug, Clone, thiserror::Error)]
#[error("{severity}: {message} ({code}){}", detail.as_deref().map(|d| format!(" - {d}")).unwrap_or_default())]
pub struct DatabaseError {
    pub severity: String,
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
    pub kind: ErrorKind,
}

impl DatabaseError {
    /// Parse the field list out of an `ErrorResponse`/`NoticeResponse` body.
    ///
    /// Body format: one or more `{Byte1 field-code, String value}` pairs,
    /// terminated by a zero byte.
    pub fn parse(mut body: Bytes) -> Result<Self, ProtocolError> {
        let mut severity = None;
        let mut code = None;
        let mut message = None;
        let mut detail = None;

        loop {
            if !body.has_remaining() {
                return Err(ProtocolError::malformed("ErrorResponse missing terminator"));
            }
            let field = body.get_u8();
            if field == 0 {
                break;
            }
            let value = body
                .get_nul_bytestr()
                .map_err(ProtocolError::malformed)?;
            match field {
                b'S' => severity = Some(value.to_string()),
                b'C' => code = Some(value.to_string()),
                b'M' => message = Some(value.to_string()),
                b'D' => detail = Some(value.to_string()),
                _ => {} // unrecognized field types are ignored per protocol docs
            }
        }

        let code = code.ok_or_else(|| ProtocolError::malformed("ErrorResponse missing SQLSTATE"))?;
        let kind = ErrorKind::from_sqlstate(&code);

        Ok(Self {
            severity: severity.unwrap_or_else(|| "ERROR".into()),
            code,
            message: message.unwrap_or_default(),
            detail,
            kind,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn body(fields: &[(u8, &str)]) -> Bytes {
        let mut buf = Vec::new();
        for (code, value) in fields {
            buf.push(*code);
            buf.extend_from_slice(value.as_bytes());
            buf.push(0);
        }
        buf.push(0);
        Bytes::from(buf)
    }

    #[test]
    fn classifies_constraint_violation() {
        let err = DatabaseError::parse(body(&[
            (b'S', "ERROR"),
            (b'C', "23505"),
            (b'M', "duplicate key value"),
        ])).unwrap();
        assert_eq!(err.kind, ErrorKind::ConstraintViolation);
        assert_eq!(err.code, "23505");
    }

    #[test]
    fn classifies_serialization_failure() {
        let err = DatabaseError::parse(body(&[(b'S', "ERROR"), (b'C', "40001"), (b'M', "could not serialize")])).unwrap();
        assert_eq!(err.kind, ErrorKind::TransactionSerializationFailure);
    }

    #[test]
    fn unknown_class_is_query_error() {
        let err = DatabaseError::parse(body(&[(b'S', "ERROR"), (b'C', "55000"), (b'M', "x")])).unwrap();
        assert_eq!(err.kind, ErrorKind::QueryError);
    }
}
