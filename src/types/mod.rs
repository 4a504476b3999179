//! Per-OID binary/text encode and decode (C2 — type registry).
mod array;
#[cfg(feature = "json")]
mod json;
mod scalar;
mod text;
#[cfg(feature = "time")]
mod time;

use bytes::BytesMut;

pub use array::encode_array;
#[cfg(feature = "json")]
pub use json::Json;
pub use text::{TextDecode, TextEncode};

use crate::common::BoxError;

/// An application-side type could not be reconciled with the column/value
/// it was asked to represent.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    #[error("expected {expected} bytes, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("invalid utf8 in text value: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("{0}")]
    Other(#[source] BoxError),
}

impl TypeError {
    pub fn other(source: impl Into<BoxError>) -> Self {
        Self::Other(source.into())
    }
}

/// Writes `self`'s PostgreSQL binary representation.
pub trait BinaryEncode {
    fn encode_binary(&self, buf: &mut BytesMut);
}

/// Reads a value out of its PostgreSQL binary representation.
pub trait BinaryDecode<'a>: Sized {
    fn decode_binary(bytes: &'a [u8]) -> Result<Self, TypeError>;
}
