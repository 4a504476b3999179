//! Parameter marshaller (C6): turns a parameter pack into a Bind payload.
use bytes::{Bytes, BytesMut};

use crate::ext::BindParams;
use crate::postgres::{Oid, PgFormat, PgType};
use crate::types::{BinaryEncode, TextEncode, encode_array};

/// One marshalled bind parameter: format, OID, and either its encoded bytes
/// or `None` for SQL `NULL`.
pub struct Encoded {
    pub oid: Oid,
    pub format: PgFormat,
    pub bytes: Option<Bytes>,
}

impl Encoded {
    pub fn null(oid: Oid) -> Self {
        Self { oid, format: PgFormat::Binary, bytes: None }
    }

    fn binary<T: BinaryEncode + PgType>(value: &T) -> Self {
        let mut buf = BytesMut::new();
        value.encode_binary(&mut buf);
        Self { oid: T::OID, format: PgFormat::Binary, bytes: Some(buf.freeze()) }
    }

    fn text(oid: Oid, value: impl Into<Bytes>) -> Self {
        Self { oid, format: PgFormat::Text, bytes: Some(value.into()) }
    }
}

/// `{length(i32) + value-bytes, -1 for NULL}`, implemented over the wrapped
/// bytes so it can be written directly by [`crate::postgres::frontend::Bind`].
///
/// `None` is a SQL `NULL` (size `-1`); `Some(empty)` is a legitimate
/// zero-length value, e.g. an empty `bytea` (spec.md §9 open question).
pub struct EncodedBuf(Option<Bytes>);

impl bytes::Buf for EncodedBuf {
    fn remaining(&self) -> usize {
        self.0.as_ref().map_or(0, Bytes::remaining)
    }

    fn chunk(&self) -> &[u8] {
        self.0.as_ref().map_or(&[][..], Bytes::chunk)
    }

    fn advance(&mut self, cnt: usize) {
        if let Some(bytes) = &mut self.0 {
            bytes.advance(cnt);
        }
    }
}

impl BindParams for EncodedBuf {
    fn size(&self) -> i32 {
        match &self.0 {
            Some(bytes) => bytes.len() as i32,
            None => -1,
        }
    }
}

/// A value convertible into one or more bind parameters.
///
/// Most types produce exactly one [`Encoded`]; [`BatchText`] is the explicit
/// mechanism (spec.md §4.6) for expanding a `Vec<String>` into one text
/// parameter per element, for multi-row `VALUES ($1),($2),($3)` inserts.
pub trait Param {
    fn into_params(self) -> Vec<Encoded>;
}

macro_rules! scalar_param {
    ($ty:ty) => {
        impl Param for $ty {
            fn into_params(self) -> Vec<Encoded> {
                vec![Encoded::binary(&self)]
            }
        }
    };
}

scalar_param!(bool);
scalar_param!(i16);
scalar_param!(i32);
scalar_param!(i64);
scalar_param!(f32);
scalar_param!(f64);

impl Param for String {
    fn into_params(self) -> Vec<Encoded> {
        vec![Encoded::binary(&self)]
    }
}

impl Param for &str {
    fn into_params(self) -> Vec<Encoded> {
        vec![Encoded::binary(&self.to_owned())]
    }
}

impl Param for Vec<u8> {
    fn into_params(self) -> Vec<Encoded> {
        vec![Encoded::binary(&self)]
    }
}

#[cfg(feature = "uuid")]
impl Param for uuid::Uuid {
    fn into_params(self) -> Vec<Encoded> {
        vec![Encoded::binary(&self)]
    }
}

#[cfg(feature = "time")]
impl Param for time::PrimitiveDateTime {
    fn into_params(self) -> Vec<Encoded> {
        vec![Encoded::binary(&self)]
    }
}

#[cfg(feature = "time")]
impl Param for time::OffsetDateTime {
    fn into_params(self) -> Vec<Encoded> {
        vec![Encoded::binary(&self)]
    }
}

#[cfg(feature = "json")]
impl<T: serde::Serialize> Param for crate::types::Json<T> {
    fn into_params(self) -> Vec<Encoded> {
        vec![Encoded::binary(&self)]
    }
}

impl<T: Param> Param for Option<T> {
    fn into_params(self) -> Vec<Encoded> {
        match self {
            Some(value) => value.into_params(),
            // a bare `None` carries no OID of its own; callers that need a
            // concrete NULL OID should prepare the statement with declared
            // parameter types instead.
            None => vec![Encoded::null(0)],
        }
    }
}

/// A 1-D PostgreSQL array. Encoded per spec.md §4.2; an empty array is sent
/// as `NULL` rather than a zero-length array header.
impl<T: BinaryEncode + PgType> Param for Vec<T> {
    fn into_params(self) -> Vec<Encoded> {
        if self.is_empty() {
            return vec![Encoded::null(T::ARRAY_OID)];
        }
        let bytes = encode_array(&self, T::OID).freeze();
        vec![Encoded { oid: T::ARRAY_OID, format: PgFormat::Binary, bytes: Some(bytes) }]
    }
}

/// Explicit marker for the batch-insert expansion: each element becomes its
/// own text-format parameter, in order (spec.md §4.6).
pub struct BatchText(pub Vec<String>);

impl Param for BatchText {
    fn into_params(self) -> Vec<Encoded> {
        self.0.into_iter().map(|s| Encoded::text(<str as PgType>::OID, s.encode_text().into_bytes())).collect()
    }
}

macro_rules! tuple_param {
    ($($name:ident),+) => {
        impl<$($name: Param),+> Param for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_params(self) -> Vec<Encoded> {
                let ($($name,)+) = self;
                let mut out = Vec::new();
                $(out.extend($name.into_params());)+
                out
            }
        }
    };
}

tuple_param!(A);
tuple_param!(A, B);
tuple_param!(A, B, C);
tuple_param!(A, B, C, D);
tuple_param!(A, B, C, D, E);
tuple_param!(A, B, C, D, E, F);
tuple_param!(A, B, C, D, E, F, G);
tuple_param!(A, B, C, D, E, F, G, H);

/// Marshals a parameter pack into the pieces a [`crate::postgres::frontend::Bind`]
/// message needs: per-parameter format codes, the length-prefixed value
/// buffers, and the OID list for a matching `Parse`.
pub fn marshal<P: Param>(params: P) -> (Vec<PgFormat>, Vec<EncodedBuf>, Vec<Oid>) {
    let encoded = params.into_params();
    let mut formats = Vec::with_capacity(encoded.len());
    let mut values = Vec::with_capacity(encoded.len());
    let mut oids = Vec::with_capacity(encoded.len());

    for param in encoded {
        formats.push(param.format);
        oids.push(param.oid);
        values.push(EncodedBuf(param.bytes));
    }

    (formats, values, oids)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scalar_produces_one_param() {
        let (formats, values, oids) = marshal((42i32,));
        assert_eq!(formats, vec![PgFormat::Binary]);
        assert_eq!(oids, vec![23]);
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn batch_text_expands_per_element() {
        let (formats, values, oids) = marshal((BatchText(vec!["a".into(), "b".into(), "c".into()]),));
        assert_eq!(formats, vec![PgFormat::Text; 3]);
        assert_eq!(oids, vec![25; 3]);
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn empty_array_is_null() {
        let (_, values, _) = marshal((Vec::<i32>::new(),));
        assert_eq!(values[0].0, None);
    }

    #[test]
    fn option_none_is_null() {
        let (_, values, _) = marshal((Option::<i32>::None,));
        assert_eq!(values[0].0, None);
    }
}
