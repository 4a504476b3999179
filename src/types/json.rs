//! `jsonb` binary codec.
//!
//! Wire representation is a 1-byte version (always `1`) followed by the
//! JSON payload as UTF-8 text. Per the open question in spec.md §9, this
//! decodes straight into a standard JSON parser rather than chasing the
//! array-of-pairs quirk some implementations produce.
use bytes::{BufMut, BytesMut};
use serde::{Serialize, de::DeserializeOwned};

use crate::postgres::{Jsonb, Oid, PgType};

use super::{BinaryDecode, BinaryEncode, TypeError};

const JSONB_VERSION: u8 = 1;

/// Wraps a `Serialize`/`Deserialize` value for transmission as `jsonb`.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T> PgType for Json<T> {
    const OID: Oid = Jsonb::OID;
    const ARRAY_OID: Oid = Jsonb::ARRAY_OID;
}

impl<T: Serialize> BinaryEncode for Json<T> {
    fn encode_binary(&self, buf: &mut BytesMut) {
        buf.put_u8(JSONB_VERSION);
        let bytes = serde_json::to_vec(&self.0).expect("T's Serialize impl does not fail");
        buf.put_slice(&bytes);
    }
}

impl<T: DeserializeOwned> BinaryDecode<'_> for Json<T> {
    fn decode_binary(bytes: &[u8]) -> Result<Self, TypeError> {
        let [version, payload @ ..] = bytes else {
            return Err(TypeError::other(crate::common::general!("jsonb payload missing version byte")));
        };
        if *version != JSONB_VERSION {
            return Err(TypeError::other(crate::common::general!("unsupported jsonb version {version}")));
        }
        serde_json::from_slice(payload).map(Json).map_err(TypeError::other)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn roundtrips_object() {
        let value = json!({"a": 1, "b": [true, null, "x"]});
        let mut buf = BytesMut::new();
        Json(value.clone()).encode_binary(&mut buf);
        assert_eq!(buf[0], 1);
        let Json(decoded) = Json::<serde_json::Value>::decode_binary(&buf).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn rejects_unknown_version() {
        let bytes = [2u8, b'{', b'}'];
        let err = Json::<serde_json::Value>::decode_binary(&bytes).unwrap_err();
        assert!(matches!(err, TypeError::Other(_)));
    }
}
