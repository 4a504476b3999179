//! Binary codecs for the fixed-width and textual scalar types.
use bytes::{Buf, BufMut, BytesMut};

use super::{BinaryDecode, BinaryEncode, TypeError};

macro_rules! int_codec {
    ($ty:ty, $get:ident, $put:ident) => {
        impl BinaryEncode for $ty {
            fn encode_binary(&self, buf: &mut BytesMut) {
                buf.$put(*self);
            }
        }

        impl BinaryDecode<'_> for $ty {
            fn decode_binary(mut bytes: &[u8]) -> Result<Self, TypeError> {
                let expected = std::mem::size_of::<$ty>();
                if bytes.len() != expected {
                    return Err(TypeError::LengthMismatch { expected, found: bytes.len() });
                }
                Ok(bytes.$get())
            }
        }
    };
}

int_codec!(i16, get_i16, put_i16);
int_codec!(i32, get_i32, put_i32);
int_codec!(i64, get_i64, put_i64);
int_codec!(f32, get_f32, put_f32);
int_codec!(f64, get_f64, put_f64);

impl BinaryEncode for bool {
    fn encode_binary(&self, buf: &mut BytesMut) {
        buf.put_u8(*self as u8);
    }
}

impl BinaryDecode<'_> for bool {
    fn decode_binary(bytes: &[u8]) -> Result<Self, TypeError> {
        match bytes {
            [0] => Ok(false),
            [_] => Ok(true),
            _ => Err(TypeError::LengthMismatch { expected: 1, found: bytes.len() }),
        }
    }
}

impl BinaryEncode for str {
    fn encode_binary(&self, buf: &mut BytesMut) {
        buf.put_slice(self.as_bytes());
    }
}

impl BinaryEncode for String {
    fn encode_binary(&self, buf: &mut BytesMut) {
        buf.put_slice(self.as_bytes());
    }
}

impl<'a> BinaryDecode<'a> for &'a str {
    fn decode_binary(bytes: &'a [u8]) -> Result<Self, TypeError> {
        Ok(std::str::from_utf8(bytes)?)
    }
}

impl BinaryDecode<'_> for String {
    fn decode_binary(bytes: &[u8]) -> Result<Self, TypeError> {
        Ok(std::str::from_utf8(bytes)?.to_owned())
    }
}

impl BinaryEncode for [u8] {
    fn encode_binary(&self, buf: &mut BytesMut) {
        buf.put_slice(self);
    }
}

impl BinaryEncode for Vec<u8> {
    fn encode_binary(&self, buf: &mut BytesMut) {
        buf.put_slice(self);
    }
}

impl<'a> BinaryDecode<'a> for &'a [u8] {
    fn decode_binary(bytes: &'a [u8]) -> Result<Self, TypeError> {
        Ok(bytes)
    }
}

impl BinaryDecode<'_> for Vec<u8> {
    fn decode_binary(bytes: &[u8]) -> Result<Self, TypeError> {
        Ok(bytes.to_vec())
    }
}

#[cfg(feature = "uuid")]
impl BinaryEncode for uuid::Uuid {
    fn encode_binary(&self, buf: &mut BytesMut) {
        buf.put_slice(self.as_bytes());
    }
}

#[cfg(feature = "uuid")]
impl BinaryDecode<'_> for uuid::Uuid {
    fn decode_binary(bytes: &[u8]) -> Result<Self, TypeError> {
        let bytes: [u8; 16] = bytes
            .try_into()
            .map_err(|_| TypeError::LengthMismatch { expected: 16, found: bytes.len() })?;
        Ok(uuid::Uuid::from_bytes(bytes))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn int4_roundtrip() {
        let mut buf = BytesMut::new();
        42i32.encode_binary(&mut buf);
        assert_eq!(i32::decode_binary(&buf).unwrap(), 42);
    }

    #[test]
    fn bool_roundtrip() {
        let mut buf = BytesMut::new();
        true.encode_binary(&mut buf);
        assert!(bool::decode_binary(&buf).unwrap());
    }

    #[test]
    fn bytea_empty_is_zero_length_not_null() {
        let mut buf = BytesMut::new();
        Vec::<u8>::new().encode_binary(&mut buf);
        assert!(buf.is_empty());
        assert_eq!(Vec::<u8>::decode_binary(&buf).unwrap(), Vec::<u8>::new());
    }
}
