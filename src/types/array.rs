//! PostgreSQL's standard 1-D array wire format.
//!
//! `{ndim=1, has_null, element_oid, dim_length, lower_bound=1}` followed by
//! length-prefixed elements. Empty arrays are sent as `NULL` instead (spec.md
//! §4.2), so an empty `Vec<T>` never reaches [`encode_array`].
use bytes::{Buf, BufMut, BytesMut};

use super::{BinaryDecode, BinaryEncode, TypeError};
use crate::postgres::{Oid, PgType};

pub fn encode_array<T: BinaryEncode>(elements: &[T], element_oid: Oid) -> BytesMut {
    let mut buf = BytesMut::new();
    buf.put_i32(1); // ndim
    buf.put_i32(0); // has_null flag; binary arrays report it but readers don't rely on it
    buf.put_u32(element_oid);
    buf.put_i32(elements.len().try_into().expect("array too large"));
    buf.put_i32(1); // lower_bound

    for element in elements {
        let start = buf.len();
        buf.put_i32(0);
        element.encode_binary(&mut buf);
        let len = (buf.len() - start - 4) as i32;
        buf[start..start + 4].copy_from_slice(&len.to_be_bytes());
    }

    buf
}

/// Inverse of [`encode_array`], operating directly on a column's field
/// bytes (no copy: each element is handed to `T::decode_binary` as a
/// sub-slice of `bytes`).
pub fn decode_array<'a, T>(mut bytes: &'a [u8]) -> Result<Vec<Option<T>>, TypeError>
where
    T: BinaryDecode<'a> + PgType,
{
    if bytes.remaining() < 12 {
        return Err(TypeError::other(crate::common::general!("array header truncated")));
    }
    let ndim = bytes.get_i32();
    let _has_null = bytes.get_i32();
    let _element_oid = bytes.get_u32();

    if ndim == 0 {
        return Ok(Vec::new());
    }
    if ndim != 1 {
        return Err(TypeError::other(crate::common::general!("only 1-D arrays are supported, found {ndim} dimensions")));
    }

    if bytes.remaining() < 8 {
        return Err(TypeError::other(crate::common::general!("array dimension header truncated")));
    }
    let len = bytes.get_i32();
    let _lower_bound = bytes.get_i32();

    let mut out = Vec::with_capacity(len.max(0) as usize);
    for _ in 0..len {
        if bytes.remaining() < 4 {
            return Err(TypeError::other(crate::common::general!("array element length truncated")));
        }
        let elem_len = bytes.get_i32();
        if elem_len < 0 {
            out.push(None);
            continue;
        }
        let elem_len = elem_len as usize;
        if bytes.remaining() < elem_len {
            return Err(TypeError::LengthMismatch { expected: elem_len, found: bytes.remaining() });
        }
        let (elem, rest) = bytes.split_at(elem_len);
        bytes = rest;
        out.push(Some(T::decode_binary(elem)?));
    }

    Ok(out)
}

impl<'a, T> BinaryDecode<'a> for Vec<Option<T>>
where
    T: BinaryDecode<'a> + PgType,
{
    fn decode_binary(bytes: &'a [u8]) -> Result<Self, TypeError> {
        decode_array(bytes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn int4_array_roundtrip() {
        let elements = [1i32, 2, 3];
        let encoded = encode_array(&elements, i32::OID);
        let decoded: Vec<Option<i32>> = decode_array(&encoded).unwrap();
        assert_eq!(decoded, vec![Some(1), Some(2), Some(3)]);
    }
}
