//! Byte-level helpers shared by the wire codec (C1).
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::common::ByteStr;

/// Integer signedness in the postgres docs is awful.
pub trait UsizeExt {
    /// Length is `usize` in rust, while postgres sometimes wants `u32`.
    /// Panics on overflow instead of silently wrapping.
    fn to_u32(self) -> u32;
}

impl UsizeExt for usize {
    fn to_u32(self) -> u32 {
        self.try_into().expect("message size too large for protocol")
    }
}

pub trait StrExt {
    /// A postgres `String` must be nul terminated.
    fn nul_string_len(&self) -> u32;
}

impl StrExt for str {
    fn nul_string_len(&self) -> u32 {
        self.len().to_u32() + 1
    }
}

pub trait BufMutExt {
    /// Write a postgres nul-terminated `String`.
    fn put_nul_string(&mut self, string: &str);
}

impl<B: BufMut> BufMutExt for B {
    fn put_nul_string(&mut self, string: &str) {
        self.put(string.as_bytes());
        self.put_u8(b'\0');
    }
}

pub trait BytesExt {
    fn get_nul_bytes(&mut self) -> Self;

    fn get_nul_bytestr(&mut self) -> Result<ByteStr, std::str::Utf8Error>;
}

impl BytesExt for Bytes {
    fn get_nul_bytes(&mut self) -> Self {
        let end = self
            .iter()
            .position(|e| matches!(e, b'\0'))
            .expect("postgres string was not nul terminated");
        let me = self.split_to(end);
        Buf::advance(self, 1);
        me
    }

    fn get_nul_bytestr(&mut self) -> Result<ByteStr, std::str::Utf8Error> {
        ByteStr::from_utf8(self.get_nul_bytes())
    }
}

impl BytesExt for BytesMut {
    fn get_nul_bytes(&mut self) -> Self {
        let end = self
            .iter()
            .position(|e| matches!(e, b'\0'))
            .expect("postgres string was not nul terminated");
        let me = self.split_to(end);
        Buf::advance(self, 1);
        me
    }

    fn get_nul_bytestr(&mut self) -> Result<ByteStr, std::str::Utf8Error> {
        ByteStr::from_utf8(self.get_nul_bytes().freeze())
    }
}

/// A value that can be written as a Bind parameter.
pub trait BindParams: Buf {
    /// The length of the parameter value, in bytes (not including itself).
    ///
    /// Can be zero. As a special case, `-1` indicates `NULL`; no value bytes
    /// follow in the `NULL` case.
    fn size(&self) -> i32;
}
