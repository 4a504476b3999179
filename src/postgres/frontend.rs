//! Frontend (frontend-to-server) message encoding (C1 — wire codec).
use bytes::{BufMut, BytesMut};

use crate::ext::{BindParams, BufMutExt, StrExt, UsizeExt};

use super::pg_format::PgFormat;

/// Byte length of a message's tag + length prefix.
const PREFIX: usize = 1 + 4;

/// Writes `msg` into `buf`, prefixed with its tag and back-patched length.
pub fn write<F: FrontendProtocol>(msg: F, buf: &mut BytesMut) {
    let start = buf.len();
    buf.put_u8(F::MSGTYPE);
    buf.put_i32(0); // placeholder, patched below
    let body_start = buf.len();
    let expected_len = msg.size_hint();

    msg.encode(buf);

    let body_len = buf.len() - body_start;
    debug_assert_eq!(body_len, expected_len, "size_hint() did not match encoded body");
    let len = (body_len + 4).to_u32() as i32;
    buf[start + 1..start + PREFIX].copy_from_slice(&len.to_be_bytes());
}

/// A message sent to the backend with a standard `{tag, length}` prefix.
///
/// [`Startup`] is the one frontend message without a tag byte and is written
/// with its own `write()` method instead of going through [`write`].
pub trait FrontendProtocol {
    const MSGTYPE: u8;

    /// Exact length, in bytes, that [`Self::encode`] will write.
    fn size_hint(&self) -> usize;

    fn encode(self, buf: &mut BytesMut);
}

macro_rules! size_of {
    ($($ty:ty),*) => {
        0 $(+ std::mem::size_of::<$ty>())*
    };
}

/// Requests protocol negotiation and session parameters at connection start.
///
/// Has no message tag; its body begins directly with the protocol version.
pub struct Startup<'a> {
    pub user: &'a str,
    pub database: &'a str,
    pub replication: Option<&'a str>,
}

impl<'a> Startup<'a> {
    const PROTOCOL_VERSION: i32 = 196_608;

    pub fn write(self, buf: &mut BytesMut) {
        let start = buf.len();
        buf.put_i32(0);

        buf.put_i32(Self::PROTOCOL_VERSION);
        buf.put_nul_string("user");
        buf.put_nul_string(self.user);
        buf.put_nul_string("database");
        buf.put_nul_string(self.database);
        if let Some(replication) = self.replication {
            buf.put_nul_string("replication");
            buf.put_nul_string(replication);
        }
        buf.put_u8(0);

        let len = (buf.len() - start).to_u32() as i32;
        buf[start..start + 4].copy_from_slice(&len.to_be_bytes());
    }
}

/// An SSL negotiation request. Uses the same header shape as [`Startup`] but
/// a fixed, well-known code instead of a protocol version.
pub struct SslRequest;

impl SslRequest {
    const CODE: i32 = 80_877_103;

    pub fn write(self, buf: &mut BytesMut) {
        buf.put_i32(8);
        buf.put_i32(Self::CODE);
    }
}

pub struct PasswordMessage<'a> {
    pub password: &'a str,
}

impl FrontendProtocol for PasswordMessage<'_> {
    const MSGTYPE: u8 = b'p';

    fn size_hint(&self) -> usize {
        self.password.nul_string_len() as usize
    }

    fn encode(self, buf: &mut BytesMut) {
        buf.put_nul_string(self.password);
    }
}

pub struct SaslInitialResponse<'a> {
    pub mechanism: &'a str,
    pub data: &'a [u8],
}

impl FrontendProtocol for SaslInitialResponse<'_> {
    const MSGTYPE: u8 = b'p';

    fn size_hint(&self) -> usize {
        self.mechanism.nul_string_len() as usize + size_of!(i32) + self.data.len()
    }

    fn encode(self, buf: &mut BytesMut) {
        buf.put_nul_string(self.mechanism);
        buf.put_i32(self.data.len().to_u32() as i32);
        buf.put_slice(self.data);
    }
}

pub struct SaslResponse<'a> {
    pub data: &'a [u8],
}

impl FrontendProtocol for SaslResponse<'_> {
    const MSGTYPE: u8 = b'p';

    fn size_hint(&self) -> usize {
        self.data.len()
    }

    fn encode(self, buf: &mut BytesMut) {
        buf.put_slice(self.data);
    }
}

pub struct Query<'a> {
    pub sql: &'a str,
}

impl FrontendProtocol for Query<'_> {
    const MSGTYPE: u8 = b'Q';

    fn size_hint(&self) -> usize {
        self.sql.nul_string_len() as usize
    }

    fn encode(self, buf: &mut BytesMut) {
        buf.put_nul_string(self.sql);
    }
}

pub struct Parse<'a, I> {
    pub prepare_name: &'a str,
    pub sql: &'a str,
    pub oids_len: u16,
    pub oids: I,
}

impl<'a, I> FrontendProtocol for Parse<'a, I>
where
    I: IntoIterator<Item = u32>,
{
    const MSGTYPE: u8 = b'P';

    fn size_hint(&self) -> usize {
        self.prepare_name.nul_string_len() as usize
            + self.sql.nul_string_len() as usize
            + size_of!(u16)
            + self.oids_len as usize * size_of!(u32)
    }

    fn encode(self, buf: &mut BytesMut) {
        buf.put_nul_string(self.prepare_name);
        buf.put_nul_string(self.sql);
        buf.put_u16(self.oids_len);
        for oid in self.oids {
            buf.put_u32(oid);
        }
    }
}

pub struct Bind<'a, ParamFmts, Params, ResultFmts> {
    pub portal_name: &'a str,
    pub stmt_name: &'a str,
    pub param_formats_len: u16,
    pub param_formats: ParamFmts,
    pub params_len: u16,
    pub params_size_hint: usize,
    pub params: Params,
    pub result_formats_len: u16,
    pub result_formats: ResultFmts,
}

impl<'a, ParamFmts, Params, ResultFmts> FrontendProtocol for Bind<'a, ParamFmts, Params, ResultFmts>
where
    ParamFmts: IntoIterator<Item = PgFormat>,
    Params: IntoIterator,
    Params::Item: BindParams,
    ResultFmts: IntoIterator<Item = PgFormat>,
{
    const MSGTYPE: u8 = b'B';

    fn size_hint(&self) -> usize {
        self.portal_name.nul_string_len() as usize
            + self.stmt_name.nul_string_len() as usize
            + size_of!(u16)
            + self.param_formats_len as usize * size_of!(u16)
            + size_of!(u16)
            + self.params_len as usize * size_of!(i32)
            + self.params_size_hint
            + size_of!(u16)
            + self.result_formats_len as usize * size_of!(u16)
    }

    fn encode(self, buf: &mut BytesMut) {
        buf.put_nul_string(self.portal_name);
        buf.put_nul_string(self.stmt_name);

        buf.put_u16(self.param_formats_len);
        for fmt in self.param_formats {
            buf.put_u16(fmt.format_code());
        }

        buf.put_u16(self.params_len);
        for mut param in self.params {
            buf.put_i32(param.size());
            buf.put(&mut param);
        }

        buf.put_u16(self.result_formats_len);
        for fmt in self.result_formats {
            buf.put_u16(fmt.format_code());
        }
    }
}

pub struct Execute<'a> {
    pub portal_name: &'a str,
    pub max_row: i32,
}

impl FrontendProtocol for Execute<'_> {
    const MSGTYPE: u8 = b'E';

    fn size_hint(&self) -> usize {
        self.portal_name.nul_string_len() as usize + size_of!(i32)
    }

    fn encode(self, buf: &mut BytesMut) {
        buf.put_nul_string(self.portal_name);
        buf.put_i32(self.max_row);
    }
}

pub struct Describe<'a> {
    /// `b'S'` for a prepared statement, `b'P'` for a portal.
    pub kind: u8,
    pub name: &'a str,
}

impl FrontendProtocol for Describe<'_> {
    const MSGTYPE: u8 = b'D';

    fn size_hint(&self) -> usize {
        size_of!(u8) + self.name.nul_string_len() as usize
    }

    fn encode(self, buf: &mut BytesMut) {
        buf.put_u8(self.kind);
        buf.put_nul_string(self.name);
    }
}

pub struct Close<'a> {
    /// `b'S'` for a prepared statement, `b'P'` for a portal.
    pub variant: u8,
    pub name: &'a str,
}

impl FrontendProtocol for Close<'_> {
    const MSGTYPE: u8 = b'C';

    fn size_hint(&self) -> usize {
        size_of!(u8) + self.name.nul_string_len() as usize
    }

    fn encode(self, buf: &mut BytesMut) {
        buf.put_u8(self.variant);
        buf.put_nul_string(self.name);
    }
}

pub struct Sync;

impl FrontendProtocol for Sync {
    const MSGTYPE: u8 = b'S';

    fn size_hint(&self) -> usize {
        0
    }

    fn encode(self, _buf: &mut BytesMut) {}
}

pub struct Flush;

impl FrontendProtocol for Flush {
    const MSGTYPE: u8 = b'H';

    fn size_hint(&self) -> usize {
        0
    }

    fn encode(self, _buf: &mut BytesMut) {}
}

pub struct Terminate;

impl FrontendProtocol for Terminate {
    const MSGTYPE: u8 = b'X';

    fn size_hint(&self) -> usize {
        0
    }

    fn encode(self, _buf: &mut BytesMut) {}
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn startup_length_prefix_covers_whole_message() {
        let mut buf = BytesMut::new();
        Startup { user: "postgres", database: "postgres", replication: None }.write(&mut buf);
        let len = i32::from_be_bytes(buf[..4].try_into().unwrap());
        assert_eq!(len as usize, buf.len());
    }

    #[test]
    fn query_roundtrips_length() {
        let mut buf = BytesMut::new();
        write(Query { sql: "select 1" }, &mut buf);
        assert_eq!(buf[0], b'Q');
        let len = i32::from_be_bytes(buf[1..5].try_into().unwrap());
        assert_eq!(len as usize, buf.len() - 1);
    }
}
