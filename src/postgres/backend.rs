//! Backend (server-to-frontend) message decoding (C1 — wire codec).
use bytes::{Buf, Bytes};

use super::error::ProtocolError;
use crate::ext::BytesExt;

/// A message sent by the backend.
pub trait BackendProtocol: Sized {
    const MSGTYPE: u8;

    fn decode(body: Bytes) -> Result<Self, ProtocolError>;
}

macro_rules! match_backend {
    ($($ty:ident($variant:ident)),* $(,)?) => {
        #[derive(Debug)]
        #[non_exhaustive]
        pub enum BackendMessage {
            $($variant($ty),)*
        }

        impl BackendMessage {
            pub fn msgtype(tag: u8) -> bool {
                matches!(tag, $(<$ty as BackendProtocol>::MSGTYPE)|*)
            }

            pub fn message_name(tag: u8) -> &'static str {
                match tag {
                    $(<$ty as BackendProtocol>::MSGTYPE => stringify!($variant),)*
                    _ => "Unknown",
                }
            }

            pub fn decode(tag: u8, body: Bytes) -> Result<Self, ProtocolError> {
                match tag {
                    $(<$ty as BackendProtocol>::MSGTYPE => Ok(Self::$variant($ty::decode(body)?)),)*
                    found => Err(ProtocolError::unknown(found)),
                }
            }
        }
    };
}

macro_rules! unit_msg {
    ($name:ident, $tag:literal) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl BackendProtocol for $name {
            const MSGTYPE: u8 = $tag;

            fn decode(_body: Bytes) -> Result<Self, ProtocolError> {
                Ok($name)
            }
        }
    };
}

match_backend! {
    Authentication(Authentication),
    BackendKeyData(BackendKeyData),
    BindComplete(BindComplete),
    CloseComplete(CloseComplete),
    CommandComplete(CommandComplete),
    DataRow(DataRow),
    EmptyQueryResponse(EmptyQueryResponse),
    ErrorResponse(ErrorResponse),
    NegotiateProtocolVersion(NegotiateProtocolVersion),
    NoData(NoData),
    NoticeResponse(NoticeResponse),
    ParameterDescription(ParameterDescription),
    ParameterStatus(ParameterStatus),
    ParseComplete(ParseComplete),
    PortalSuspended(PortalSuspended),
    ReadyForQuery(ReadyForQuery),
    RowDescription(RowDescription),
}

unit_msg!(BindComplete, b'2');
unit_msg!(CloseComplete, b'3');
unit_msg!(EmptyQueryResponse, b'I');
unit_msg!(NoData, b'n');
unit_msg!(ParseComplete, b'1');
unit_msg!(PortalSuspended, b's');

/// `AuthenticationXXX` — the server's authentication request.
///
/// <https://www.postgresql.org/docs/current/protocol-message-formats.html>
pub enum Authentication {
    Ok,
    CleartextPassword,
    MD5Password { salt: [u8; 4] },
    SASL { mechanisms: Vec<String> },
    SASLContinue { data: Bytes },
    SASLFinal { data: Bytes },
}

impl BackendProtocol for Authentication {
    const MSGTYPE: u8 = b'R';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let auth = body.get_u32();
        Ok(match auth {
            0 => Self::Ok,
            3 => Self::CleartextPassword,
            5 => {
                if body.remaining() < 4 {
                    return Err(ProtocolError::malformed("MD5Password missing salt"));
                }
                let mut salt = [0u8; 4];
                body.copy_to_slice(&mut salt);
                Self::MD5Password { salt }
            }
            10 => {
                let mut mechanisms = Vec::new();
                while body.first().copied() != Some(0) {
                    let name = body.get_nul_bytestr().map_err(ProtocolError::malformed)?;
                    mechanisms.push(name.to_string());
                }
                Self::SASL { mechanisms }
            }
            11 => Self::SASLContinue { data: body },
            12 => Self::SASLFinal { data: body },
            other => return Err(ProtocolError::unknown_auth(other)),
        })
    }
}

impl std::fmt::Debug for Authentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "Ok"),
            Self::CleartextPassword => write!(f, "CleartextPassword"),
            Self::MD5Password { .. } => write!(f, "MD5Password {{ salt: .. }}"),
            Self::SASL { mechanisms } => f.debug_struct("SASL").field("mechanisms", mechanisms).finish(),
            Self::SASLContinue { .. } => write!(f, "SASLContinue {{ .. }}"),
            Self::SASLFinal { .. } => write!(f, "SASLFinal {{ .. }}"),
        }
    }
}

pub struct BackendKeyData {
    pub process_id: i32,
    pub secret_key: i32,
}

impl BackendProtocol for BackendKeyData {
    const MSGTYPE: u8 = b'K';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        if body.remaining() < 8 {
            return Err(ProtocolError::malformed("BackendKeyData too short"));
        }
        Ok(Self { process_id: body.get_i32(), secret_key: body.get_i32() })
    }
}

impl std::fmt::Debug for BackendKeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendKeyData")
            .field("process_id", &self.process_id)
            .field("secret_key", &"..")
            .finish()
    }
}

#[derive(Debug)]
pub struct ParameterStatus {
    pub name: crate::common::ByteStr,
    pub value: crate::common::ByteStr,
}

impl BackendProtocol for ParameterStatus {
    const MSGTYPE: u8 = b'S';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let name = body.get_nul_bytestr().map_err(ProtocolError::malformed)?;
        let value = body.get_nul_bytestr().map_err(ProtocolError::malformed)?;
        Ok(Self { name, value })
    }
}

/// Raw, undissected body. Classification into [`super::error::DatabaseError`]
/// happens lazily — most callers only care whether one arrived.
pub struct NoticeResponse {
    pub body: Bytes,
}

impl BackendProtocol for NoticeResponse {
    const MSGTYPE: u8 = b'N';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { body })
    }
}

impl std::fmt::Debug for NoticeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NoticeResponse {{ .. }}")
    }
}

pub struct ErrorResponse {
    pub body: Bytes,
}

impl BackendProtocol for ErrorResponse {
    const MSGTYPE: u8 = b'E';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { body })
    }
}

impl std::fmt::Debug for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ErrorResponse {{ .. }}")
    }
}

pub struct RowDescription {
    pub body: Bytes,
}

impl BackendProtocol for RowDescription {
    const MSGTYPE: u8 = b'T';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { body })
    }
}

impl std::fmt::Debug for RowDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RowDescription {{ .. }}")
    }
}

pub struct DataRow {
    pub body: Bytes,
}

impl BackendProtocol for DataRow {
    const MSGTYPE: u8 = b'D';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { body })
    }
}

impl std::fmt::Debug for DataRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DataRow {{ .. }}")
    }
}

#[derive(Debug)]
pub struct CommandComplete {
    pub tag: crate::common::ByteStr,
}

impl BackendProtocol for CommandComplete {
    const MSGTYPE: u8 = b'C';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { tag: body.get_nul_bytestr().map_err(ProtocolError::malformed)? })
    }
}

#[derive(Debug)]
pub struct NegotiateProtocolVersion {
    pub newest_minor: i32,
    pub unrecognized: Vec<String>,
}

impl BackendProtocol for NegotiateProtocolVersion {
    const MSGTYPE: u8 = b'v';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        if body.remaining() < 8 {
            return Err(ProtocolError::malformed("NegotiateProtocolVersion too short"));
        }
        let newest_minor = body.get_i32();
        let count = body.get_i32();
        let mut unrecognized = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            unrecognized.push(body.get_nul_bytestr().map_err(ProtocolError::malformed)?.to_string());
        }
        Ok(Self { newest_minor, unrecognized })
    }
}

#[derive(Debug)]
pub struct ParameterDescription {
    pub oids: Vec<u32>,
}

impl BackendProtocol for ParameterDescription {
    const MSGTYPE: u8 = b't';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        if body.remaining() < 2 {
            return Err(ProtocolError::malformed("ParameterDescription too short"));
        }
        let count = body.get_u16();
        let mut oids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            if body.remaining() < 4 {
                return Err(ProtocolError::malformed("ParameterDescription truncated"));
            }
            oids.push(body.get_u32());
        }
        Ok(Self { oids })
    }
}

pub struct ReadyForQuery {
    pub tx_status: u8,
}

impl BackendProtocol for ReadyForQuery {
    const MSGTYPE: u8 = b'Z';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        if !body.has_remaining() {
            return Err(ProtocolError::malformed("ReadyForQuery missing status"));
        }
        Ok(Self { tx_status: body.get_u8() })
    }
}

impl std::fmt::Debug for ReadyForQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self.tx_status {
            b'I' => "idle",
            b'T' => "in transaction",
            b'E' => "failed transaction",
            _ => "unknown",
        };
        write!(f, "ReadyForQuery {{ tx_status: {status} }}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_md5_password() {
        let body = Bytes::from_static(&[0, 0, 0, 5, 1, 2, 3, 4]);
        let Authentication::MD5Password { salt } = Authentication::decode(body).unwrap() else {
            panic!("expected MD5Password");
        };
        assert_eq!(salt, [1, 2, 3, 4]);
    }

    #[test]
    fn decodes_ready_for_query() {
        let msg = ReadyForQuery::decode(Bytes::from_static(b"T")).unwrap();
        assert_eq!(msg.tx_status, b'T');
    }

    #[test]
    fn decodes_sasl_mechanism_list() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&10u32.to_be_bytes());
        buf.extend_from_slice(b"SCRAM-SHA-256\0");
        buf.push(0);
        let Authentication::SASL { mechanisms } = Authentication::decode(Bytes::from(buf)).unwrap() else {
            panic!("expected SASL");
        };
        assert_eq!(mechanisms, vec!["SCRAM-SHA-256"]);
    }
}
