//! Message framing over an asynchronous byte stream (C3) and the
//! `PgTransport` seam the rest of the crate is built against.
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::Error;
use crate::net::Socket;
use crate::postgres::backend::{BackendMessage, BackendProtocol, ErrorResponse, NoticeResponse};
use crate::postgres::frontend::{self, FrontendProtocol, Startup};
use crate::postgres::{DatabaseError, ProtocolError};

const DEFAULT_BUF_CAPACITY: usize = 1024;

/// The framed byte-stream collaborator (spec.md §1's "external collaborator"
/// boundary): reads whole backend messages, buffers and flushes outbound
/// ones. [`crate::connection::Connection`] is the one built-in implementer,
/// over [`Socket`]; a host with its own event loop can implement this trait
/// directly instead.
///
/// Never used as `dyn PgTransport` — the crate is generic over its one
/// concrete implementer, so the usual `async fn`-in-trait `Send` caveat
/// doesn't bite here.
#[allow(async_fn_in_trait)]
pub trait PgTransport {
    /// Reads and decodes the next backend message, routing `NoticeResponse`
    /// to a log line rather than returning it (spec.md §4.9: notices never
    /// fail a command).
    async fn recv_message(&mut self) -> Result<BackendMessage, Error>;

    /// Reads raw messages until one tagged `B::MSGTYPE` arrives, decoding it.
    /// An `ErrorResponse` observed along the way is classified and returned
    /// as `Err` instead; any other unexpected tag is a `ProtocolViolation`.
    async fn expect<B: BackendProtocol>(&mut self) -> Result<B, Error>;

    /// Buffers a frontend message without flushing.
    fn queue<F: FrontendProtocol>(&mut self, msg: F);

    /// Drains the outbound buffer to the transport.
    async fn flush(&mut self) -> Result<(), Error>;

    /// Buffers and immediately flushes `msg`.
    async fn send<F: FrontendProtocol>(&mut self, msg: F) -> Result<(), Error> {
        self.queue(msg);
        self.flush().await
    }

    /// Drains messages until `ReadyForQuery`, discarding everything else.
    /// Used after issuing `Sync` when the caller doesn't need the
    /// intervening responses (e.g. statement deallocation).
    async fn ready_request(&mut self) -> Result<u8, Error> {
        loop {
            if let BackendMessage::ReadyForQuery(rfq) = self.recv_message().await? {
                return Ok(rfq.tx_status);
            }
        }
    }
}

/// A framer over any `tokio` `AsyncRead + AsyncWrite` byte stream.
pub struct Framed<S> {
    socket: S,
    read_buf: BytesMut,
    write_buf: BytesMut,
}

impl<S> Framed<S> {
    pub fn new(socket: S) -> Self {
        Self {
            socket,
            read_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            write_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
        }
    }

    pub fn queue_startup(&mut self, startup: Startup<'_>) {
        startup.write(&mut self.write_buf);
    }
}

impl<S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin> Framed<S> {
    /// Reads one complete message's tag and body, blocking on I/O as needed.
    /// `NeedMore` (spec.md §4.3) is handled internally by looping on reads;
    /// partial messages persist in `read_buf` across calls.
    async fn read_one(&mut self) -> Result<(u8, Bytes), Error> {
        loop {
            if self.read_buf.len() >= 5 {
                let len = i32::from_be_bytes(self.read_buf[1..5].try_into().unwrap()) as usize;
                if self.read_buf.len() > len {
                    let tag = self.read_buf[0];
                    self.read_buf.advance(5);
                    let body = self.read_buf.split_to(len - 4).freeze();
                    crate::common::trace!("<- {} ({} bytes)", tag as char, body.len());
                    return Ok((tag, body));
                }
            }
            let n = self.socket.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }
        }
    }
}

impl<S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send> PgTransport for Framed<S> {
    async fn recv_message(&mut self) -> Result<BackendMessage, Error> {
        loop {
            let (tag, body) = self.read_one().await?;
            let msg = BackendMessage::decode(tag, body).map_err(Error::from)?;
            if let BackendMessage::NoticeResponse(NoticeResponse { body }) = msg {
                match DatabaseError::parse(body) {
                    Ok(notice) => crate::common::warn_log!("{notice}"),
                    Err(e) => crate::common::warn_log!("malformed NoticeResponse: {e}"),
                }
                continue;
            }
            return Ok(msg);
        }
    }

    async fn expect<B: BackendProtocol>(&mut self) -> Result<B, Error> {
        loop {
            let (tag, body) = self.read_one().await?;
            if tag == NoticeResponse::MSGTYPE {
                if let Ok(notice) = DatabaseError::parse(body) {
                    crate::common::warn_log!("{notice}");
                }
                continue;
            }
            if tag == ErrorResponse::MSGTYPE {
                return Err(DatabaseError::parse(body)?.into());
            }
            if tag == B::MSGTYPE {
                return B::decode(body).map_err(Error::from);
            }
            return Err(ProtocolError::unexpected(B::MSGTYPE, tag).into());
        }
    }

    fn queue<F: FrontendProtocol>(&mut self, msg: F) {
        frontend::write(msg, &mut self.write_buf);
    }

    async fn flush(&mut self) -> Result<(), Error> {
        self.socket.write_all_buf(&mut self.write_buf).await?;
        self.socket.flush().await?;
        Ok(())
    }
}

pub type PgStream = Framed<Socket>;
