//! The transport socket: TCP or Unix domain, behind one handle.
//!
//! This is the one piece of the "external collaborator" boundary (spec.md
//! §1) that this crate does implement directly, since `tokio` is carried as
//! an optional default feature rather than left fully external. Without the
//! `tokio` feature these constructors panic; a host embedding its own
//! transport should implement [`crate::io::PgTransport`] directly instead.
use std::io;

pub struct Socket {
    kind: Kind,
}

enum Kind {
    #[cfg(feature = "tokio")]
    Tcp(tokio::net::TcpStream),
    #[cfg(all(feature = "tokio", unix))]
    Unix(tokio::net::UnixStream),
}

impl Socket {
    pub async fn connect_tcp(host: &str, port: u16) -> io::Result<Socket> {
        #[cfg(feature = "tokio")]
        {
            let socket = tokio::net::TcpStream::connect((host, port)).await?;
            socket.set_nodelay(true)?;
            crate::common::trace!("connected via tcp: {:?}", socket.peer_addr());
            Ok(Socket { kind: Kind::Tcp(socket) })
        }
        #[cfg(not(feature = "tokio"))]
        {
            let _ = (host, port);
            panic!("runtime disabled: enable the `tokio` feature or implement `PgTransport` directly")
        }
    }

    pub async fn connect_unix(path: &str) -> io::Result<Socket> {
        #[cfg(all(feature = "tokio", unix))]
        {
            let socket = tokio::net::UnixStream::connect(path).await?;
            crate::common::trace!("connected via unix socket: {path}");
            Ok(Socket { kind: Kind::Unix(socket) })
        }
        #[cfg(not(all(feature = "tokio", unix)))]
        {
            let _ = path;
            panic!("runtime disabled: enable the `tokio` feature or implement `PgTransport` directly")
        }
    }

    pub fn shutdown(&mut self) -> impl Future<Output = io::Result<()>> {
        #[cfg(feature = "tokio")]
        {
            tokio::io::AsyncWriteExt::shutdown(self)
        }
        #[cfg(not(feature = "tokio"))]
        {
            std::future::ready(Ok(()))
        }
    }
}

#[cfg(feature = "tokio")]
impl tokio::io::AsyncRead for Socket {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        use std::pin::Pin;
        match &mut self.kind {
            Kind::Tcp(t) => Pin::new(t).poll_read(cx, buf),
            #[cfg(unix)]
            Kind::Unix(u) => Pin::new(u).poll_read(cx, buf),
        }
    }
}

#[cfg(feature = "tokio")]
impl tokio::io::AsyncWrite for Socket {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<io::Result<usize>> {
        use std::pin::Pin;
        match &mut self.kind {
            Kind::Tcp(t) => Pin::new(t).poll_write(cx, buf),
            #[cfg(unix)]
            Kind::Unix(u) => Pin::new(u).poll_write(cx, buf),
        }
    }

    fn poll_write_vectored(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> std::task::Poll<io::Result<usize>> {
        use std::pin::Pin;
        match &mut self.kind {
            Kind::Tcp(t) => Pin::new(t).poll_write_vectored(cx, bufs),
            #[cfg(unix)]
            Kind::Unix(u) => Pin::new(u).poll_write_vectored(cx, bufs),
        }
    }

    #[inline]
    fn is_write_vectored(&self) -> bool {
        true
    }

    #[inline]
    fn poll_flush(self: std::pin::Pin<&mut Self>, _: &mut std::task::Context<'_>) -> std::task::Poll<io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(mut self: std::pin::Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> std::task::Poll<io::Result<()>> {
        use std::pin::Pin;
        match &mut self.kind {
            Kind::Tcp(t) => Pin::new(t).poll_shutdown(cx),
            #[cfg(unix)]
            Kind::Unix(u) => Pin::new(u).poll_shutdown(cx),
        }
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            #[cfg(feature = "tokio")]
            Kind::Tcp(tcp) => std::fmt::Debug::fmt(tcp, f),
            #[cfg(all(feature = "tokio", unix))]
            Kind::Unix(unix) => std::fmt::Debug::fmt(unix, f),
        }
    }
}
