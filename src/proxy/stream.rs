//! Relay stream abstractions
//!
//! An accepted connection goes through `Establish` to become the application
//! byte stream the pumps work on. `HalfClose` reports whether a stream can
//! have its read or write half shut down independently.

use socket2::{SockRef, Socket};
use std::future::Future;
use std::io;
use std::net::Shutdown;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::net::TcpStream;
use tokio_openssl::SslStream;

/// Out-of-band shutdown control over a socket
///
/// Holds a duplicate of the socket descriptor, so it can shut the connection
/// down while the stream itself is owned by a pump blocked in a read or write.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    socket: Arc<Socket>,
}

impl ShutdownHandle {
    /// Duplicate the descriptor of a TCP stream
    pub fn from_tcp(stream: &TcpStream) -> io::Result<Self> {
        let socket = SockRef::from(stream).try_clone()?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    /// No more reads are expected on this socket
    pub fn close_read(&self) -> io::Result<()> {
        self.socket.shutdown(Shutdown::Read)
    }

    /// No more writes will be sent on this socket
    pub fn close_write(&self) -> io::Result<()> {
        self.socket.shutdown(Shutdown::Write)
    }

    /// Shut both directions down, unblocking any pending read or write
    pub fn close(&self) -> io::Result<()> {
        self.socket.shutdown(Shutdown::Both)
    }
}

/// Half-close capability of a connection
///
/// Streams without an underlying socket (in-memory pipes) return `None` and
/// are closed as a whole by dropping them.
pub trait HalfClose {
    fn shutdown_handle(&self) -> Option<ShutdownHandle> {
        None
    }
}

impl HalfClose for TcpStream {
    fn shutdown_handle(&self) -> Option<ShutdownHandle> {
        ShutdownHandle::from_tcp(self).ok()
    }
}

impl<S: HalfClose> HalfClose for SslStream<S> {
    fn shutdown_handle(&self) -> Option<ShutdownHandle> {
        self.get_ref().shutdown_handle()
    }
}

impl HalfClose for DuplexStream {}

/// Turns an accepted connection into the stream the relay pumps bytes over
///
/// For TLS connections this is where the server handshake happens, inside the
/// session's own task, so a slow client never holds up the accept loop.
pub trait Establish: Send + 'static {
    type Stream: AsyncRead + AsyncWrite + HalfClose + Send + Unpin + 'static;

    fn establish(self) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

impl Establish for TcpStream {
    type Stream = TcpStream;

    fn establish(self) -> impl Future<Output = io::Result<Self::Stream>> + Send {
        async move { Ok(self) }
    }
}

impl Establish for DuplexStream {
    type Stream = DuplexStream;

    fn establish(self) -> impl Future<Output = io::Result<Self::Stream>> + Send {
        async move { Ok(self) }
    }
}

/// Application byte stream of an accepted connection
///
/// Either the raw TCP stream or the decrypted side of a TLS session; the pumps
/// never need to know which.
pub enum RelayStream {
    Plain(TcpStream),
    Tls(SslStream<TcpStream>),
}

impl HalfClose for RelayStream {
    fn shutdown_handle(&self) -> Option<ShutdownHandle> {
        match self {
            Self::Plain(stream) => stream.shutdown_handle(),
            Self::Tls(stream) => stream.shutdown_handle(),
        }
    }
}

impl AsyncRead for RelayStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for RelayStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}
