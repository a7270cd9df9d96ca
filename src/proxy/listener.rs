//! Listener provider
//!
//! `produce` builds the listener the relay accepts on. The transport variant
//! (plaintext or TLS-terminating) is chosen once, here, from the
//! configuration; nothing downstream inspects it again.

use log::{debug, info};
use openssl::ssl::{Ssl, SslAcceptor};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_openssl::SslStream;
use tokio_util::sync::CancellationToken;

use crate::common::{resolve_socket_addr, AcceptError, RelayError, Result};
use crate::config::RelayConfig;
use crate::tls::create_tls_acceptor;
use super::stream::{Establish, RelayStream};

/// A source of inbound connections
///
/// `close` is idempotent and makes any pending or future `accept` return
/// `AcceptError::Closed`.
pub trait Listener: Send + Sync + 'static {
    type Conn: Establish;

    fn accept(
        &self,
    ) -> impl Future<Output = std::result::Result<(Self::Conn, SocketAddr), AcceptError>> + Send;

    fn close(&self);

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// How accepted connections are turned into application streams
#[derive(Clone)]
pub enum Transport {
    Plain,
    Tls(Arc<SslAcceptor>),
}

impl Transport {
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

/// The relay's TCP listener
pub struct RelayListener {
    listener: TcpListener,
    transport: Transport,
    closed: CancellationToken,
}

impl RelayListener {
    pub fn new(listener: TcpListener, transport: Transport) -> Self {
        Self {
            listener,
            transport,
            closed: CancellationToken::new(),
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}

impl Listener for RelayListener {
    type Conn = Incoming;

    fn accept(
        &self,
    ) -> impl Future<Output = std::result::Result<(Incoming, SocketAddr), AcceptError>> + Send {
        async move {
            tokio::select! {
                biased;
                _ = self.closed.cancelled() => Err(AcceptError::Closed),
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    let incoming = Incoming {
                        stream,
                        transport: self.transport.clone(),
                    };
                    Ok((incoming, peer))
                }
            }
        }
    }

    fn close(&self) {
        if !self.closed.is_cancelled() {
            debug!("Closing listener");
        }
        self.closed.cancel();
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// A connection accepted by `RelayListener`, not yet established
pub struct Incoming {
    stream: TcpStream,
    transport: Transport,
}

impl Establish for Incoming {
    type Stream = RelayStream;

    fn establish(self) -> impl Future<Output = io::Result<RelayStream>> + Send {
        async move {
            match self.transport {
                Transport::Plain => Ok(RelayStream::Plain(self.stream)),
                Transport::Tls(acceptor) => {
                    let ssl = Ssl::new(acceptor.context()).map_err(io::Error::other)?;
                    let mut stream = SslStream::new(ssl, self.stream).map_err(io::Error::other)?;

                    Pin::new(&mut stream)
                        .accept()
                        .await
                        .map_err(|e| io::Error::other(format!("TLS handshake failed: {}", e)))?;

                    debug!("TLS handshake successful");
                    Ok(RelayStream::Tls(stream))
                }
            }
        }
    }
}

/// Produce the listener described by `config`
///
/// With TLS enabled the credentials are loaded before anything is bound, so a
/// configuration or credential error never leaves a socket behind.
pub async fn produce(config: &RelayConfig) -> Result<RelayListener> {
    let transport = if config.tls_enabled() {
        let acceptor = create_tls_acceptor(config.cert_file_path(), config.key_file_path())?;
        Transport::Tls(Arc::new(acceptor))
    } else {
        Transport::Plain
    };

    let listener = bind(config.listen_addr()).await?;
    info!(
        "Listening on {} ({})",
        config.listen_addr(),
        if transport.is_tls() { "tls" } else { "plaintext" }
    );

    Ok(RelayListener::new(listener, transport))
}

async fn bind(addr: &str) -> Result<TcpListener> {
    let bind_error = |source: io::Error| RelayError::Bind {
        addr: addr.to_string(),
        source,
    };

    let socket_addr = resolve_socket_addr(addr)
        .map_err(|e| bind_error(io::Error::new(io::ErrorKind::InvalidInput, e.to_string())))?;

    TcpListener::bind(socket_addr).await.map_err(bind_error)
}
