//! Proxy server module
//!
//! This module implements the accept loop: it owns the bound listener,
//! spawns one session per accepted connection and stops when the shutdown
//! token is cancelled.

use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::common::{AcceptError, BufferPool, Result};
use crate::common::net::dial_addr;
use crate::config::RelayConfig;
use super::handler::{handle_connection, SessionContext};
use super::listener::{produce, Listener, RelayListener};

/// Accept connections from `listener` until it is closed
///
/// Each accepted connection gets its own session task on `tracker`; the loop
/// never waits for a session. Cancelling `root` closes the listener, which is
/// the only way a pending accept is interrupted, and also ends every live
/// session. Accept failures other than closure are logged and the loop keeps
/// going.
pub async fn serve<L: Listener>(
    listener: Arc<L>,
    ctx: SessionContext,
    root: CancellationToken,
    tracker: TaskTracker,
) -> Result<()> {
    // Stops the closer task if the loop ends without a shutdown request.
    let done = CancellationToken::new();
    let _done_guard = done.clone().drop_guard();

    {
        let listener = Arc::clone(&listener);
        let root = root.clone();
        tracker.spawn(async move {
            tokio::select! {
                _ = root.cancelled() => listener.close(),
                _ = done.cancelled() => {}
            }
        });
    }

    loop {
        match listener.accept().await {
            Ok((conn, peer)) => {
                info!("Accepting connection from {}", peer);

                let ctx = ctx.clone();
                let root = root.clone();
                tracker.spawn(async move {
                    handle_connection(conn, peer, ctx, &root).await;
                });
            }
            Err(AcceptError::Closed) => {
                info!("Listener closed, no longer accepting connections");
                return Ok(());
            }
            Err(AcceptError::Io(e)) => {
                error!("Error accepting connection: {}", e);
            }
        }
    }
}

/// Relay server
///
/// Binds the configured listener and relays every accepted connection to the
/// configured backend.
pub struct Relay<L = RelayListener> {
    listener: Arc<L>,
    config: Arc<RelayConfig>,
    pool: BufferPool,
}

impl Relay<RelayListener> {
    /// Create the listener described by `config`
    ///
    /// # Errors
    ///
    /// Returns a bind error if the listen address is invalid or in use, and a
    /// configuration or credential error if TLS is enabled without usable
    /// certificate material.
    pub async fn bind(config: Arc<RelayConfig>) -> Result<Self> {
        let listener = produce(&config).await?;
        Ok(Self::from_listener(listener, config))
    }
}

impl<L: Listener> Relay<L> {
    /// Build a relay around an already created listener
    pub fn from_listener(listener: L, config: Arc<RelayConfig>) -> Self {
        let pool = BufferPool::with_capacity_bytes(config.buffer_size_bytes());
        Self {
            listener: Arc::new(listener),
            config,
            pool,
        }
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The pool the pumps borrow their buffers from
    pub fn buffer_pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Run the accept loop until `shutdown` is cancelled
    ///
    /// Returns `Ok(())` once the listener has been closed by the shutdown.
    /// Sessions still draining at that point keep running on `tracker`;
    /// callers wait for them with `tracker.close()` and `tracker.wait()`.
    pub async fn run(&self, shutdown: CancellationToken, tracker: TaskTracker) -> Result<()> {
        let ctx = SessionContext {
            backend_addr: Arc::from(dial_addr(self.config.backend_addr())),
            connect_timeout: self.config.connect_timeout(),
            pool: self.pool.clone(),
        };

        info!("Forwarding to {}", self.config.backend_addr());
        serve(Arc::clone(&self.listener), ctx, shutdown, tracker).await
    }
}

/// Bind the configured listener and relay until `shutdown` is cancelled
///
/// Only listener creation failures are returned; everything that goes wrong
/// inside a connection is contained in that connection's session.
pub async fn run(
    config: Arc<RelayConfig>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
) -> Result<()> {
    let relay = Relay::bind(config).await?;
    relay.run(shutdown, tracker).await
}
