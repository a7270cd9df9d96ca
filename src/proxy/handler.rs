//! Connection handler module
//!
//! This module handles individual client connections: it establishes the
//! client stream, dials the backend and runs one pump per direction.

use log::{debug, error, info, warn};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::common::BufferPool;
use super::forwarder::{pump, Direction, PumpReport};
use super::stream::{Establish, HalfClose, ShutdownHandle};

/// Everything a session needs besides its client connection
#[derive(Clone)]
pub struct SessionContext {
    /// Backend address, `host:port`
    pub backend_addr: Arc<str>,
    /// Upper bound on the backend dial
    pub connect_timeout: Duration,
    pub pool: BufferPool,
}

/// Lifecycle of a session
///
/// `Dialing -> Relaying -> Draining -> Closed`, or `Dialing -> Closed` when
/// the backend cannot be reached. Never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Dialing,
    Relaying,
    Draining,
    Closed,
}

impl SessionState {
    fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Dialing, Relaying) | (Dialing, Closed) | (Relaying, Draining) | (Draining, Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dialing => write!(f, "dialing"),
            Self::Relaying => write!(f, "relaying"),
            Self::Draining => write!(f, "draining"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Summary of a finished session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    /// Always `Closed` once `handle_connection` returns
    pub state: SessionState,
    /// Whether the backend was reached
    pub dialed: bool,
    pub client_to_backend: u64,
    pub backend_to_client: u64,
}

struct Session {
    peer: SocketAddr,
    state: SessionState,
}

impl Session {
    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid session transition {} -> {}",
            self.state,
            next
        );
        debug!("Session {}: {} -> {}", self.peer, self.state, next);
        self.state = next;
    }

    fn close(
        mut self,
        dialed: bool,
        up: Option<PumpReport>,
        down: Option<PumpReport>,
    ) -> SessionReport {
        self.advance(SessionState::Closed);
        SessionReport {
            state: self.state,
            dialed,
            client_to_backend: up.map_or(0, |r| r.bytes),
            backend_to_client: down.map_or(0, |r| r.bytes),
        }
    }
}

/// Handle a single client connection
///
/// Runs until both directions have stopped. The session gets its own
/// cancellation scope derived from `parent`; cancelling `parent` ends the
/// session, and so does either pump stopping. Nothing is returned to the
/// accept loop except the report: every failure stays inside the session.
pub async fn handle_connection<C>(
    conn: C,
    peer: SocketAddr,
    ctx: SessionContext,
    parent: &CancellationToken,
) -> SessionReport
where
    C: Establish,
{
    let cancel = parent.child_token();
    let _cancel_on_exit = cancel.clone().drop_guard();
    let mut session = Session {
        peer,
        state: SessionState::Dialing,
    };

    let client = tokio::select! {
        biased;
        _ = cancel.cancelled() => return session.close(false, None, None),
        client = conn.establish() => client,
    };
    let client = match client {
        Ok(client) => client,
        Err(e) => {
            warn!("Error establishing connection from {}: {}", peer, e);
            return session.close(false, None, None);
        }
    };

    let backend = tokio::select! {
        biased;
        _ = cancel.cancelled() => return session.close(false, None, None),
        backend = dial(&ctx.backend_addr, ctx.connect_timeout) => backend,
    };
    let backend = match backend {
        Ok(backend) => backend,
        Err(e) => {
            error!("Error connecting to backend {} for {}: {}", ctx.backend_addr, peer, e);
            // Dropping the client stream closes it.
            return session.close(false, None, None);
        }
    };
    session.advance(SessionState::Relaying);

    let client_ctl = client.shutdown_handle();
    let backend_ctl = backend.shutdown_handle();
    let (client_reader, client_writer) = tokio::io::split(client);
    let (backend_reader, backend_writer) = tokio::io::split(backend);

    let upstream = tokio::spawn(pump(
        Direction {
            src: client_reader,
            dst: backend_writer,
            src_ctl: client_ctl.clone(),
            dst_ctl: backend_ctl.clone(),
            label: format!("{} -> {}", peer, ctx.backend_addr),
        },
        cancel.clone(),
        ctx.pool.clone(),
    ));
    let downstream = tokio::spawn(pump(
        Direction {
            src: backend_reader,
            dst: client_writer,
            src_ctl: backend_ctl.clone(),
            dst_ctl: client_ctl.clone(),
            label: format!("{} -> {}", ctx.backend_addr, peer),
        },
        cancel.clone(),
        ctx.pool.clone(),
    ));
    let watcher = tokio::spawn(close_on_cancel(cancel.clone(), [client_ctl, backend_ctl]));

    cancel.cancelled().await;
    session.advance(SessionState::Draining);

    let (up, down, watched) = tokio::join!(joined(upstream), joined(downstream), watcher);
    if let Err(e) = watched {
        error!("Session {} watcher failed: {}", peer, e);
    }

    let report = session.close(true, up, down);
    info!(
        "Connection from {} closed ({} bytes up, {} bytes down)",
        peer, report.client_to_backend, report.backend_to_client
    );
    report
}

async fn dial(addr: &str, connect_timeout: Duration) -> io::Result<TcpStream> {
    match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(stream) => stream,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "Connection timed out")),
    }
}

/// Force both connections shut once the session is cancelled
///
/// Unblocks any pump parked in a read or write on a socket. Streams with no
/// shutdown handle are unblocked by the pumps' own cancellation checks.
async fn close_on_cancel<const N: usize>(
    cancel: CancellationToken,
    controls: [Option<ShutdownHandle>; N],
) {
    cancel.cancelled().await;
    for ctl in controls.iter().flatten() {
        let _ = ctl.close();
    }
}

async fn joined(task: JoinHandle<PumpReport>) -> Option<PumpReport> {
    match task.await {
        Ok(report) => Some(report),
        Err(e) => {
            error!("Pump task failed: {}", e);
            None
        }
    }
}
