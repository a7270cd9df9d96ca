//! Data forwarding module
//!
//! This module copies bytes from one connection to another in one direction.

use log::{debug, log, Level};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::common::BufferPool;
use super::stream::ShutdownHandle;

/// Why a pump stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// The source reached end-of-stream
    Eof,
    /// Reading from the source failed
    ReadError,
    /// Writing to the destination failed
    WriteError,
    /// The session was cancelled from elsewhere
    Cancelled,
}

/// Outcome of one pump run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpReport {
    /// Bytes fully written to the destination
    pub bytes: u64,
    pub exit: PumpExit,
}

/// One direction of a session
///
/// `src_ctl` and `dst_ctl` are the half-close controls of the connections
/// behind `src` and `dst`, when they have one.
pub struct Direction<R, W> {
    pub src: R,
    pub dst: W,
    pub src_ctl: Option<ShutdownHandle>,
    pub dst_ctl: Option<ShutdownHandle>,
    /// Used in log lines, e.g. `client 127.0.0.1:5000 -> backend`
    pub label: String,
}

/// Copy bytes from `src` to `dst` until either side fails or `cancel` fires
///
/// A buffer is borrowed from `pool` for the whole run and released on every
/// exit path. Every chunk read is written out completely before the next
/// read. On end-of-stream or a read error the destination's write half is
/// shut down; on a write error the source's read half is. Either way the
/// session is then cancelled, which is also what ends the opposite direction.
pub async fn pump<R, W>(
    direction: Direction<R, W>,
    cancel: CancellationToken,
    pool: BufferPool,
) -> PumpReport
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let Direction {
        mut src,
        mut dst,
        src_ctl,
        dst_ctl,
        label,
    } = direction;

    let mut buffer = pool.borrow();
    let mut total: u64 = 0;

    let exit = loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break PumpExit::Cancelled,
            read = src.read(&mut buffer) => read,
        };

        let n = match read {
            Ok(0) => {
                debug!("{}: source closed connection", label);
                close_write_half(&mut dst, dst_ctl.as_ref(), &cancel).await;
                break PumpExit::Eof;
            }
            Ok(n) => n,
            Err(e) => {
                log!(failure_level(&e, &cancel), "{}: read error: {}", label, e);
                close_write_half(&mut dst, dst_ctl.as_ref(), &cancel).await;
                break PumpExit::ReadError;
            }
        };

        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => break PumpExit::Cancelled,
            written = write_chunk(&mut dst, &buffer[..n]) => written,
        };

        if let Err(e) = written {
            log!(failure_level(&e, &cancel), "{}: write error: {}", label, e);
            close_read_half(src_ctl.as_ref());
            break PumpExit::WriteError;
        }

        total += n as u64;
    };

    cancel.cancel();
    debug!("{}: transferred {} bytes total ({:?})", label, total, exit);

    PumpReport { bytes: total, exit }
}

/// Write all of `chunk`, accumulating partial writes
async fn write_chunk<W>(dst: &mut W, chunk: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while written < chunk.len() {
        let n = dst.write(&chunk[written..]).await?;
        if n == 0 {
            return Err(io::ErrorKind::WriteZero.into());
        }
        written += n;
    }
    dst.flush().await
}

/// Tell the destination no more data is coming
///
/// When the stream-level shutdown fails (for TLS, the close_notify could not
/// be sent) the socket's write half is shut directly, and failing that the
/// destination is closed entirely.
async fn close_write_half<W>(
    dst: &mut W,
    dst_ctl: Option<&ShutdownHandle>,
    cancel: &CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    let shutdown = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        shutdown = dst.shutdown() => shutdown,
    };

    if shutdown.is_err() {
        if let Some(ctl) = dst_ctl {
            if ctl.close_write().is_err() {
                let _ = ctl.close();
            }
        }
    }
}

/// Tell the source no more reads are expected
///
/// Without a half-close control the source is closed when the cancelled
/// session drops it.
fn close_read_half(src_ctl: Option<&ShutdownHandle>) {
    if let Some(ctl) = src_ctl {
        if ctl.close_read().is_err() {
            let _ = ctl.close();
        }
    }
}

/// Log level for a failed read or write
///
/// Errors after the session was cancelled come from the relay closing its
/// own sockets. A peer resetting or aborting the connection is reported at
/// info, other closed-connection kinds at debug, anything else at warn.
fn failure_level(err: &io::Error, cancel: &CancellationToken) -> Level {
    if cancel.is_cancelled() {
        return Level::Trace;
    }

    match err.kind() {
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => Level::Info,
        io::ErrorKind::NotConnected | io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof => {
            Level::Debug
        }
        _ => Level::Warn,
    }
}
