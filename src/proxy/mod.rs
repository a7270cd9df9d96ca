//! Relay service module
//!
//! This module implements the core of the relay: the listener provider, the
//! per-connection session, the byte pumps and the accept loop that ties them
//! together.
//!
//! Every session runs in its own task under a cancellation scope derived from
//! the server's shutdown token, so stopping the server reaches every live
//! connection without any shared bookkeeping.

pub mod forwarder;
pub mod handler;
pub mod listener;
pub mod server;
pub mod stream;

pub use forwarder::{pump, Direction, PumpExit, PumpReport};
pub use handler::{handle_connection, SessionContext, SessionReport, SessionState};
pub use listener::{produce, Incoming, Listener, RelayListener, Transport};
pub use server::{run, serve, Relay};
pub use stream::{Establish, HalfClose, RelayStream, ShutdownHandle};
