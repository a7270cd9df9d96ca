//! Error handling module
//!
//! This module defines the error types and result type aliases used in the relay.

use std::io;
use thiserror::Error;

/// Relay error type
#[derive(Error, Debug)]
pub enum RelayError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// OpenSSL error
    #[error("OpenSSL error: {0}")]
    Ssl(#[from] openssl::error::ErrorStack),

    /// The listen address could not be bound
    #[error("listen error on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Certificate or private key could not be loaded
    #[error("Credential error: {0}")]
    Credential(String),
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `RelayError`.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Why a listener stopped producing a connection.
#[derive(Error, Debug)]
pub enum AcceptError {
    /// The listener was closed; no further connections will arrive.
    #[error("listener closed")]
    Closed,

    /// A transient accept failure; the listener is still open.
    #[error("accept error: {0}")]
    Io(#[from] io::Error),
}
