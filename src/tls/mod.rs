//! TLS handling module
//!
//! This module loads the server credentials used to terminate TLS and
//! exposes a few certificate inspection helpers.

mod acceptor;
mod cert;

pub use acceptor::create_tls_acceptor;
pub use cert::{get_cert_fingerprint, get_cert_subject, load_cert};
