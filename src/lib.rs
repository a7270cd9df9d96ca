//! TLS Relay: a TCP relay with optional TLS termination
//!
//! This library accepts client connections on a listen address, optionally
//! terminates TLS on them, and relays the bytes in both directions to a single
//! backend address. Connections are independent: one failing never affects
//! another, and a shutdown request reaches every live connection.
//!
//! # Main Features
//!
//! - Plaintext or TLS-terminating listener, chosen once from configuration
//! - Full-duplex relaying with half-close propagation
//! - Pooled relay buffers of a configurable size
//! - Layered configuration: defaults, JSON file, environment, flags
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tls_relay::{Relay, RelayConfig, Result};
//! use tls_relay::config::ConfigOverrides;
//! use tokio_util::sync::CancellationToken;
//! use tokio_util::task::TaskTracker;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = RelayConfig::resolve([ConfigOverrides {
//!         listen_addr: Some("0.0.0.0:8443".to_string()),
//!         backend_addr: Some("127.0.0.1:6000".to_string()),
//!         ..Default::default()
//!     }])?;
//!
//!     let shutdown = CancellationToken::new();
//!     let tracker = TaskTracker::new();
//!
//!     let relay = Relay::bind(Arc::new(config)).await?;
//!     relay.run(shutdown, tracker.clone()).await?;
//!
//!     tracker.close();
//!     tracker.wait().await;
//!     Ok(())
//! }
//! ```

// Public modules
pub mod common;
pub mod config;
pub mod proxy;
pub mod tls;

// Re-export commonly used structures and functions for convenience
pub use common::{RelayError, Result};
pub use config::RelayConfig;
pub use proxy::Relay;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
