//! Common module
//!
//! This module contains shared types, errors, and utility functions used throughout the relay.

pub mod buffer_pool;
pub mod error;
pub mod log;
pub mod net;

// Re-export commonly used types and functions
pub use buffer_pool::{BufferPool, PoolStats, PooledBuffer};
pub use error::{AcceptError, RelayError, Result};
pub use log::init_logger;
pub use net::{normalize_addr, resolve_socket_addr, split_host_port};
