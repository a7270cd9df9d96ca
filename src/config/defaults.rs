//! Default configuration values
//!
//! Single source of truth for defaults, shared by the loaders and the CLI.

/// Environment variable prefix for all configuration options
pub const ENV_PREFIX: &str = "TLS_RELAY";

/// Default listen address
pub const LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Default backend address
pub const BACKEND_ADDR: &str = "127.0.0.1:9000";

/// Default relay chunk size in kilobytes
pub const BUFFER_SIZE_KB: usize = 32;

/// Largest accepted relay chunk size in kilobytes (64 MB)
pub const MAX_BUFFER_SIZE_KB: usize = 64 * 1024;

/// TLS termination is off unless asked for
pub const TLS_ENABLED: bool = false;

/// Default backend dial timeout in seconds
pub const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default log level
pub const LOG_LEVEL: &str = "info";

pub fn listen_addr() -> String {
    LISTEN_ADDR.to_string()
}

pub fn backend_addr() -> String {
    BACKEND_ADDR.to_string()
}

pub fn buffer_size() -> usize {
    BUFFER_SIZE_KB
}

pub fn connect_timeout() -> u64 {
    CONNECT_TIMEOUT_SECS
}

pub fn log_level() -> String {
    LOG_LEVEL.to_string()
}
