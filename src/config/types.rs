//! Configuration types
//!
//! `RelayConfig` is the resolved, immutable record the relay runs from.
//! `ConfigOverrides` is what each configuration source produces: every field
//! is optional and only the fields a source actually sets are applied.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::defaults;

/// Relay configuration
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address the relay listens on (`host:port`)
    pub(crate) listen_addr: String,
    /// Address every connection is relayed to (`host:port`)
    pub(crate) backend_addr: String,
    /// Relay chunk size in kilobytes
    pub(crate) buffer_size: usize,
    /// Terminate TLS on accepted connections
    pub(crate) tls_enabled: bool,
    /// PEM certificate (chain) presented to clients
    pub(crate) cert_file_path: PathBuf,
    /// PEM private key matching the certificate
    pub(crate) key_file_path: PathBuf,
    /// Backend dial timeout in seconds
    pub(crate) connect_timeout: u64,
    /// Log level (error, warn, info, debug, trace)
    pub(crate) log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: defaults::listen_addr(),
            backend_addr: defaults::backend_addr(),
            buffer_size: defaults::buffer_size(),
            tls_enabled: defaults::TLS_ENABLED,
            cert_file_path: PathBuf::new(),
            key_file_path: PathBuf::new(),
            connect_timeout: defaults::connect_timeout(),
            log_level: defaults::log_level(),
        }
    }
}

impl RelayConfig {
    pub fn listen_addr(&self) -> &str {
        &self.listen_addr
    }

    pub fn backend_addr(&self) -> &str {
        &self.backend_addr
    }

    /// Relay chunk size in kilobytes
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Relay chunk size in bytes
    pub fn buffer_size_bytes(&self) -> usize {
        self.buffer_size.saturating_mul(1024)
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls_enabled
    }

    pub fn cert_file_path(&self) -> &Path {
        &self.cert_file_path
    }

    pub fn key_file_path(&self) -> &Path {
        &self.key_file_path
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Partial configuration produced by a single source
///
/// Numeric fields are signed so that negative input is reported as an
/// out-of-range value rather than a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub listen_addr: Option<String>,
    #[serde(default)]
    pub backend_addr: Option<String>,
    #[serde(default)]
    pub buffer_size: Option<i64>,
    #[serde(default)]
    pub tls_enabled: Option<bool>,
    #[serde(default)]
    pub cert_file_path: Option<PathBuf>,
    #[serde(default)]
    pub key_file_path: Option<PathBuf>,
    #[serde(default)]
    pub connect_timeout: Option<i64>,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    /// Whether this source sets nothing at all
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
