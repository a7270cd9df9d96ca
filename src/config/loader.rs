//! Configuration loading functionality
//!
//! Each loader turns one source (JSON text, a JSON file, environment
//! variables) into a `ConfigOverrides`. `RelayConfig::resolve` applies the
//! sources in order, later ones winning.

use std::env;
use std::fs;
use std::path::Path;

use crate::common::{RelayError, Result};
use super::types::{ConfigOverrides, RelayConfig};

impl ConfigOverrides {
    /// Parse overrides from JSON
    ///
    /// Empty input yields no overrides.
    pub fn from_json(json: &[u8]) -> Result<Self> {
        if json.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        serde_json::from_slice(json)
            .map_err(|e| RelayError::Config(format!("parse json config: {}", e)))
    }

    /// Read overrides from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read(path).map_err(|e| {
            RelayError::Config(format!("read config file {}: {}", path.display(), e))
        })?;

        Self::from_json(&content)
    }

    /// Read overrides from `<prefix>_*` environment variables
    ///
    /// Recognised names: `LISTEN_ADDR`, `BACKEND_ADDR`, `BUFFER_SIZE`,
    /// `TLS_ENABLED`, `CERT_FILE_PATH`, `KEY_FILE_PATH`, `CONNECT_TIMEOUT`,
    /// `LOG_LEVEL`. `TLS_ENABLED` is on only for the value `true`.
    pub fn from_env(prefix: &str) -> Result<Self> {
        let get_env = |name: &str| env::var(format!("{}_{}", prefix, name)).ok();

        let parse_number = |name: &str, label: &str| -> Result<Option<i64>> {
            get_env(name)
                .map(|v| {
                    v.trim()
                        .parse::<i64>()
                        .map_err(|e| RelayError::Config(format!("{}: {}: {:?}", label, e, v)))
                })
                .transpose()
        };

        Ok(Self {
            listen_addr: get_env("LISTEN_ADDR"),
            backend_addr: get_env("BACKEND_ADDR"),
            buffer_size: parse_number("BUFFER_SIZE", "buffer size")?,
            tls_enabled: get_env("TLS_ENABLED").map(|v| v.trim().eq_ignore_ascii_case("true")),
            cert_file_path: get_env("CERT_FILE_PATH").map(Into::into),
            key_file_path: get_env("KEY_FILE_PATH").map(Into::into),
            connect_timeout: parse_number("CONNECT_TIMEOUT", "connect timeout")?,
            log_level: get_env("LOG_LEVEL"),
        })
    }
}

impl RelayConfig {
    /// Build a configuration from defaults plus the given sources
    ///
    /// Sources are applied in iteration order and the result is validated.
    pub fn resolve<I>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = ConfigOverrides>,
    {
        let mut config = Self::default();
        for overrides in sources {
            config.apply(overrides)?;
        }
        config.validate()?;
        Ok(config)
    }
}
