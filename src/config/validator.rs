//! Configuration validator
//!
//! Field-level checks run as each source is applied; record-level checks run
//! once the record is complete.

use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::{normalize_addr, RelayError, Result};
use super::defaults;
use super::types::{ConfigOverrides, RelayConfig};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl RelayConfig {
    /// Apply one configuration source on top of the current values
    ///
    /// Fields left unset by the source are kept. Empty strings and paths are
    /// treated as unset. The first invalid field aborts the whole source.
    pub fn apply(&mut self, overrides: ConfigOverrides) -> Result<()> {
        if let Some(addr) = non_empty(overrides.listen_addr) {
            self.listen_addr = parse_address(&addr)?;
        }

        if let Some(addr) = non_empty(overrides.backend_addr) {
            self.backend_addr = parse_address(&addr)?;
        }

        if let Some(size) = overrides.buffer_size {
            let size = positive(size, "buffer size")?;
            if size > defaults::MAX_BUFFER_SIZE_KB as i64 {
                return Err(RelayError::Config(format!(
                    "buffer size too large: {} KB (max {} KB)",
                    size,
                    defaults::MAX_BUFFER_SIZE_KB
                )));
            }
            self.buffer_size = size as usize;
        }

        if let Some(enabled) = overrides.tls_enabled {
            self.tls_enabled = enabled;
        }

        if let Some(path) = non_empty_path(overrides.cert_file_path) {
            check_exists(&path, "cert file path")?;
            self.cert_file_path = path;
        }

        if let Some(path) = non_empty_path(overrides.key_file_path) {
            check_exists(&path, "key file path")?;
            self.key_file_path = path;
        }

        if let Some(secs) = overrides.connect_timeout {
            self.connect_timeout = positive(secs, "connect timeout")? as u64;
        }

        if let Some(level) = non_empty(overrides.log_level) {
            let level = level.to_lowercase();
            if LOG_LEVELS.contains(&level.as_str()) {
                self.log_level = level;
            } else {
                warn!("Invalid log level: {}. Keeping: {}", level, self.log_level);
            }
        }

        Ok(())
    }

    /// Check the record as a whole
    ///
    /// Certificate material is not checked here; it is loaded
    /// and verified when the TLS listener is created.
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr == self.backend_addr {
            return Err(RelayError::Config(
                "listen and backend addresses must be different".to_string(),
            ));
        }

        if self.buffer_size == 0 {
            return Err(RelayError::Config("buffer size must be positive".to_string()));
        }

        if self.buffer_size > defaults::MAX_BUFFER_SIZE_KB {
            return Err(RelayError::Config("buffer size too large".to_string()));
        }

        if self.connect_timeout == 0 {
            return Err(RelayError::Config("connect timeout must be positive".to_string()));
        }

        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_empty_path(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|p| !p.as_os_str().is_empty())
}

fn parse_address(addr: &str) -> Result<String> {
    normalize_addr(addr.trim()).map_err(|e| match e {
        RelayError::Config(msg) => RelayError::Config(format!("parse address: {}", msg)),
        other => other,
    })
}

fn positive(value: i64, name: &str) -> Result<i64> {
    if value <= 0 {
        return Err(RelayError::Config(format!("{} must be positive", name)));
    }
    Ok(value)
}

fn check_exists(path: &Path, name: &str) -> Result<()> {
    fs::metadata(path)
        .map(|_| ())
        .map_err(|e| RelayError::Config(format!("{} {}: {}", name, path.display(), e)))
}
