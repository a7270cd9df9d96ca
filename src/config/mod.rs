//! Configuration module
//!
//! This module resolves the relay configuration from defaults, a JSON file,
//! environment variables and command-line flags, and validates the result.
//! The relay itself only ever sees the finished, immutable `RelayConfig`.

pub mod defaults;
mod loader;
mod types;
mod validator;

pub use defaults::ENV_PREFIX;
pub use types::{ConfigOverrides, RelayConfig};
